//! # Plan Command Implementation
//!
//! This module implements the `plan` subcommand, which shows what `build`
//! would do with the same options: environment changes, staging commands,
//! every backend stage with its steps, and coverage post-processing.
//!
//! Stages that would be skipped are shown with the reason. The plan reflects
//! the current state of the workspace, so a second `plan` after a `build`
//! no longer lists the clone and bootstrap commands.
//!
//! This command is a safe, read-only operation that does not modify any files
//! or run any tools.

use std::borrow::Cow;
use std::io;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, Style, TreeItem};

use boost_ci::backends::StageOutcome;
use boost_ci::config::BuildConfiguration;
use boost_ci::orchestrator::{Pipeline, Plan};
use boost_ci::output::{emoji, OutputConfig};
use boost_ci::platform::Platform;
use boost_ci::process::{CommandSpec, RecordingRunner};

use super::build::ConfigArgs;

/// Show what `build` would do, without doing it
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = args.config.to_configuration()?;
    let runner = RecordingRunner::new();
    let pipeline = Pipeline::new(&runner, Platform::current(), args.config.layout()?);

    let plan = pipeline.plan(&config)?;

    println!(
        "{} Plan for {} ({} backend)",
        emoji(&out, "📋", "[PLAN]"),
        config.library,
        config.backend
    );
    let tree = build_tree(&config, pipeline.layout().root.display().to_string(), &plan);
    print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display plan: {}", e))?;

    Ok(())
}

fn build_tree(config: &BuildConfiguration, root: String, plan: &Plan) -> TreeNode {
    let environment = TreeNode::branch(
        "environment",
        plan.environment
            .iter()
            .map(|change| TreeNode::leaf(change.to_string()))
            .collect(),
    );

    let mut staging = Vec::new();
    if plan.staging.remove_existing {
        staging.push(TreeNode::leaf(format!("remove {}", root)));
    }
    if let Some(clone) = &plan.staging.clone {
        staging.push(command_node(clone));
    }
    staging.push(TreeNode::leaf(format!(
        "copy {} to libs/{}",
        config.source_dir.display(),
        config.library
    )));
    staging.extend(plan.staging.setup.iter().map(|(_, c)| command_node(c)));
    let workspace = TreeNode::branch(
        format!(
            "workspace {} ({})",
            root,
            if plan.staging.fresh { "fresh" } else { "reused" }
        ),
        staging,
    );

    let stages = plan
        .stages
        .iter()
        .zip(&plan.outcomes)
        .map(|(stage, outcome)| match &outcome.outcome {
            StageOutcome::Passed => TreeNode::branch(
                stage.name,
                stage
                    .steps
                    .iter()
                    .map(|step| TreeNode::leaf(step.to_string()))
                    .collect(),
            ),
            StageOutcome::Skipped { reason } => {
                TreeNode::leaf(format!("{} (skipped: {})", stage.name, reason))
            }
            StageOutcome::Failed { message } => {
                TreeNode::leaf(format!("{} (failed: {})", stage.name, message))
            }
        })
        .collect();

    let mut children = vec![environment, workspace, TreeNode::branch("stages", stages)];
    if !plan.coverage.is_empty() {
        children.push(TreeNode::branch(
            "coverage",
            plan.coverage.iter().map(command_node).collect(),
        ));
    }

    TreeNode::branch(config.backend.to_string(), children)
}

fn command_node(command: &CommandSpec) -> TreeNode {
    TreeNode::leaf(command.to_string())
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: impl Into<String>) -> Self {
        Self::branch(label, Vec::new())
    }

    fn branch(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
