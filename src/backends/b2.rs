//! The fast path: a single `b2` invocation over the library's tests and
//! examples.

use crate::defaults;
use crate::process::CommandSpec;

use super::{BuildContext, BuildStage};

/// The one stage of the `b2` backend.
pub fn stages(ctx: &BuildContext<'_>) -> Vec<BuildStage> {
    let config = ctx.config;
    let lib = config.library.as_str();

    let mut command = CommandSpec::new("b2")
        .current_dir(&ctx.layout.root)
        .args([
            "--abbreviate-paths".to_string(),
            format!("toolset={}", config.toolset),
            format!("cxxstd={}", config.cxxstd),
            format!("address-model={}", config.address_model),
            format!("variant={}", config.variant),
            format!("stdlib={}", config.stdlib),
            "warnings-as-errors=on".to_string(),
            format!("-j{}", defaults::BUILD_JOBS),
            format!("libs/{}/test", lib),
            format!("libs/{lib}/test/integration//boost_{lib}_integrationtests"),
            format!("libs/{lib}/example//boost_{lib}_all_examples"),
        ]);

    if let Some(root) = ctx.platform.openssl_root(config.address_model.as_str()) {
        command = command.env("OPENSSL_ROOT", root);
    }

    vec![BuildStage::new("b2").run(command)]
}
