//! Documentation release build.

use crate::defaults;
use crate::process::CommandSpec;

use super::{BuildContext, BuildStage, Step};

/// Toolchain declarations `b2` needs to build the docs.
pub const USER_CONFIG: &str = "using doxygen ;\nusing boostbook ;\nusing saxonhe ;\n";

/// C++ standard the documentation build is configured with.
pub const CXXSTD: &str = "17";

/// The one stage of the docs backend.
///
/// The generated HTML ends up in `<source-dir>/doc/html`, replacing whatever
/// was there.
pub fn stages(ctx: &BuildContext<'_>) -> Vec<BuildStage> {
    let lib = ctx.config.library.as_str();
    let html = ctx.library_dir().join("doc").join("html");

    let stage = BuildStage::new("docs")
        .step(Step::WriteFile {
            path: ctx.layout.user_config_jam(),
            contents: USER_CONFIG.to_string(),
        })
        .run(
            CommandSpec::new("b2")
                .current_dir(&ctx.layout.root)
                .args([
                    format!("-j{}", defaults::BUILD_JOBS),
                    format!("cxxstd={}", CXXSTD),
                    format!("libs/{}/doc//boostrelease", lib),
                ]),
        )
        .step(Step::ReplaceTree {
            src: html,
            dst: ctx.config.source_dir.join("doc").join("html"),
        });

    vec![stage]
}
