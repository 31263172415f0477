//! # CMake Validation Builds
//!
//! The CMake backend checks every supported way of consuming the library,
//! each in its own build directory:
//!
//! 1. `b2-distro` - installs a minimal prebuilt Boost with `b2`.
//! 2. `superproject-tests` - the library's tests built from the superproject.
//! 3. `standalone-tests` - the library built on its own against the prebuilt
//!    Boost, with integration, valgrind and coverage options.
//! 4. `subdirectory-tests` - a downstream project using `add_subdirectory`.
//! 5. `install` - installs the library, exercising the generated package
//!    files.
//! 6. `find-package-tests` - a downstream project using `find_package`
//!    against the prebuilt Boost.
//!
//! Stages 1, 3 and 6 only run with standalone tests enabled. Stage 6 is also
//! off for coverage builds, because stage 1 then strips the library headers
//! from the prebuilt distribution.

use std::env;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::process::{cmake_bool, cmake_list, path_arg, CommandSpec};

use super::{Artifact, BuildContext, BuildStage, Step};

/// C++ standard all CMake builds use.
pub const CXXSTD: &str = "20";

/// `CMAKE_BUILD_TYPE` and `--config` of all CMake builds.
pub const BUILD_TYPE: &str = "Debug";

/// The stage whose instrumented test run feeds coverage collection.
pub const STANDALONE_STAGE: &str = "standalone-tests";

const STANDALONE_DISABLED: &str = "standalone tests disabled";

/// Stages of the CMake backend, in execution order.
pub fn stages(ctx: &BuildContext<'_>) -> Vec<BuildStage> {
    let planner = Planner::new(ctx);
    vec![
        planner.b2_distro(),
        planner.superproject_tests(),
        planner.standalone_tests(),
        planner.subdirectory_tests(),
        planner.install(),
        planner.find_package_tests(),
    ]
}

struct Planner<'a> {
    ctx: &'a BuildContext<'a>,
    library_dir: PathBuf,
    b2_distro: PathBuf,
    /// `LD_LIBRARY_PATH` pointing at the prebuilt distribution, if needed.
    library_path: Option<(&'static str, String)>,
}

impl<'a> Planner<'a> {
    fn new(ctx: &'a BuildContext<'a>) -> Self {
        let b2_distro = ctx.layout.b2_distro();
        let library_path = ctx.platform.library_path_var().map(|var| {
            let mut value = b2_distro.join("lib").display().to_string();
            if let Ok(previous) = env::var(var) {
                if !previous.is_empty() {
                    value.push(ctx.platform.path_list_separator());
                    value.push_str(&previous);
                }
            }
            (var, value)
        });

        Self {
            ctx,
            library_dir: ctx.library_dir(),
            b2_distro,
            library_path,
        }
    }

    fn command(&self, program: &str, cwd: &Path) -> CommandSpec {
        let command = CommandSpec::new(program).current_dir(cwd);
        match &self.library_path {
            Some((var, value)) => command.env(*var, value.clone()),
            None => command,
        }
    }

    /// `CMAKE_PREFIX_PATH` with `extra` before the platform entries.
    fn prefix_path(&self, extra: &[&Path]) -> String {
        let platform = self.ctx.platform.cmake_prefix_path();
        let entries: Vec<&Path> = extra
            .iter()
            .copied()
            .chain(platform.iter().map(PathBuf::as_path))
            .collect();
        format!("-DCMAKE_PREFIX_PATH={}", cmake_list(entries))
    }

    /// `CMAKE_PREFIX_PATH` with `extra` after the platform entries.
    fn prefix_path_after(&self, extra: &Path) -> String {
        let mut entries = self.ctx.platform.cmake_prefix_path();
        entries.push(extra.to_path_buf());
        format!("-DCMAKE_PREFIX_PATH={}", cmake_list(entries))
    }

    fn generator(&self) -> [String; 2] {
        ["-G".to_string(), self.ctx.config.generator.clone()]
    }

    fn shared_libs(&self) -> String {
        format!(
            "-DBUILD_SHARED_LIBS={}",
            cmake_bool(self.ctx.config.build_shared_libs)
        )
    }

    fn library_option(&self, name: &str, value: bool) -> String {
        format!(
            "-D{}{}={}",
            self.ctx.config.env_prefix(),
            name,
            cmake_bool(value)
        )
    }

    fn build(&self, dir: &Path, target: Option<&str>) -> CommandSpec {
        let mut command = self.command("cmake", dir).args(["--build", "."]);
        if let Some(target) = target {
            command = command.args(["--target", target]);
        }
        command
            .args(["--config", BUILD_TYPE])
            .arg(format!("-j{}", defaults::BUILD_JOBS))
    }

    fn ctest(&self, dir: &Path) -> CommandSpec {
        self.command("ctest", dir)
            .args(["--output-on-failure", "--build-config", BUILD_TYPE])
    }

    fn b2_distro(&self) -> BuildStage {
        let config = self.ctx.config;
        let mut stage = BuildStage::new("b2-distro")
            .run(self.command("b2", &self.ctx.layout.root).args([
                format!("--prefix={}", path_arg(&self.b2_distro)),
                "--with-system".to_string(),
                "--with-context".to_string(),
                "--with-coroutine".to_string(),
                "--with-date_time".to_string(),
                "--with-test".to_string(),
                "-d0".to_string(),
                format!("cxxstd={}", CXXSTD),
                "install".to_string(),
            ]))
            .produces(Artifact::B2Distro)
            .disabled_if(!config.standalone_tests, STANDALONE_DISABLED);

        // Installed copies of our headers would be attributed coverage
        if config.coverage {
            stage = stage.step(Step::RemoveDir(
                self.b2_distro
                    .join("include")
                    .join("boost")
                    .join(&config.library),
            ));
        }
        stage
    }

    fn superproject_tests(&self) -> BuildStage {
        let config = self.ctx.config;
        let dir = self.ctx.layout.root.join("__build_cmake_test__");
        BuildStage::new("superproject-tests")
            .in_dir(&dir)
            .run(
                self.command("cmake", &dir)
                    .args(self.generator())
                    .arg(self.prefix_path(&[]))
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE))
                    .arg(format!("-DCMAKE_CXX_STANDARD={}", CXXSTD))
                    .arg(format!("-DBOOST_INCLUDE_LIBRARIES={}", config.library))
                    .arg(self.shared_libs())
                    .args(["-DBUILD_TESTING=ON", "-DBoost_VERBOSE=ON", ".."]),
            )
            .run(self.build(&dir, Some("tests")))
            .run(self.ctest(&dir))
    }

    fn standalone_tests(&self) -> BuildStage {
        let config = self.ctx.config;
        let dir = self.library_dir.join("__build_standalone__");
        BuildStage::new(STANDALONE_STAGE)
            .in_dir(&dir)
            .run(
                self.command("cmake", &dir)
                    .arg(self.prefix_path(&[self.b2_distro.as_path()]))
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE))
                    .arg(format!("-DCMAKE_CXX_STANDARD={}", CXXSTD))
                    .arg(self.library_option("INTEGRATION_TESTS", true))
                    .arg(self.library_option("VALGRIND_TESTS", config.valgrind))
                    .arg(self.library_option("COVERAGE", config.coverage))
                    .args(self.generator())
                    .arg(".."),
            )
            .run(
                self.command("cmake", &dir)
                    .args(["--build", "."])
                    .arg(format!("-j{}", defaults::BUILD_JOBS)),
            )
            .run(self.ctest(&dir))
            .requires(Artifact::B2Distro)
            .disabled_if(!config.standalone_tests, STANDALONE_DISABLED)
    }

    fn subdirectory_tests(&self) -> BuildStage {
        let dir = self
            .library_dir
            .join("test")
            .join("cmake_test")
            .join("__build_cmake_subdir_test__");
        BuildStage::new("subdirectory-tests")
            .in_dir(&dir)
            .run(
                self.command("cmake", &dir)
                    .args(self.generator())
                    .arg(self.prefix_path(&[]))
                    .arg("-DBOOST_CI_INSTALL_TEST=OFF")
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE))
                    .arg(self.shared_libs())
                    .arg(".."),
            )
            .run(self.build(&dir, None))
            .run(self.ctest(&dir))
    }

    fn install(&self) -> BuildStage {
        let config = self.ctx.config;
        let dir = self.ctx.layout.root.join("__build_cmake_install_test__");
        BuildStage::new("install")
            .in_dir(&dir)
            .run(
                self.command("cmake", &dir)
                    .args(self.generator())
                    .arg(self.prefix_path(&[]))
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE))
                    .arg(format!("-DBOOST_INCLUDE_LIBRARIES={}", config.library))
                    .arg(self.shared_libs())
                    .arg(format!(
                        "-DCMAKE_INSTALL_PREFIX={}",
                        path_arg(self.ctx.layout.cmake_distro())
                    ))
                    .args([
                        "-DBoost_VERBOSE=ON",
                        "-DBoost_DEBUG=ON",
                        "-DCMAKE_INSTALL_MESSAGE=NEVER",
                        "..",
                    ]),
            )
            .run(self.build(&dir, Some("install")))
    }

    fn find_package_tests(&self) -> BuildStage {
        let config = self.ctx.config;
        let dir = self
            .library_dir
            .join("test")
            .join("cmake_b2_test")
            .join("__build_cmake_b2_test__");
        BuildStage::new("find-package-tests")
            .in_dir(&dir)
            .run(
                self.command("cmake", &dir)
                    .args(self.generator())
                    .arg(self.prefix_path_after(&self.b2_distro))
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE))
                    .args(["-DBUILD_TESTING=ON", ".."]),
            )
            .run(self.build(&dir, None))
            .run(self.ctest(&dir))
            .requires(Artifact::B2Distro)
            .disabled_if(!config.standalone_tests, STANDALONE_DISABLED)
            .disabled_if(
                config.coverage,
                "incompatible with coverage (library headers are stripped from b2-distro)",
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{preview, StageOutcome};
    use crate::config::{BackendKind, BuildConfiguration};
    use crate::platform::Platform;
    use crate::workspace::Layout;

    fn plan(config: &BuildConfiguration, platform: Platform) -> Vec<BuildStage> {
        let layout = Layout::new("/home/ci");
        let ctx = BuildContext {
            config,
            layout: &layout,
            platform,
        };
        stages(&ctx)
    }

    fn config() -> BuildConfiguration {
        BuildConfiguration::new(BackendKind::Cmake, "/src/mysql")
    }

    fn commands(stage: &BuildStage) -> Vec<CommandSpec> {
        stage
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Run(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    fn ran(stages: &[BuildStage]) -> Vec<String> {
        preview(stages)
            .into_iter()
            .filter(|r| r.outcome == StageOutcome::Passed)
            .map(|r| r.name)
            .collect()
    }

    #[test]
    fn test_all_stages_run_by_default() {
        let stages = plan(&config(), Platform::Posix);
        assert_eq!(
            ran(&stages),
            vec![
                "b2-distro",
                "superproject-tests",
                "standalone-tests",
                "subdirectory-tests",
                "install",
                "find-package-tests",
            ]
        );
    }

    #[test]
    fn test_without_standalone_tests_only_independent_stages_run() {
        let config = BuildConfiguration {
            standalone_tests: false,
            ..config()
        };
        let stages = plan(&config, Platform::Posix);
        assert_eq!(
            ran(&stages),
            vec!["superproject-tests", "subdirectory-tests", "install"]
        );
    }

    #[test]
    fn test_coverage_strips_headers_and_skips_find_package() {
        let config = BuildConfiguration {
            coverage: true,
            ..config()
        };
        let stages = plan(&config, Platform::Posix);

        assert_eq!(
            stages[0].steps.last(),
            Some(&Step::RemoveDir(PathBuf::from(
                "/home/ci/b2-distro/include/boost/mysql"
            )))
        );
        assert!(!ran(&stages).contains(&"find-package-tests".to_string()));
        let standalone = commands(&stages[2]);
        assert!(standalone[0].has_arg("-DBOOST_MYSQL_COVERAGE=ON"));
    }

    #[test]
    fn test_b2_distro_command() {
        let stages = plan(&config(), Platform::Posix);
        let command = &commands(&stages[0])[0];
        assert_eq!(
            command.to_string(),
            "b2 --prefix=/home/ci/b2-distro --with-system --with-context --with-coroutine \
             --with-date_time --with-test -d0 cxxstd=20 install"
        );
        assert_eq!(stages[0].steps.len(), 1);
    }

    #[test]
    fn test_superproject_tests_commands() {
        let config = BuildConfiguration {
            build_shared_libs: false,
            ..config()
        };
        let stages = plan(&config, Platform::Posix);
        let stage = &stages[1];
        let commands = commands(stage);

        assert_eq!(
            stage.dir.as_deref(),
            Some(Path::new("/home/ci/boost-root/__build_cmake_test__"))
        );
        assert_eq!(
            commands[0].to_string(),
            "cmake -G Ninja -DCMAKE_PREFIX_PATH= -DCMAKE_BUILD_TYPE=Debug \
             -DCMAKE_CXX_STANDARD=20 -DBOOST_INCLUDE_LIBRARIES=mysql -DBUILD_SHARED_LIBS=OFF \
             -DBUILD_TESTING=ON -DBoost_VERBOSE=ON .."
        );
        assert_eq!(
            commands[1].to_string(),
            "cmake --build . --target tests --config Debug -j4"
        );
        assert_eq!(
            commands[2].to_string(),
            "ctest --output-on-failure --build-config Debug"
        );
        for command in &commands {
            assert_eq!(command.cwd, stage.dir);
        }
    }

    #[test]
    fn test_standalone_uses_distro_and_library_options() {
        let config = BuildConfiguration {
            valgrind: true,
            ..config()
        };
        let stages = plan(&config, Platform::Posix);
        let stage = &stages[2];
        let configure = &commands(stage)[0];

        assert_eq!(
            stage.dir.as_deref(),
            Some(Path::new(
                "/home/ci/boost-root/libs/mysql/__build_standalone__"
            ))
        );
        assert!(configure.has_arg("-DCMAKE_PREFIX_PATH=/home/ci/b2-distro"));
        assert!(configure.has_arg("-DBOOST_MYSQL_INTEGRATION_TESTS=ON"));
        assert!(configure.has_arg("-DBOOST_MYSQL_VALGRIND_TESTS=ON"));
        assert!(configure.has_arg("-DBOOST_MYSQL_COVERAGE=OFF"));
        assert_eq!(stage.requires, vec![Artifact::B2Distro]);
    }

    #[test]
    fn test_install_stage_targets_cmake_distro() {
        let stages = plan(&config(), Platform::Posix);
        let commands = commands(&stages[4]);
        assert!(commands[0].has_arg("-DCMAKE_INSTALL_PREFIX=/home/ci/cmake-distro"));
        assert!(commands[0].has_arg("-DCMAKE_INSTALL_MESSAGE=NEVER"));
        assert_eq!(
            commands[1].to_string(),
            "cmake --build . --target install --config Debug -j4"
        );
        assert_eq!(commands.len(), 2);
        // nothing consumes the installed tree yet
        assert!(stages[4].produces.is_empty());
    }

    #[test]
    fn test_find_package_dir_and_prefix() {
        let stages = plan(&config(), Platform::Windows);
        let stage = &stages[5];
        assert!(stage
            .dir
            .as_ref()
            .unwrap()
            .ends_with("test/cmake_b2_test/__build_cmake_b2_test__"));
        let configure = &commands(stage)[0];
        assert!(configure.args.iter().any(|a| a.starts_with("-DCMAKE_PREFIX_PATH=C:\\openssl-64;")
            && a.ends_with("b2-distro")));
    }

    #[test]
    fn test_library_path_only_on_posix() {
        let posix = plan(&config(), Platform::Posix);
        let value = commands(&posix[1])[0]
            .env_value("LD_LIBRARY_PATH")
            .map(str::to_string)
            .unwrap();
        assert!(value.starts_with("/home/ci/b2-distro/lib"));

        let windows = plan(&config(), Platform::Windows);
        assert_eq!(commands(&windows[1])[0].env_value("LD_LIBRARY_PATH"), None);
    }

    #[test]
    fn test_generator_is_configurable() {
        let config = BuildConfiguration {
            generator: "Unix Makefiles".to_string(),
            ..config()
        };
        let stages = plan(&config, Platform::Posix);
        let configure = &commands(&stages[3])[0];
        assert_eq!(configure.args[0..2], ["-G", "Unix Makefiles"]);
        assert!(configure.has_arg("-DBOOST_CI_INSTALL_TEST=OFF"));
    }
}
