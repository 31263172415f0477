//! End-to-end tests for the `boost-ci plan` command.
//!
//! `plan` is read-only: it must never create the workspace or spawn tools.

mod common;
use common::prelude::*;

#[test]
fn test_plan_fresh_b2_workspace() {
    let fixture = TestFixture::new().with_library_sources();

    fixture
        .command()
        .arg("plan")
        .args(fixture.config_args("b2"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[PLAN] Plan for mysql (b2 backend)"))
        .stdout(predicate::str::contains("(fresh)"))
        .stdout(predicate::str::contains(
            "git clone -b master --depth 1 https://github.com/boostorg/boost.git",
        ))
        .stdout(predicate::str::contains(
            "python tools/boostdep/depinst/depinst.py --include example mysql",
        ))
        .stdout(predicate::str::contains("b2 --abbreviate-paths toolset=clang"));

    assert!(!fixture.workspace().exists());
}

#[test]
fn test_plan_cmake_without_standalone_tests() {
    let fixture = TestFixture::new().with_library_sources();

    fixture
        .command()
        .arg("plan")
        .args(fixture.config_args("cmake"))
        .args(["--cmake-standalone-tests", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "b2-distro (skipped: standalone tests disabled)",
        ))
        .stdout(predicate::str::contains(
            "find-package-tests (skipped: standalone tests disabled)",
        ))
        .stdout(predicate::str::contains("ctest --output-on-failure"));
}

#[test]
fn test_plan_cmake_coverage_lists_upload() {
    let fixture = TestFixture::new().with_library_sources();

    fixture
        .command()
        .arg("plan")
        .args(fixture.config_args("cmake"))
        .env("BOOST_CI_COVERAGE", "true")
        .assert()
        .success()
        .stdout(predicate::str::contains("-DBOOST_MYSQL_COVERAGE=ON"))
        .stdout(predicate::str::contains(
            "lcov --capture --no-external --directory . -o coverage.info",
        ))
        .stdout(predicate::str::contains("codecov -Z -f coverage.info"));
}

#[test]
fn test_plan_reused_workspace_skips_clone() {
    let fixture = TestFixture::new()
        .with_library_sources()
        .with_file("boost-root/README.md", "boost\n");

    fixture
        .command()
        .arg("plan")
        .args(fixture.config_args("docs"))
        .assert()
        .success()
        .stdout(predicate::str::contains("(reused)"))
        .stdout(predicate::str::contains("git clone").not())
        .stdout(predicate::str::contains("libs/mysql/doc//boostrelease"));
}

#[test]
fn test_plan_clean_removes_workspace_first() {
    let fixture = TestFixture::new()
        .with_library_sources()
        .with_file("boost-root/README.md", "boost\n");

    fixture
        .command()
        .arg("plan")
        .args(fixture.config_args("b2"))
        .args(["--clean", "yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(fresh)"))
        .stdout(predicate::str::contains("git clone"));

    assert!(fixture.workspace().join("README.md").exists());
}
