//! CLI integration tests for Anvil.
//!
//! These tests drive the `anvil` binary against throwaway projects. Tests
//! that need a real GCC toolchain skip themselves when it is missing.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the anvil binary command.
fn anvil() -> Command {
    Command::cargo_bin("anvil").unwrap()
}

/// Create a project directory with the given manifest and sources.
fn project(manifest: &str, sources: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Anvil.toml"), manifest).unwrap();
    for (path, contents) in sources {
        let path = tmp.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    tmp
}

// ============================================================================
// anvil environments
// ============================================================================

#[test]
fn test_environments_lists_builtins_and_aliases() {
    anvil()
        .arg("environments")
        .assert()
        .success()
        .stdout(predicate::str::contains("Linux_64 (linux_x64)"))
        .stdout(predicate::str::contains("Linux_32 (linux_i386)"))
        .stdout(predicate::str::contains("MacOSX_64"))
        .stdout(predicate::str::contains("Solaris_sparc"));
}

// ============================================================================
// anvil build: configuration errors
// ============================================================================

#[test]
fn test_build_without_manifest_fails() {
    let tmp = TempDir::new().unwrap();

    anvil()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read manifest"));
}

#[test]
fn test_build_requires_project_name() {
    let tmp = project("[project]\nversion = \"1.0\"\n", &[]);

    anvil()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("project.name"));
}

#[test]
fn test_build_rejects_unknown_target() {
    let tmp = project(
        "[project]\nname = \"demo\"\n\n[build]\nhost = \"linux_64\"\n",
        &[],
    );

    anvil()
        .args(["build", "--target", "amiga"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "couldn't find any environment matching `amiga`",
        ));
}

#[test]
fn test_build_without_toolchain_for_target_fails() {
    let tmp = project(
        "[project]\nname = \"demo\"\n\n[build]\nhost = \"win_64\"\n",
        &[("src/main/cpp/main.cpp", "int main() { return 0; }\n")],
    );

    anvil()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no compiler for target environment `Win_64`"));
}

#[test]
fn test_manifest_path_option() {
    let tmp = project("[project]\nname = \"demo\"\n", &[]);
    let build_dir = tmp.path().join("target");
    fs::create_dir_all(build_dir.join("obj")).unwrap();

    anvil()
        .arg("clean")
        .arg("--manifest-path")
        .arg(tmp.path().join("Anvil.toml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!build_dir.exists());
}

// ============================================================================
// anvil build: real toolchain
// ============================================================================

fn have_toolchain() -> bool {
    cfg!(all(target_os = "linux", target_arch = "x86_64"))
        && which::which("gcc").is_ok()
        && which::which("g++").is_ok()
        && which::which("ar").is_ok()
}

fn exists(root: &Path, rel: &str) -> bool {
    root.join(rel).exists()
}

#[test]
fn test_build_links_static_library_and_executable() {
    if !have_toolchain() {
        eprintln!("skipping: no x86_64 GCC toolchain");
        return;
    }

    let tmp = project(
        r#"
[project]
name = "greet"
version = "0.3.0"

[build]
host = "linux_64"
shared = true

[compiler-arguments]
all = "-O0"

[[executable]]
name = "hello"
entry-point = "src/main/cpp/main.c"
"#,
        &[
            ("src/main/include/greet.h", "int greet(void);\n"),
            (
                "src/main/cpp/greet.c",
                "#include \"greet.h\"\nint greet(void) { return 0; }\n",
            ),
            (
                "src/main/cpp/main.c",
                "#include \"greet.h\"\nint main(void) { return greet(); }\n",
            ),
        ],
    );

    anvil()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Linux_64 (2 compiled)"));

    let root = tmp.path();
    assert!(exists(root, "target/obj/linux_64/greet.o"));
    assert!(exists(root, "target/obj/linux_64/main.d"));
    assert!(exists(root, "target/attached/static/linux_64/libgreet.a"));
    assert!(exists(root, "target/attached/shared/linux_64/libgreet.so.0.3.0"));
    assert!(exists(root, "target/attached/executables/linux_64/hello"));

    Command::new(root.join("target/attached/executables/linux_64/hello"))
        .assert()
        .success();

    // Nothing changed: nothing is recompiled.
    anvil()
        .arg("build")
        .current_dir(root)
        .assert()
        .success()
        .stderr(predicate::str::contains("Linux_64 (0 compiled)"));
}

#[test]
fn test_compile_error_fails_build() {
    if !have_toolchain() {
        eprintln!("skipping: no x86_64 GCC toolchain");
        return;
    }

    let tmp = project(
        "[project]\nname = \"broken\"\n\n[build]\nhost = \"linux_64\"\n",
        &[("src/main/cpp/bad.c", "int main( { return 0; }\n")],
    );

    anvil()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("compilation aborted").or(predicate::str::contains("failed")));
}
