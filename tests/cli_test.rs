use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn kernel_prep(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kernel-prep").unwrap();
    cmd.arg("--config")
        .arg(config_dir.join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_zero() {
    Command::cargo_bin("kernel-prep")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn no_args_shows_help() {
    Command::cargo_bin("kernel-prep").unwrap().assert().failure();
}

#[test]
fn run_echoes_command_and_output() {
    let tmp = tempfile::tempdir().unwrap();
    kernel_prep(tmp.path())
        .args(["run", "--", "echo", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CMD: echo hello"))
        .stdout(predicate::str::contains("\nhello\n"));
}

#[test]
fn run_non_zero_exit_is_reported_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    kernel_prep(tmp.path())
        .args(["run", "--shell", "exit 4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR (4) running command!"));
}

#[test]
fn run_json_reports_code_and_moves_echo_to_stderr() {
    let tmp = tempfile::tempdir().unwrap();
    let output = kernel_prep(tmp.path())
        .args(["--json", "run", "--shell", "echo out; exit 3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["code"], 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CMD: echo out; exit 3"));
    assert!(stderr.contains("out"));
}

#[test]
fn run_missing_program_fails() {
    let tmp = tempfile::tempdir().unwrap();
    kernel_prep(tmp.path())
        .args(["run", "kernel-prep-no-such-program"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn run_no_split_rejects_separate_arguments() {
    let tmp = tempfile::tempdir().unwrap();
    kernel_prep(tmp.path())
        .args(["run", "--no-split", "--", "echo", "hello"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("CMD:").not())
        .stderr(predicate::str::contains("--no-split takes a single command string"));
}

#[test]
fn run_list_from_file_runs_all_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("log");
    let cmds = tmp.path().join("cmds.txt");
    std::fs::write(
        &cmds,
        format!(
            "# steps\necho A >> {log}; exit 1\necho B >> {log}\necho C >> {log}; exit 2\n",
            log = log.display()
        ),
    )
    .unwrap();

    kernel_prep(tmp.path())
        .args(["run-list", "--shell", "--file"])
        .arg(&cmds)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ran 3 command(s)"));

    assert_eq!(std::fs::read_to_string(&log).unwrap(), "A\nB\nC\n");
}

#[test]
fn pip_install_manifest_without_pip_aborts() {
    let tmp = tempfile::tempdir().unwrap();
    let manifest = tmp.path().join("environment.yml");
    std::fs::write(&manifest, "dependencies:\n  - python=3.7\n").unwrap();

    kernel_prep(tmp.path())
        .arg("pip-install-manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .stdout(predicate::str::contains("CMD:").not())
        .stderr(predicate::str::contains("did not find a `pip` entry"));
}

#[test]
fn style_writes_theme_files() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("style");

    kernel_prep(tmp.path())
        .args(["style", "--dir"])
        .arg(&out)
        .assert()
        .success();

    let rc = std::fs::read_to_string(out.join("matplotlibrc")).unwrap();
    assert!(rc.contains("savefig.dpi: 300"));
    assert!(out.join("ipython_config.py").exists());

    kernel_prep(tmp.path())
        .args(["style", "--dir"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn env_json_respects_config_override() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        "[python]\nhosted = true\nsite_packages = \"/nonexistent/site-packages\"\n",
    )
    .unwrap();

    let output = kernel_prep(tmp.path())
        .args(["--json", "env"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["hosted"], true);
    assert_eq!(result["site_packages_present"], false);
}

#[test]
fn bootstrap_skips_outside_hosted_kernel() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "[python]\nhosted = false\n").unwrap();

    kernel_prep(tmp.path())
        .args(["bootstrap", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped"))
        .stdout(predicate::str::contains("CMD:").not());
}

#[test]
fn config_init_then_path() {
    let tmp = tempfile::tempdir().unwrap();

    kernel_prep(tmp.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(tmp.path().join("config.toml").exists());

    kernel_prep(tmp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    kernel_prep(tmp.path())
        .args(["config", "init"])
        .assert()
        .failure();
}

#[test]
fn invalid_config_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "[runner]\nshell = \"\"\n").unwrap();

    kernel_prep(tmp.path())
        .args(["run", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("runner.shell"));
}
