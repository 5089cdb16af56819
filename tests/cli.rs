use assert_cmd::Command;
use std::fs;

fn reelbrowser() -> Command {
    let mut cmd = Command::cargo_bin("reelbrowser").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_zero_and_lists_commands() {
    let output = reelbrowser().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["record", "cards", "pdf", "snap", "jobs"] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}

#[test]
fn version_exits_zero() {
    reelbrowser().arg("--version").assert().success();
}

#[test]
fn usage_errors_exit_one() {
    reelbrowser().assert().code(1);
    reelbrowser().arg("teleport").assert().code(1);
    reelbrowser().args(["pdf", "only-input.html"]).assert().code(1);
}

#[test]
fn invalid_runbook_fails_before_launching_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let runbook = dir.path().join("bad.yaml");
    fs::write(&runbook, "name: empty\nscenes: []\n").unwrap();

    let output = reelbrowser()
        .current_dir(dir.path())
        .args(["record", runbook.to_str().unwrap(), "--no-gate", "--no-mute"])
        .env("REELBROWSER_CHROME", "/nonexistent/chrome")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load runbook"), "{stderr}");
}

#[test]
fn jobs_without_base_url_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "api: {}\n").unwrap();

    let output = reelbrowser()
        .args(["--config", config.to_str().unwrap(), "jobs", "--token", "t"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No API base URL"));
}
