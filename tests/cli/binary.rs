use std::process::Command;

use tempfile::TempDir;

fn reposcan() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reposcan"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let output = reposcan().arg("--help").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for name in ["scan", "serve", "clean"] {
        assert!(stdout.contains(name), "missing {} in help", name);
    }
}

#[test]
fn test_missing_config_file_fails() {
    let output = reposcan()
        .args(["--config-file", "/nonexistent/reposcan.toml", "clean"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_clean_removes_run_directories() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("reposcan.toml");
    std::fs::write(&config, "").unwrap();
    let workspace = temp_dir.path().join("runs");
    std::fs::create_dir_all(workspace.join("scan-20240501-100000-000-0123456789ab/repo")).unwrap();
    std::fs::create_dir_all(workspace.join("unrelated")).unwrap();

    let status = reposcan()
        .arg("--config-file")
        .arg(&config)
        .args(["--log-level", "off", "clean", "--workspace"])
        .arg(&workspace)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(!workspace.join("scan-20240501-100000-000-0123456789ab").exists());
    assert!(workspace.join("unrelated").exists());
}

#[test]
fn test_half_fixed_layout_in_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("reposcan.toml");
    std::fs::write(&config, "[scan]\nclone-dir = \"cloned_repo\"\n").unwrap();

    let status = reposcan()
        .arg("--config-file")
        .arg(&config)
        .args(["--log-level", "off", "clean"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}
