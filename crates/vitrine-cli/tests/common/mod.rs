#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

fn home_dir() -> &'static Path {
    static HOME: OnceLock<TempDir> = OnceLock::new();
    HOME.get_or_init(|| tempfile::tempdir().expect("failed to create home dir for tests"))
        .path()
}

/// Create a `vitrine` command isolated from the user's config and cache.
/// Callers pick the data directory explicitly.
#[allow(dead_code)]
pub fn vitrine_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vitrine"));
    cmd.timeout(CMD_TIMEOUT);
    let home = home_dir();
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env_remove("VITRINE_CONFIG");
    cmd.env("VITRINE_DATA_DIR", data_dir);
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Run a command that prints JSON and parse its stdout.
#[allow(dead_code)]
pub fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--format").arg("json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}
