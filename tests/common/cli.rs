use assert_cmd::Command;
use std::ffi::OsStr;

use super::TestArea;

#[derive(Debug)]
pub struct PtRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl PtRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).expect("stdout is JSON")
    }
}

pub fn pt(area: &TestArea) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pt"));
    cmd.current_dir(area.root());
    cmd.env_remove("PLAINTRACK_DIR");
    cmd.env_remove("PLAINTRACK_AUTO_MERGE");
    cmd.env("HOME", area.root());
    cmd.env("RUST_LOG", "plaintrack=debug");
    cmd
}

pub fn run_pt<I, S>(area: &TestArea, args: I) -> PtRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = pt(area).args(args).output().expect("run pt");
    PtRun {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
    }
}
