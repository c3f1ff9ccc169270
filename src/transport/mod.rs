//! DF-010: Subprocess execution for the external automation tool.

pub mod local;

use std::time::Duration;

/// Output from running a command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external program to completion or until the timeout expires.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<ExecOutput, String>;
}

/// Production runner: spawns the program locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<ExecOutput, String> {
        local::exec_local(program, args, timeout)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_df010_exec_output_success() {
        let ok = ExecOutput { exit_code: 0, stdout: "ok".into(), stderr: "".into() };
        assert!(ok.success());
        let fail = ExecOutput { exit_code: 1, stdout: "".into(), stderr: "err".into() };
        assert!(!fail.success());
        let sig = ExecOutput { exit_code: -1, stdout: "".into(), stderr: "killed".into() };
        assert!(!sig.success());
    }

    #[test]
    fn test_df010_local_runner_delegates() {
        let out = LocalRunner
            .run("sh", &["-c", "echo runner"], Duration::from_secs(10))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "runner");
    }
}
