//! DF-011: Local command execution with a hard timeout.
//!
//! stdout and stderr are drained on helper threads so a chatty child cannot
//! block on a full pipe while we wait. On timeout the child is killed. The
//! same deadline bounds collecting output, since a background grandchild can
//! keep the pipes open after the child exits.

use super::ExecOutput;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const WAIT_STEP: Duration = Duration::from_millis(20);
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Run `program args...` and collect its output, killing it after `timeout`.
pub fn exec_local(program: &str, args: &[&str], timeout: Duration) -> Result<ExecOutput, String> {
    let deadline = Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let cmd = format!("{} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", program, e))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, deadline, timeout)
        .map_err(|e| format!("{}: {}", cmd, e))?;

    let collect = |rx: Receiver<String>, name: &str| {
        rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(|_| {
                format!(
                    "{}: timed out after {}s waiting for {} to close",
                    cmd,
                    timeout.as_secs(),
                    name
                )
            })
    };

    Ok(ExecOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: collect(stdout, "stdout")?,
        stderr: collect(stderr, "stderr")?,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        // Receiver gone means the caller gave up
        let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
    });
    rx
}

/// Poll the child until it exits or the deadline passes.
fn wait_with_timeout(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<std::process::ExitStatus, String> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {}s", timeout.as_secs()));
            }
            Ok(None) => thread::sleep(WAIT_STEP),
            Err(e) => return Err(format!("wait error: {}", e)),
        }
    }
}
