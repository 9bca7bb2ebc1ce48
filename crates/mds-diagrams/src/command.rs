//! External process execution with an optional timeout.
//!
//! On Unix the child leads its own process group, so a timeout also kills
//! the processes it started (package runners spawn the real renderer as a
//! grandchild that shares the output pipes).

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit-status polls while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished process.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Process execution error.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CommandError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// With a timeout, the child and its process group are killed once the
/// deadline passes, whether the child itself is still running or a
/// descendant still holds its output pipes.
pub(crate) fn run(mut cmd: Command, timeout: Option<Duration>) -> Result<ProcessOutput, CommandError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    // Drain pipes on separate threads so a chatty child cannot block on a full pipe
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let Some(timeout) = timeout else {
        let status = child.wait().map_err(|source| CommandError::Wait {
            program: program.clone(),
            source,
        })?;
        return Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout: collect(stdout.as_ref(), None).unwrap_or_default(),
            stderr: collect(stderr.as_ref(), None).unwrap_or_default(),
        });
    };

    let deadline = Instant::now() + timeout;
    let timed_out = |child: &mut Child| {
        tracing::debug!(program = %program, pid = child.id(), "Killing timed out process group");
        kill_tree(child);
        CommandError::Timeout {
            program: program.clone(),
            timeout,
        }
    };

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                kill_tree(&mut child);
                return Err(CommandError::Wait {
                    program: program.clone(),
                    source,
                });
            }
        }
        if Instant::now() >= deadline {
            return Err(timed_out(&mut child));
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Reader threads of a killed group are left to finish on their own
    let (Some(stdout), Some(stderr)) = (
        collect(stdout.as_ref(), Some(deadline)),
        collect(stderr.as_ref(), Some(deadline)),
    ) else {
        return Err(timed_out(&mut child));
    };

    Ok(ProcessOutput {
        success: status.success(),
        code: status.code(),
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a reader to reach end of file.
///
/// Returns `None` when the deadline passes first.
fn collect(reader: Option<&Receiver<String>>, deadline: Option<Instant>) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    match deadline {
        None => Some(reader.recv().unwrap_or_default()),
        Some(deadline) => {
            match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(text) => Some(text),
                Err(RecvTimeoutError::Disconnected) => Some(String::new()),
                Err(RecvTimeoutError::Timeout) => None,
            }
        }
    }
}

/// Kill the child together with every process left in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; `pgid` is the group created for this child.
    let res = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if res != 0 {
        let err = std::io::Error::last_os_error();
        // Group already gone
        if !matches!(err.raw_os_error(), Some(libc::ESRCH | libc::EPERM)) {
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}
