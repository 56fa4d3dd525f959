use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, the way a terminal would show them.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    run_command_in(program, args, None, timeout, trace_id)
}

pub fn run_command_in(
    program: &str,
    args: &[String],
    working_dir: Option<&Path>,
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }
    debug!(trace_id = %trace_id, program = %program, args = ?args, "running command");
    let mut child = command
        .spawn()
        .map_err(|err| AppError::spawn(format!("Failed to spawn {program}: {err}"), trace_id))?;

    // Drain stdout/stderr in parallel; otherwise, a chatty child process can block once the pipe
    // buffer fills, and we will incorrectly hit the timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let (tx, rx) = mpsc::channel();
    drain(stdout, Pipe::Stdout, tx.clone());
    drain(stderr, Pipe::Stderr, tx);

    let deadline = Instant::now() + timeout;
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(timed_out(program, timeout, trace_id));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    // A grandchild that inherited the pipes keeps them open after the child
    // exits; the deadline still applies to reaching EOF.
    let mut stdout_bytes = None;
    let mut stderr_bytes = None;
    while stdout_bytes.is_none() || stderr_bytes.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Pipe::Stdout, bytes)) => stdout_bytes = Some(bytes),
            Ok((Pipe::Stderr, bytes)) => stderr_bytes = Some(bytes),
            Err(RecvTimeoutError::Timeout) => {
                debug!(trace_id = %trace_id, program = %program, "output pipes still open after exit");
                return Err(timed_out(program, timeout, trace_id));
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes.unwrap_or_default()).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes.unwrap_or_default()).to_string(),
        exit_code,
    })
}

fn timed_out(program: &str, timeout: Duration, trace_id: &str) -> AppError {
    AppError::timeout(
        format!("{program} timed out after {}ms", timeout.as_millis()),
        trace_id,
    )
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

fn drain<R: Read + Send + 'static>(mut reader: R, pipe: Pipe, tx: Sender<(Pipe, Vec<u8>)>) {
    std::thread::spawn(move || {
        let mut buffer = Vec::<u8>::new();
        let mut temp = [0u8; 4096];
        loop {
            match reader.read(&mut temp) {
                Ok(0) => break,
                Ok(count) => buffer.extend_from_slice(&temp[..count]),
                Err(_) => break,
            }
        }
        let _ = tx.send((pipe, buffer));
    });
}
