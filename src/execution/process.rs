use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// How long to wait for pipes to drain once the process is gone
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// What one bounded child process produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub truncated: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run a command to completion under a wall-clock timeout, keeping at most
/// `max_output` bytes of each output stream.
///
/// `stdin`, when given, is written in one go and the pipe closed; otherwise
/// the child reads end-of-file. On timeout the child is killed and whatever
/// it printed so far is returned with `timed_out` set.
pub async fn run_bounded(
    mut command: Command,
    stdin: Option<&str>,
    timeout: Duration,
    max_output: usize,
) -> io::Result<ProcessOutput> {
    command
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        let input = input.to_string();
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                debug!("Child closed stdin early: {}", e);
            }
            // Dropping the pipe closes it
        });
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
    let stdout_capture = SharedCapture::default();
    let stderr_capture = SharedCapture::default();
    let stdout_task = tokio::spawn(drain_into(stdout, max_output, stdout_capture.clone()));
    let stderr_task = tokio::spawn(drain_into(stderr, max_output, stderr_capture.clone()));

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (status?.code(), false),
        Err(_) => {
            debug!("Process exceeded {:?}, killing it", timeout);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out process: {}", e);
            }
            (None, true)
        }
    };

    finish_drain(stdout_task).await;
    finish_drain(stderr_task).await;
    let (stdout, stdout_truncated) = stdout_capture.take();
    let (stderr, stderr_truncated) = stderr_capture.take();

    Ok(ProcessOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        timed_out,
        truncated: stdout_truncated || stderr_truncated,
    })
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Output read so far, readable even when the reader never finishes
#[derive(Debug, Clone, Default)]
struct SharedCapture(Arc<Mutex<Captured>>);

impl SharedCapture {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> (Vec<u8>, bool) {
        let mut captured = self.lock();
        (std::mem::take(&mut captured.bytes), captured.truncated)
    }
}

// Keeps draining past the limit so the child never blocks on a full pipe
async fn drain_into<R: AsyncRead + Unpin>(mut reader: R, limit: usize, capture: SharedCapture) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let mut captured = capture.lock();
                let room = limit.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
}

/// Read a stream to its end, keeping at most `limit` bytes.
/// Returns the bytes kept and whether anything was dropped.
pub(crate) async fn read_bounded<R: AsyncRead + Unpin>(reader: R, limit: usize) -> (Vec<u8>, bool) {
    let capture = SharedCapture::default();
    drain_into(reader, limit, capture.clone()).await;
    capture.take()
}

async fn finish_drain(mut task: JoinHandle<()>) {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Output reader failed: {}", e),
        Err(_) => {
            // A leftover grandchild still holds the pipe open
            task.abort();
            warn!("Output pipe did not close after the process exited");
        }
    }
}
