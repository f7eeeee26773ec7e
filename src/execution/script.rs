use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::execution::process::read_bounded;
use crate::models::{Engine, ExecutionResult};
use crate::utils::scope_guard::ScopeGuard;

pub const TIMEOUT_MESSAGE: &str = "Execution timed out.";

/// What a running script reports back
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    Print(String),
    /// Some output was dropped at the host's limit
    Truncated,
    Done,
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to start script interpreter {program}: {source}")]
    Launch { program: String, source: std::io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptLimits {
    pub timeout: Duration,
    pub max_output: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_output: 10 * 1024 * 1024,
        }
    }
}

/// A launched script: its event stream and the hook that tears it down
pub struct ScriptSession {
    pub events: mpsc::UnboundedReceiver<ScriptEvent>,
    pub cancel: Box<dyn FnOnce() + Send>,
}

/// Something that can start a script and stream its prints.
pub trait ScriptHost: Send + Sync {
    fn launch(&self, code: &str, input_lines: Vec<String>) -> Result<ScriptSession, ScriptError>;
}

// `readLine()` walks the input lines; `console.log` prints each argument
// JSON encoded, space separated, one line per call
const PRELUDE: &str = r#"
let __inputIndex = 0;
globalThis.readLine = () => __input[__inputIndex++] || '';
console.log = (...args) => {
  const line = args.map((a) => { try { return JSON.stringify(a); } catch (e) { return String(a); } }).join(' ');
  process.stdout.write(line + '\n');
};
"#;

/// Full program text: input lines, helpers, then the submitted code
pub fn script_program(code: &str, input_lines: &[String]) -> String {
    let input = serde_json::to_string(input_lines).unwrap_or_else(|_| "[]".to_string());
    format!("const __input = {input};\n{PRELUDE}\n{code}\n")
}

/// Forward complete lines from `reader` as prints, decoding lossily.
///
/// At most `limit` bytes are forwarded; the rest is read and dropped. A
/// trailing line without a newline is forwarded at end of stream. Returns
/// whether anything was dropped.
pub async fn forward_lines<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
    events: &mpsc::UnboundedSender<ScriptEvent>,
) -> io::Result<bool> {
    let mut chunk = [0u8; 8192];
    let mut pending: Vec<u8> = Vec::new();
    let mut budget = limit;
    let mut truncated = false;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let keep = n.min(budget);
        if keep < n {
            truncated = true;
        }
        budget -= keep;
        pending.extend_from_slice(&chunk[..keep]);

        while let Some(end) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line[..end]).into_owned();
            if events.send(ScriptEvent::Print(text)).is_err() {
                return Ok(truncated);
            }
        }
    }

    if !pending.is_empty() {
        let _ = events.send(ScriptEvent::Print(String::from_utf8_lossy(&pending).into_owned()));
    }
    Ok(truncated)
}

/// Runs scripts with a Node.js interpreter, program text fed on stdin
#[derive(Debug, Clone)]
pub struct NodeScriptHost {
    interpreter: String,
    max_output: usize,
}

impl NodeScriptHost {
    pub fn new(interpreter: impl Into<String>, max_output: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            max_output,
        }
    }
}

impl ScriptHost for NodeScriptHost {
    fn launch(&self, code: &str, input_lines: Vec<String>) -> Result<ScriptSession, ScriptError> {
        let mut child = Command::new(&self.interpreter)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScriptError::Launch { program: self.interpreter.clone(), source })?;

        let program = script_program(code, &input_lines);
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let max_output = self.max_output;
        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(program.as_bytes()).await {
                        debug!("Script interpreter closed stdin early: {}", e);
                    }
                });
            }

            let stderr_task = tokio::spawn(async move {
                match stderr {
                    Some(stderr) => read_bounded(stderr, max_output).await,
                    None => (Vec::new(), false),
                }
            });

            let mut truncated = false;
            if let Some(stdout) = stdout {
                let forwarded = tokio::select! {
                    _ = &mut cancel_rx => {
                        let _ = child.kill().await;
                        return;
                    }
                    forwarded = forward_lines(stdout, max_output, &tx) => forwarded,
                };
                match forwarded {
                    Ok(dropped) => truncated = dropped,
                    Err(e) => {
                        warn!("Failed to read script output: {}", e);
                        let _ = child.kill().await;
                        let _ = tx.send(ScriptEvent::Error(format!("Failed to read script output: {e}")));
                        return;
                    }
                }
            }

            let status = tokio::select! {
                _ = &mut cancel_rx => {
                    let _ = child.kill().await;
                    return;
                }
                status = child.wait() => status,
            };
            let (stderr, stderr_truncated) = stderr_task.await.unwrap_or_default();
            if truncated || stderr_truncated {
                let _ = tx.send(ScriptEvent::Truncated);
            }
            let stderr = String::from_utf8_lossy(&stderr);
            let event = match status {
                Ok(status) if status.success() => ScriptEvent::Done,
                Ok(status) if stderr.trim().is_empty() => ScriptEvent::Error(format!("Script exited with {status}")),
                Ok(_) => ScriptEvent::Error(stderr.trim_end().to_string()),
                Err(e) => ScriptEvent::Error(e.to_string()),
            };
            let _ = tx.send(event);
        });

        Ok(ScriptSession {
            events: rx,
            cancel: Box::new(move || {
                let _ = cancel_tx.send(());
            }),
        })
    }
}

/// Run a script until it finishes, fails or exceeds the time limit.
///
/// Prints become stdout lines, kept up to the output limit. The session is
/// cancelled exactly once on every path, including when this future is
/// dropped.
pub async fn run_script(
    host: &dyn ScriptHost,
    code: &str,
    input: Option<&str>,
    limits: ScriptLimits,
) -> Result<ExecutionResult, ScriptError> {
    let input_lines = input
        .filter(|input| !input.is_empty())
        .map(|input| input.split('\n').map(str::to_string).collect())
        .unwrap_or_default();

    let ScriptSession { mut events, cancel } = host.launch(code, input_lines)?;
    let mut cleanup = ScopeGuard::new(move || {
        cancel();
        debug!("Script session released");
    });

    let mut result = ExecutionResult::new(Engine::Script);
    let deadline = tokio::time::sleep(limits.timeout);
    tokio::pin!(deadline);

    let exit_code = loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Script exceeded {:?}", limits.timeout);
                result.timed_out = true;
                result.stderr.push_str(TIMEOUT_MESSAGE);
                break None;
            }
            event = events.recv() => match event {
                Some(ScriptEvent::Print(line)) => {
                    if result.stdout.len() + line.len() + 1 > limits.max_output {
                        result.truncated = true;
                        continue;
                    }
                    result.stdout.push_str(&line);
                    result.stdout.push('\n');
                }
                Some(ScriptEvent::Truncated) => result.truncated = true,
                Some(ScriptEvent::Done) => break Some(0),
                Some(ScriptEvent::Error(message)) => {
                    result.stderr.push_str(&message);
                    break Some(1);
                }
                None => {
                    warn!("Script host went away without finishing");
                    result.stderr.push_str("Script ended unexpectedly");
                    break None;
                }
            },
        }
    };

    cleanup.run();
    Ok(result.with_exit_code(exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed event list, optionally never finishing
    struct ScriptedHost {
        events: Vec<ScriptEvent>,
        hang: bool,
        cancels: Arc<AtomicUsize>,
        inputs: std::sync::Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedHost {
        fn new(events: Vec<ScriptEvent>, hang: bool) -> Self {
            Self {
                events,
                hang,
                cancels: Arc::new(AtomicUsize::new(0)),
                inputs: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl ScriptHost for ScriptedHost {
        fn launch(&self, _code: &str, input_lines: Vec<String>) -> Result<ScriptSession, ScriptError> {
            self.inputs.lock().unwrap().push(input_lines);
            let (tx, rx) = mpsc::unbounded_channel();
            for event in &self.events {
                tx.send(event.clone()).unwrap();
            }
            let keep_open = if self.hang { Some(tx) } else { None };
            let cancels = self.cancels.clone();
            Ok(ScriptSession {
                events: rx,
                cancel: Box::new(move || {
                    drop(keep_open);
                    cancels.fetch_add(1, Ordering::SeqCst);
                }),
            })
        }
    }

    fn limits(timeout: Duration) -> ScriptLimits {
        ScriptLimits { timeout, ..ScriptLimits::default() }
    }

    fn node_available() -> bool {
        std::process::Command::new("node")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn drain(mut rx: mpsc::UnboundedReceiver<ScriptEvent>) -> Vec<ScriptEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::other("pipe broke")))
        }
    }

    #[tokio::test]
    async fn prints_then_done() {
        let host = ScriptedHost::new(
            vec![ScriptEvent::Print("1".to_string()), ScriptEvent::Print("\"two\"".to_string()), ScriptEvent::Done],
            false,
        );
        let result = run_script(&host, "ignored", Some("a\nb"), limits(Duration::from_secs(1))).await.unwrap();

        assert_eq!(result.stdout, "1\n\"two\"\n");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.success);
        assert!(!result.truncated);
        assert_eq!(host.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(host.inputs.lock().unwrap()[0], vec!["a", "b"]);
    }

    #[tokio::test]
    async fn error_event_ends_the_run() {
        let host = ScriptedHost::new(
            vec![ScriptEvent::Print("before".to_string()), ScriptEvent::Error("ReferenceError: x".to_string())],
            false,
        );
        let result = run_script(&host, "x", None, limits(Duration::from_secs(1))).await.unwrap();

        assert_eq!(result.stdout, "before\n");
        assert_eq!(result.stderr, "ReferenceError: x");
        assert!(!result.success);
        assert_eq!(host.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hanging_script_times_out_once() {
        let host = ScriptedHost::new(vec![ScriptEvent::Print("tick".to_string())], true);
        let result = run_script(&host, "while(true){}", None, limits(Duration::from_millis(100))).await.unwrap();

        assert!(result.timed_out);
        assert_eq!(result.stderr, TIMEOUT_MESSAGE);
        assert_eq!(result.stdout, "tick\n");
        assert_eq!(result.exit_code, None);
        assert_eq!(host.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stdout_is_kept_up_to_the_output_limit() {
        let line = "x".repeat(10);
        let host = ScriptedHost::new(
            vec![
                ScriptEvent::Print(line.clone()),
                ScriptEvent::Print(line.clone()),
                ScriptEvent::Print(line.clone()),
                ScriptEvent::Done,
            ],
            false,
        );
        let limits = ScriptLimits { timeout: Duration::from_secs(1), max_output: 25 };
        let result = run_script(&host, "ignored", None, limits).await.unwrap();

        assert_eq!(result.stdout, format!("{line}\n{line}\n"));
        assert!(result.truncated);
        assert!(result.success);
    }

    #[tokio::test]
    async fn host_side_truncation_is_reported() {
        let host = ScriptedHost::new(
            vec![ScriptEvent::Print("kept".to_string()), ScriptEvent::Truncated, ScriptEvent::Done],
            false,
        );
        let result = run_script(&host, "ignored", None, limits(Duration::from_secs(1))).await.unwrap();
        assert_eq!(result.stdout, "kept\n");
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn forward_lines_decodes_invalid_utf8_lossily() {
        let (tx, rx) = mpsc::unbounded_channel();
        let truncated = forward_lines(&b"a\xff\nafter\n"[..], 1024, &tx).await.unwrap();

        assert!(!truncated);
        assert_eq!(
            drain(rx),
            vec![ScriptEvent::Print("a\u{FFFD}".to_string()), ScriptEvent::Print("after".to_string())]
        );
    }

    #[tokio::test]
    async fn forward_lines_drops_bytes_past_the_limit() {
        let (tx, rx) = mpsc::unbounded_channel();
        let truncated = forward_lines(&b"12345\n67890\nmore\n"[..], 8, &tx).await.unwrap();

        assert!(truncated);
        assert_eq!(
            drain(rx),
            vec![ScriptEvent::Print("12345".to_string()), ScriptEvent::Print("67".to_string())]
        );
    }

    #[tokio::test]
    async fn forward_lines_surfaces_read_errors() {
        let (tx, rx) = mpsc::unbounded_channel();
        let result = forward_lines((&b"first\n"[..]).chain(BrokenPipe), 1024, &tx).await;

        assert!(result.is_err());
        assert_eq!(drain(rx), vec![ScriptEvent::Print("first".to_string())]);
    }

    #[test]
    fn program_embeds_input_lines() {
        let program = script_program("console.log(readLine());", &["1 2".to_string(), "\"q\"".to_string()]);
        assert!(program.starts_with(r#"const __input = ["1 2","\"q\""];"#));
        assert!(program.ends_with("console.log(readLine());\n"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_launch_error() {
        let host = NodeScriptHost::new("definitely-not-node", 1024);
        assert!(matches!(
            run_script(&host, "console.log(1)", None, limits(Duration::from_secs(1))).await,
            Err(ScriptError::Launch { .. })
        ));
    }

    #[tokio::test]
    async fn node_host_streams_prints_and_reads_input() {
        if !node_available() {
            return;
        }
        let host = NodeScriptHost::new("node", 1024 * 1024);
        let code = "const n = Number(readLine()); console.log(n * 2); console.log('done', [1]);";
        let result = run_script(&host, code, Some("21"), limits(Duration::from_secs(10))).await.unwrap();
        assert_eq!(result.stdout, "42\n\"done\" [1]\n");
        assert!(result.success);

        let failing = run_script(&host, "throw new Error('boom')", None, limits(Duration::from_secs(10))).await.unwrap();
        assert!(failing.stderr.contains("boom"));
        assert!(!failing.success);
    }

    #[tokio::test]
    async fn node_host_keeps_output_after_invalid_utf8() {
        if !node_available() {
            return;
        }
        let host = NodeScriptHost::new("node", 1024 * 1024);
        let code = "process.stdout.write(Buffer.from([0x61, 0xff, 0x0a])); console.log('after');";
        let result = run_script(&host, code, None, limits(Duration::from_secs(10))).await.unwrap();
        assert_eq!(result.stdout, "a\u{FFFD}\n\"after\"\n");
        assert!(result.success);
    }

    #[tokio::test]
    async fn node_host_runs_scripts_larger_than_an_argument() {
        if !node_available() {
            return;
        }
        let host = NodeScriptHost::new("node", 1024 * 1024);
        let code = format!("// {}\nconsole.log('ok');", "x".repeat(200 * 1024));
        let result = run_script(&host, &code, None, limits(Duration::from_secs(10))).await.unwrap();
        assert_eq!(result.stdout, "\"ok\"\n");
        assert!(result.success);
    }

    #[tokio::test]
    async fn node_host_bounds_output() {
        if !node_available() {
            return;
        }
        let host = NodeScriptHost::new("node", 10_000);
        let code = "const line = 'y'.repeat(1000); for (let i = 0; i < 1000; i++) { console.log(line); }";
        let limits = ScriptLimits { timeout: Duration::from_secs(10), max_output: 10_000 };
        let result = run_script(&host, code, None, limits).await.unwrap();
        assert!(result.stdout.len() <= 10_000);
        assert!(result.truncated);
        assert!(result.success);
    }
}
