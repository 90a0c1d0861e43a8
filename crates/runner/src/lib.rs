use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info};

use vintner_core::diagnostics::{DiagnosticsSink, ErrorReport};

pub mod command;
pub mod redact;
pub mod wine;

pub use command::{spawn_parts, CommandSpec};

/// Final outcome of a supervised run.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// Redacted command line, safe to log.
    pub command: String,
}

/// A failed run. Carries the redacted command so the failure can be
/// reconstructed from the log without exposing credentials.
#[derive(Debug, Error)]
#[error("{kind} (command: {command})")]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub command: String,
}

#[derive(Debug, Error)]
pub enum ExecErrorKind {
    #[error("failed to spawn process: {0}")]
    Spawn(std::io::Error),
    #[error("process terminated with signal {0}")]
    TerminatedBySignal(i32),
    #[error("i/o error while supervising process: {0}")]
    Io(std::io::Error),
}

/// Live handle passed to output observers. Supports early termination; a
/// kill requested through here resolves the run normally instead of as a
/// signal failure.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Option<u32>,
    state: Arc<HandleState>,
}

#[derive(Debug, Default)]
struct HandleState {
    terminate: Notify,
    terminate_requested: AtomicBool,
}

impl ProcessHandle {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pid,
            state: Arc::new(HandleState::default()),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Asks the supervisor to kill the process.
    pub fn terminate(&self) {
        self.state.terminate_requested.store(true, Ordering::SeqCst);
        self.state.terminate.notify_one();
    }

    pub fn termination_requested(&self) -> bool {
        self.state.terminate_requested.load(Ordering::SeqCst)
    }

    async fn termination_signal(&self) {
        self.state.terminate.notified().await;
    }
}

pub type OutputObserver = Arc<dyn Fn(&str, &ProcessHandle) + Send + Sync>;

/// Options for one supervised run.
#[derive(Clone)]
pub struct RunOptions {
    /// Overlay on top of the inherited process environment.
    pub env: HashMap<String, String>,
    /// Wrapper chain prefixing the executable, first wrapper outermost.
    pub wrappers: Vec<String>,
    /// Output log, truncated before the run starts.
    pub log_file: Option<PathBuf>,
    /// Invoked with every raw output chunk and the live process handle.
    pub on_output: Option<OutputObserver>,
    /// Stable tag identifying the runner in logs and diagnostics.
    pub runner_label: String,
    pub app_name: String,
    pub log_message_prefix: Option<String>,
    pub diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            wrappers: Vec::new(),
            log_file: None,
            on_output: None,
            runner_label: "launcher".to_string(),
            app_name: String::new(),
            log_message_prefix: None,
            diagnostics: None,
        }
    }
}

/// Spawns the command with its wrapper chain and environment overlay,
/// streams both output pipes, and classifies the exit. The diagnostics hook
/// fires on every outcome.
pub async fn run_process(spec: CommandSpec, options: RunOptions) -> Result<ExecResult, ExecError> {
    let inherited: HashMap<String, String> = std::env::vars().collect();
    let safe_command = redact::redacted_command(
        &spec.args,
        &options.env,
        &options.wrappers,
        &spec.executable,
        &inherited,
    );

    info!(
        target: "runner",
        runner = %options.runner_label,
        app = %options.app_name,
        "{}: {safe_command}",
        options.log_message_prefix.as_deref().unwrap_or("running command")
    );

    let log_file = match &options.log_file {
        Some(path) => {
            debug!(target: "runner", "logging output to {}", path.display());
            Some(Arc::new(Mutex::new(open_fresh_log(path, &safe_command).await?)))
        }
        None => None,
    };

    let (image, argv) = command::spawn_parts(&spec, &options.wrappers);
    let mut process = Command::new(&image);
    process
        .args(&argv)
        .envs(&options.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        process.current_dir(cwd);
    }

    let mut child = match process.spawn() {
        Ok(child) => child,
        Err(source) => {
            report(&options, &source.to_string());
            error!(
                target: "runner",
                runner = %options.runner_label,
                "error running command \"{safe_command}\": {source}"
            );
            return Err(ExecError {
                kind: ExecErrorKind::Spawn(source),
                command: safe_command,
            });
        }
    };

    let handle = ProcessHandle::new(child.id());
    let stdout_task = child.stdout.take().map(|pipe| {
        tokio::spawn(stream_output(
            pipe,
            log_file.clone(),
            options.on_output.clone(),
            handle.clone(),
        ))
    });
    let stderr_task = child.stderr.take().map(|pipe| {
        tokio::spawn(stream_output(
            pipe,
            log_file.clone(),
            options.on_output.clone(),
            handle.clone(),
        ))
    });

    let status = tokio::select! {
        status = child.wait() => status,
        _ = handle.termination_signal() => {
            let _ = child.start_kill();
            child.wait().await
        }
    };
    let status = match status {
        Ok(status) => status,
        Err(source) => {
            return Err(ExecError {
                kind: ExecErrorKind::Io(source),
                command: safe_command,
            })
        }
    };

    let stdout = collect_stream(stdout_task, &safe_command).await?;
    let stderr = collect_stream(stderr_task, &safe_command).await?;

    let combined = format!("{stdout}{stderr}");
    report(&options, &combined);

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            if !handle.termination_requested() {
                error!(
                    target: "runner",
                    runner = %options.runner_label,
                    app = %options.app_name,
                    "process terminated with signal {signal}"
                );
                return Err(ExecError {
                    kind: ExecErrorKind::TerminatedBySignal(signal),
                    command: safe_command,
                });
            }
        }
    }

    debug!(
        target: "runner",
        runner = %options.runner_label,
        code = ?status.code(),
        "command finished"
    );
    Ok(ExecResult {
        stdout,
        stderr,
        command: safe_command,
    })
}

fn report(options: &RunOptions, output: &str) {
    if let Some(diagnostics) = &options.diagnostics {
        diagnostics.classify_and_report(ErrorReport {
            output,
            log_path: options.log_file.as_deref(),
            runner_label: &options.runner_label,
            app_name: &options.app_name,
        });
    }
}

async fn open_fresh_log(path: &Path, command: &str) -> Result<tokio::fs::File, ExecError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| ExecError {
            kind: ExecErrorKind::Io(source),
            command: command.to_string(),
        })?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|source| ExecError {
            kind: ExecErrorKind::Io(source),
            command: command.to_string(),
        })
}

async fn stream_output<R>(
    mut pipe: R,
    log_file: Option<Arc<Mutex<tokio::fs::File>>>,
    observer: Option<OutputObserver>,
    handle: ProcessHandle,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected: Vec<String> = Vec::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let read = pipe.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        let chunk = String::from_utf8_lossy(&buffer[..read]).into_owned();
        if let Some(file) = &log_file {
            file.lock().await.write_all(chunk.as_bytes()).await?;
        }
        if let Some(observer) = &observer {
            observer(&chunk, &handle);
        }
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            collected.push(trimmed.to_string());
        }
    }
    Ok(collected.join("\n"))
}

async fn collect_stream(
    task: Option<tokio::task::JoinHandle<std::io::Result<String>>>,
    command: &str,
) -> Result<String, ExecError> {
    let Some(task) = task else {
        return Ok(String::new());
    };
    match task.await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(source)) => Err(ExecError {
            kind: ExecErrorKind::Io(source),
            command: command.to_string(),
        }),
        Err(join_error) => Err(ExecError {
            kind: ExecErrorKind::Io(std::io::Error::new(std::io::ErrorKind::Other, join_error)),
            command: command.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_are_captured_separately() {
        let result = run_process(sh("echo out; echo err >&2"), RunOptions::default())
            .await
            .unwrap();
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
    }

    #[tokio::test]
    async fn test_wrappers_lead_the_invocation() {
        let spec = CommandSpec::new("echo", vec!["wrapped".to_string()]);
        let options = RunOptions {
            wrappers: vec!["/usr/bin/env".to_string()],
            ..RunOptions::default()
        };
        let result = run_process(spec, options).await.unwrap();
        assert_eq!(result.stdout, "wrapped");
    }

    #[tokio::test]
    async fn test_spawn_failure_carries_redacted_command() {
        let spec = CommandSpec::new(
            "/nonexistent/vintner-test-bin",
            vec!["--sid".to_string(), "SECRET123".to_string()],
        );
        let error = run_process(spec, RunOptions::default()).await.unwrap_err();
        assert!(matches!(error.kind, ExecErrorKind::Spawn(_)));
        assert!(error.command.contains(redact::REDACTION_MARKER));
        assert!(!error.command.contains("SECRET123"));
    }

    #[tokio::test]
    async fn test_external_signal_is_a_failure() {
        let error = run_process(sh("kill -KILL $$"), RunOptions::default())
            .await
            .unwrap_err();
        match error.kind {
            ExecErrorKind::TerminatedBySignal(signal) => assert_eq!(signal, 9),
            other => panic!("unexpected error kind: {other:?}"),
        }
        assert!(error.to_string().contains("signal 9"));
    }

    #[tokio::test]
    async fn test_observer_termination_resolves_normally() {
        let spec = sh("echo ready; sleep 30");
        let options = RunOptions {
            on_output: Some(Arc::new(|chunk: &str, handle: &ProcessHandle| {
                if chunk.contains("ready") {
                    handle.terminate();
                }
            })),
            ..RunOptions::default()
        };
        let result = run_process(spec, options).await.unwrap();
        assert_eq!(result.stdout, "ready");
    }

    #[tokio::test]
    async fn test_log_file_is_truncated_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");
        std::fs::write(&log_path, "stale contents\n").unwrap();
        let options = RunOptions {
            log_file: Some(log_path.clone()),
            ..RunOptions::default()
        };
        run_process(sh("echo fresh"), options).await.unwrap();
        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents, "fresh\n");
    }

    #[tokio::test]
    async fn test_diagnostics_hook_fires_on_every_outcome() {
        struct CountingSink(AtomicUsize);
        impl DiagnosticsSink for CountingSink {
            fn classify_and_report(&self, _report: ErrorReport<'_>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let options = RunOptions {
            diagnostics: Some(Arc::clone(&sink) as Arc<dyn DiagnosticsSink>),
            ..RunOptions::default()
        };
        run_process(sh("true"), options).await.unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_carries_redacted_command() {
        let result = run_process(sh("true"), RunOptions::default()).await.unwrap();
        assert!(result.command.contains("/bin/sh"));
    }
}
