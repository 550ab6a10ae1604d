//! Launcher process execution
//!
//! Runs the built command as a child process and hands every line of its
//! combined stdout/stderr to a callback while the child is still running.
//!
//! Each pipe is drained by its own reader thread; the threads forward lines
//! over a channel to the calling thread, which also polls for exit. A child
//! that writes more than the pipe buffer holds can therefore never block on
//! a full pipe while we wait for it.
//!
//! Cancellation (shared flag) and an optional overall timeout terminate the
//! child with SIGTERM, then SIGKILL once the grace period runs out.

use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::SubmissionCommand;
use crate::error::{SubmitError, SubmitResult};

/// How a launcher process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal, e.g. `SIGTERM`
    pub term_signal: Option<String>,
    /// The caller requested cancellation and the child was terminated
    pub cancelled: bool,
    /// The overall timeout expired and the child was terminated
    pub timed_out: bool,
    /// Number of output lines delivered
    pub line_count: u64,
}

/// Runs a command, streaming its output lines.
pub trait ProcessRunner {
    /// Run `command` to completion, calling `on_line` for every output line
    /// as it arrives. Fails only if the process cannot be started or waited on.
    fn run(
        &self,
        command: &SubmissionCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> SubmitResult<ProcessOutcome>;
}

/// Settings for [`SystemRunner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Overall wall-clock limit; `None` waits forever
    pub timeout: Option<Duration>,
    /// Time between SIGTERM and SIGKILL
    pub termination_grace: Duration,
    /// How often exit, cancellation and timeout are checked while idle
    pub poll_interval: Duration,
    /// Extra environment variables, added to the inherited environment
    pub env: BTreeMap<String, String>,
    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            termination_grace: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }
}

/// Runs commands as local child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    config: RunnerConfig,
    cancelled: Arc<AtomicBool>,
}

impl SystemRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned cancellation flag (e.g. set by a signal handler).
    pub fn with_cancellation_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Get a cancellation flag that can be shared.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Consume a pending cancellation request.
    fn clear_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn spawn(&self, command: &SubmissionCommand) -> SubmitResult<Child> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.spawn().map_err(|e| SubmitError::ProcessLaunchFailure {
            program: command.program().to_string(),
            reason: e.to_string(),
        })
    }

    /// Terminate a child process gracefully then forcefully.
    fn terminate_child(&self, child: &mut Child) -> io::Result<ExitStatus> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            let _ = signal::kill(pid, Signal::SIGTERM);
        }
        #[cfg(not(unix))]
        {
            let _ = child.kill();
        }

        let start = Instant::now();
        while start.elapsed() < self.config.termination_grace {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(self.config.poll_interval.min(Duration::from_millis(100)));
        }

        warn!(pid = child.id(), "launcher ignored SIGTERM, killing");
        let _ = child.kill();
        child.wait()
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        command: &SubmissionCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> SubmitResult<ProcessOutcome> {
        // A request made before or during this run applies to this run only.
        let _reset = CancelReset(self);
        let start = Instant::now();
        let mut child = self.spawn(command)?;
        debug!(pid = child.id(), program = command.program(), "launcher started");

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        // Channel disconnects once both readers hit EOF.
        drop(tx);

        let mut status: Option<ExitStatus> = None;
        let mut exited_at: Option<Instant> = None;
        let mut drained = false;
        let mut cancelled = false;
        let mut timed_out = false;
        let mut line_count = 0u64;

        loop {
            let mut idle = false;
            if drained {
                if status.is_some() {
                    break;
                }
                thread::sleep(self.config.poll_interval);
            } else {
                match rx.recv_timeout(self.config.poll_interval) {
                    Ok(line) => {
                        line_count += 1;
                        on_line(&line);
                    }
                    Err(RecvTimeoutError::Timeout) => idle = true,
                    Err(RecvTimeoutError::Disconnected) => drained = true,
                }
            }

            if let Some(exited) = exited_at {
                // A grandchild can hold the pipes open after the launcher exits.
                if idle && exited.elapsed() >= self.config.termination_grace {
                    warn!("launcher exited but its output is still open, detaching readers");
                    break;
                }
                continue;
            }

            if self.is_cancelled() {
                warn!("cancellation requested, terminating launcher");
                status = Some(self.terminate_child(&mut child)?);
                cancelled = true;
            } else if self.config.timeout.is_some_and(|t| start.elapsed() >= t) {
                warn!(
                    timeout_secs = self.config.timeout.map(|t| t.as_secs()),
                    "launcher timed out, terminating"
                );
                status = Some(self.terminate_child(&mut child)?);
                timed_out = true;
            } else {
                status = child.try_wait()?;
            }

            if status.is_some() {
                exited_at = Some(Instant::now());
            }
        }

        if drained {
            for reader in readers {
                let _ = reader.join();
            }
        }

        let status = match status {
            Some(status) => status,
            None => child.wait()?,
        };

        Ok(ProcessOutcome {
            exit_code: status.code(),
            term_signal: term_signal(&status),
            cancelled,
            timed_out,
            line_count,
        })
    }
}

struct CancelReset<'a>(&'a SystemRunner);

impl Drop for CancelReset<'_> {
    fn drop(&mut self) {
        self.0.clear_cancel();
    }
}

/// Longest line forwarded; the rest of a longer line is dropped.
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Forward each line of `stream` to `tx` until EOF.
fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match (&mut reader).take(MAX_LINE_BYTES).read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if n as u64 == MAX_LINE_BYTES
                        && !buf.ends_with(b"\n")
                        && discard_line(&mut reader).is_err()
                    {
                        break;
                    }
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
                    if tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

/// Skip input up to and including the next newline.
fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

fn term_signal(status: &ExitStatus) -> Option<String> {
    if status.code().is_some() {
        return None;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map(|s| match nix::sys::signal::Signal::try_from(s) {
            Ok(sig) => sig.as_str().to_string(),
            Err(_) => format!("SIG{}", s),
        })
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> SubmissionCommand {
        SubmissionCommand::from_tokens(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ])
    }

    fn fast() -> RunnerConfig {
        RunnerConfig {
            poll_interval: Duration::from_millis(10),
            termination_grace: Duration::from_millis(500),
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn test_collects_stdout_and_stderr() {
        let runner = SystemRunner::new(fast());
        let mut lines = Vec::new();
        let outcome = runner
            .run(&sh("echo out; echo err 1>&2; exit 3"), &mut |l| {
                lines.push(l.to_string())
            })
            .unwrap();

        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.line_count, 2);
        assert!(lines.contains(&"out".to_string()));
        assert!(lines.contains(&"err".to_string()));
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_missing_binary() {
        let runner = SystemRunner::new(fast());
        let cmd = SubmissionCommand::from_tokens(vec!["/nonexistent/bin/spark-submit".to_string()]);
        let err = runner.run(&cmd, &mut |_| {}).unwrap_err();
        assert!(matches!(err, SubmitError::ProcessLaunchFailure { .. }));
    }

    #[test]
    fn test_env_passed_through() {
        let mut config = fast();
        config
            .env
            .insert("SPARKHOOK_TEST_VAR".to_string(), "hello".to_string());
        let runner = SystemRunner::new(config);
        let mut lines = Vec::new();
        runner
            .run(&sh("echo $SPARKHOOK_TEST_VAR"), &mut |l| lines.push(l.to_string()))
            .unwrap();
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn test_timeout_terminates() {
        let config = RunnerConfig {
            timeout: Some(Duration::from_millis(200)),
            ..fast()
        };
        let runner = SystemRunner::new(config);
        let start = Instant::now();
        let outcome = runner.run(&sh("exec sleep 30"), &mut |_| {}).unwrap();

        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.term_signal.as_deref(), Some("SIGTERM"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_cancel_before_start_terminates_immediately() {
        let runner = SystemRunner::new(fast());
        runner.request_cancel();
        let outcome = runner.run(&sh("exec sleep 30"), &mut |_| {}).unwrap();
        assert!(outcome.cancelled);
        assert_ne!(outcome.exit_code, Some(0));
    }

    #[test]
    fn test_cancellation_does_not_carry_over() {
        let runner = SystemRunner::new(fast());
        let shared = runner.clone();
        runner.request_cancel();

        let first = runner.run(&sh("exec sleep 30"), &mut |_| {}).unwrap();
        assert!(first.cancelled);
        assert!(!runner.is_cancelled());
        assert!(!shared.is_cancelled());

        let second = runner.run(&sh("echo ok"), &mut |_| {}).unwrap();
        assert!(!second.cancelled);
        assert_eq!(second.exit_code, Some(0));
    }

    #[test]
    fn test_overlong_line_truncated() {
        let runner = SystemRunner::new(fast());
        let mut lines = Vec::new();
        let outcome = runner
            .run(
                &sh("head -c 200000 /dev/zero | tr '\\0' x; echo; echo tail"),
                &mut |l| lines.push(l.to_string()),
            )
            .unwrap();

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len() as u64, MAX_LINE_BYTES);
        assert!(lines[0].bytes().all(|b| b == b'x'));
        assert_eq!(lines[1], "tail");
    }
}
