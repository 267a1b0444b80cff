use crate::DriverError;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Time granted to a detached QEMU process to finish its own fork and
/// write the pid file before the launching call returns.
pub const DETACH_GRACE: Duration = Duration::from_secs(5);

/// Cooperative interruption flag, raised by the embedding application
/// (e.g. from a ctrl-c handler). The runner never kills the child over
/// it; it only reclassifies a non-zero exit as a user-requested abort.
#[derive(Debug, Clone, Default)]
pub struct InterruptToken(Arc<AtomicBool>);

impl InterruptToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Captured result of a foreground invocation. Detached launches return
/// an empty output with status 0; there is nothing meaningful to capture
/// from a process that outlives the call.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

/// Seam between the driver and process execution, so lifecycle tests can
/// count and inspect invocations without launching real emulators.
pub trait CommandRunner {
    fn run(&self, argv: &[String], detach: bool) -> Result<CommandOutput, DriverError>;
}

/// Executes external commands on the host.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interrupt: InterruptToken,
    detach_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            interrupt: InterruptToken::new(),
            detach_grace: DETACH_GRACE,
        }
    }
}

impl ProcessRunner {
    pub fn new(interrupt: InterruptToken) -> Self {
        Self {
            interrupt,
            detach_grace: DETACH_GRACE,
        }
    }

    #[cfg(test)]
    fn with_detach_grace(interrupt: InterruptToken, detach_grace: Duration) -> Self {
        Self {
            interrupt,
            detach_grace,
        }
    }
}

fn normalize_line_endings(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace("\r\n", "\n")
}

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String], detach: bool) -> Result<CommandOutput, DriverError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            DriverError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command line",
            ))
        })?;

        debug!("executing {} (detach: {detach})", argv.join(" "));

        if detach {
            // The child outlives this call; drop the handle without
            // waiting and give the emulator time to come up.
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            std::thread::sleep(self.detach_grace);
            return Ok(CommandOutput::default());
        }

        let output = Command::new(program).args(args).output()?;
        let stdout = normalize_line_endings(&output.stdout);
        let stderr = normalize_line_endings(&output.stderr);
        let status = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            if self.interrupt.is_raised() {
                debug!("command interrupted by user, treating exit {status} as benign");
            } else {
                return Err(DriverError::CommandFailed {
                    command: argv.join(" "),
                    status,
                    stdout,
                    stderr,
                });
            }
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()]
    }

    #[test]
    fn captures_stdout() {
        let runner = ProcessRunner::default();
        let out = runner.run(&sh("echo hello"), false).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.status, 0);
    }

    #[test]
    fn normalizes_crlf_output() {
        let runner = ProcessRunner::default();
        let out = runner.run(&sh("printf 'a\\r\\nb\\r\\n'"), false).unwrap();
        assert_eq!(out.stdout, "a\nb\n");
    }

    #[test]
    fn nonzero_exit_is_command_failed() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(&sh("echo oops >&2; exit 3"), false)
            .unwrap_err();
        match err {
            DriverError::CommandFailed {
                status, stderr, ..
            } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "oops\n");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn raised_token_reclassifies_failure() {
        let token = InterruptToken::new();
        token.raise();
        let runner = ProcessRunner::new(token);
        let out = runner.run(&sh("exit 1"), false).unwrap();
        assert_eq!(out.status, 1);
    }

    #[test]
    fn missing_binary_is_io_error() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(&["/nonexistent/qemu".to_owned()], false)
            .unwrap_err();
        assert!(matches!(err, DriverError::Io(_)));
    }

    #[test]
    fn empty_argv_rejected() {
        let runner = ProcessRunner::default();
        assert!(runner.run(&[], false).is_err());
    }

    #[test]
    fn detached_launch_returns_without_output() {
        let runner =
            ProcessRunner::with_detach_grace(InterruptToken::new(), Duration::from_millis(10));
        let out = runner.run(&sh("sleep 0.2"), true).unwrap();
        assert_eq!(out.status, 0);
        assert!(out.stdout.is_empty());
    }
}
