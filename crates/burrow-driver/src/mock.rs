use crate::runner::{CommandOutput, CommandRunner};
use crate::DriverError;
use std::sync::Mutex;

/// One recorded invocation: the full argument vector and the detach flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    pub detach: bool,
}

/// Command runner that records invocations instead of executing them,
/// so lifecycle tests can assert on launch counts and argument lists.
#[derive(Debug, Default)]
pub struct MockRunner {
    calls: Mutex<Vec<RecordedCall>>,
    fail_next: Mutex<Option<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next invocation fail with a CommandFailed carrying the
    /// given stderr.
    pub fn fail_next(&self, stderr: impl Into<String>) {
        *self.fail_next.lock().expect("mock lock poisoned") = Some(stderr.into());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock poisoned").len()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, argv: &[String], detach: bool) -> Result<CommandOutput, DriverError> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedCall {
                argv: argv.to_vec(),
                detach,
            });

        if let Some(stderr) = self.fail_next.lock().expect("mock lock poisoned").take() {
            return Err(DriverError::CommandFailed {
                command: argv.join(" "),
                status: 1,
                stdout: String::new(),
                stderr,
            });
        }

        Ok(CommandOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let runner = MockRunner::new();
        runner.run(&["qemu-img".to_owned()], false).unwrap();
        runner.run(&["qemu-system-x86_64".to_owned()], true).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].argv, vec!["qemu-img"]);
        assert!(!calls[0].detach);
        assert!(calls[1].detach);
    }

    #[test]
    fn fail_next_fails_once() {
        let runner = MockRunner::new();
        runner.fail_next("boom");
        assert!(runner.run(&["x".to_owned()], false).is_err());
        assert!(runner.run(&["x".to_owned()], false).is_ok());
    }
}
