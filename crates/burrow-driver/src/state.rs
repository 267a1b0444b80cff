use crate::layout::InstanceLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The three observable states of an instance, derived from two probes:
/// data-directory existence and pid-file liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    NotCreated,
    Stopped,
    Running,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCreated => write!(f, "not_created"),
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Pure classification: RUNNING implies CREATED, so a live pid wins
/// regardless of the directory probe.
pub fn classify(created: bool, alive: bool) -> InstanceState {
    if alive {
        InstanceState::Running
    } else if created {
        InstanceState::Stopped
    } else {
        InstanceState::NotCreated
    }
}

/// Non-destructive liveness probe: does the pid's process group exist?
/// ESRCH means the process is gone and is never surfaced as an error.
pub fn pid_alive(pid: i32) -> bool {
    // SAFETY: getpgid performs no memory access through the argument; any
    // pid value is a valid input and errors are reported via errno.
    #[allow(unsafe_code)]
    let pgid = unsafe { libc::getpgid(pid) };
    pgid >= 0
}

/// Read the decimal pid from a pid file. A missing file means the
/// instance was never started (or the file was cleaned up); a corrupt
/// or non-positive pid is logged and treated as not-running rather than
/// an error. Zero in particular would make getpgid probe our own process
/// group and report a dead instance as live.
pub fn read_pid(path: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(path).ok()?;
    match content.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Some(pid),
        Ok(_) | Err(_) => {
            tracing::warn!(
                "corrupt pid file {}: ignoring '{}'",
                path.display(),
                content.trim()
            );
            None
        }
    }
}

/// True iff the instance's pid file names a currently live process.
pub fn is_running(layout: &InstanceLayout, id: &str) -> bool {
    read_pid(&layout.pid_file(id)).is_some_and(pid_alive)
}

/// Classify the instance. The running probe is checked first: a live pid
/// implies the data directory exists, which skips a redundant existence
/// check in the common case.
pub fn get_state(layout: &InstanceLayout, id: &str) -> InstanceState {
    if is_running(layout, id) {
        InstanceState::Running
    } else if layout.is_created(id) {
        InstanceState::Stopped
    } else {
        InstanceState::NotCreated
    }
}
