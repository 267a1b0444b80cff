//! Instance lifecycle driver for Burrow virtual machines.
//!
//! This crate implements the execution layer: the on-disk instance layout
//! (`InstanceLayout`), three-state instance detection, deterministic QEMU
//! command construction, a process runner with interrupt-aware foreground
//! execution and a detached launch mode, the monitor-socket powerdown
//! client, and the `InstanceDriver` tying them together into idempotent
//! import/start/stop/delete operations.

pub mod command;
pub mod control;
pub mod instance;
pub mod layout;
pub mod mock;
pub mod runner;
pub mod state;

pub use command::build_launch_command;
pub use instance::InstanceDriver;
pub use layout::InstanceLayout;
pub use runner::{CommandOutput, CommandRunner, InterruptToken, ProcessRunner};
pub use state::InstanceState;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("launch config error: {0}")]
    Config(#[from] burrow_config::ConfigError),
    #[error("command `{command}` exited with status {status}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stdout: String,
        stderr: String,
    },
    #[error("control channel {endpoint} failed: {source}")]
    Control {
        endpoint: String,
        source: std::io::Error,
    },
}
