use crate::command::build_launch_command;
use crate::control;
use crate::layout::InstanceLayout;
use crate::runner::{CommandRunner, InterruptToken, ProcessRunner};
use crate::state::{self, InstanceState};
use crate::DriverError;
use base64::Engine as _;
use burrow_config::{ChannelEndpoint, LaunchConfig};
use rand::RngCore;
use std::fs;
use tracing::{debug, info};

/// Root entry point for instance lifecycle operations.
///
/// All operations are synchronous and idempotent against the observed
/// state; no locking is performed, so callers must serialize operations
/// against a single instance id themselves.
pub struct InstanceDriver {
    layout: InstanceLayout,
    runner: Box<dyn CommandRunner>,
}

impl InstanceDriver {
    /// Driver backed by real process execution, reporting user
    /// interruption through the given token.
    pub fn new(layout: InstanceLayout, interrupt: InterruptToken) -> Self {
        Self {
            layout,
            runner: Box::new(ProcessRunner::new(interrupt)),
        }
    }

    /// Driver with an injected command runner (tests).
    pub fn with_runner(layout: InstanceLayout, runner: Box<dyn CommandRunner>) -> Self {
        Self { layout, runner }
    }

    #[inline]
    pub fn layout(&self) -> &InstanceLayout {
        &self.layout
    }

    pub fn state(&self, id: &str) -> InstanceState {
        state::get_state(&self.layout, id)
    }

    /// Clone the configured base image into a fresh instance and return
    /// its id. A failed image clone leaves the empty instance directory
    /// behind for a later `delete`; no rollback is attempted.
    pub fn import(&self, config: &LaunchConfig) -> Result<String, DriverError> {
        config.validate()?;

        let id = new_instance_id();
        info!("importing instance {id} from {}", config.image.base.display());

        fs::create_dir_all(self.layout.instance_dir(&id))?;
        fs::create_dir_all(self.layout.runtime_dir(&id))?;

        if let Some(firmware_dir) = config
            .image
            .firmware_dir
            .as_ref()
            .filter(|_| config.requires_uefi_firmware())
        {
            let code = self.layout.firmware_code(&id);
            let vars = self.layout.firmware_vars(&id);
            debug!("copying UEFI firmware from {}", firmware_dir.display());
            fs::copy(firmware_dir.join(crate::layout::FIRMWARE_CODE_FILE), code)?;
            fs::copy(firmware_dir.join(crate::layout::FIRMWARE_VARS_FILE), vars)?;
        }

        let image = self.layout.image_path(&id);
        let argv = vec![
            "qemu-img".to_owned(),
            "create".to_owned(),
            "-f".to_owned(),
            "qcow2".to_owned(),
            "-F".to_owned(),
            "qcow2".to_owned(),
            "-b".to_owned(),
            config.image.base.display().to_string(),
            image.display().to_string(),
        ];
        self.runner.run(&argv, false)?;

        Ok(id)
    }

    /// Launch the instance. No-op when already running. Does not wait for
    /// readiness beyond the runner's detach grace; QEMU writes the pid
    /// file itself via `-pidfile`.
    pub fn start(&self, id: &str, config: &LaunchConfig) -> Result<(), DriverError> {
        config.validate()?;

        if self.state(id) == InstanceState::Running {
            debug!("instance {id} already running, start is a no-op");
            return Ok(());
        }

        // The runtime root may have been wiped since import (tmp dirs
        // rarely survive a host reboot).
        fs::create_dir_all(self.layout.runtime_dir(id))?;

        info!("starting instance {id}");
        let argv = build_launch_command(&self.layout, id, config);
        self.runner.run(&argv, config.launch.foreground)?;
        Ok(())
    }

    /// Request a graceful shutdown over the monitor channel. No-op when
    /// not running. Fire-and-forget: callers observe the exit by
    /// re-querying `state`.
    pub fn stop(&self, id: &str, config: &LaunchConfig) -> Result<(), DriverError> {
        if self.state(id) != InstanceState::Running {
            debug!("instance {id} not running, stop is a no-op");
            return Ok(());
        }

        info!("stopping instance {id}");
        let endpoint = ChannelEndpoint::resolve(
            config.channels.control_port,
            self.layout.control_socket(id),
        );
        control::send_powerdown(&endpoint)
    }

    /// Remove both directory trees. Irreversible; no-op when the instance
    /// was never created.
    pub fn delete(&self, id: &str) -> Result<(), DriverError> {
        if !self.layout.is_created(id) {
            debug!("instance {id} not created, delete is a no-op");
            return Ok(());
        }

        info!("deleting instance {id}");
        fs::remove_dir_all(self.layout.instance_dir(id))?;
        let runtime_dir = self.layout.runtime_dir(id);
        if runtime_dir.exists() {
            fs::remove_dir_all(runtime_dir)?;
        }
        Ok(())
    }
}

/// URL-safe random token naming an instance's subdirectories:
/// 8 random bytes, base64url without padding (11 characters).
fn new_instance_id() -> String {
    let mut buf = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}
