use std::path::{Path, PathBuf};

pub const IMAGE_FILE: &str = "linked-box.img";
pub const PID_FILE: &str = "qemu.pid";
pub const FIRMWARE_CODE_FILE: &str = "edk2-aarch64-code.fd";
pub const FIRMWARE_VARS_FILE: &str = "edk2-arm-vars.fd";
pub const CONTROL_SOCKET_FILE: &str = "qemu_socket";
pub const SERIAL_SOCKET_FILE: &str = "qemu_socket_serial";

/// On-disk layout anchoring instance identity.
///
/// Each instance id names one subdirectory under two roots: a persistent
/// data root (cloned disk image, firmware, pid file) and a volatile
/// runtime root (monitor and serial sockets), the latter typically under
/// a tmp directory recreated per host boot.
#[derive(Debug, Clone)]
pub struct InstanceLayout {
    data_root: PathBuf,
    runtime_root: PathBuf,
}

impl InstanceLayout {
    pub fn new(data_root: impl Into<PathBuf>, runtime_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            runtime_root: runtime_root.into(),
        }
    }

    #[inline]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    #[inline]
    pub fn runtime_root(&self) -> &Path {
        &self.runtime_root
    }

    #[inline]
    pub fn instance_dir(&self, id: &str) -> PathBuf {
        self.data_root.join(id)
    }

    #[inline]
    pub fn runtime_dir(&self, id: &str) -> PathBuf {
        self.runtime_root.join(id)
    }

    /// The instance's copy-on-write disk, backed by the imported base image.
    #[inline]
    pub fn image_path(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(IMAGE_FILE)
    }

    /// Written by QEMU itself via `-pidfile`; read back as a liveness marker.
    #[inline]
    pub fn pid_file(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(PID_FILE)
    }

    #[inline]
    pub fn firmware_code(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(FIRMWARE_CODE_FILE)
    }

    #[inline]
    pub fn firmware_vars(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(FIRMWARE_VARS_FILE)
    }

    #[inline]
    pub fn control_socket(&self, id: &str) -> PathBuf {
        self.runtime_dir(id).join(CONTROL_SOCKET_FILE)
    }

    #[inline]
    pub fn serial_socket(&self, id: &str) -> PathBuf {
        self.runtime_dir(id).join(SERIAL_SOCKET_FILE)
    }

    /// An instance exists iff its data subdirectory does, independent of
    /// whether a backing process is alive.
    pub fn is_created(&self, id: &str) -> bool {
        self.instance_dir(id).is_dir()
    }
}
