use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read launch config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse launch config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("image.base must not be empty")]
    EmptyBaseImage,
    #[error("network.ssh_port must not be 0")]
    InvalidSshPort,
    #[error("machine.arch '{0}' requires image.firmware_dir (UEFI pflash images)")]
    MissingFirmwareDir(String),
}

/// Per-instance launch configuration, supplied by the orchestration layer
/// for `import` and `start`. Not persisted by the driver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    pub machine: MachineSection,
    pub network: NetworkSection,
    #[serde(default)]
    pub channels: ChannelsSection,
    pub image: ImageSection,
    #[serde(default)]
    pub launch: LaunchSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MachineSection {
    /// QEMU target architecture; selects the `qemu-system-<arch>` binary.
    pub arch: String,
    /// Machine type passed to `-machine`, accelerator flags included.
    #[serde(default = "default_machine_type", rename = "type")]
    pub machine_type: String,
    #[serde(default = "default_cpu")]
    pub cpu: String,
    #[serde(default = "default_smp")]
    pub smp: u32,
    /// Memory size passed verbatim to `-m` (e.g. "4G").
    #[serde(default = "default_memory")]
    pub memory: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    #[serde(default = "default_net_device")]
    pub device: String,
    /// Host port forwarded to guest port 22.
    pub ssh_port: u16,
    /// Additional forwarding rules, each appended verbatim as a
    /// `hostfwd=` clause (e.g. "tcp::8080-:80").
    #[serde(default)]
    pub ports: Vec<String>,
    /// Raw options appended to the `-netdev user` backend, comma-joined.
    #[serde(default)]
    pub extra_args: Option<String>,
}

/// Optional TCP ports for the monitor and serial channels. When a port is
/// absent the driver substitutes a unix socket under the instance's
/// runtime directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChannelsSection {
    #[serde(default)]
    pub control_port: Option<u16>,
    #[serde(default)]
    pub debug_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    /// Backing image the instance's qcow2 disk is cloned from.
    pub base: PathBuf,
    /// Directory holding the edk2 firmware images, required for aarch64.
    #[serde(default)]
    pub firmware_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LaunchSection {
    /// Keep QEMU attached to the launching call instead of passing
    /// `-daemonize`. The driver then detaches the process itself.
    #[serde(default)]
    pub foreground: bool,
    /// Raw arguments appended verbatim at the end of the command line.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_machine_type() -> String {
    "virt".to_owned()
}

fn default_cpu() -> String {
    "host".to_owned()
}

fn default_smp() -> u32 {
    2
}

fn default_memory() -> String {
    "4G".to_owned()
}

fn default_net_device() -> String {
    "virtio-net-device".to_owned()
}

impl LaunchConfig {
    /// Whether the target architecture boots through UEFI pflash images
    /// that must be copied into the instance directory at import.
    pub fn requires_uefi_firmware(&self) -> bool {
        self.machine.arch == "aarch64"
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.base.as_os_str().is_empty() {
            return Err(ConfigError::EmptyBaseImage);
        }
        if self.network.ssh_port == 0 {
            return Err(ConfigError::InvalidSshPort);
        }
        if self.requires_uefi_firmware() && self.image.firmware_dir.is_none() {
            return Err(ConfigError::MissingFirmwareDir(self.machine.arch.clone()));
        }
        Ok(())
    }
}

pub fn parse_launch_str(input: &str) -> Result<LaunchConfig, ConfigError> {
    let config: LaunchConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_launch_file(path: impl AsRef<Path>) -> Result<LaunchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_launch_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[machine]
arch = "x86_64"

[network]
ssh_port = 50022

[image]
base = "/images/base.qcow2"
"#;

    #[test]
    fn parse_minimal_config() {
        let cfg = parse_launch_str(MINIMAL).unwrap();
        assert_eq!(cfg.machine.arch, "x86_64");
        assert_eq!(cfg.machine.machine_type, "virt");
        assert_eq!(cfg.machine.cpu, "host");
        assert_eq!(cfg.machine.smp, 2);
        assert_eq!(cfg.machine.memory, "4G");
        assert_eq!(cfg.network.device, "virtio-net-device");
        assert_eq!(cfg.network.ssh_port, 50022);
        assert!(cfg.network.ports.is_empty());
        assert!(cfg.channels.control_port.is_none());
        assert!(!cfg.launch.foreground);
        assert!(cfg.launch.extra_args.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let cfg = parse_launch_str(
            r#"
[machine]
arch = "aarch64"
type = "virt,accel=hvf,highmem=off"
cpu = "cortex-a72"
smp = 4
memory = "8G"

[network]
device = "virtio-net-pci"
ssh_port = 2222
ports = ["tcp::8080-:80", "udp::5353-:53"]
extra_args = "ipv6=off"

[channels]
control_port = 4444
debug_port = 4445

[image]
base = "/images/base.qcow2"
firmware_dir = "/usr/share/qemu"

[launch]
foreground = true
extra_args = ["-serial", "stdio"]
"#,
        )
        .unwrap();
        assert!(cfg.requires_uefi_firmware());
        assert_eq!(cfg.network.ports.len(), 2);
        assert_eq!(cfg.channels.control_port, Some(4444));
        assert_eq!(cfg.launch.extra_args, vec!["-serial", "stdio"]);
    }

    #[test]
    fn unknown_field_rejected() {
        let result = parse_launch_str(
            r#"
[machine]
arch = "x86_64"
flavor = "spicy"

[network]
ssh_port = 50022

[image]
base = "/images/base.qcow2"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn aarch64_without_firmware_dir_rejected() {
        let result = parse_launch_str(
            r#"
[machine]
arch = "aarch64"

[network]
ssh_port = 50022

[image]
base = "/images/base.qcow2"
"#,
        );
        assert!(matches!(result, Err(ConfigError::MissingFirmwareDir(_))));
    }

    #[test]
    fn x86_64_does_not_require_firmware() {
        let cfg = parse_launch_str(MINIMAL).unwrap();
        assert!(!cfg.requires_uefi_firmware());
    }

    #[test]
    fn zero_ssh_port_rejected() {
        let result = parse_launch_str(
            r#"
[machine]
arch = "x86_64"

[network]
ssh_port = 0

[image]
base = "/images/base.qcow2"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidSshPort)));
    }

    #[test]
    fn parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launch.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = parse_launch_file(&path).unwrap();
        assert_eq!(cfg.network.ssh_port, 50022);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = parse_launch_file("/nonexistent/launch.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
