//! Launch configuration schema for Burrow VM instances.
//!
//! This crate defines the configuration layer: TOML launch file parsing
//! (`LaunchConfig`), validation, and the tagged control/debug channel
//! endpoint representation (`ChannelEndpoint`) consumed by the driver's
//! command builder and control channel client.

pub mod endpoint;
pub mod launch;

pub use endpoint::ChannelEndpoint;
pub use launch::{
    parse_launch_file, parse_launch_str, ChannelsSection, ConfigError, ImageSection,
    LaunchConfig, LaunchSection, MachineSection, NetworkSection,
};
