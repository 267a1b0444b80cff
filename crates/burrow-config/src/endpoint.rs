use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a monitor or serial channel of a running instance is reachable.
///
/// Exactly one of the two transports is chosen per channel: a TCP port on
/// localhost when the launch config names one, otherwise a unix socket
/// under the instance's runtime directory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEndpoint {
    Tcp { port: u16 },
    Unix { path: PathBuf },
}

impl ChannelEndpoint {
    pub fn resolve(port: Option<u16>, socket_path: PathBuf) -> Self {
        match port {
            Some(port) => Self::Tcp { port },
            None => Self::Unix { path: socket_path },
        }
    }

    /// The chardev sub-options naming this endpoint in a QEMU
    /// `-chardev socket,...` declaration.
    pub fn chardev_clause(&self) -> String {
        match self {
            Self::Tcp { port } => format!("port={port},host=localhost,ipv4=on"),
            Self::Unix { path } => format!("path={}", path.display()),
        }
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { port } => write!(f, "localhost:{port}"),
            Self::Unix { path } => write!(f, "{}", path.display()),
        }
    }
}
