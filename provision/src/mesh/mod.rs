//! WireGuard full mesh over the cluster's servers.

pub mod keys;
pub mod render;
pub mod topology;

pub use keys::{HostKeyPair, MeshKeyGenerator};
pub use render::{render_config, WIREGUARD_CONFIG_PATH};
pub use topology::{MeshConfig, MeshHost, MeshSettings, MeshTopologyBuilder, Peer};
