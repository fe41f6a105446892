//! Cluster provisioning: WireGuard mesh, remote command pipelines and the
//! etcd/kubeadm installation plans built on them.

pub mod error;
pub mod install;
pub mod inventory;
pub mod mesh;
pub mod remote;
mod templates;

pub use error::{ExecError, InstallError, MeshError, RemoteError};
pub use inventory::{HostInventory, Role, ServerConfig};
