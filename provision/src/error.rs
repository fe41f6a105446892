use std::time::Duration;

use ipnet::Ipv4Net;
use kthw_pki::{CertRole, PkiError};
use thiserror::Error;

/// Errors while generating the overlay network
#[derive(Debug, Error)]
pub enum MeshError {
    /// The random source failed; no partial mesh is returned
    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("overlay network {network} has no address left for {host}")]
    AddressPoolExhausted { network: Ipv4Net, host: String },

    #[error("failed to render WireGuard config for {host}: {source}")]
    Render {
        host: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Failure reported by a [`RemoteExecutor`](crate::remote::RemoteExecutor)
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("remote command exited with status {}: {output}", status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    Failed { status: Option<i32>, output: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Output captured before the failure, if any
    pub fn output(&self) -> &str {
        match self {
            ExecError::Failed { output, .. } => output,
            _ => "",
        }
    }
}

/// Errors of command pipelines and remote waits
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("pipeline was already executed")]
    AlreadyExecuted,

    #[error("'{description}' failed on {host}: {source}")]
    Execution {
        host: String,
        description: String,
        output: String,
        #[source]
        source: ExecError,
    },

    #[error("'{description}' on {host} timed out after {timeout:?}")]
    Timeout {
        host: String,
        description: String,
        timeout: Duration,
    },

    #[error("{host} did not finish booting after {attempts} attempts")]
    BootTimeout { host: String, attempts: u32 },

    #[error("task for {host} failed: {reason}")]
    Join { host: String, reason: String },
}

/// Errors while planning or running an installation
#[derive(Debug, Error)]
pub enum InstallError {
    /// Inventory does not satisfy the role requirements
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to obtain {role} certificate: {source}")]
    Certificate {
        role: CertRole,
        #[source]
        source: PkiError,
    },

    #[error("failed to load CA: {0}")]
    Ca(#[source] PkiError),

    #[error("failed to render {artifact}: {source}")]
    Render {
        artifact: &'static str,
        #[source]
        source: minijinja::Error,
    },

    #[error("installation failed on {}", .0.join(", "))]
    HostsFailed(Vec<String>),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl InstallError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
