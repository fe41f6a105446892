use async_trait::async_trait;

use super::command::FileMode;
use crate::error::ExecError;

/// Transport that runs commands on remote hosts
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a shell command line, returning combined stdout and stderr
    async fn run(&self, host: &str, command_line: &str) -> Result<String, ExecError>;

    /// Write `content` to `path` on the host with the given permissions
    async fn copy(
        &self,
        host: &str,
        content: &[u8],
        path: &str,
        mode: FileMode,
    ) -> Result<(), ExecError>;
}
