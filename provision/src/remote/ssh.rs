use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::command::FileMode;
use super::executor::RemoteExecutor;
use crate::error::ExecError;

/// Connection parameters for [`SshExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub user: String,
    pub port: u16,
    /// Private key; falls back to `~/.ssh/id_ed25519` then `~/.ssh/id_rsa`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    /// Upper bound for a single remote command
    pub command_timeout_secs: u64,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            identity_file: None,
            connect_timeout_secs: 10,
            command_timeout_secs: 600,
        }
    }
}

impl SshSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Configured identity, or the first default key that exists
    pub fn resolve_identity(&self) -> Option<PathBuf> {
        if let Some(path) = &self.identity_file {
            return Some(path.clone());
        }
        let ssh_dir = dirs::home_dir()?.join(".ssh");
        ["id_ed25519", "id_rsa"]
            .iter()
            .map(|name| ssh_dir.join(name))
            .find(|path| path.exists())
    }
}

/// Runs commands through the system `ssh` client
#[derive(Debug, Clone)]
pub struct SshExecutor {
    settings: SshSettings,
    identity: Option<PathBuf>,
}

impl SshExecutor {
    pub fn new(settings: SshSettings) -> Self {
        let identity = settings.resolve_identity();
        Self { settings, identity }
    }

    fn command(&self, host: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p")
            .arg(self.settings.port.to_string())
            .args(["-o", "BatchMode=yes"])
            .args(["-o", "StrictHostKeyChecking=no"])
            .args(["-o", "UserKnownHostsFile=/dev/null"])
            .args(["-o", "LogLevel=ERROR"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.settings.connect_timeout_secs));
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(format!("{}@{}", self.settings.user, host));
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, host: &str, command_line: &str) -> Result<String, ExecError> {
        debug!(host, command_line, "ssh run");
        let output = self
            .command(host)
            .arg(command_line)
            .stdin(Stdio::null())
            .output()
            .await?;

        let combined = combine(&output.stdout, &output.stderr);
        if output.status.success() {
            Ok(combined)
        } else {
            Err(failure(output.status.code(), combined))
        }
    }

    async fn copy(
        &self,
        host: &str,
        content: &[u8],
        path: &str,
        mode: FileMode,
    ) -> Result<(), ExecError> {
        debug!(host, path, %mode, bytes = content.len(), "ssh copy");
        let mut child = self
            .command(host)
            .arg(copy_line(path, mode))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failure(
                output.status.code(),
                combine(&output.stdout, &output.stderr),
            ))
        }
    }
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(stderr));
    text
}

fn failure(status: Option<i32>, output: String) -> ExecError {
    // ssh reserves 255 for its own errors
    match status {
        Some(255) => ExecError::Transport(output.trim().to_string()),
        status => ExecError::Failed { status, output },
    }
}

/// Remote shell line that stores stdin at `path`, creating missing parent
/// directories first
fn copy_line(path: &str, mode: FileMode) -> String {
    let target = shell_quote(path);
    let write = format!("cat > {} && chmod {} {}", target, mode, target);
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => {
            format!("mkdir -p {} && {}", shell_quote(parent), write)
        }
        _ => write,
    }
}

/// Single-quote a word for the remote shell
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/etc/wireguard/wg0.conf"), "'/etc/wireguard/wg0.conf'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_copy_line_creates_parent_directory() {
        assert_eq!(
            copy_line("/etc/kubernetes/pki/etcd.key", FileMode::Private),
            "mkdir -p '/etc/kubernetes/pki' && cat > '/etc/kubernetes/pki/etcd.key' \
             && chmod 0400 '/etc/kubernetes/pki/etcd.key'"
        );
        assert_eq!(
            copy_line("/boot.sh", FileMode::Executable),
            "cat > '/boot.sh' && chmod 0744 '/boot.sh'"
        );
    }

    #[test]
    fn test_copy_line_writes_into_missing_directory() {
        use std::io::Write as _;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("kubernetes").join("pki").join("etcd.key");

        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg(copy_line(target.to_str().unwrap(), FileMode::Private))
            .stdin(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(b"KEY").unwrap();
        assert!(child.wait().unwrap().success());

        assert_eq!(std::fs::read(&target).unwrap(), b"KEY");
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o400);
    }

    #[test]
    fn test_explicit_identity_wins() {
        let settings = SshSettings {
            identity_file: Some(PathBuf::from("/keys/cluster")),
            ..SshSettings::default()
        };
        assert_eq!(settings.resolve_identity(), Some(PathBuf::from("/keys/cluster")));
    }

    #[test]
    fn test_command_arguments() {
        let settings = SshSettings {
            user: "ubuntu".to_string(),
            port: 2222,
            identity_file: Some(PathBuf::from("/keys/cluster")),
            ..SshSettings::default()
        };
        let executor = SshExecutor::new(settings);
        let cmd = executor.command("203.0.113.7");
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..2], ["-p", "2222"]);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"/keys/cluster".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("ubuntu@203.0.113.7"));
    }

    #[test]
    fn test_status_255_is_transport_error() {
        assert!(matches!(failure(Some(255), "refused".into()), ExecError::Transport(_)));
        assert!(matches!(
            failure(Some(2), "no such file".into()),
            ExecError::Failed { status: Some(2), .. }
        ));
    }
}
