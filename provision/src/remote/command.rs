use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Permissions of a copied file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Owner read only (keys)
    Private,
    ReadOnly,
    Executable,
}

impl FileMode {
    pub fn bits(self) -> u32 {
        match self {
            FileMode::Private => 0o400,
            FileMode::ReadOnly => 0o444,
            FileMode::Executable => 0o744,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.bits())
    }
}

/// One step executed on a remote host
#[derive(Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Shell {
        host: String,
        command_line: String,
        description: String,
    },
    CopyFile {
        host: String,
        content: Vec<u8>,
        path: String,
        mode: FileMode,
        description: String,
    },
}

impl RemoteCommand {
    pub fn shell(
        host: impl Into<String>,
        command_line: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        RemoteCommand::Shell {
            host: host.into(),
            command_line: command_line.into(),
            description: description.into(),
        }
    }

    pub fn copy_file(
        host: impl Into<String>,
        content: impl Into<Vec<u8>>,
        path: impl Into<String>,
        mode: FileMode,
        description: impl Into<String>,
    ) -> Self {
        RemoteCommand::CopyFile {
            host: host.into(),
            content: content.into(),
            path: path.into(),
            mode,
            description: description.into(),
        }
    }

    pub fn host(&self) -> &str {
        match self {
            RemoteCommand::Shell { host, .. } | RemoteCommand::CopyFile { host, .. } => host,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            RemoteCommand::Shell { description, .. }
            | RemoteCommand::CopyFile { description, .. } => description,
        }
    }

    /// Host, description and command line or path must all be non-empty
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.description().trim().is_empty() {
            return Err(RemoteError::InvalidCommand(format!(
                "command for host '{}' has no description",
                self.host()
            )));
        }
        if self.host().trim().is_empty() {
            return Err(RemoteError::InvalidCommand(format!(
                "'{}' has no target host",
                self.description()
            )));
        }
        let target_empty = match self {
            RemoteCommand::Shell { command_line, .. } => command_line.trim().is_empty(),
            RemoteCommand::CopyFile { path, .. } => path.trim().is_empty(),
        };
        if target_empty {
            return Err(RemoteError::InvalidCommand(format!(
                "'{}' has nothing to run",
                self.description()
            )));
        }
        Ok(())
    }
}

// File contents are often keys; only their size is shown
impl fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCommand::Shell {
                host,
                command_line,
                description,
            } => f
                .debug_struct("Shell")
                .field("host", host)
                .field("command_line", command_line)
                .field("description", description)
                .finish(),
            RemoteCommand::CopyFile {
                host,
                content,
                path,
                mode,
                description,
            } => f
                .debug_struct("CopyFile")
                .field("host", host)
                .field("content_len", &content.len())
                .field("path", path)
                .field("mode", mode)
                .field("description", description)
                .finish(),
        }
    }
}
