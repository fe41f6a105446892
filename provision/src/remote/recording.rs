use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::command::FileMode;
use super::executor::RemoteExecutor;
use crate::error::ExecError;

/// Command as seen by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuedCommand {
    Run {
        host: String,
        command_line: String,
    },
    Copy {
        host: String,
        path: String,
        mode: FileMode,
        content: Vec<u8>,
    },
}

impl IssuedCommand {
    pub fn host(&self) -> &str {
        match self {
            IssuedCommand::Run { host, .. } | IssuedCommand::Copy { host, .. } => host,
        }
    }

    /// Command line or destination path
    pub fn target(&self) -> &str {
        match self {
            IssuedCommand::Run { command_line, .. } => command_line,
            IssuedCommand::Copy { path, .. } => path,
        }
    }
}

#[derive(Debug)]
struct FailureRule {
    pattern: String,
    /// Remaining failures; `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    issued: Vec<IssuedCommand>,
    failures: Vec<FailureRule>,
    hangs: Vec<String>,
    outputs: HashMap<String, String>,
}

enum Outcome {
    Succeed,
    Fail,
    Hang,
}

/// In-memory executor recording every command it is given
///
/// Commands succeed unless their command line or path contains a pattern
/// registered with [`fail_on`](Self::fail_on) or [`hang_on`](Self::hang_on).
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    state: Mutex<State>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command whose target contains `pattern`
    pub fn fail_on(self, pattern: impl Into<String>) -> Self {
        self.push_failure(pattern.into(), None);
        self
    }

    /// Fail the first `times` commands whose target contains `pattern`
    pub fn fail_times(self, pattern: impl Into<String>, times: usize) -> Self {
        self.push_failure(pattern.into(), Some(times));
        self
    }

    /// Never complete commands whose target contains `pattern`
    pub fn hang_on(self, pattern: impl Into<String>) -> Self {
        self.lock().hangs.push(pattern.into());
        self
    }

    /// Canned output for an exact command line
    pub fn respond(self, command_line: impl Into<String>, output: impl Into<String>) -> Self {
        self.lock().outputs.insert(command_line.into(), output.into());
        self
    }

    pub fn issued(&self) -> Vec<IssuedCommand> {
        self.lock().issued.clone()
    }

    pub fn issued_on(&self, host: &str) -> Vec<IssuedCommand> {
        self.lock()
            .issued
            .iter()
            .filter(|c| c.host() == host)
            .cloned()
            .collect()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.lock()
            .issued
            .iter()
            .filter_map(|c| match c {
                IssuedCommand::Run { command_line, .. } => Some(command_line.clone()),
                IssuedCommand::Copy { .. } => None,
            })
            .collect()
    }

    pub fn copied_paths(&self, host: &str) -> Vec<String> {
        self.issued_on(host)
            .into_iter()
            .filter_map(|c| match c {
                IssuedCommand::Copy { path, .. } => Some(path),
                IssuedCommand::Run { .. } => None,
            })
            .collect()
    }

    fn push_failure(&self, pattern: String, remaining: Option<usize>) {
        self.lock().failures.push(FailureRule { pattern, remaining });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the log from other assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, command: IssuedCommand) -> Outcome {
        let mut state = self.lock();
        let target = command.target().to_string();
        state.issued.push(command);

        if state.hangs.iter().any(|p| target.contains(p.as_str())) {
            return Outcome::Hang;
        }
        for rule in state.failures.iter_mut() {
            if !target.contains(rule.pattern.as_str()) {
                continue;
            }
            match rule.remaining.as_mut() {
                None => return Outcome::Fail,
                Some(0) => continue,
                Some(n) => {
                    *n -= 1;
                    return Outcome::Fail;
                }
            }
        }
        Outcome::Succeed
    }
}

#[async_trait]
impl RemoteExecutor for RecordingExecutor {
    async fn run(&self, host: &str, command_line: &str) -> Result<String, ExecError> {
        let outcome = self.record(IssuedCommand::Run {
            host: host.to_string(),
            command_line: command_line.to_string(),
        });
        match outcome {
            Outcome::Succeed => Ok(self
                .lock()
                .outputs
                .get(command_line)
                .cloned()
                .unwrap_or_default()),
            Outcome::Fail => Err(ExecError::Failed {
                status: Some(1),
                output: format!("{}: simulated failure", command_line),
            }),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }

    async fn copy(
        &self,
        host: &str,
        content: &[u8],
        path: &str,
        mode: FileMode,
    ) -> Result<(), ExecError> {
        let outcome = self.record(IssuedCommand::Copy {
            host: host.to_string(),
            path: path.to_string(),
            mode,
            content: content.to_vec(),
        });
        match outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail => Err(ExecError::Failed {
                status: Some(1),
                output: format!("{}: simulated failure", path),
            }),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}
