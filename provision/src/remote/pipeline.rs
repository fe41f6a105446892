use std::time::Duration;

use tracing::{debug, error, info};

use super::command::RemoteCommand;
use super::executor::RemoteExecutor;
use crate::error::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub host: String,
    pub description: String,
    /// Output of shell steps
    pub output: Option<String>,
}

/// Ordered commands executed one after another, stopping at the first failure
///
/// Steps that already ran are not rolled back.
#[derive(Debug)]
pub struct CommandPipeline {
    commands: Vec<RemoteCommand>,
    verbose: bool,
    state: PipelineState,
}

impl CommandPipeline {
    pub fn new(commands: Vec<RemoteCommand>, verbose: bool) -> Result<Self, RemoteError> {
        for command in &commands {
            command.validate()?;
        }
        Ok(Self {
            commands,
            verbose,
            state: PipelineState::Pending,
        })
    }

    pub fn commands(&self) -> &[RemoteCommand] {
        &self.commands
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every command with a per-command `timeout`
    pub async fn execute(
        &mut self,
        executor: &dyn RemoteExecutor,
        timeout: Duration,
    ) -> Result<Vec<StepReport>, RemoteError> {
        if self.state != PipelineState::Pending {
            return Err(RemoteError::AlreadyExecuted);
        }
        self.state = PipelineState::Running;

        let mut reports = Vec::with_capacity(self.commands.len());
        for (index, command) in self.commands.iter().enumerate() {
            debug!(
                step = index + 1,
                total = self.commands.len(),
                host = command.host(),
                description = command.description(),
                "Executing step"
            );

            match run_step(executor, command, timeout).await {
                Ok(output) => {
                    match (&output, self.verbose) {
                        (Some(text), true) => info!(
                            host = command.host(),
                            output = %text.trim_end(),
                            "{}",
                            command.description()
                        ),
                        _ => info!(host = command.host(), "{}", command.description()),
                    }
                    reports.push(StepReport {
                        host: command.host().to_string(),
                        description: command.description().to_string(),
                        output,
                    });
                }
                Err(e) => {
                    error!(
                        host = command.host(),
                        description = command.description(),
                        "Step failed: {}",
                        e
                    );
                    self.state = PipelineState::Failed;
                    return Err(e);
                }
            }
        }

        self.state = PipelineState::Completed;
        Ok(reports)
    }
}

async fn run_step(
    executor: &dyn RemoteExecutor,
    command: &RemoteCommand,
    timeout: Duration,
) -> Result<Option<String>, RemoteError> {
    let result = match command {
        RemoteCommand::Shell {
            host, command_line, ..
        } => tokio::time::timeout(timeout, executor.run(host, command_line))
            .await
            .map(|r| r.map(Some)),
        RemoteCommand::CopyFile {
            host,
            content,
            path,
            mode,
            ..
        } => tokio::time::timeout(timeout, executor.copy(host, content, path, *mode))
            .await
            .map(|r| r.map(|_| None)),
    };

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(RemoteError::Execution {
            host: command.host().to_string(),
            description: command.description().to_string(),
            output: source.output().to_string(),
            source,
        }),
        Err(_) => Err(RemoteError::Timeout {
            host: command.host().to_string(),
            description: command.description().to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::command::FileMode;
    use crate::remote::recording::{IssuedCommand, RecordingExecutor};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn four_steps() -> Vec<RemoteCommand> {
        vec![
            RemoteCommand::shell("h1", "step-one", "First step"),
            RemoteCommand::shell("h1", "step-two", "Second step"),
            RemoteCommand::copy_file("h1", "x", "/tmp/three", FileMode::ReadOnly, "Third step"),
            RemoteCommand::shell("h1", "step-four", "Fourth step"),
        ]
    }

    #[tokio::test]
    async fn test_executes_in_order() {
        let executor = RecordingExecutor::new().respond("step-one", "one\n");
        let mut pipeline = CommandPipeline::new(four_steps(), true).unwrap();

        let reports = pipeline.execute(&executor, TIMEOUT).await.unwrap();

        assert_eq!(pipeline.state(), PipelineState::Completed);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].output.as_deref(), Some("one\n"));
        assert_eq!(reports[2].output, None);
        let targets: Vec<_> = executor.issued().iter().map(|c| c.target().to_string()).collect();
        assert_eq!(targets, vec!["step-one", "step-two", "/tmp/three", "step-four"]);
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let executor = RecordingExecutor::new().fail_on("step-two");
        let mut pipeline = CommandPipeline::new(four_steps(), false).unwrap();

        let err = pipeline.execute(&executor, TIMEOUT).await.unwrap_err();

        match err {
            RemoteError::Execution {
                description,
                host,
                output,
                ..
            } => {
                assert_eq!(description, "Second step");
                assert_eq!(host, "h1");
                assert!(output.contains("simulated failure"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(
            executor.issued(),
            vec![
                IssuedCommand::Run {
                    host: "h1".to_string(),
                    command_line: "step-one".to_string()
                },
                IssuedCommand::Run {
                    host: "h1".to_string(),
                    command_line: "step-two".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_timeout_stops_pipeline() {
        let executor = RecordingExecutor::new().hang_on("step-two");
        let mut pipeline = CommandPipeline::new(four_steps(), false).unwrap();

        let err = pipeline
            .execute(&executor, Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RemoteError::Timeout { ref description, .. } if description == "Second step"
        ));
        assert_eq!(executor.issued().len(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_runs_once() {
        let executor = RecordingExecutor::new();
        let mut pipeline = CommandPipeline::new(four_steps(), false).unwrap();
        pipeline.execute(&executor, TIMEOUT).await.unwrap();

        assert!(matches!(
            pipeline.execute(&executor, TIMEOUT).await,
            Err(RemoteError::AlreadyExecuted)
        ));
        assert_eq!(executor.issued().len(), 4);
    }

    #[test]
    fn test_rejects_invalid_command() {
        let commands = vec![RemoteCommand::shell("h1", "ls", "")];
        assert!(matches!(
            CommandPipeline::new(commands, false),
            Err(RemoteError::InvalidCommand(_))
        ));
    }
}
