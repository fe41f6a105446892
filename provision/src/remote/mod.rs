//! Remote command execution over a pluggable transport.

pub mod boot;
pub mod command;
pub mod executor;
pub mod pipeline;
pub mod recording;
pub mod ssh;

pub use boot::{wait_for_all, wait_for_boot, BootWaitPolicy, BOOT_FINISHED_MARKER};
pub use command::{FileMode, RemoteCommand};
pub use executor::RemoteExecutor;
pub use pipeline::{CommandPipeline, PipelineState, StepReport};
pub use recording::{IssuedCommand, RecordingExecutor};
pub use ssh::{SshExecutor, SshSettings};
