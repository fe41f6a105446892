use std::time::Duration;

use futures::future::join_all;
use tracing::info;

use super::HostOutcome;
use crate::error::InstallError;
use crate::inventory::{require_single, Role, ServerConfig};
use crate::remote::{CommandPipeline, RemoteCommand, RemoteExecutor, StepReport};

const PRINT_JOIN_COMMAND: &str = "kubeadm token create --print-join-command";

/// Join `worker` to the cluster run by `controller`
pub async fn join_worker(
    executor: &dyn RemoteExecutor,
    worker: &ServerConfig,
    controller: &ServerConfig,
    timeout: Duration,
) -> Result<Vec<StepReport>, InstallError> {
    if worker.has_role(Role::Controller) {
        return Err(InstallError::configuration(format!(
            "{} is a controller and cannot be installed as worker",
            worker.name
        )));
    }
    if !worker.has_role(Role::Worker) {
        return Err(InstallError::configuration(format!(
            "{} is not in role worker",
            worker.name
        )));
    }
    info!(worker = %worker.name, controller = %controller.name, "Joining worker");

    let mut fetch = CommandPipeline::new(
        vec![RemoteCommand::shell(
            controller.host(),
            PRINT_JOIN_COMMAND,
            "Get cluster join command from controller",
        )],
        false,
    )?;
    let join_command = fetch
        .execute(executor, timeout)
        .await?
        .into_iter()
        .find_map(|step| step.output)
        .map(|output| output.trim().to_string())
        .unwrap_or_default();
    if join_command.is_empty() {
        return Err(InstallError::configuration(format!(
            "controller {} returned no join command",
            controller.name
        )));
    }

    let mut join = CommandPipeline::new(
        vec![RemoteCommand::shell(
            worker.host(),
            join_command,
            "Running join cluster command on worker",
        )],
        false,
    )?;
    Ok(join.execute(executor, timeout).await?)
}

/// Join every worker of the inventory concurrently
pub async fn join_workers(
    executor: &dyn RemoteExecutor,
    servers: &[ServerConfig],
    timeout: Duration,
) -> Result<Vec<HostOutcome>, InstallError> {
    let controller = require_single(servers, Role::Controller)?;
    let workers: Vec<&ServerConfig> = servers
        .iter()
        .filter(|s| s.has_role(Role::Worker) && !s.has_role(Role::Controller))
        .collect();

    let results = join_all(
        workers
            .iter()
            .map(|worker| join_worker(executor, worker, controller, timeout)),
    )
    .await;

    Ok(workers
        .into_iter()
        .zip(results)
        .map(|(worker, result)| HostOutcome {
            name: worker.name.clone(),
            host: worker.host(),
            result,
        })
        .collect())
}
