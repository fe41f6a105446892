//! Installation plans: ordered remote commands per host, run host by host in
//! parallel.

pub mod addons;
pub mod cluster;
pub mod controller;
pub mod etcd;
pub mod network;
pub mod templates;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::error::InstallError;
use crate::remote::{CommandPipeline, RemoteExecutor, StepReport};

pub use cluster::ClusterInstaller;
pub use controller::{controller_plan, ControllerOptions};
pub use etcd::etcd_plan;
pub use network::network_plans;
pub use worker::{join_worker, join_workers};

pub const CA_CERT_PATH: &str = "/etc/kubernetes/pki/ca.crt";
pub const CA_KEY_PATH: &str = "/etc/kubernetes/pki/ca.key";
pub const ETCD_CERT_PATH: &str = "/etc/kubernetes/pki/etcd.crt";
pub const ETCD_KEY_PATH: &str = "/etc/kubernetes/pki/etcd.key";
pub const ETCD_CLIENT_CERT_PATH: &str = "/etc/kubernetes/pki/etcd-client.crt";
pub const ETCD_CLIENT_KEY_PATH: &str = "/etc/kubernetes/pki/etcd-client.key";
pub const ETCD_SERVICE_PATH: &str = "/etc/systemd/system/etcd.service";
pub const KUBEADM_CONFIG_PATH: &str = "/etc/kubernetes/kubeadm-controller.conf";

/// Commands for one host
#[derive(Debug)]
pub struct HostPlan {
    pub name: String,
    pub host: String,
    pub pipeline: CommandPipeline,
}

/// Result of one host's plan
#[derive(Debug)]
pub struct HostOutcome {
    pub name: String,
    pub host: String,
    pub result: Result<Vec<StepReport>, InstallError>,
}

impl HostOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every plan in its own task and wait for all of them
///
/// A failing host does not stop the others.
pub async fn run_plans(
    executor: Arc<dyn RemoteExecutor>,
    plans: Vec<HostPlan>,
    timeout: Duration,
) -> Vec<HostOutcome> {
    let handles: Vec<_> = plans
        .into_iter()
        .map(|plan| {
            let executor = executor.clone();
            let name = plan.name.clone();
            let host = plan.host.clone();
            let handle = tokio::spawn(async move {
                let mut pipeline = plan.pipeline;
                pipeline.execute(executor.as_ref(), timeout).await
            });
            (name, host, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, host, handle) in handles {
        let result = match handle.await {
            Ok(result) => result.map_err(InstallError::from),
            Err(e) => Err(InstallError::Remote(crate::error::RemoteError::Join {
                host: host.clone(),
                reason: e.to_string(),
            })),
        };
        match &result {
            Ok(steps) => info!(server = %name, %host, steps = steps.len(), "Plan completed"),
            Err(e) => error!(server = %name, %host, "Plan failed: {}", e),
        }
        outcomes.push(HostOutcome { name, host, result });
    }
    outcomes
}

/// Collapse outcomes into an error naming every failed server
pub fn ensure_success(outcomes: &[HostOutcome]) -> Result<(), InstallError> {
    let failed: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.is_success())
        .map(|o| o.name.clone())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(InstallError::HostsFailed(failed))
    }
}
