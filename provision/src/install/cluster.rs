use std::sync::Arc;
use std::time::Duration;

use kthw_pki::{CertificateGenerator, CertificateLoader};
use rand::RngCore;
use tracing::info;

use super::{
    controller_plan, ensure_success, etcd_plan, join_workers, network_plans, run_plans,
    ControllerOptions, HostOutcome, HostPlan,
};
use crate::error::InstallError;
use crate::inventory::{require_single, validate, Role, ServerConfig};
use crate::mesh::{MeshConfig, MeshTopologyBuilder};
use crate::remote::{wait_for_all, BootWaitPolicy, RemoteExecutor};

/// Runs the installation phases against one executor
pub struct ClusterInstaller {
    executor: Arc<dyn RemoteExecutor>,
    timeout: Duration,
    verbose: bool,
    options: ControllerOptions,
    boot: BootWaitPolicy,
}

impl ClusterInstaller {
    pub fn new(executor: Arc<dyn RemoteExecutor>, timeout: Duration) -> Self {
        Self {
            executor,
            timeout,
            verbose: false,
            options: ControllerOptions::default(),
            boot: BootWaitPolicy::default(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn controller_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn boot_policy(mut self, boot: BootWaitPolicy) -> Self {
        self.boot = boot;
        self
    }

    /// Wait until every server finished its first boot
    pub async fn wait_for_boot(&self, servers: &[ServerConfig]) -> Result<(), InstallError> {
        let hosts = servers.iter().map(ServerConfig::host).collect();
        for (_, result) in wait_for_all(self.executor.clone(), hosts, self.boot.clone()).await {
            result?;
        }
        Ok(())
    }

    /// Build the mesh, bring up `wg0` everywhere and record overlay addresses
    pub async fn install_network<R: RngCore>(
        &self,
        servers: &mut [ServerConfig],
        mesh: &mut MeshTopologyBuilder<R>,
    ) -> Result<MeshConfig, InstallError> {
        validate(servers)?;
        let config = mesh.build_mesh(servers)?;
        let plans = network_plans(&config, self.verbose)?;
        self.run(plans).await?;
        config.apply_to(servers);
        Ok(config)
    }

    pub async fn install_etcd(
        &self,
        servers: &[ServerConfig],
        certs: &dyn CertificateGenerator,
    ) -> Result<(), InstallError> {
        let plan = etcd_plan(servers, certs, self.verbose)?;
        self.run(vec![plan]).await.map(|_| ())
    }

    pub async fn install_controller(
        &self,
        servers: &[ServerConfig],
        loader: &dyn CertificateLoader,
        generator: &dyn CertificateGenerator,
    ) -> Result<(), InstallError> {
        let plan = controller_plan(servers, loader, generator, &self.options, self.verbose)?;
        self.run(vec![plan]).await.map(|_| ())
    }

    pub async fn install_workers(
        &self,
        servers: &[ServerConfig],
    ) -> Result<Vec<HostOutcome>, InstallError> {
        let outcomes = join_workers(self.executor.as_ref(), servers, self.timeout).await?;
        ensure_success(&outcomes)?;
        Ok(outcomes)
    }

    /// Every phase in order; role requirements are checked before anything runs
    pub async fn install_all<R: RngCore>(
        &self,
        servers: &mut [ServerConfig],
        mesh: &mut MeshTopologyBuilder<R>,
        loader: &dyn CertificateLoader,
        generator: &dyn CertificateGenerator,
    ) -> Result<MeshConfig, InstallError> {
        validate(servers)?;
        require_single(servers, Role::Etcd)?;
        require_single(servers, Role::Controller)?;

        self.wait_for_boot(servers).await?;
        let config = self.install_network(servers, mesh).await?;
        self.install_etcd(servers, generator).await?;
        self.install_controller(servers, loader, generator).await?;
        self.install_workers(servers).await?;
        info!(servers = servers.len(), "Cluster installed");
        Ok(config)
    }

    async fn run(&self, plans: Vec<HostPlan>) -> Result<Vec<HostOutcome>, InstallError> {
        let outcomes = run_plans(self.executor.clone(), plans, self.timeout).await;
        ensure_success(&outcomes)?;
        Ok(outcomes)
    }
}
