use kthw_pki::{CertRole, CertificateGenerator, CertificateLoader};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::addons::{AddOn, CalicoNetworking, KubernetesDashboard};
use super::templates::{kubeadm_controller_config, KubeadmParams};
use super::{
    HostPlan, CA_CERT_PATH, CA_KEY_PATH, ETCD_CLIENT_CERT_PATH, ETCD_CLIENT_KEY_PATH,
    KUBEADM_CONFIG_PATH,
};
use crate::error::InstallError;
use crate::inventory::{require_single, Role, ServerConfig};
use crate::remote::{CommandPipeline, FileMode, RemoteCommand};

/// Tunables of the control plane installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerOptions {
    /// Remove the master taint so workloads can run on the controller
    pub run_pods_on_master: bool,
    pub kubernetes_version: String,
    pub pod_subnet: String,
    pub service_subnet: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            run_pods_on_master: true,
            kubernetes_version: "v1.14.0".to_string(),
            pod_subnet: "10.100.0.0/16".to_string(),
            service_subnet: "10.96.0.0/12".to_string(),
        }
    }
}

/// kubeadm control plane backed by the external etcd
pub fn controller_plan(
    servers: &[ServerConfig],
    loader: &dyn CertificateLoader,
    generator: &dyn CertificateGenerator,
    options: &ControllerOptions,
    verbose: bool,
) -> Result<HostPlan, InstallError> {
    let controller = require_single(servers, Role::Controller)?;
    let etcd = require_single(servers, Role::Etcd)?;
    let etcd_endpoint = format!("https://{}:2379", etcd.require_private_ip()?);
    let host = controller.host();
    info!(server = %controller.name, %host, %etcd_endpoint, "Planning controller installation");

    let ca = loader.load_ca().map_err(InstallError::Ca)?;
    let etcd_client = generator
        .etcd_client_certificate()
        .map_err(|source| InstallError::Certificate {
            role: CertRole::EtcdClient,
            source,
        })?;
    let kubeadm_config = kubeadm_controller_config(&KubeadmParams {
        node_name: controller.name.clone(),
        public_ip: host.clone(),
        etcd_endpoints: vec![etcd_endpoint],
        kubernetes_version: options.kubernetes_version.clone(),
        pod_subnet: options.pod_subnet.clone(),
        service_subnet: options.service_subnet.clone(),
    })?;

    let mut commands = vec![
        RemoteCommand::copy_file(
            &host,
            etcd_client.key_pem,
            ETCD_CLIENT_KEY_PATH,
            FileMode::Private,
            format!("Upload etcd client private key to {}", ETCD_CLIENT_KEY_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            etcd_client.cert_pem,
            ETCD_CLIENT_CERT_PATH,
            FileMode::ReadOnly,
            format!("Upload etcd client certificate to {}", ETCD_CLIENT_CERT_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            ca.cert_pem().to_vec(),
            CA_CERT_PATH,
            FileMode::ReadOnly,
            format!("Upload CA certificate to {}", CA_CERT_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            ca.key_pem().to_vec(),
            CA_KEY_PATH,
            FileMode::Private,
            format!("Upload CA private key to {}", CA_KEY_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            kubeadm_config,
            KUBEADM_CONFIG_PATH,
            FileMode::ReadOnly,
            "Copy kubeadm config",
        ),
        RemoteCommand::shell(
            &host,
            format!("kubeadm init --config {}", KUBEADM_CONFIG_PATH),
            "Install kubernetes cluster",
        ),
        RemoteCommand::shell(
            &host,
            "mkdir -p $HOME/.kube && cp -f /etc/kubernetes/admin.conf $HOME/.kube/config && chown $(id -u):$(id -g) $HOME/.kube/config",
            "Setup kubectl",
        ),
        RemoteCommand::shell(
            &host,
            format!(
                "ufw allow from {} to {} && ufw allow 6443",
                options.pod_subnet, host
            ),
            "Open firewall pod network -> public IP and :6443 -> public IP",
        ),
    ];

    if options.run_pods_on_master {
        commands.push(RemoteCommand::shell(
            &host,
            "kubectl taint nodes --all node-role.kubernetes.io/master-",
            "Untaint master, allow pod scheduling on master node",
        ));
    }

    let addons: [&dyn AddOn; 2] = [
        &CalicoNetworking::new(options.pod_subnet.clone()),
        &KubernetesDashboard,
    ];
    for addon in addons {
        commands.extend(addon.commands(&host));
    }

    Ok(HostPlan {
        name: controller.name.clone(),
        host,
        pipeline: CommandPipeline::new(commands, verbose)?,
    })
}
