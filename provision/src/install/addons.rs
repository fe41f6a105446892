use crate::remote::{FileMode, RemoteCommand};

const CALICO_RBAC_MANIFEST: &str = "https://docs.projectcalico.org/v3.3/getting-started/kubernetes/installation/hosted/rbac-kdd.yaml";
const CALICO_MANIFEST: &str = "https://docs.projectcalico.org/v3.3/getting-started/kubernetes/installation/hosted/kubernetes-datastore/calico-networking/1.7/calico.yaml";
/// Pod network hard-coded in the upstream Calico manifest
const CALICO_DEFAULT_POD_NETWORK: &str = "192.168.0.0/16";

const DASHBOARD_MANIFEST: &str = "https://raw.githubusercontent.com/kubernetes/dashboard/master/aio/deploy/recommended/kubernetes-dashboard.yaml";
const DASHBOARD_ADMIN_MANIFEST: &str = include_str!("../../manifests/dashboard-admin.yaml");
const DASHBOARD_ADMIN_PATH: &str = "/tmp/dashboard-admin.yaml";

/// Cluster add-on installed from the controller once kubeadm is done
pub trait AddOn {
    fn description(&self) -> &'static str;

    fn commands(&self, host: &str) -> Vec<RemoteCommand>;
}

pub struct CalicoNetworking {
    pod_subnet: String,
}

impl CalicoNetworking {
    pub fn new(pod_subnet: impl Into<String>) -> Self {
        Self {
            pod_subnet: pod_subnet.into(),
        }
    }
}

impl AddOn for CalicoNetworking {
    fn description(&self) -> &'static str {
        "Install Calico networking"
    }

    fn commands(&self, host: &str) -> Vec<RemoteCommand> {
        let download = format!(
            "curl {} -o /tmp/rbac-kdd.yaml && curl {} -o /tmp/calico.yaml",
            CALICO_RBAC_MANIFEST, CALICO_MANIFEST
        );
        let set_pod_network = format!(
            "sed -i 's/{}/{}/g' /tmp/calico.yaml",
            CALICO_DEFAULT_POD_NETWORK.replace('/', "\\/"),
            self.pod_subnet.replace('/', "\\/")
        );
        let apply = "kubectl apply -f /tmp/rbac-kdd.yaml && kubectl apply -f /tmp/calico.yaml";
        vec![RemoteCommand::shell(
            host,
            format!("{} && {} && {}", download, set_pod_network, apply),
            self.description(),
        )]
    }
}

/// Kubernetes dashboard plus a cluster-admin service account
pub struct KubernetesDashboard;

impl AddOn for KubernetesDashboard {
    fn description(&self) -> &'static str {
        "Install Kubernetes dashboard"
    }

    fn commands(&self, host: &str) -> Vec<RemoteCommand> {
        vec![
            RemoteCommand::copy_file(
                host,
                DASHBOARD_ADMIN_MANIFEST,
                DASHBOARD_ADMIN_PATH,
                FileMode::ReadOnly,
                "Copy dashboard admin manifest to cluster",
            ),
            RemoteCommand::shell(
                host,
                format!("kubectl apply -f {}", DASHBOARD_ADMIN_PATH),
                "Create dashboard admin user",
            ),
            RemoteCommand::shell(
                host,
                format!("kubectl apply -f {}", DASHBOARD_MANIFEST),
                self.description(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calico_rewrites_pod_network() {
        let commands = CalicoNetworking::new("10.100.0.0/16").commands("h1");
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            RemoteCommand::Shell { command_line, .. } => {
                assert!(command_line.contains("s/192.168.0.0\\/16/10.100.0.0\\/16/g"));
                assert!(command_line.ends_with("kubectl apply -f /tmp/calico.yaml"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_dashboard_uploads_embedded_manifest() {
        let commands = KubernetesDashboard.commands("h1");
        assert_eq!(commands.len(), 3);
        match &commands[0] {
            RemoteCommand::CopyFile { content, path, .. } => {
                assert_eq!(path, DASHBOARD_ADMIN_PATH);
                assert!(String::from_utf8_lossy(content).contains("name: cluster-admin"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        let descriptions: std::collections::HashSet<_> =
            commands.iter().map(|c| c.description()).collect();
        assert_eq!(descriptions.len(), 3);
    }
}
