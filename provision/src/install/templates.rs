use serde::Serialize;

use super::{CA_CERT_PATH, ETCD_CERT_PATH, ETCD_CLIENT_CERT_PATH, ETCD_CLIENT_KEY_PATH, ETCD_KEY_PATH};
use crate::error::InstallError;
use crate::templates;

const ETCD_SERVICE_TEMPLATE: &str = r#"[Unit]
Description=etcd
Documentation=https://github.com/etcd-io/etcd

[Service]
Type=notify
Restart=always
RestartSec=5
TimeoutStartSec=0
StartLimitInterval=0
ExecStart=/usr/local/bin/etcd \
  --name {{ node_name }} \
  --data-dir /var/lib/etcd \
  --listen-client-urls "https://{{ private_ip }}:2379,https://localhost:2379" \
  --advertise-client-urls "https://{{ private_ip }}:2379" \
  --initial-cluster "{{ node_name }}=http://localhost:2380" \
  --heartbeat-interval 200 \
  --election-timeout 5000 \
  --cert-file {{ cert_file }} \
  --key-file {{ key_file }} \
  --trusted-ca-file {{ ca_file }} \
  --client-cert-auth

[Install]
WantedBy=multi-user.target
"#;

const KUBEADM_CONTROLLER_TEMPLATE: &str = r#"apiVersion: kubeadm.k8s.io/v1beta1
kind: InitConfiguration
bootstrapTokens:
- groups:
  - system:bootstrappers:kubeadm:default-node-token
  ttl: 24h0m0s
  usages:
  - signing
  - authentication
localAPIEndpoint:
  advertiseAddress: {{ public_ip }}
  bindPort: 6443
nodeRegistration:
  name: {{ node_name }}
  taints:
  - effect: NoSchedule
    key: node-role.kubernetes.io/master
---
apiVersion: kubeadm.k8s.io/v1beta1
kind: ClusterConfiguration
clusterName: kubernetes
etcd:
  external:
    endpoints:
{% for endpoint in etcd_endpoints %}
    - {{ endpoint }}
{% endfor %}
    caFile: {{ ca_file }}
    certFile: {{ cert_file }}
    keyFile: {{ key_file }}
kubernetesVersion: {{ kubernetes_version }}
networking:
  dnsDomain: cluster.local
  podSubnet: "{{ pod_subnet }}"
  serviceSubnet: "{{ service_subnet }}"
"#;

#[derive(Serialize)]
struct EtcdServiceContext<'a> {
    node_name: &'a str,
    private_ip: String,
    cert_file: &'static str,
    key_file: &'static str,
    ca_file: &'static str,
}

/// systemd unit for a single-node etcd serving TLS on the overlay address
pub fn etcd_service(node_name: &str, private_ip: &str) -> Result<String, InstallError> {
    let context = EtcdServiceContext {
        node_name,
        private_ip: private_ip.to_string(),
        cert_file: ETCD_CERT_PATH,
        key_file: ETCD_KEY_PATH,
        ca_file: CA_CERT_PATH,
    };
    templates::render("etcd.service", ETCD_SERVICE_TEMPLATE, &context).map_err(|source| {
        InstallError::Render {
            artifact: "etcd.service",
            source,
        }
    })
}

/// Inputs of the kubeadm controller configuration
#[derive(Debug, Serialize)]
pub struct KubeadmParams {
    pub node_name: String,
    pub public_ip: String,
    pub etcd_endpoints: Vec<String>,
    pub kubernetes_version: String,
    pub pod_subnet: String,
    pub service_subnet: String,
}

#[derive(Serialize)]
struct KubeadmContext<'a> {
    #[serde(flatten)]
    params: &'a KubeadmParams,
    ca_file: &'static str,
    cert_file: &'static str,
    key_file: &'static str,
}

pub fn kubeadm_controller_config(params: &KubeadmParams) -> Result<String, InstallError> {
    let context = KubeadmContext {
        params,
        ca_file: CA_CERT_PATH,
        cert_file: ETCD_CLIENT_CERT_PATH,
        key_file: ETCD_CLIENT_KEY_PATH,
    };
    templates::render(
        "kubeadm-controller.conf",
        KUBEADM_CONTROLLER_TEMPLATE,
        &context,
    )
    .map_err(|source| InstallError::Render {
        artifact: "kubeadm-controller.conf",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etcd_service_uses_uploaded_material() {
        let unit = etcd_service("node-1", "10.0.0.1").unwrap();

        assert!(unit.contains("--name node-1 \\\n"));
        assert!(unit.contains("\"https://10.0.0.1:2379,https://localhost:2379\""));
        assert!(unit.contains("--cert-file /etc/kubernetes/pki/etcd.crt"));
        assert!(unit.contains("--key-file /etc/kubernetes/pki/etcd.key"));
        assert!(unit.contains("--trusted-ca-file /etc/kubernetes/pki/ca.crt"));
        assert!(unit.ends_with("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn test_kubeadm_config_lists_etcd_endpoints() {
        let params = KubeadmParams {
            node_name: "controller".to_string(),
            public_ip: "203.0.113.10".to_string(),
            etcd_endpoints: vec!["https://10.0.0.1:2379".to_string()],
            kubernetes_version: "v1.14.0".to_string(),
            pod_subnet: "10.100.0.0/16".to_string(),
            service_subnet: "10.96.0.0/12".to_string(),
        };
        let config = kubeadm_controller_config(&params).unwrap();

        assert!(config.contains("    endpoints:\n    - https://10.0.0.1:2379\n    caFile:"));
        assert!(config.contains("advertiseAddress: 203.0.113.10\n"));
        assert!(config.contains("certFile: /etc/kubernetes/pki/etcd-client.crt\n"));
        assert!(config.contains("podSubnet: \"10.100.0.0/16\""));
        assert!(config.contains("kubernetesVersion: v1.14.0\n"));
    }
}
