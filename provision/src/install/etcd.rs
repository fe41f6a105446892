use kthw_pki::{CertRole, CertificateGenerator};
use tracing::info;

use super::templates::etcd_service;
use super::{HostPlan, CA_CERT_PATH, ETCD_CERT_PATH, ETCD_KEY_PATH, ETCD_SERVICE_PATH};
use crate::error::InstallError;
use crate::inventory::{require_single, Role, ServerConfig};
use crate::remote::{CommandPipeline, FileMode, RemoteCommand};

pub const ETCD_VERSION: &str = "v3.3.12";

/// Single-node etcd on the one server in the etcd role
pub fn etcd_plan(
    servers: &[ServerConfig],
    certs: &dyn CertificateGenerator,
    verbose: bool,
) -> Result<HostPlan, InstallError> {
    let etcd = require_single(servers, Role::Etcd)?;
    let private_ip = etcd.require_private_ip()?.to_string();
    let host = etcd.host();
    info!(server = %etcd.name, %host, "Planning etcd installation");

    let cert = certs
        .etcd_server_certificate(&["localhost".to_string(), private_ip.clone()])
        .map_err(|source| InstallError::Certificate {
            role: CertRole::EtcdServer,
            source,
        })?;
    let unit = etcd_service(&etcd.name, &private_ip)?;

    let archive = format!("/tmp/etcd-{}.tar.gz", ETCD_VERSION);
    let commands = vec![
        RemoteCommand::copy_file(
            &host,
            cert.key_pem,
            ETCD_KEY_PATH,
            FileMode::Private,
            format!("Upload etcd private key to {}", ETCD_KEY_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            cert.cert_pem,
            ETCD_CERT_PATH,
            FileMode::ReadOnly,
            format!("Upload etcd certificate to {}", ETCD_CERT_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            certs.ca().cert_pem().to_vec(),
            CA_CERT_PATH,
            FileMode::ReadOnly,
            format!("Upload CA certificate to {}", CA_CERT_PATH),
        ),
        RemoteCommand::copy_file(
            &host,
            unit,
            ETCD_SERVICE_PATH,
            FileMode::ReadOnly,
            "Copy etcd systemd service to host",
        ),
        RemoteCommand::shell(
            &host,
            format!(
                "curl -L https://github.com/etcd-io/etcd/releases/download/{v}/etcd-{v}-linux-amd64.tar.gz -o {archive}",
                v = ETCD_VERSION,
                archive = archive
            ),
            "Download etcd binary",
        ),
        RemoteCommand::shell(
            &host,
            format!(
                "tar xzf {} -C /tmp && mv /tmp/etcd-{}*/etcd* /usr/local/bin/",
                archive, ETCD_VERSION
            ),
            "Untar etcd archive and copy to /usr/local/bin",
        ),
        RemoteCommand::shell(
            &host,
            "systemctl daemon-reload && systemctl enable etcd && systemctl restart etcd",
            "Enable and start etcd service",
        ),
    ];

    Ok(HostPlan {
        name: etcd.name.clone(),
        host,
        pipeline: CommandPipeline::new(commands, verbose)?,
    })
}
