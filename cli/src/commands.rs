use anyhow::{Context, Result};
use kthw_pki::{CertificateAuthority, CertificateIssuer, FsCertificateLoader};
use kthw_provision::install::{join_worker, ClusterInstaller};
use kthw_provision::inventory::{require_single, Role};
use kthw_provision::mesh::{render_config, MeshTopologyBuilder};
use kthw_provision::remote::SshExecutor;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::ClusterConfig;
use crate::{ClientRole, InstallTarget};

pub fn init_ca(cfg: &ClusterConfig) -> Result<()> {
    let ca = CertificateAuthority::generate(&cfg.pki).context("Failed to generate CA")?;
    ca.persist(&cfg.pki.base_dir)
        .with_context(|| format!("Failed to persist CA to {:?}", cfg.pki.base_dir))?;
    info!(
        "CA written to {:?}",
        CertificateAuthority::cert_path(&cfg.pki.base_dir)
    );
    Ok(())
}

pub fn issue(cfg: &ClusterConfig, role: ClientRole) -> Result<()> {
    let issuer = CertificateIssuer::load(&cfg.pki).context("Failed to load CA")?;
    let cert = match role {
        ClientRole::Admin => issuer.issue_admin_client(),
        ClientRole::EtcdClient => issuer.issue_etcd_client(),
    }
    .with_context(|| format!("Failed to issue {:?} certificate", role))?;
    cert.write()
        .with_context(|| format!("Failed to write {:?}", cert.cert_path()))?;
    info!("Certificate written to {:?}", cert.cert_path());
    Ok(())
}

pub fn render_mesh(cfg: &ClusterConfig, out_dir: &Path) -> Result<()> {
    let mesh = MeshTopologyBuilder::new(cfg.mesh.clone())
        .build_mesh(&cfg.servers)
        .context("Failed to build mesh")?;
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create dir {:?}", out_dir))?;

    for host in &mesh.hosts {
        let text = render_config(host)?;
        let path = out_dir.join(format!("{}.conf", host.name));
        fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?;
        info!(server = %host.name, address = %host.address(), "Wrote {:?}", path);
    }
    Ok(())
}

fn installer(cfg: &ClusterConfig, verbose: bool) -> ClusterInstaller {
    let executor = Arc::new(SshExecutor::new(cfg.ssh.clone()));
    ClusterInstaller::new(executor, cfg.ssh.command_timeout())
        .verbose(verbose)
        .controller_options(cfg.controller.clone())
        .boot_policy(cfg.boot.clone())
}

pub async fn wait_for_boot(cfg: &ClusterConfig) -> Result<()> {
    installer(cfg, false)
        .wait_for_boot(&cfg.servers)
        .await
        .context("Servers did not finish booting")?;
    Ok(())
}

pub async fn install(
    cfg: &mut ClusterConfig,
    config_path: &Path,
    target: InstallTarget,
    verbose: bool,
) -> Result<()> {
    let installer = installer(cfg, verbose);
    let loader = FsCertificateLoader::new(&cfg.pki.base_dir);

    match target {
        InstallTarget::Network => {
            let mut mesh = MeshTopologyBuilder::new(cfg.mesh.clone());
            installer
                .install_network(&mut cfg.servers, &mut mesh)
                .await
                .context("Failed to install network")?;
            cfg.save(config_path)?;
        }
        InstallTarget::Etcd => {
            let issuer = CertificateIssuer::load(&cfg.pki).context("Failed to load CA")?;
            installer
                .install_etcd(&cfg.servers, &issuer)
                .await
                .context("Failed to install etcd")?;
        }
        InstallTarget::Controller => {
            let issuer = CertificateIssuer::load(&cfg.pki).context("Failed to load CA")?;
            installer
                .install_controller(&cfg.servers, &loader, &issuer)
                .await
                .context("Failed to install controller")?;
        }
        InstallTarget::Worker { name } => {
            let worker = cfg.server(&name)?;
            let controller = require_single(&cfg.servers, Role::Controller)?;
            let executor = SshExecutor::new(cfg.ssh.clone());
            join_worker(&executor, worker, controller, cfg.ssh.command_timeout())
                .await
                .with_context(|| format!("Failed to join worker {}", name))?;
        }
        InstallTarget::All => {
            let issuer = CertificateIssuer::load(&cfg.pki).context("Failed to load CA")?;
            let mut mesh = MeshTopologyBuilder::new(cfg.mesh.clone());
            let result = installer
                .install_all(&mut cfg.servers, &mut mesh, &loader, &issuer)
                .await;
            // Overlay addresses are kept even when a later phase failed
            cfg.save(config_path)?;
            result.context("Failed to install cluster")?;
        }
    }
    Ok(())
}
