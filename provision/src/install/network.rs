use tracing::info;

use super::HostPlan;
use crate::error::InstallError;
use crate::mesh::{render_config, MeshConfig, WIREGUARD_CONFIG_PATH};
use crate::remote::{CommandPipeline, FileMode, RemoteCommand};

/// One plan per mesh host bringing up `wg0`
pub fn network_plans(mesh: &MeshConfig, verbose: bool) -> Result<Vec<HostPlan>, InstallError> {
    info!(hosts = mesh.hosts.len(), "Planning WireGuard network");

    mesh.hosts
        .iter()
        .map(|mesh_host| -> Result<HostPlan, InstallError> {
            let host = mesh_host.public_ip.to_string();
            let config = render_config(mesh_host)?;
            let commands = vec![
                RemoteCommand::copy_file(
                    &host,
                    config,
                    WIREGUARD_CONFIG_PATH,
                    FileMode::Private,
                    "Upload wireguard config file of device 'wg0'",
                ),
                RemoteCommand::shell(
                    &host,
                    "ufw allow in on wg0",
                    "Open firewall for private overlay network",
                ),
                RemoteCommand::shell(
                    &host,
                    "systemctl enable wg-quick@wg0 && systemctl restart wg-quick@wg0",
                    "Start wireguard device 'wg0'",
                ),
            ];
            Ok(HostPlan {
                name: mesh_host.name.clone(),
                host,
                pipeline: CommandPipeline::new(commands, verbose)?,
            })
        })
        .collect()
}
