use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use ipnet::{Ipv4AddrRange, Ipv4Net};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::keys::{HostKeyPair, MeshKeyGenerator};
use crate::error::MeshError;
use crate::inventory::ServerConfig;

pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Overlay network parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    pub network: Ipv4Net,
    pub listen_port: u16,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            network: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 24),
            listen_port: DEFAULT_LISTEN_PORT,
        }
    }
}

/// Peer entry as seen by other hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub public_key: String,
    pub endpoint: String,
    pub allowed_ips: String,
}

#[derive(Debug, Clone)]
pub struct MeshHost {
    pub name: String,
    pub public_ip: IpAddr,
    pub private_ip: Ipv4Addr,
    pub prefix_len: u8,
    pub listen_port: u16,
    pub keys: HostKeyPair,
    pub peers: Vec<Peer>,
}

impl MeshHost {
    /// Interface address with the overlay prefix, e.g. `10.0.0.1/24`
    pub fn address(&self) -> String {
        format!("{}/{}", self.private_ip, self.prefix_len)
    }

    pub fn as_peer(&self) -> Peer {
        Peer {
            public_key: self.keys.public_key_base64(),
            endpoint: SocketAddr::new(self.public_ip, self.listen_port).to_string(),
            allowed_ips: format!("{}/32", self.private_ip),
        }
    }
}

/// Full mesh over every host of one build
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub network: Ipv4Net,
    pub hosts: Vec<MeshHost>,
}

impl MeshConfig {
    /// Overlay address assigned to each server
    pub fn assignments(&self) -> BTreeMap<String, Ipv4Addr> {
        self.hosts
            .iter()
            .map(|h| (h.name.clone(), h.private_ip))
            .collect()
    }

    /// Write the assigned overlay addresses back into inventory entries
    pub fn apply_to(&self, servers: &mut [ServerConfig]) {
        let assignments = self.assignments();
        for server in servers {
            if let Some(ip) = assignments.get(&server.name) {
                server.private_ip = Some(*ip);
            }
        }
    }
}

/// Sequential allocator over the host range of a network
struct AddressAllocator {
    network: Ipv4Net,
    range: Ipv4AddrRange,
}

impl AddressAllocator {
    fn new(network: Ipv4Net) -> Self {
        Self {
            network,
            range: network.hosts(),
        }
    }

    fn next(&mut self, host: &str) -> Result<Ipv4Addr, MeshError> {
        self.range
            .next()
            .ok_or_else(|| MeshError::AddressPoolExhausted {
                network: self.network,
                host: host.to_string(),
            })
    }
}

/// Builds a full WireGuard mesh over a set of servers
///
/// Every host peers with every other host, so the work grows with the
/// square of the cluster size. Clusters here are a handful of machines.
pub struct MeshTopologyBuilder<R = OsRng> {
    settings: MeshSettings,
    keys: MeshKeyGenerator<R>,
}

impl MeshTopologyBuilder<OsRng> {
    pub fn new(settings: MeshSettings) -> Self {
        Self {
            settings,
            keys: MeshKeyGenerator::new(),
        }
    }
}

impl<R: RngCore> MeshTopologyBuilder<R> {
    pub fn with_key_generator(settings: MeshSettings, keys: MeshKeyGenerator<R>) -> Self {
        Self { settings, keys }
    }

    pub fn build_mesh(&mut self, servers: &[ServerConfig]) -> Result<MeshConfig, MeshError> {
        info!(hosts = servers.len(), network = %self.settings.network, "Building mesh");

        let mut allocator = AddressAllocator::new(self.settings.network);
        let mut hosts = Vec::with_capacity(servers.len());
        for server in servers {
            let private_ip = allocator.next(&server.name)?;
            let keys = self.keys.generate()?;
            debug!(host = %server.name, %private_ip, "Assigned overlay address");
            hosts.push(MeshHost {
                name: server.name.clone(),
                public_ip: server.public_ip,
                private_ip,
                prefix_len: self.settings.network.prefix_len(),
                listen_port: self.settings.listen_port,
                keys,
                peers: Vec::new(),
            });
        }

        let projections: Vec<Peer> = hosts.iter().map(MeshHost::as_peer).collect();
        for host in &mut hosts {
            let own_key = host.keys.public_key_base64();
            host.peers = projections
                .iter()
                .filter(|peer| peer.public_key != own_key)
                .cloned()
                .collect();
        }

        Ok(MeshConfig {
            network: self.settings.network,
            hosts,
        })
    }
}
