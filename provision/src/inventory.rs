//! Cluster inventory: the servers to provision and the roles they play.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::error::InstallError;

/// Role a server plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Etcd,
    Controller,
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Etcd => write!(f, "etcd"),
            Role::Controller => write!(f, "controller"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

/// One inventory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub public_ip: IpAddr,
    /// Overlay address, assigned once the mesh is built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, public_ip: IpAddr) -> Self {
        Self {
            name: name.into(),
            public_ip,
            private_ip: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_private_ip(mut self, private_ip: Ipv4Addr) -> Self {
        self.private_ip = Some(private_ip);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Address used to reach the host for remote commands
    pub fn host(&self) -> String {
        self.public_ip.to_string()
    }

    /// Overlay address, required once the network is installed
    pub fn require_private_ip(&self) -> Result<Ipv4Addr, InstallError> {
        self.private_ip.ok_or_else(|| {
            InstallError::configuration(format!(
                "server {} has no private IP; install the network first",
                self.name
            ))
        })
    }
}

/// Provider of inventory entries
pub trait HostInventory {
    fn servers(&self) -> &[ServerConfig];

    fn find(&self, name: &str) -> Option<&ServerConfig> {
        self.servers().iter().find(|s| s.name == name)
    }
}

impl HostInventory for Vec<ServerConfig> {
    fn servers(&self) -> &[ServerConfig] {
        self
    }
}

pub fn select_in_role(servers: &[ServerConfig], role: Role) -> Vec<&ServerConfig> {
    servers.iter().filter(|s| s.has_role(role)).collect()
}

/// The only server carrying `role`
pub fn require_single(servers: &[ServerConfig], role: Role) -> Result<&ServerConfig, InstallError> {
    match select_in_role(servers, role).as_slice() {
        [single] => Ok(single),
        found => Err(InstallError::configuration(format!(
            "expected exactly one {} server, found {}",
            role,
            found.len()
        ))),
    }
}

/// Names and public addresses must be unique across the inventory
pub fn validate(servers: &[ServerConfig]) -> Result<(), InstallError> {
    let mut names = HashSet::new();
    let mut addresses = HashSet::new();
    for server in servers {
        if server.name.is_empty() {
            return Err(InstallError::configuration("server name must not be empty"));
        }
        if !names.insert(server.name.as_str()) {
            return Err(InstallError::configuration(format!(
                "duplicate server name {}",
                server.name
            )));
        }
        if !addresses.insert(server.public_ip) {
            return Err(InstallError::configuration(format!(
                "duplicate public IP {}",
                server.public_ip
            )));
        }
    }
    Ok(())
}
