use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::codec;
use crate::error::Result;
use crate::inspect::inspect;

/// Fixed profile a leaf certificate is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertRole {
    EtcdServer,
    EtcdClient,
    Admin,
}

impl CertRole {
    /// File name without extension; the key uses `<stem>-key.pem`
    pub fn file_stem(self) -> &'static str {
        match self {
            CertRole::EtcdServer => "etcd",
            CertRole::EtcdClient => "etcd-client",
            CertRole::Admin => "admin",
        }
    }

    pub fn common_name(self) -> &'static str {
        match self {
            CertRole::EtcdServer => "etcd",
            CertRole::EtcdClient => "etcd-client",
            CertRole::Admin => "admin",
        }
    }

    /// Kubernetes RBAC maps `system:masters` to cluster-admin
    pub fn organization(self) -> &'static str {
        match self {
            CertRole::EtcdServer | CertRole::EtcdClient => "etcd",
            CertRole::Admin => "system:masters",
        }
    }
}

impl fmt::Display for CertRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CertRole::EtcdServer => "etcd-server",
            CertRole::EtcdClient => "etcd-client",
            CertRole::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Leaf certificate together with its private key
#[derive(Clone)]
pub struct IssuedCertificate {
    pub role: CertRole,
    pub key_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
    /// Subject alternative names the certificate was issued for
    pub hosts: Vec<String>,
    pub base_dir: PathBuf,
}

impl IssuedCertificate {
    pub fn key_path(&self) -> PathBuf {
        key_path(&self.base_dir, self.role)
    }

    pub fn cert_path(&self) -> PathBuf {
        cert_path(&self.base_dir, self.role)
    }

    /// Persist key and certificate; existing files are never replaced
    pub fn write(&self) -> Result<()> {
        codec::ensure_dir(&self.base_dir)?;
        codec::write_pair(
            &self.key_path(),
            &self.key_pem,
            &self.cert_path(),
            &self.cert_pem,
        )?;
        info!(role = %self.role, cert = %self.cert_path().display(), "Certificate written");
        Ok(())
    }

    /// Load a previously written certificate of `role`
    pub fn load(base_dir: &Path, role: CertRole) -> Result<Self> {
        let key_pem = codec::read(&key_path(base_dir, role))?;
        let cert_pem = codec::read(&cert_path(base_dir, role))?;

        let info = inspect(&cert_pem)?;
        let hosts = info
            .dns_sans
            .into_iter()
            .chain(info.ip_sans.iter().map(|ip| ip.to_string()))
            .collect();

        Ok(Self {
            role,
            key_pem,
            cert_pem,
            hosts,
            base_dir: base_dir.to_path_buf(),
        })
    }
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("role", &self.role)
            .field("key", &"<redacted>")
            .field("cert_bytes", &self.cert_pem.len())
            .field("hosts", &self.hosts)
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

pub fn key_path(base_dir: &Path, role: CertRole) -> PathBuf {
    base_dir.join(format!("{}-key.pem", role.file_stem()))
}

pub fn cert_path(base_dir: &Path, role: CertRole) -> PathBuf {
    base_dir.join(format!("{}.pem", role.file_stem()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layout() {
        let base = Path::new("pki");
        assert_eq!(key_path(base, CertRole::Admin), base.join("admin-key.pem"));
        assert_eq!(cert_path(base, CertRole::Admin), base.join("admin.pem"));
        assert_eq!(key_path(base, CertRole::EtcdServer), base.join("etcd-key.pem"));
        assert_eq!(cert_path(base, CertRole::EtcdClient), base.join("etcd-client.pem"));
    }

    #[test]
    fn test_admin_is_cluster_admin() {
        assert_eq!(CertRole::Admin.organization(), "system:masters");
    }
}
