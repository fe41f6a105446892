use anyhow::{Context, Result};
use kthw_pki::PkiSettings;
use kthw_provision::install::ControllerOptions;
use kthw_provision::mesh::MeshSettings;
use kthw_provision::remote::{BootWaitPolicy, SshSettings};
use kthw_provision::{HostInventory, ServerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "kthw.toml";

/// Contents of `kthw.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub pki: PkiSettings,
    pub mesh: MeshSettings,
    pub ssh: SshSettings,
    pub boot: BootWaitPolicy,
    pub controller: ControllerOptions,
    pub servers: Vec<ServerConfig>,
}

impl ClusterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let cfg = toml::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn server(&self, name: &str) -> Result<&ServerConfig> {
        self.find(name)
            .with_context(|| format!("No server named {:?} in config", name))
    }
}

impl HostInventory for ClusterConfig {
    fn servers(&self) -> &[ServerConfig] {
        &self.servers
    }
}

/// `kthw.toml` in the working directory if present, else the per-user config dir
pub fn default_config_path() -> PathBuf {
    resolve_config_path(Path::new(DEFAULT_CONFIG_FILE), dirs::config_dir())
}

fn resolve_config_path(local: &Path, config_dir: Option<PathBuf>) -> PathBuf {
    if local.exists() {
        return local.to_path_buf();
    }
    match config_dir {
        Some(mut dir) => {
            dir.push("kthw");
            dir.push(DEFAULT_CONFIG_FILE);
            dir
        }
        None => local.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kthw_provision::Role;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[pki]
base_dir = "/var/lib/kthw/pki"

[ssh]
user = "ubuntu"

[[servers]]
name = "node-1"
public_ip = "203.0.113.1"
roles = ["etcd", "controller"]

[[servers]]
name = "node-2"
public_ip = "203.0.113.2"
private_ip = "10.0.0.2"
roles = ["worker"]
"#;

    #[test]
    fn test_parse_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kthw.toml");
        fs::write(&path, SAMPLE).unwrap();

        let cfg = ClusterConfig::load(&path).unwrap();

        assert_eq!(cfg.pki.base_dir, PathBuf::from("/var/lib/kthw/pki"));
        assert_eq!(cfg.pki.key_size, 2048);
        assert_eq!(cfg.ssh.user, "ubuntu");
        assert_eq!(cfg.ssh.port, 22);
        assert_eq!(cfg.mesh.listen_port, 51820);
        assert_eq!(cfg.servers.len(), 2);
        assert!(cfg.servers[0].has_role(Role::Controller));
        assert_eq!(cfg.servers[1].private_ip, Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(cfg.server("node-2").unwrap().name, "node-2");
        assert!(cfg.server("node-3").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("kthw.toml");
        fs::write(dir.path().join("seed.toml"), SAMPLE).unwrap();
        let mut cfg = ClusterConfig::load(&dir.path().join("seed.toml")).unwrap();
        cfg.servers[0].private_ip = Some(Ipv4Addr::new(10, 0, 0, 1));

        cfg.save(&path).unwrap();

        assert_eq!(ClusterConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_local_config_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("kthw.toml");
        let user_dir = dir.path().join("user");

        assert_eq!(
            resolve_config_path(&local, Some(user_dir.clone())),
            user_dir.join("kthw").join("kthw.toml")
        );
        assert_eq!(resolve_config_path(&local, None), local);

        fs::write(&local, SAMPLE).unwrap();
        assert_eq!(resolve_config_path(&local, Some(user_dir)), local);
    }

    #[test]
    fn test_missing_config_is_empty() {
        let dir = TempDir::new().unwrap();
        let cfg = ClusterConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.servers.is_empty());
    }
}
