use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use kthw_pki::{CertificateAuthority, CertificateIssuer, FsCertificateLoader, PkiSettings};
use kthw_provision::{Role, ServerConfig};
use tempfile::TempDir;

/// Get the path to a compiled binary in the target directory
fn cargo_bin(name: &str) -> PathBuf {
    // Look for the binary in target/debug (standard cargo test location)
    let mut path = std::env::current_exe()
        .expect("Failed to get current exe")
        .parent()
        .expect("No parent")
        .parent()
        .expect("No grandparent")
        .to_path_buf();
    path.push(name);
    if path.exists() {
        return path;
    }

    // Fallback: try target/debug directly
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // integration-tests -> workspace root
    path.push("target");
    path.push("debug");
    path.push(name);
    if path.exists() {
        return path;
    }

    panic!(
        "Binary '{}' not found. Run `cargo build --workspace` first.",
        name
    );
}

/// Run the `kthw` binary against a config file
pub fn kthw(config: &Path, args: &[&str]) -> Output {
    Command::new(cargo_bin("kthw"))
        .arg("--config")
        .arg(config)
        .args(["--log-level", "warn"])
        .args(args)
        .output()
        .expect("Failed to run kthw")
}

/// CA persisted in a temporary PKI directory
pub struct TestPki {
    pub settings: PkiSettings,
    pub ca: CertificateAuthority,
    _temp_dir: TempDir,
}

impl TestPki {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = PkiSettings::with_base_dir(temp_dir.path().join("pki"));
        let ca = CertificateAuthority::generate(&settings).expect("Failed to generate CA");
        ca.persist(&settings.base_dir).expect("Failed to persist CA");
        Self {
            settings,
            ca,
            _temp_dir: temp_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.settings.base_dir
    }

    pub fn issuer(&self) -> CertificateIssuer {
        CertificateIssuer::load(&self.settings).expect("Failed to load issuer")
    }

    pub fn loader(&self) -> FsCertificateLoader {
        FsCertificateLoader::new(self.base_dir())
    }
}

pub fn server(name: &str, last: u8, roles: &[Role]) -> ServerConfig {
    ServerConfig::new(name, IpAddr::V4(Ipv4Addr::new(198, 51, 100, last)))
        .with_roles(roles.iter().copied())
}

/// etcd, controller and two workers without overlay addresses
pub fn inventory() -> Vec<ServerConfig> {
    vec![
        server("etcd-1", 10, &[Role::Etcd]),
        server("controller-1", 11, &[Role::Controller]),
        server("worker-1", 12, &[Role::Worker]),
        server("worker-2", 13, &[Role::Worker]),
    ]
}
