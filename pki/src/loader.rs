use std::path::PathBuf;

use crate::ca::CertificateAuthority;
use crate::error::Result;
use crate::issued::{CertRole, IssuedCertificate};

/// Access to trust material that was generated earlier
pub trait CertificateLoader: Send + Sync {
    fn load_ca(&self) -> Result<CertificateAuthority>;

    fn load_certificate(&self, role: CertRole) -> Result<IssuedCertificate>;
}

/// Loads certificates from the PKI base directory
#[derive(Debug, Clone)]
pub struct FsCertificateLoader {
    base_dir: PathBuf,
}

impl FsCertificateLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl CertificateLoader for FsCertificateLoader {
    fn load_ca(&self) -> Result<CertificateAuthority> {
        CertificateAuthority::load(&self.base_dir)
    }

    fn load_certificate(&self, role: CertRole) -> Result<IssuedCertificate> {
        IssuedCertificate::load(&self.base_dir, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PkiError;
    use crate::issuer::CertificateIssuer;
    use crate::settings::PkiSettings;
    use tempfile::TempDir;

    #[test]
    fn test_loads_written_material() {
        let dir = TempDir::new().unwrap();
        let settings = PkiSettings::with_base_dir(dir.path());
        let ca = CertificateAuthority::generate(&settings).unwrap();
        ca.persist(dir.path()).unwrap();
        let client = CertificateIssuer::new(ca.clone(), &settings)
            .unwrap()
            .issue_etcd_client()
            .unwrap();
        client.write().unwrap();

        let loader = FsCertificateLoader::new(dir.path());
        assert_eq!(loader.load_ca().unwrap().cert_pem(), ca.cert_pem());
        assert_eq!(
            loader.load_certificate(CertRole::EtcdClient).unwrap().key_pem,
            client.key_pem
        );
    }

    #[test]
    fn test_missing_certificate() {
        let dir = TempDir::new().unwrap();
        let loader = FsCertificateLoader::new(dir.path());
        assert!(matches!(
            loader.load_certificate(CertRole::Admin),
            Err(PkiError::NotFound { .. })
        ));
    }
}
