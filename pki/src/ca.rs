use std::fmt;
use std::path::{Path, PathBuf};

use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyUsagePurpose};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::codec;
use crate::error::{PkiError, Result};
use crate::inspect::inspect;
use crate::keys::{generate_rsa_key_pair, parse_key_pair};
use crate::settings::PkiSettings;

pub const CA_KEY_FILE: &str = "ca-key.pem";
pub const CA_CERT_FILE: &str = "ca.pem";

const CA_COMMON_NAME: &str = "Kubernetes";
const CA_ORGANIZATION: &str = "Kubernetes";

/// Build the fixed subject used by every certificate of the cluster
pub(crate) fn subject(common_name: &str, organization: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, "DE");
    dn.push(DnType::StateOrProvinceName, "RLP");
    dn.push(DnType::LocalityName, "Mainz");
    dn.push(DnType::OrganizationName, organization);
    dn.push(DnType::OrganizationalUnitName, "Learning Kubernetes");
    dn.push(DnType::CommonName, common_name);
    dn
}

/// Root CA of the cluster.
///
/// Certificate and key always travel together; a value of this type is never
/// half initialised.
#[derive(Clone)]
pub struct CertificateAuthority {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    key_size: usize,
    validity: Duration,
}

impl CertificateAuthority {
    /// Generate a fresh self-signed root that may not sign intermediate CAs
    pub fn generate(settings: &PkiSettings) -> Result<Self> {
        settings.validate()?;
        info!(key_size = settings.key_size, "Generating CA certificate");

        let key_pair = generate_rsa_key_pair(settings.key_size)?;

        let mut params = CertificateParams::default();
        params.distinguished_name = subject(CA_COMMON_NAME, CA_ORGANIZATION);
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + settings.validity();

        let cert = params
            .self_signed(&key_pair)
            .map_err(PkiError::CaGeneration)?;

        Ok(Self {
            cert_pem: cert.pem().into_bytes(),
            key_pem: key_pair.serialize_pem().into_bytes(),
            key_size: settings.key_size,
            validity: settings.validity(),
        })
    }

    /// Wrap material that is already in memory
    pub fn from_parts(cert_pem: Vec<u8>, key_pem: Vec<u8>, key_size: usize) -> Result<Self> {
        if cert_pem.is_empty() || key_pem.is_empty() {
            return Err(PkiError::InvalidCa(
                "certificate and private key must both be present".to_string(),
            ));
        }
        Ok(Self {
            cert_pem,
            key_pem,
            key_size,
            validity: Duration::hours(i64::from(crate::settings::DEFAULT_VALIDITY_HOURS)),
        })
    }

    pub fn key_path(base_dir: &Path) -> PathBuf {
        base_dir.join(CA_KEY_FILE)
    }

    pub fn cert_path(base_dir: &Path) -> PathBuf {
        base_dir.join(CA_CERT_FILE)
    }

    /// Write private key and certificate below `base_dir`, never overwriting
    pub fn persist(&self, base_dir: &Path) -> Result<()> {
        codec::ensure_dir(base_dir)?;
        let key_path = Self::key_path(base_dir);
        let cert_path = Self::cert_path(base_dir);

        codec::write_pair(&key_path, &self.key_pem, &cert_path, &self.cert_pem)?;

        info!(
            key = %key_path.display(),
            cert = %cert_path.display(),
            "CA written"
        );
        Ok(())
    }

    /// Load a persisted CA and check that its key belongs to its certificate
    pub fn load(base_dir: &Path) -> Result<Self> {
        let key_path = Self::key_path(base_dir);
        let cert_path = Self::cert_path(base_dir);

        let key_pem = codec::read(&key_path)?;
        let cert_pem = codec::read(&cert_path)?;

        let info = inspect(&cert_pem)?;
        let key_pair = parse_key_pair(&key_pem)?;
        if key_pair.public_key_raw() != info.public_key.as_slice() {
            return Err(PkiError::KeyMismatch {
                key: key_path,
                cert: cert_path,
            });
        }

        debug!(base_dir = %base_dir.display(), key_size = info.key_bits, "Loaded CA");
        Ok(Self {
            cert_pem,
            key_pem,
            key_size: info.key_bits,
            validity: Duration::seconds(info.not_after - info.not_before),
        })
    }

    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }
}

impl fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("cert_bytes", &self.cert_pem.len())
            .field("key", &"<redacted>")
            .field("key_size", &self.key_size)
            .field("validity", &self.validity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::private_key_bits;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_ca() {
        let ca = CertificateAuthority::generate(&PkiSettings::default()).unwrap();

        let info = inspect(ca.cert_pem()).unwrap();
        assert_eq!(info.common_name.as_deref(), Some("Kubernetes"));
        assert!(info.is_ca);
        assert_eq!(info.path_len, Some(0));
        assert_eq!(info.key_bits, 2048);
        assert_eq!(private_key_bits(ca.key_pem()).unwrap(), 2048);
        assert_eq!(info.not_after - info.not_before, 8760 * 3600);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let ca = CertificateAuthority::generate(&PkiSettings::default()).unwrap();
        ca.persist(dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("ca-key.pem")).unwrap(), ca.key_pem());
        assert_eq!(fs::read(dir.path().join("ca.pem")).unwrap(), ca.cert_pem());

        let loaded = CertificateAuthority::load(dir.path()).unwrap();
        assert_eq!(loaded.cert_pem(), ca.cert_pem());
        assert_eq!(loaded.key_pem(), ca.key_pem());
        assert_eq!(loaded.key_size(), 2048);
        assert_eq!(loaded.validity(), Duration::hours(8760));
    }

    #[test]
    fn test_persist_twice_keeps_first_ca() {
        let dir = TempDir::new().unwrap();
        let first = CertificateAuthority::generate(&PkiSettings::default()).unwrap();
        let second = CertificateAuthority::generate(&PkiSettings::default()).unwrap();

        first.persist(dir.path()).unwrap();
        let err = second.persist(dir.path()).unwrap_err();

        assert!(matches!(err, PkiError::AlreadyExists { .. }));
        assert_eq!(fs::read(dir.path().join("ca-key.pem")).unwrap(), first.key_pem());
        assert_eq!(fs::read(dir.path().join("ca.pem")).unwrap(), first.cert_pem());
    }

    #[test]
    fn test_persist_does_not_override_existing_public_key() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ca.pem"), b"irrelevant").unwrap();

        let ca = CertificateAuthority::generate(&PkiSettings::default()).unwrap();
        assert!(matches!(
            ca.persist(dir.path()),
            Err(PkiError::AlreadyExists { .. })
        ));
        assert_eq!(fs::read(dir.path().join("ca.pem")).unwrap(), b"irrelevant");
        assert!(!dir.path().join("ca-key.pem").exists());
    }

    #[test]
    fn test_load_missing_ca() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            CertificateAuthority::load(dir.path()),
            Err(PkiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_rejects_foreign_key() {
        let dir = TempDir::new().unwrap();
        let ca = CertificateAuthority::generate(&PkiSettings::default()).unwrap();
        let other = CertificateAuthority::generate(&PkiSettings::default()).unwrap();

        fs::write(dir.path().join("ca.pem"), ca.cert_pem()).unwrap();
        fs::write(dir.path().join("ca-key.pem"), other.key_pem()).unwrap();

        assert!(matches!(
            CertificateAuthority::load(dir.path()),
            Err(PkiError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_from_parts_requires_both_halves() {
        assert!(matches!(
            CertificateAuthority::from_parts(b"CA_CERT".to_vec(), Vec::new(), 2048),
            Err(PkiError::InvalidCa(_))
        ));
        assert!(CertificateAuthority::from_parts(b"CA_CERT".to_vec(), b"CA_KEY".to_vec(), 2048).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let ca = CertificateAuthority::from_parts(b"CA_CERT".to_vec(), b"CA_KEY".to_vec(), 2048).unwrap();
        let rendered = format!("{:?}", ca);
        assert!(!rendered.contains("CA_KEY"));
    }
}
