use std::net::IpAddr;
use std::path::PathBuf;

use rcgen::{
    CertificateParams, CertificateSigningRequestParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::ca::{subject, CertificateAuthority};
use crate::error::{PkiError, Result};
use crate::issued::{CertRole, IssuedCertificate};
use crate::keys::{generate_rsa_key_pair, parse_key_pair};
use crate::settings::PkiSettings;

/// Source of leaf certificates for installation plans
pub trait CertificateGenerator: Send + Sync {
    /// CA every certificate of this generator chains to
    fn ca(&self) -> &CertificateAuthority;

    fn etcd_server_certificate(&self, hosts: &[String]) -> Result<IssuedCertificate>;

    fn etcd_client_certificate(&self) -> Result<IssuedCertificate>;

    fn admin_client_certificate(&self) -> Result<IssuedCertificate>;
}

/// Signs leaf certificates with a loaded CA using one fixed profile
pub struct CertificateIssuer {
    ca: CertificateAuthority,
    ca_key: KeyPair,
    ca_cert: rcgen::Certificate,
    key_size: usize,
    validity: Duration,
    base_dir: PathBuf,
}

impl CertificateIssuer {
    /// Parse the CA once and prepare the signing context
    ///
    /// Leaf certificates are valid for as long as the CA itself was issued for.
    pub fn new(ca: CertificateAuthority, settings: &PkiSettings) -> Result<Self> {
        settings.validate()?;

        let ca_key = parse_key_pair(ca.key_pem())?;
        let ca_cert_pem = std::str::from_utf8(ca.cert_pem())
            .map_err(|_| PkiError::InvalidCa("certificate is not PEM text".to_string()))?;
        let ca_cert = CertificateParams::from_ca_cert_pem(ca_cert_pem)
            .and_then(|params| params.self_signed(&ca_key))
            .map_err(|e| PkiError::InvalidCa(format!("failed to parse CA certificate: {}", e)))?;

        Ok(Self {
            validity: ca.validity(),
            ca,
            ca_key,
            ca_cert,
            key_size: settings.key_size,
            base_dir: settings.base_dir.clone(),
        })
    }

    /// Load the CA persisted in `settings.base_dir` and build an issuer from it
    pub fn load(settings: &PkiSettings) -> Result<Self> {
        let ca = CertificateAuthority::load(&settings.base_dir)?;
        Self::new(ca, settings)
    }

    pub fn ca(&self) -> &CertificateAuthority {
        &self.ca
    }

    /// Server certificate valid for every entry of `hosts`
    pub fn issue_etcd_server(&self, hosts: &[String]) -> Result<IssuedCertificate> {
        self.issue(CertRole::EtcdServer, hosts)
    }

    /// Client certificate for mutual TLS against etcd
    pub fn issue_etcd_client(&self) -> Result<IssuedCertificate> {
        self.issue(CertRole::EtcdClient, &[])
    }

    /// Client certificate granting cluster-admin through `system:masters`
    pub fn issue_admin_client(&self) -> Result<IssuedCertificate> {
        self.issue(CertRole::Admin, &[])
    }

    fn issue(&self, role: CertRole, hosts: &[String]) -> Result<IssuedCertificate> {
        info!(%role, ?hosts, "Issuing certificate");

        let sans = hosts
            .iter()
            .map(|host| subject_alt_name(host))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|source| PkiError::Signing { role, source })?;

        let mut request = CertificateParams::default();
        request.distinguished_name = subject(role.common_name(), role.organization());
        request.subject_alt_names = sans.clone();

        let key_pair = generate_rsa_key_pair(self.key_size)?;

        let csr_pem = request
            .serialize_request(&key_pair)
            .and_then(|csr| csr.pem())
            .map_err(|source| PkiError::Signing { role, source })?;
        let mut csr = CertificateSigningRequestParams::from_pem(&csr_pem)
            .map_err(|source| PkiError::Signing { role, source })?;

        // The profile is decided here, not by the request
        csr.params.distinguished_name = request.distinguished_name;
        csr.params.subject_alt_names = sans;
        csr.params.is_ca = IsCa::NoCa;
        csr.params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        csr.params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let now = OffsetDateTime::now_utc();
        csr.params.not_before = now;
        csr.params.not_after = now + self.validity;

        let cert = csr
            .signed_by(&self.ca_cert, &self.ca_key)
            .map_err(|source| PkiError::Signing { role, source })?;

        debug!(%role, "Certificate signed");
        Ok(IssuedCertificate {
            role,
            key_pem: key_pair.serialize_pem().into_bytes(),
            cert_pem: cert.pem().into_bytes(),
            hosts: hosts.to_vec(),
            base_dir: self.base_dir.clone(),
        })
    }
}

impl CertificateGenerator for CertificateIssuer {
    fn ca(&self) -> &CertificateAuthority {
        &self.ca
    }

    fn etcd_server_certificate(&self, hosts: &[String]) -> Result<IssuedCertificate> {
        self.issue_etcd_server(hosts)
    }

    fn etcd_client_certificate(&self) -> Result<IssuedCertificate> {
        self.issue_etcd_client()
    }

    fn admin_client_certificate(&self) -> Result<IssuedCertificate> {
        self.issue_admin_client()
    }
}

fn subject_alt_name(host: &str) -> std::result::Result<SanType, rcgen::Error> {
    match host.parse::<IpAddr>() {
        Ok(ip) => Ok(SanType::IpAddress(ip)),
        Err(_) => Ok(SanType::DnsName(host.to_string().try_into()?)),
    }
}
