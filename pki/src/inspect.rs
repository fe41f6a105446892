//! Read-only view of a PEM certificate.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use x509_parser::extensions::GeneralName;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

use crate::error::{PkiError, Result};

/// Fields of a certificate relevant to this PKI
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub common_name: Option<String>,
    pub organizations: Vec<String>,
    /// RSA modulus size in bits
    pub key_bits: usize,
    /// Raw subject public key (PKCS#1 for RSA)
    pub public_key: Vec<u8>,
    pub is_ca: bool,
    pub path_len: Option<u32>,
    pub dns_sans: Vec<String>,
    pub ip_sans: Vec<IpAddr>,
    /// Unix timestamps
    pub not_before: i64,
    pub not_after: i64,
}

/// Parse a PEM certificate
pub fn inspect(pem: &[u8]) -> Result<CertificateInfo> {
    let (_, pem) =
        parse_x509_pem(pem).map_err(|e| PkiError::Parse(format!("invalid PEM: {}", e)))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| PkiError::Parse(format!("invalid certificate: {}", e)))?;

    let subject = cert.subject();
    let common_name = subject
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);
    let organizations = subject
        .iter_organization()
        .filter_map(|o| o.as_str().ok())
        .map(str::to_string)
        .collect();

    let key_bits = match cert.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => rsa.key_size(),
        Ok(_) => return Err(PkiError::Parse("certificate key is not RSA".to_string())),
        Err(e) => return Err(PkiError::Parse(format!("invalid public key: {}", e))),
    };
    let public_key = cert.public_key().subject_public_key.data.to_vec();

    let (is_ca, path_len) = match cert.basic_constraints() {
        Ok(Some(ext)) => (ext.value.ca, ext.value.path_len_constraint),
        Ok(None) => (false, None),
        Err(e) => return Err(PkiError::Parse(format!("invalid basic constraints: {}", e))),
    };

    let mut dns_sans = Vec::new();
    let mut ip_sans = Vec::new();
    if let Ok(Some(ext)) = cert.subject_alternative_name() {
        for name in &ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => dns_sans.push(dns.to_string()),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_bytes(bytes) {
                        ip_sans.push(ip);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(CertificateInfo {
        common_name,
        organizations,
        key_bits,
        public_key,
        is_ca,
        path_len,
        dns_sans,
        ip_sans,
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
    })
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes)
            .ok()
            .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}
