use rand::rngs::OsRng;
use rcgen::{KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

use crate::error::{PkiError, Result};

/// Generate an RSA key pair usable by rcgen for signing.
///
/// rcgen cannot generate RSA keys itself, so the key is produced by the `rsa`
/// crate and handed over as PKCS#8 PEM.
pub(crate) fn generate_rsa_key_pair(key_bits: usize) -> Result<KeyPair> {
    let key = RsaPrivateKey::new(&mut OsRng, key_bits).map_err(|e| PkiError::KeyGeneration {
        key_bits,
        reason: e.to_string(),
    })?;

    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| PkiError::KeyGeneration {
            key_bits,
            reason: format!("failed to encode key: {}", e),
        })?;

    KeyPair::from_pem_and_sign_algo(&pem, &PKCS_RSA_SHA256).map_err(|e| PkiError::KeyGeneration {
        key_bits,
        reason: format!("failed to load generated key: {}", e),
    })
}

/// Parse a PKCS#8 PEM private key for signing
pub(crate) fn parse_key_pair(pem: &[u8]) -> Result<KeyPair> {
    let pem = std::str::from_utf8(pem)
        .map_err(|_| PkiError::InvalidCa("private key is not PEM text".to_string()))?;
    KeyPair::from_pem_and_sign_algo(pem, &PKCS_RSA_SHA256)
        .map_err(|e| PkiError::InvalidCa(format!("failed to parse private key: {}", e)))
}

/// Modulus size in bits of a PKCS#8 PEM RSA private key
pub fn private_key_bits(pem: &[u8]) -> Result<usize> {
    let pem = std::str::from_utf8(pem)
        .map_err(|_| PkiError::Parse("private key is not PEM text".to_string()))?;
    let key = RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| PkiError::Parse(format!("failed to parse private key: {}", e)))?;
    Ok(key.size() * 8)
}
