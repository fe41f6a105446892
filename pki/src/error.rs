use std::path::PathBuf;

use thiserror::Error;

use crate::CertRole;

/// PKI errors
#[derive(Debug, Error)]
pub enum PkiError {
    /// Self-signing the root certificate failed
    #[error("failed to generate CA: {0}")]
    CaGeneration(#[source] rcgen::Error),

    /// The CA handed to an operation has no usable certificate or key
    #[error("CA is not usable: {0}")]
    InvalidCa(String),

    /// Private key generation failed
    #[error("failed to generate {key_bits}-bit private key: {reason}")]
    KeyGeneration { key_bits: usize, reason: String },

    /// The CA refused to sign a request
    #[error("failed to sign {role} certificate: {source}")]
    Signing {
        role: CertRole,
        #[source]
        source: rcgen::Error,
    },

    /// Trust material is never overwritten
    #[error("refusing to overwrite existing file {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("no key material at {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The loaded private key does not belong to the loaded certificate
    #[error("private key {} does not match certificate {}", key.display(), cert.display())]
    KeyMismatch { key: PathBuf, cert: PathBuf },

    #[error("unsupported key size {0} (expected 2048, 3072 or 4096)")]
    UnsupportedKeySize(usize),

    #[error("failed to parse certificate: {0}")]
    Parse(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for PKI operations
pub type Result<T> = std::result::Result<T, PkiError>;
