//! Minimal PKI for a single-CA Kubernetes cluster.
//!
//! One self-signed root signs a fixed set of leaf certificates (etcd server,
//! etcd client, admin client). Material lives as `.pem` files in one base
//! directory and is never overwritten once written.

pub mod ca;
pub mod codec;
pub mod error;
pub mod inspect;
pub mod issued;
pub mod issuer;
mod keys;
pub mod loader;
pub mod settings;

pub use ca::CertificateAuthority;
pub use error::{PkiError, Result};
pub use inspect::{inspect, CertificateInfo};
pub use issued::{CertRole, IssuedCertificate};
pub use issuer::{CertificateGenerator, CertificateIssuer};
pub use keys::private_key_bits;
pub use loader::{CertificateLoader, FsCertificateLoader};
pub use settings::PkiSettings;
