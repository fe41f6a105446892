use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::{PkiError, Result};

pub const DEFAULT_BASE_DIR: &str = "pki";
pub const DEFAULT_KEY_SIZE: usize = 2048;
/// One year
pub const DEFAULT_VALIDITY_HOURS: u32 = 8760;

const SUPPORTED_KEY_SIZES: [usize; 3] = [2048, 3072, 4096];

/// Settings shared by CA generation and leaf issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PkiSettings {
    /// Directory holding all `.pem` files
    pub base_dir: PathBuf,
    /// RSA modulus size in bits
    pub key_size: usize,
    pub validity_hours: u32,
}

impl PkiSettings {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn validity(&self) -> Duration {
        Duration::hours(i64::from(self.validity_hours))
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_KEY_SIZES.contains(&self.key_size) {
            return Err(PkiError::UnsupportedKeySize(self.key_size));
        }
        Ok(())
    }
}

impl Default for PkiSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            key_size: DEFAULT_KEY_SIZE,
            validity_hours: DEFAULT_VALIDITY_HOURS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PkiSettings::default();
        assert_eq!(settings.base_dir, PathBuf::from("pki"));
        assert_eq!(settings.key_size, 2048);
        assert_eq!(settings.validity(), Duration::hours(8760));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_weak_key_size() {
        let settings = PkiSettings {
            key_size: 1024,
            ..PkiSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(PkiError::UnsupportedKeySize(1024))
        ));
    }
}
