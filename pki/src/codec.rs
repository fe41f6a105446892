//! Reading and writing key material on disk.
//!
//! Every write is exclusive: an existing file is an error, never a target.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{PkiError, Result};

/// Kind of material being written, which decides its file permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    PrivateKey,
    Certificate,
}

impl Material {
    #[cfg_attr(not(unix), allow(dead_code))]
    fn mode(self) -> u32 {
        match self {
            Material::PrivateKey => 0o600,
            Material::Certificate => 0o644,
        }
    }
}

/// Create `dir` and all of its parents if missing
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| PkiError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `bytes` to a file that must not exist yet
pub fn write_new(path: &Path, bytes: &[u8], material: Material) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(material.mode());
    }

    let mut file = options.open(path).map_err(|source| {
        if source.kind() == ErrorKind::AlreadyExists {
            PkiError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            PkiError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|source| PkiError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(path = %path.display(), ?material, "Wrote key material");
    Ok(())
}

/// Write a private key and its certificate as a unit.
///
/// Neither file is written if either already exists. If the certificate
/// cannot be written the freshly created key file is removed again.
pub fn write_pair(key_path: &Path, key: &[u8], cert_path: &Path, cert: &[u8]) -> Result<()> {
    for path in [key_path, cert_path] {
        if path.exists() {
            return Err(PkiError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
    }

    write_new(key_path, key, Material::PrivateKey)?;
    if let Err(e) = write_new(cert_path, cert, Material::Certificate) {
        let _ = fs::remove_file(key_path);
        return Err(e);
    }
    Ok(())
}

/// Read a file of key material
pub fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| PkiError::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_new_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ca-key.pem");

        write_new(&path, b"first", Material::PrivateKey).unwrap();
        let err = write_new(&path, b"second", Material::PrivateKey).unwrap_err();

        assert!(matches!(err, PkiError::AlreadyExists { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_write_pair_checks_both_targets_first() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("admin-key.pem");
        let cert = dir.path().join("admin.pem");
        fs::write(&cert, b"irrelevant").unwrap();

        let err = write_pair(&key, b"KEY", &cert, b"CERT").unwrap_err();

        assert!(matches!(err, PkiError::AlreadyExists { ref path } if path == &cert));
        assert!(!key.exists(), "key must not be written when the cert slot is taken");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read(&dir.path().join("missing.pem")).unwrap_err();
        assert!(matches!(err, PkiError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etcd-key.pem");
        write_new(&path, b"KEY", Material::PrivateKey).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
