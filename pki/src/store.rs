//! Persisting key and certificate material
//!
//! Keys are written before certificates. If the certificate write fails the
//! key is left on disk without a matching certificate; the next run
//! overwrites both.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use pem::{EncodeConfig, LineEnding, Pem};

use crate::certificate::parser::CERTIFICATE_PEM_TAG;
use crate::certificate::signing::SignedCertificate;
use crate::config::TlsLayout;
use crate::error::{PkiError, Result};
use crate::keys::KeyPair;

/// PEM block type of stored private keys
pub const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

const DIR_MODE: u32 = 0o700;
const KEY_FILE_MODE: u32 = 0o600;
const CERT_FILE_MODE: u32 = 0o644;

/// Where a certificate and its key were written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMaterial {
    /// PEM certificate file
    pub certificate_path: PathBuf,
    /// PEM private key file
    pub private_key_path: PathBuf,
}

impl TlsLayout {
    /// Create the base directory and its `ca` and `client` sub-directories
    pub fn prepare(&self) -> Result<()> {
        create_dir(self.base_dir())?;
        for dir in self.subdirectories() {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

/// Write `key` to `key_path` and `cert` to `cert_path`
pub fn store(
    cert: &SignedCertificate,
    key: &KeyPair,
    cert_path: &Path,
    key_path: &Path,
) -> Result<StoredMaterial> {
    for path in [key_path, cert_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }
    }

    let key_der = key.private_key_der();
    let key_pem = zeroize::Zeroizing::new(encode_pem(PRIVATE_KEY_PEM_TAG, &key_der));
    write_file(key_path, key_pem.as_bytes(), KEY_FILE_MODE)?;
    write_file(cert_path, cert.to_pem().as_bytes(), CERT_FILE_MODE)?;

    tracing::debug!(
        certificate = %cert_path.display(),
        private_key = %key_path.display(),
        "Stored certificate material"
    );

    Ok(StoredMaterial {
        certificate_path: cert_path.to_path_buf(),
        private_key_path: key_path.to_path_buf(),
    })
}

/// Store a root CA at `ca/root.pem` and `ca/root.key`
pub fn store_root(
    layout: &TlsLayout,
    cert: &SignedCertificate,
    key: &KeyPair,
) -> Result<StoredMaterial> {
    store(cert, key, &layout.root_cert_path(), &layout.root_key_path())
}

/// Store a leaf at `client/client.pem` and `client/client-key.pem`
pub fn store_leaf(
    layout: &TlsLayout,
    cert: &SignedCertificate,
    key: &KeyPair,
) -> Result<StoredMaterial> {
    store(cert, key, &layout.leaf_cert_path(), &layout.leaf_key_path())
}

pub(crate) fn encode_pem(tag: &str, der: &[u8]) -> String {
    let block = Pem::new(tag, der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn create_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    builder
        .create(path)
        .map_err(|source| PkiError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        })
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let write_error = |source: std::io::Error| PkiError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(write_error)?;

    // mode only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(write_error)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    file.write_all(contents).map_err(write_error)?;
    file.sync_all().map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pem_uses_lf() {
        let encoded = encode_pem(CERTIFICATE_PEM_TAG, &[0u8; 100]);

        assert!(encoded.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(encoded.ends_with("-----END CERTIFICATE-----\n"));
        assert!(!encoded.contains('\r'));
    }

    #[test]
    fn test_write_file_truncates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("file.pem");

        write_file(&path, b"a much longer first version", KEY_FILE_MODE).expect("first write");
        write_file(&path, b"short", KEY_FILE_MODE).expect("second write");

        assert_eq!(fs::read(&path).expect("read back"), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_reset_on_existing_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("key.pem");
        fs::write(&path, b"old").expect("seed file");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).expect("chmod");

        write_file(&path, b"new", KEY_FILE_MODE).expect("write");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, KEY_FILE_MODE);
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_creates_private_directories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("temp dir");
        let layout = TlsLayout::new(dir.path().join("tls"));
        layout.prepare().expect("prepare");
        // idempotent
        layout.prepare().expect("prepare again");

        for sub in layout.subdirectories() {
            let mode = fs::metadata(&sub).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, DIR_MODE, "{}", sub.display());
        }
    }

    #[test]
    fn test_directory_create_error_names_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").expect("seed file");

        let err = create_dir(&blocker.join("ca")).expect_err("parent is a file");
        assert!(matches!(&err, PkiError::DirectoryCreate { path, .. } if path.ends_with("ca")));
        assert_eq!(err.stage(), "material store");
    }
}
