//! Loading the root certificate authority from disk
//!
//! The CA is trusted as configured: the only check is that the certificate
//! asserts CA basic constraints. There is no chain validation and no expiry
//! check.

use std::path::Path;

use crate::certificate::parser::{parse_certificate_pem, CertificateDetails};
use crate::config::TlsLayout;
use crate::error::{PkiError, Result};
use crate::keys::KeyPair;

/// A CA certificate and private key ready to sign leaves
pub struct LoadedCa {
    issuer: rcgen::Issuer<'static, rcgen::KeyPair>,
    certificate_der: Vec<u8>,
    details: CertificateDetails,
}

impl LoadedCa {
    /// DER encoding of the CA certificate
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// Decoded fields of the CA certificate
    #[must_use]
    pub fn details(&self) -> &CertificateDetails {
        &self.details
    }

    pub(crate) fn issuer(&self) -> &rcgen::Issuer<'static, rcgen::KeyPair> {
        &self.issuer
    }
}

impl std::fmt::Debug for LoadedCa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedCa")
            .field("subject", &self.details.subject)
            .field("serial", &self.details.serial_hex())
            .finish_non_exhaustive()
    }
}

/// Load the root CA from the layout's `ca/root.pem` and `ca/root.key`
pub fn load_ca(layout: &TlsLayout) -> Result<LoadedCa> {
    load_ca_from(&layout.root_cert_path(), &layout.root_key_path())
}

/// Load a CA from explicit certificate and key paths
pub fn load_ca_from(cert_path: &Path, key_path: &Path) -> Result<LoadedCa> {
    let cert_pem = read_ca_file(cert_path)?;
    let key_pem = read_ca_file(key_path)?;

    let (certificate_der, details) = parse_certificate_pem(&cert_pem).map_err(|e| {
        PkiError::CaParse(format!("{}: {e}", cert_path.display()))
    })?;

    if !details.is_ca {
        return Err(PkiError::NotACa(format!(
            "{} ({}) does not assert CA basic constraints",
            cert_path.display(),
            details.subject
        )));
    }

    let key = KeyPair::from_pem(&key_pem)?;
    if key.public_key_raw() != details.public_key_bits.as_slice() {
        return Err(PkiError::CaParse(format!(
            "private key {} does not match CA certificate {}",
            key_path.display(),
            cert_path.display()
        )));
    }

    let signing_key = key.into_signing_key();
    let issuer = rcgen::Issuer::from_ca_cert_pem(&cert_pem, signing_key)
        .map_err(|e| PkiError::CaParse(format!("Failed to create CA issuer: {e}")))?;

    tracing::info!(
        subject = %details.subject,
        serial = %details.serial_hex(),
        not_after = %details.not_after,
        "Loaded root CA"
    );

    Ok(LoadedCa {
        issuer,
        certificate_der,
        details,
    })
}

fn read_ca_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PkiError::CaFileRead {
        path: path.to_path_buf(),
        source,
    })
}
