//! Error handling for certificate issuance
//!
//! Every failure is terminal for the invocation: errors are propagated to the
//! caller unchanged and never retried.

use std::path::PathBuf;

use thiserror::Error;

/// Issuance errors, one variant per stage that can fail
#[derive(Debug, Error)]
pub enum PkiError {
    /// The key generator or its random source failed
    #[error("Couldn't generate a private key: {0}")]
    KeyGeneration(String),

    /// Drawing a random serial number failed
    #[error("Failed to generate serial number: {0}")]
    SerialGeneration(String),

    /// The configured validity window cannot be represented
    #[error("Invalid validity period: {0}")]
    InvalidValidity(String),

    /// The SPIFFE identity is not a well-formed URI
    #[error("Invalid SPIFFE id {uri:?}: {reason}")]
    InvalidIdentityUri {
        /// Candidate URI as built from the trust domain and workload id
        uri: String,
        /// Why it was rejected
        reason: String,
    },

    /// A CA file is missing or unreadable
    #[error("Couldn't read CA file {}: {source}", .path.display())]
    CaFileRead {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CA certificate or key could not be decoded
    #[error("Couldn't parse CA material: {0}")]
    CaParse(String),

    /// The supplied CA certificate does not assert CA basic constraints
    #[error("This is not a root certificate: {0}")]
    NotACa(String),

    /// The signing operation failed or the template/issuer pairing is invalid
    #[error("Couldn't sign certificate: {0}")]
    Signing(String),

    /// The freshly signed certificate failed to decode
    #[error("Generated certificate contains errors: {0}")]
    GeneratedCertificateInvalid(String),

    /// A certificate signature did not verify against the given issuer
    #[error("Certificate signature verification failed: {0}")]
    SignatureVerification(String),

    /// A directory of the TLS layout could not be created
    #[error("Couldn't create TLS directory {}: {source}", .path.display())]
    DirectoryCreate {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing a key or certificate file failed
    #[error("Couldn't write {}: {source}", .path.display())]
    FileWrite {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl PkiError {
    /// Create an `InvalidIdentityUri` error
    pub fn invalid_identity(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentityUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Name of the issuance stage that produced this error
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::KeyGeneration(_) => "key generation",
            Self::SerialGeneration(_)
            | Self::InvalidValidity(_)
            | Self::InvalidIdentityUri { .. } => "certificate template",
            Self::CaFileRead { .. } | Self::CaParse(_) | Self::NotACa(_) => "CA loading",
            Self::Signing(_) | Self::GeneratedCertificateInvalid(_) => "certificate signing",
            Self::SignatureVerification(_) => "signature verification",
            Self::DirectoryCreate { .. } | Self::FileWrite { .. } => "material store",
        }
    }
}

/// Result type for issuance operations
pub type Result<T> = std::result::Result<T, PkiError>;
