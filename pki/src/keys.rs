//! Key pair generation and loading

use rcgen::SignatureAlgorithm;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{PkiError, Result};

const RSA_KEY_BITS: usize = 2048;

/// Asymmetric algorithm of generated keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    /// RSA 2048-bit, signs with SHA-256 and PKCS#1 v1.5
    #[default]
    Rsa2048,
    /// ECDSA on P-256, signs with SHA-256
    EcdsaP256,
}

impl KeyAlgorithm {
    /// Signature algorithm certificates signed by this key use
    #[must_use]
    pub fn signature_algorithm(self) -> &'static SignatureAlgorithm {
        match self {
            KeyAlgorithm::Rsa2048 => &rcgen::PKCS_RSA_SHA256,
            KeyAlgorithm::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyAlgorithm::Rsa2048 => f.write_str("RSA-2048"),
            KeyAlgorithm::EcdsaP256 => f.write_str("ECDSA-P256"),
        }
    }
}

/// A private/public signing key pair owned by one issuance
pub struct KeyPair {
    inner: rcgen::KeyPair,
}

impl KeyPair {
    /// Generate fresh key material from the OS random source
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        let inner = match algorithm {
            KeyAlgorithm::Rsa2048 => {
                let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|e| {
                    PkiError::KeyGeneration(format!("RSA key generation failed: {e}"))
                })?;
                let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(|e| {
                    PkiError::KeyGeneration(format!("Private key encoding failed: {e}"))
                })?;
                rcgen::KeyPair::from_pem_and_sign_algo(&pkcs8_pem, &rcgen::PKCS_RSA_SHA256)
                    .map_err(|e| PkiError::KeyGeneration(format!("Unusable RSA key: {e}")))?
            }
            KeyAlgorithm::EcdsaP256 => rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
                .map_err(|e| PkiError::KeyGeneration(format!("ECDSA key generation failed: {e}")))?,
        };

        tracing::debug!(%algorithm, "Generated key pair");
        Ok(Self { inner })
    }

    /// Load a private key from PEM
    ///
    /// Accepts PKCS#8 `PRIVATE KEY` blocks and PKCS#1 `RSA PRIVATE KEY` blocks.
    pub fn from_pem(key_pem: &str) -> Result<Self> {
        let block = pem::parse(key_pem)
            .map_err(|e| PkiError::CaParse(format!("Invalid private key PEM: {e}")))?;

        let inner = match block.tag() {
            "PRIVATE KEY" => rcgen::KeyPair::from_pem(key_pem)
                .map_err(|e| PkiError::CaParse(format!("Unsupported private key: {e}")))?,
            "RSA PRIVATE KEY" => {
                let private_key = RsaPrivateKey::from_pkcs1_der(block.contents()).map_err(|e| {
                    PkiError::CaParse(format!("Failed to parse PKCS1 private key: {e}"))
                })?;
                let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(|e| {
                    PkiError::CaParse(format!("Failed to encode PKCS8 private key: {e}"))
                })?;
                rcgen::KeyPair::from_pem_and_sign_algo(&pkcs8_pem, &rcgen::PKCS_RSA_SHA256)
                    .map_err(|e| PkiError::CaParse(format!("Unsupported private key: {e}")))?
            }
            other => {
                return Err(PkiError::CaParse(format!(
                    "Unexpected PEM block {other:?}, expected a private key"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// PKCS#8 DER encoding of the private key
    #[must_use]
    pub fn private_key_der(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.inner.serialize_der())
    }

    /// Raw public key, as carried in a certificate's SubjectPublicKeyInfo bit string
    #[must_use]
    pub fn public_key_raw(&self) -> &[u8] {
        rcgen::PublicKeyData::der_bytes(&self.inner)
    }

    /// Signature algorithm used when this key signs
    #[must_use]
    pub fn signature_algorithm(&self) -> &'static SignatureAlgorithm {
        self.inner.algorithm()
    }

    pub(crate) fn signing_key(&self) -> &rcgen::KeyPair {
        &self.inner
    }

    pub(crate) fn into_signing_key(self) -> rcgen::KeyPair {
        self.inner
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", self.inner.algorithm())
            .finish_non_exhaustive()
    }
}
