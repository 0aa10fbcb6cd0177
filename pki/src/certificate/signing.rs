//! Certificate signing
//!
//! Root templates are self-signed with the subject key; leaf templates are
//! signed by a loaded CA. The encoded result is decoded again before it is
//! handed out.

use crate::authority::LoadedCa;
use crate::error::{PkiError, Result};
use crate::keys::KeyPair;

use super::parser::{parse_certificate_der, CertificateDetails};
use super::template::CertificateTemplate;

/// Who signs a template
#[derive(Debug)]
pub enum IssuerContext {
    /// The subject key signs its own template
    SelfSigned,
    /// A CA loaded from disk signs the template
    Authority(LoadedCa),
}

/// A signed, re-decoded certificate
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    der: Vec<u8>,
    details: CertificateDetails,
}

impl SignedCertificate {
    /// DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Decoded fields
    #[must_use]
    pub fn details(&self) -> &CertificateDetails {
        &self.details
    }

    /// PEM encoding with a `CERTIFICATE` block
    #[must_use]
    pub fn to_pem(&self) -> String {
        crate::store::encode_pem(super::parser::CERTIFICATE_PEM_TAG, &self.der)
    }
}

/// Sign `template` for `subject_key` under `issuer`
pub fn sign(
    template: &CertificateTemplate,
    issuer: &IssuerContext,
    subject_key: &KeyPair,
) -> Result<SignedCertificate> {
    let params = template.to_params()?;

    let certificate = match (template, issuer) {
        (CertificateTemplate::Root(_), IssuerContext::SelfSigned) => params
            .self_signed(subject_key.signing_key())
            .map_err(|e| PkiError::Signing(format!("Self-signing root failed: {e}")))?,
        (CertificateTemplate::Leaf(leaf), IssuerContext::Authority(ca)) => {
            if !ca.details().covers(leaf.fields.not_before, leaf.fields.not_after) {
                tracing::warn!(
                    ca_not_before = %ca.details().not_before,
                    ca_not_after = %ca.details().not_after,
                    leaf_not_after = %leaf.fields.not_after,
                    "Leaf validity extends beyond the CA validity window"
                );
            }
            params
                .signed_by(subject_key.signing_key(), ca.issuer())
                .map_err(|e| PkiError::Signing(format!("Signing by CA failed: {e}")))?
        }
        (CertificateTemplate::Root(_), IssuerContext::Authority(_)) => {
            return Err(PkiError::Signing(
                "Root template must be self-signed".to_string(),
            ));
        }
        (CertificateTemplate::Leaf(_), IssuerContext::SelfSigned) => {
            return Err(PkiError::Signing(
                "Leaf template requires a CA issuer".to_string(),
            ));
        }
    };

    let der = certificate.der().to_vec();

    // validate certificate is correct
    let details = parse_certificate_der(&der)
        .map_err(|e| PkiError::GeneratedCertificateInvalid(e.to_string()))?;

    tracing::debug!(
        subject = %details.subject,
        issuer = %details.issuer,
        serial = %details.serial_hex(),
        "Signed certificate"
    );

    Ok(SignedCertificate { der, details })
}
