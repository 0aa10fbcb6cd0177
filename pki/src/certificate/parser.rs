//! Certificate decoding
//!
//! Decodes DER/PEM certificates back into the logical fields the templates
//! are built from. Used for the post-signing self-check, for CA validation
//! and for signature verification.

use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

use super::template::{ExtendedKeyUsage, KeyUsage};
use crate::error::{PkiError, Result};

/// PEM block type of certificates
pub const CERTIFICATE_PEM_TAG: &str = "CERTIFICATE";

/// Why a certificate could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid PEM
    #[error("Failed to parse PEM: {0}")]
    Pem(String),
    /// PEM block of some other type
    #[error("Unexpected PEM block {0:?}, expected CERTIFICATE")]
    UnexpectedPemTag(String),
    /// Not a valid X.509 certificate
    #[error("X.509 parsing failed: {0}")]
    X509(String),
    /// Data left over after the certificate
    #[error("{0} trailing bytes after certificate")]
    TrailingData(usize),
}

/// Logical fields of a decoded certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    /// Subject DN in RFC 4514 form
    pub subject: String,
    /// Issuer DN in RFC 4514 form
    pub issuer: String,
    /// DER encoding of the subject name
    pub subject_der: Vec<u8>,
    /// DER encoding of the issuer name
    pub issuer_der: Vec<u8>,
    /// First organization attribute of the subject
    pub organization: Option<String>,
    /// Serial number, big-endian without leading zero bytes
    pub serial: Vec<u8>,
    /// Start of validity
    pub not_before: OffsetDateTime,
    /// End of validity
    pub not_after: OffsetDateTime,
    /// Basic constraints CA flag
    pub is_ca: bool,
    /// Key usage bits present
    pub key_usage: Vec<KeyUsage>,
    /// Extended key usage purposes present
    pub extended_key_usage: Vec<ExtendedKeyUsage>,
    /// URI subject alternative names
    pub uris: Vec<String>,
    /// DER SubjectPublicKeyInfo
    pub public_key_der: Vec<u8>,
    /// Contents of the SubjectPublicKeyInfo bit string
    pub public_key_bits: Vec<u8>,
    /// Signature algorithm OID
    pub signature_algorithm: String,
}

impl CertificateDetails {
    /// Serial number as an integer, if it fits in 128 bits
    #[must_use]
    pub fn serial_u128(&self) -> Option<u128> {
        if self.serial.len() > 16 {
            return None;
        }
        Some(
            self.serial
                .iter()
                .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)),
        )
    }

    /// Serial number as colon separated hex
    #[must_use]
    pub fn serial_hex(&self) -> String {
        if self.serial.is_empty() {
            return "00".to_string();
        }
        self.serial
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Whether the certificate names itself as issuer
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.subject_der == self.issuer_der
    }

    /// Whether `[not_before, not_after]` lies within this certificate's validity
    #[must_use]
    pub fn covers(&self, not_before: OffsetDateTime, not_after: OffsetDateTime) -> bool {
        self.not_before <= not_before && not_after <= self.not_after
    }
}

/// Decode a DER certificate
pub fn parse_certificate_der(der: &[u8]) -> std::result::Result<CertificateDetails, DecodeError> {
    let (rest, cert) =
        X509Certificate::from_der(der).map_err(|e| DecodeError::X509(e.to_string()))?;
    if !rest.is_empty() {
        return Err(DecodeError::TrailingData(rest.len()));
    }

    extract_details(&cert)
}

/// Decode the first PEM certificate block, returning its DER and fields
pub fn parse_certificate_pem(
    pem_data: &str,
) -> std::result::Result<(Vec<u8>, CertificateDetails), DecodeError> {
    let block = pem::parse(pem_data).map_err(|e| DecodeError::Pem(e.to_string()))?;
    if block.tag() != CERTIFICATE_PEM_TAG {
        return Err(DecodeError::UnexpectedPemTag(block.tag().to_string()));
    }

    let der = block.into_contents();
    let details = parse_certificate_der(&der)?;
    Ok((der, details))
}

/// Check that `cert_der` was signed by the key of `issuer_der`
pub fn verify_issued_by(cert_der: &[u8], issuer_der: &[u8]) -> Result<()> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| PkiError::SignatureVerification(format!("Invalid certificate: {e}")))?;
    let (_, issuer) = X509Certificate::from_der(issuer_der)
        .map_err(|e| PkiError::SignatureVerification(format!("Invalid issuer certificate: {e}")))?;

    if cert.issuer().as_raw() != issuer.subject().as_raw() {
        return Err(PkiError::SignatureVerification(format!(
            "Issuer {} does not match {}",
            cert.issuer(),
            issuer.subject()
        )));
    }

    cert.verify_signature(Some(issuer.public_key()))
        .map_err(|e| PkiError::SignatureVerification(e.to_string()))
}

fn extract_details(
    cert: &X509Certificate<'_>,
) -> std::result::Result<CertificateDetails, DecodeError> {
    let extension_error = |e: x509_parser::error::X509Error| DecodeError::X509(e.to_string());

    let is_ca = cert
        .basic_constraints()
        .map_err(extension_error)?
        .is_some_and(|bc| bc.value.ca);

    let mut key_usage = Vec::new();
    if let Some(ku) = cert.key_usage().map_err(extension_error)? {
        let bits = [
            (ku.value.digital_signature(), KeyUsage::DigitalSignature),
            (ku.value.key_encipherment(), KeyUsage::KeyEncipherment),
            (ku.value.key_cert_sign(), KeyUsage::KeyCertSign),
            (ku.value.crl_sign(), KeyUsage::CrlSign),
        ];
        key_usage.extend(bits.into_iter().filter(|(set, _)| *set).map(|(_, u)| u));
    }

    let mut extended_key_usage = Vec::new();
    if let Some(eku) = cert.extended_key_usage().map_err(extension_error)? {
        if eku.value.server_auth {
            extended_key_usage.push(ExtendedKeyUsage::ServerAuth);
        }
        if eku.value.client_auth {
            extended_key_usage.push(ExtendedKeyUsage::ClientAuth);
        }
    }

    let uris = cert
        .subject_alternative_name()
        .map_err(extension_error)?
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::URI(uri) => Some((*uri).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let raw_serial = cert.raw_serial();
    let leading_zeros = raw_serial.iter().take_while(|b| **b == 0).count();

    Ok(CertificateDetails {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        subject_der: cert.subject().as_raw().to_vec(),
        issuer_der: cert.issuer().as_raw().to_vec(),
        organization: cert
            .subject()
            .iter_organization()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(str::to_string),
        serial: raw_serial[leading_zeros..].to_vec(),
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
        is_ca,
        key_usage,
        extended_key_usage,
        uris,
        public_key_der: cert.public_key().raw.to_vec(),
        public_key_bits: cert.public_key().subject_public_key.data.to_vec(),
        signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_rejected() {
        let err = parse_certificate_der(&[0x30, 0x03, 0x02, 0x01, 0x01]).expect_err("not X.509");
        assert!(matches!(err, DecodeError::X509(_)));
    }

    #[test]
    fn test_wrong_pem_tag_is_rejected() {
        let key_block = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![0u8; 8]));
        let err = parse_certificate_pem(&key_block).expect_err("not a certificate block");
        assert!(matches!(err, DecodeError::UnexpectedPemTag(tag) if tag == "PRIVATE KEY"));
    }

    #[test]
    fn test_serial_helpers() {
        let details = CertificateDetails {
            subject: String::new(),
            issuer: String::new(),
            subject_der: vec![1],
            issuer_der: vec![1],
            organization: None,
            serial: vec![0x01, 0xff],
            not_before: OffsetDateTime::UNIX_EPOCH,
            not_after: OffsetDateTime::UNIX_EPOCH,
            is_ca: false,
            key_usage: vec![],
            extended_key_usage: vec![],
            uris: vec![],
            public_key_der: vec![],
            public_key_bits: vec![],
            signature_algorithm: String::new(),
        };

        assert_eq!(details.serial_u128(), Some(0x01ff));
        assert_eq!(details.serial_hex(), "01:ff");
        assert!(details.is_self_issued());
    }
}
