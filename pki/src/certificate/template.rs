//! Certificate template construction
//!
//! Root and leaf templates come out of one builder so the fields they share
//! (serial number, start of validity) are produced identically. The variants
//! only differ in lifetime and in the identity-bearing extensions, which live
//! on `LeafTemplateSpec` alone.

use rcgen::string::Ia5String;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SanType, SerialNumber,
};
use time::OffsetDateTime;

use crate::config::PkiConfig;
use crate::error::{PkiError, Result};
use crate::identity::SpiffeId;

/// Key usage bits this tool issues or inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    /// digitalSignature
    DigitalSignature,
    /// keyEncipherment
    KeyEncipherment,
    /// keyCertSign
    KeyCertSign,
    /// cRLSign
    CrlSign,
}

/// Extended key usage purposes this tool issues or inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedKeyUsage {
    /// id-kp-serverAuth
    ServerAuth,
    /// id-kp-clientAuth
    ClientAuth,
}

/// Key usages of every leaf certificate
pub const LEAF_KEY_USAGE: [KeyUsage; 2] = [KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment];

/// Extended key usages of every leaf certificate
pub const LEAF_EXTENDED_KEY_USAGE: [ExtendedKeyUsage; 2] =
    [ExtendedKeyUsage::ServerAuth, ExtendedKeyUsage::ClientAuth];

/// What kind of template to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRequest<'a> {
    /// Self-signed root CA
    Root,
    /// Workload leaf carrying the identity of `workload_id`
    Leaf {
        /// Normalised workload id, see [`crate::identity::workload_id_from_hostname`]
        workload_id: &'a str,
    },
}

/// Fields shared by root and leaf templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFields {
    /// Serial number, uniform in `[0, 2^128)`
    pub serial: u128,
    /// Subject organization
    pub organization: String,
    /// Start of validity
    pub not_before: OffsetDateTime,
    /// End of validity
    pub not_after: OffsetDateTime,
}

/// Template of a self-signed root CA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTemplateSpec {
    /// Serial, subject and validity
    pub fields: TemplateFields,
}

/// Template of a workload leaf certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTemplateSpec {
    /// Serial, subject and validity
    pub fields: TemplateFields,
    /// Identity placed in the URI subject alternative name
    pub identity: SpiffeId,
}

/// An unsigned certificate descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateTemplate {
    /// Root CA template
    Root(RootTemplateSpec),
    /// Leaf template
    Leaf(LeafTemplateSpec),
}

impl CertificateTemplate {
    /// Fields shared by both variants
    #[must_use]
    pub fn fields(&self) -> &TemplateFields {
        match self {
            CertificateTemplate::Root(root) => &root.fields,
            CertificateTemplate::Leaf(leaf) => &leaf.fields,
        }
    }

    /// Whether the certificate asserts CA basic constraints
    #[must_use]
    pub fn is_ca(&self) -> bool {
        matches!(self, CertificateTemplate::Root(_))
    }

    /// Identity URI, leaf only
    #[must_use]
    pub fn identity(&self) -> Option<&SpiffeId> {
        match self {
            CertificateTemplate::Root(_) => None,
            CertificateTemplate::Leaf(leaf) => Some(&leaf.identity),
        }
    }

    /// Key usage extension contents; empty means the extension is absent
    #[must_use]
    pub fn key_usage(&self) -> &'static [KeyUsage] {
        match self {
            CertificateTemplate::Root(_) => &[],
            CertificateTemplate::Leaf(_) => &LEAF_KEY_USAGE,
        }
    }

    /// Extended key usage extension contents; empty means the extension is absent
    #[must_use]
    pub fn extended_key_usage(&self) -> &'static [ExtendedKeyUsage] {
        match self {
            CertificateTemplate::Root(_) => &[],
            CertificateTemplate::Leaf(_) => &LEAF_EXTENDED_KEY_USAGE,
        }
    }

    /// Lower the template to `rcgen` certificate parameters
    pub fn to_params(&self) -> Result<CertificateParams> {
        let fields = self.fields();

        let mut params = CertificateParams::default();
        params.serial_number = Some(SerialNumber::from_slice(&fields.serial.to_be_bytes()));

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::OrganizationName, fields.organization.as_str());
        params.distinguished_name = distinguished_name;

        params.not_before = fields.not_before;
        params.not_after = fields.not_after;

        match self {
            CertificateTemplate::Root(_) => {
                params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            }
            CertificateTemplate::Leaf(leaf) => {
                params.is_ca = IsCa::ExplicitNoCa;
                params.key_usages = self.key_usage().iter().map(|u| u.purpose()).collect();
                params.extended_key_usages = self
                    .extended_key_usage()
                    .iter()
                    .map(|u| u.purpose())
                    .collect();

                let uri = Ia5String::try_from(leaf.identity.as_str()).map_err(|e| {
                    PkiError::invalid_identity(leaf.identity.as_str(), e.to_string())
                })?;
                params.subject_alt_names = vec![SanType::URI(uri)];
                params.use_authority_key_identifier_extension = true;
            }
        }

        Ok(params)
    }
}

impl KeyUsage {
    fn purpose(self) -> KeyUsagePurpose {
        match self {
            KeyUsage::DigitalSignature => KeyUsagePurpose::DigitalSignature,
            KeyUsage::KeyEncipherment => KeyUsagePurpose::KeyEncipherment,
            KeyUsage::KeyCertSign => KeyUsagePurpose::KeyCertSign,
            KeyUsage::CrlSign => KeyUsagePurpose::CrlSign,
        }
    }
}

impl ExtendedKeyUsage {
    fn purpose(self) -> ExtendedKeyUsagePurpose {
        match self {
            ExtendedKeyUsage::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsage::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
        }
    }
}

/// Build a template starting at `now`
pub fn build_template(
    request: TemplateRequest<'_>,
    config: &PkiConfig,
    now: OffsetDateTime,
) -> Result<CertificateTemplate> {
    let serial = random_serial()?;
    // X.509 times carry whole seconds only
    let not_before = now
        .replace_nanosecond(0)
        .map_err(|e| PkiError::InvalidValidity(e.to_string()))?;

    let template = match request {
        TemplateRequest::Root => CertificateTemplate::Root(RootTemplateSpec {
            fields: TemplateFields {
                serial,
                organization: config.root_organization(),
                not_before,
                not_after: valid_until(not_before, config.root_validity())?,
            },
        }),
        TemplateRequest::Leaf { workload_id } => {
            let identity = SpiffeId::new(&config.trust_domain, workload_id)?;
            CertificateTemplate::Leaf(LeafTemplateSpec {
                fields: TemplateFields {
                    serial,
                    organization: config.organization.clone(),
                    not_before,
                    not_after: valid_until(not_before, config.leaf_validity())?,
                },
                identity,
            })
        }
    };

    Ok(template)
}

/// Build a template starting at the current time
pub fn build_template_now(
    request: TemplateRequest<'_>,
    config: &PkiConfig,
) -> Result<CertificateTemplate> {
    build_template(request, config, OffsetDateTime::now_utc())
}

fn random_serial() -> Result<u128> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| PkiError::SerialGeneration(e.to_string()))?;
    Ok(u128::from_be_bytes(bytes))
}

fn valid_until(not_before: OffsetDateTime, validity: std::time::Duration) -> Result<OffsetDateTime> {
    time::Duration::try_from(validity)
        .ok()
        .and_then(|validity| not_before.checked_add(validity))
        .ok_or_else(|| PkiError::InvalidValidity(format!("{validity:?} from {not_before}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const FOUR_HOURS: time::Duration = time::Duration::hours(4);
    const TEN_YEARS: time::Duration = time::Duration::days(3650);

    #[test]
    fn test_leaf_template() {
        let config = PkiConfig::default();
        let template = build_template_now(TemplateRequest::Leaf { workload_id: "my-host" }, &config)
            .expect("leaf template");

        let fields = template.fields();
        assert_eq!(fields.not_after - fields.not_before, FOUR_HOURS);
        assert_eq!(fields.organization, "My Dev org");
        assert!(!template.is_ca());
        assert_eq!(template.key_usage(), &LEAF_KEY_USAGE);
        assert_eq!(template.extended_key_usage(), &LEAF_EXTENDED_KEY_USAGE);
        assert_eq!(
            template.identity().map(SpiffeId::as_str),
            Some("spiffe://local.dev/my-host")
        );
    }

    #[test]
    fn test_root_template() {
        let config = PkiConfig::default();
        let template = build_template_now(TemplateRequest::Root, &config).expect("root template");

        let fields = template.fields();
        assert_eq!(fields.not_after - fields.not_before, TEN_YEARS);
        assert_eq!(fields.organization, "My Dev org ROOT CA");
        assert!(template.is_ca());
        assert!(template.identity().is_none());
        assert!(template.key_usage().is_empty());
        assert!(template.extended_key_usage().is_empty());
    }

    #[test]
    fn test_not_before_is_the_given_instant() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
        let template = build_template(TemplateRequest::Root, &PkiConfig::default(), now)
            .expect("root template");

        assert_eq!(template.fields().not_before, now);
    }

    #[test]
    fn test_not_before_drops_sub_second_precision() {
        let whole = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
        let now = whole + time::Duration::milliseconds(500);

        let template = build_template(
            TemplateRequest::Leaf { workload_id: "api" },
            &PkiConfig::default(),
            now,
        )
        .expect("leaf template");

        let fields = template.fields();
        assert_eq!(fields.not_before, whole);
        assert_eq!(fields.not_after, whole + FOUR_HOURS);
    }

    #[test]
    fn test_invalid_workload_id_is_rejected() {
        let err = build_template_now(
            TemplateRequest::Leaf { workload_id: "my host" },
            &PkiConfig::default(),
        )
        .expect_err("space must be rejected");

        assert!(matches!(err, PkiError::InvalidIdentityUri { .. }));
    }

    #[test]
    fn test_serials_do_not_collide() {
        let config = PkiConfig::default();
        let serials: HashSet<u128> = (0..256)
            .map(|_| {
                build_template_now(TemplateRequest::Root, &config)
                    .expect("root template")
                    .fields()
                    .serial
            })
            .collect();

        assert_eq!(serials.len(), 256);
    }

    #[test]
    fn test_overflowing_validity_is_rejected() {
        let config = PkiConfig {
            root_validity_days: u64::MAX / (24 * 3600),
            ..PkiConfig::default()
        };

        let err = build_template_now(TemplateRequest::Root, &config).expect_err("overflow");
        assert!(matches!(err, PkiError::InvalidValidity(_)));
    }

    #[test]
    fn test_leaf_params_carry_identity() {
        let template = build_template_now(
            TemplateRequest::Leaf { workload_id: "api" },
            &PkiConfig::default(),
        )
        .expect("leaf template");

        let params = template.to_params().expect("params");
        assert_eq!(params.is_ca, IsCa::ExplicitNoCa);
        assert_eq!(params.subject_alt_names.len(), 1);
        assert!(params.use_authority_key_identifier_extension);
    }
}
