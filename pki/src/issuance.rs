//! Root bootstrap and leaf issuance flows

use crate::authority::load_ca;
use crate::certificate::signing::{sign, IssuerContext, SignedCertificate};
use crate::certificate::template::{build_template_now, TemplateRequest};
use crate::config::{PkiConfig, TlsLayout};
use crate::error::Result;
use crate::keys::KeyPair;
use crate::store::{store_leaf, store_root, StoredMaterial};

/// Output of one issuance
#[derive(Debug, Clone)]
pub struct IssuedMaterial {
    /// The signed certificate
    pub certificate: SignedCertificate,
    /// Where the certificate and key were written
    pub stored: StoredMaterial,
}

/// Drives root bootstrap and leaf issuance against one layout
#[derive(Debug, Clone)]
pub struct Minter {
    config: PkiConfig,
    layout: TlsLayout,
}

impl Minter {
    /// Create a minter writing under `layout`
    pub fn new(config: PkiConfig, layout: TlsLayout) -> Self {
        Self { config, layout }
    }

    /// Issuance parameters
    #[must_use]
    pub fn config(&self) -> &PkiConfig {
        &self.config
    }

    /// Target layout
    #[must_use]
    pub fn layout(&self) -> &TlsLayout {
        &self.layout
    }

    /// Generate and store a self-signed root CA
    pub fn bootstrap_root(&self) -> Result<IssuedMaterial> {
        self.layout.prepare()?;

        let key = KeyPair::generate(self.config.key_algorithm)?;
        let template = build_template_now(TemplateRequest::Root, &self.config)?;
        let certificate = sign(&template, &IssuerContext::SelfSigned, &key)?;
        let stored = store_root(&self.layout, &certificate, &key)?;

        tracing::info!(
            subject = %certificate.details().subject,
            not_after = %certificate.details().not_after,
            path = %stored.certificate_path.display(),
            "Generated root CA"
        );

        Ok(IssuedMaterial {
            certificate,
            stored,
        })
    }

    /// Issue and store a leaf for `workload_id`, signed by the layout's CA
    pub fn issue_leaf(&self, workload_id: &str) -> Result<IssuedMaterial> {
        if workload_id.is_empty() {
            tracing::warn!(
                trust_domain = %self.config.trust_domain,
                "Empty workload id, issuing for the bare trust domain"
            );
        }

        let ca = load_ca(&self.layout)?;
        self.layout.prepare()?;

        let key = KeyPair::generate(self.config.key_algorithm)?;
        let template = build_template_now(TemplateRequest::Leaf { workload_id }, &self.config)?;
        let certificate = sign(&template, &IssuerContext::Authority(ca), &key)?;
        let stored = store_leaf(&self.layout, &certificate, &key)?;

        tracing::info!(
            identity = %template.identity().map(|id| id.as_str()).unwrap_or_default(),
            issuer = %certificate.details().issuer,
            not_after = %certificate.details().not_after,
            path = %stored.certificate_path.display(),
            "Issued leaf certificate"
        );

        Ok(IssuedMaterial {
            certificate,
            stored,
        })
    }
}
