//! X.509 issuance for development mTLS workloads
//!
//! Two flows share one engine:
//!
//! - root bootstrap: a self-signed CA, written once to `ca/root.pem` and
//!   `ca/root.key`
//! - leaf issuance: a short-lived certificate carrying a
//!   `spiffe://<trust-domain>/<workload-id>` URI, signed by that CA and
//!   written to `client/client.pem` and `client/client-key.pem`
//!
//! ```no_run
//! use mintls_pki::{resolve_workload_id, Minter, PkiConfig, TlsLayout};
//!
//! let minter = Minter::new(PkiConfig::default(), TlsLayout::new("/tmp/tls"));
//! let issued = minter.issue_leaf(&resolve_workload_id())?;
//! println!("{}", issued.certificate.to_pem());
//! # Ok::<(), mintls_pki::PkiError>(())
//! ```

pub mod authority;
pub mod certificate;
pub mod config;
pub mod error;
pub mod identity;
pub mod issuance;
pub mod keys;
pub mod store;

pub use authority::{load_ca, load_ca_from, LoadedCa};
pub use certificate::{
    build_template, build_template_now, parse_certificate_der, parse_certificate_pem, sign,
    verify_issued_by, CertificateDetails, CertificateTemplate, IssuerContext, SignedCertificate,
    TemplateRequest,
};
pub use config::{PkiConfig, TlsLayout, DEFAULT_ROOT_DIR, DEFAULT_TLS_DIR};
pub use error::{PkiError, Result};
pub use identity::{resolve_workload_id, workload_id_from_hostname, SpiffeId};
pub use issuance::{IssuedMaterial, Minter};
pub use keys::{KeyAlgorithm, KeyPair};
pub use store::{store, store_leaf, store_root, StoredMaterial};
