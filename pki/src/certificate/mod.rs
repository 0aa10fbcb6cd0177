//! Certificate templates, signing and decoding

pub mod parser;
pub mod signing;
pub mod template;

pub use parser::{
    parse_certificate_der, parse_certificate_pem, verify_issued_by, CertificateDetails,
    DecodeError, CERTIFICATE_PEM_TAG,
};
pub use signing::{sign, IssuerContext, SignedCertificate};
pub use template::{
    build_template, build_template_now, CertificateTemplate, ExtendedKeyUsage, KeyUsage,
    LeafTemplateSpec, RootTemplateSpec, TemplateFields, TemplateRequest,
};
