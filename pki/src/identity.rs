//! Workload identity
//!
//! The workload id is derived from the host name once by the caller and then
//! passed by value into template construction.

use std::fmt;

use url::Url;

use crate::error::{PkiError, Result};

/// Derive the workload id from the host name of this machine or container
///
/// A host name that cannot be read degrades to an empty id.
pub fn resolve_workload_id() -> String {
    match hostname::get() {
        Ok(name) => match name.into_string() {
            Ok(name) => workload_id_from_hostname(&name),
            Err(name) => {
                tracing::warn!(hostname = ?name, "Host name is not valid UTF-8, using empty workload id");
                String::new()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Couldn't read host name, using empty workload id");
            String::new()
        }
    }
}

/// First label of `hostname`, lower-cased
pub fn workload_id_from_hostname(hostname: &str) -> String {
    hostname
        .split('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// A `spiffe://<trust-domain>/<workload-id>` identity URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiffeId {
    uri: Url,
}

impl SpiffeId {
    /// Build and validate the identity for `workload_id` in `trust_domain`
    pub fn new(trust_domain: &str, workload_id: &str) -> Result<Self> {
        let candidate = format!("spiffe://{trust_domain}/{workload_id}");

        if trust_domain.is_empty() {
            return Err(PkiError::invalid_identity(candidate, "empty trust domain"));
        }

        if let Some(c) = workload_id.chars().find(|c| !is_path_segment_char(*c)) {
            return Err(PkiError::invalid_identity(
                candidate,
                format!("character {c:?} is not allowed in a URI path segment"),
            ));
        }

        let uri = Url::parse(&candidate)
            .map_err(|e| PkiError::invalid_identity(candidate.clone(), e.to_string()))?;

        // Anything the parser had to escape or normalise is not a literal SPIFFE id
        if uri.as_str() != candidate {
            return Err(PkiError::invalid_identity(
                candidate,
                format!("not in canonical form, parsed as {}", uri.as_str()),
            ));
        }

        Ok(Self { uri })
    }

    /// The identity as a URI string
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.uri.as_str()
    }

    /// Trust domain part of the identity
    #[must_use]
    pub fn trust_domain(&self) -> &str {
        self.uri.host_str().unwrap_or_default()
    }

    /// Workload part of the identity, without the leading `/`
    #[must_use]
    pub fn workload_id(&self) -> &str {
        self.uri.path().trim_start_matches('/')
    }
}

impl fmt::Display for SpiffeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// RFC 3986 `pchar` without percent-encoding
fn is_path_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';'
                | '=' | ':' | '@'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_workload_id_strips_domain() {
        assert_eq!(workload_id_from_hostname("my-host.cluster.local"), "my-host");
    }

    #[test]
    fn test_workload_id_is_lowercased() {
        assert_eq!(workload_id_from_hostname("My-Host"), "my-host");
    }

    #[test]
    fn test_empty_hostname_yields_empty_id() {
        assert_eq!(workload_id_from_hostname(""), "");
        assert_eq!(workload_id_from_hostname(".cluster.local"), "");
    }

    #[test]
    fn test_resolve_workload_id_matches_hostname() {
        let expected = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .map(|h| workload_id_from_hostname(&h))
            .unwrap_or_default();

        assert_eq!(resolve_workload_id(), expected);
    }

    #[test]
    fn test_spiffe_id_shape() {
        let id = SpiffeId::new("local.dev", "my-host").expect("valid id");

        assert_eq!(id.as_str(), "spiffe://local.dev/my-host");
        assert_eq!(id.trust_domain(), "local.dev");
        assert_eq!(id.workload_id(), "my-host");
    }

    #[test]
    fn test_empty_workload_id_is_accepted() {
        let id = SpiffeId::new("local.dev", "").expect("empty id degrades gracefully");
        assert_eq!(id.as_str(), "spiffe://local.dev/");
    }

    #[test]
    fn test_space_is_rejected() {
        let err = SpiffeId::new("local.dev", "my host").expect_err("space is not a pchar");
        assert!(matches!(err, PkiError::InvalidIdentityUri { .. }));
    }

    #[test]
    fn test_extra_segments_and_dot_segments_are_rejected() {
        assert!(SpiffeId::new("local.dev", "a/b").is_err());
        assert!(SpiffeId::new("local.dev", "..").is_err());
        assert!(SpiffeId::new("", "my-host").is_err());
    }

    proptest! {
        #[test]
        fn prop_workload_id_has_no_dots_or_uppercase(hostname in "[A-Za-z0-9.-]{0,40}") {
            let id = workload_id_from_hostname(&hostname);
            prop_assert!(!id.contains('.'));
            prop_assert_eq!(id.clone(), id.to_lowercase());
            prop_assert!(hostname.to_lowercase().starts_with(&id));
        }
    }
}
