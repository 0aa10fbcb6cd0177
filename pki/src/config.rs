//! Issuance configuration and the on-disk TLS layout
//!
//! `PkiConfig` holds the certificate parameters; `TlsLayout` holds the fixed
//! file naming convention relative to a base directory. Both are passed
//! explicitly so tests can point them at temporary directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::KeyAlgorithm;

/// Base directory used by leaf issuance when none is given
pub const DEFAULT_TLS_DIR: &str = "/tmp/tls";

/// Base directory used by root bootstrap when none is given
pub const DEFAULT_ROOT_DIR: &str = ".";

const CA_DIR: &str = "ca";
const CLIENT_DIR: &str = "client";
const ROOT_CERT_FILE: &str = "root.pem";
const ROOT_KEY_FILE: &str = "root.key";
const LEAF_CERT_FILE: &str = "client.pem";
const LEAF_KEY_FILE: &str = "client-key.pem";

/// Certificate issuance parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkiConfig {
    /// Subject organization; the root appends ` ROOT CA`
    #[serde(default = "default_organization")]
    pub organization: String,
    /// SPIFFE trust domain of issued identities
    #[serde(default = "default_trust_domain")]
    pub trust_domain: String,
    /// Leaf certificate lifetime in seconds
    #[serde(default = "default_leaf_validity_secs")]
    pub leaf_validity_secs: u64,
    /// Root certificate lifetime in days
    #[serde(default = "default_root_validity_days")]
    pub root_validity_days: u64,
    /// Algorithm of newly generated keys
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,
}

fn default_organization() -> String {
    "My Dev org".to_string()
}

fn default_trust_domain() -> String {
    "local.dev".to_string()
}

fn default_leaf_validity_secs() -> u64 {
    4 * 3600 // 4 hours
}

fn default_root_validity_days() -> u64 {
    365 * 10 // 10 years
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            trust_domain: default_trust_domain(),
            leaf_validity_secs: default_leaf_validity_secs(),
            root_validity_days: default_root_validity_days(),
            key_algorithm: KeyAlgorithm::default(),
        }
    }
}

impl PkiConfig {
    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the key algorithm
    #[must_use]
    pub fn with_key_algorithm(self, key_algorithm: KeyAlgorithm) -> Self {
        Self {
            key_algorithm,
            ..self
        }
    }

    /// Leaf certificate lifetime
    #[must_use]
    pub fn leaf_validity(&self) -> Duration {
        Duration::from_secs(self.leaf_validity_secs)
    }

    /// Root certificate lifetime
    #[must_use]
    pub fn root_validity(&self) -> Duration {
        Duration::from_secs(self.root_validity_days.saturating_mul(24 * 3600))
    }

    /// Subject organization of the root CA
    #[must_use]
    pub fn root_organization(&self) -> String {
        format!("{} ROOT CA", self.organization)
    }
}

/// Fixed key/certificate file layout under one base directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsLayout {
    base_dir: PathBuf,
}

impl TlsLayout {
    /// Layout rooted at `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Base directory of the layout
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/ca/root.pem`
    #[must_use]
    pub fn root_cert_path(&self) -> PathBuf {
        self.base_dir.join(CA_DIR).join(ROOT_CERT_FILE)
    }

    /// `<base>/ca/root.key`
    #[must_use]
    pub fn root_key_path(&self) -> PathBuf {
        self.base_dir.join(CA_DIR).join(ROOT_KEY_FILE)
    }

    /// `<base>/client/client.pem`
    #[must_use]
    pub fn leaf_cert_path(&self) -> PathBuf {
        self.base_dir.join(CLIENT_DIR).join(LEAF_CERT_FILE)
    }

    /// `<base>/client/client-key.pem`
    #[must_use]
    pub fn leaf_key_path(&self) -> PathBuf {
        self.base_dir.join(CLIENT_DIR).join(LEAF_KEY_FILE)
    }

    /// Sub-directories of the layout, each listed once
    #[must_use]
    pub fn subdirectories(&self) -> [PathBuf; 2] {
        [self.base_dir.join(CA_DIR), self.base_dir.join(CLIENT_DIR)]
    }
}

impl Default for TlsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_TLS_DIR)
    }
}
