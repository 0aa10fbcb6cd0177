//! Command line definition and dispatch

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mintls_pki::{
    resolve_workload_id, KeyAlgorithm, Minter, PkiConfig, TlsLayout, DEFAULT_ROOT_DIR,
    DEFAULT_TLS_DIR,
};

/// Command line of `mintls`
#[derive(Debug, Parser)]
#[command(name = "mintls")]
#[command(about = "Mint a development root CA or a short-lived SPIFFE workload certificate")]
#[command(version)]
pub struct Cli {
    /// Bootstrap the root CA instead of issuing a workload certificate
    #[arg(long)]
    pub root: bool,

    /// Base directory of the TLS material (default: "." with --root, /tmp/tls otherwise)
    #[arg(long, value_name = "DIR")]
    pub tls_dir: Option<PathBuf>,

    /// Algorithm of the generated key
    #[arg(long, value_enum)]
    pub key_algorithm: Option<KeyAlgorithmArg>,

    /// JSON file with issuance parameters
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// `--key-algorithm` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyAlgorithmArg {
    /// RSA 2048
    Rsa2048,
    /// ECDSA P-256
    EcdsaP256,
}

impl From<KeyAlgorithmArg> for KeyAlgorithm {
    fn from(arg: KeyAlgorithmArg) -> Self {
        match arg {
            KeyAlgorithmArg::Rsa2048 => KeyAlgorithm::Rsa2048,
            KeyAlgorithmArg::EcdsaP256 => KeyAlgorithm::EcdsaP256,
        }
    }
}

impl Cli {
    /// Issuance parameters from `--config`, then `--key-algorithm`
    pub fn pki_config(&self) -> anyhow::Result<PkiConfig> {
        let config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                PkiConfig::from_json(&json)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => PkiConfig::default(),
        };

        Ok(match self.key_algorithm {
            Some(arg) => config.with_key_algorithm(arg.into()),
            None => config,
        })
    }

    /// Target layout; the default base depends on the mode
    pub fn layout(&self) -> TlsLayout {
        match &self.tls_dir {
            Some(dir) => TlsLayout::new(dir),
            None if self.root => TlsLayout::new(DEFAULT_ROOT_DIR),
            None => TlsLayout::new(DEFAULT_TLS_DIR),
        }
    }
}

/// Run the selected mode, returning the base directory that was written
pub fn run(cli: &Cli) -> anyhow::Result<PathBuf> {
    let minter = Minter::new(cli.pki_config()?, cli.layout());

    if cli.root {
        minter
            .bootstrap_root()
            .context("Root CA bootstrap failed")?;
    } else {
        let workload_id = resolve_workload_id();
        log::debug!("Resolved workload id {workload_id:?}");
        minter
            .issue_leaf(&workload_id)
            .context("Leaf certificate issuance failed")?;
    }

    Ok(minter.layout().base_dir().to_path_buf())
}
