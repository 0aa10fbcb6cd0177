//! Main entry point for the mintls certificate tool

use std::process::ExitCode;

use clap::Parser;
use mintls_pki::PkiError;

mod cli;
mod logging;

fn main() -> ExitCode {
    logging::init();

    let cli = cli::Cli::parse();
    match cli::run(&cli) {
        Ok(dir) => {
            log::info!("Certificate material generated in {dir:?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let stage = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<PkiError>())
                .map_or("setup", PkiError::stage);
            log::error!("Failed during {stage}: {e:#}");
            ExitCode::FAILURE
        }
    }
}
