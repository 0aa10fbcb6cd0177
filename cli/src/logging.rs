//! Process-wide logging setup

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialize `env_logger` once; `RUST_LOG` overrides the `info` default
///
/// Library events are emitted with `tracing` and reach this logger through
/// the `log` facade.
pub fn init() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_micros()
            .init();
    });
}
