use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive for guardcache output.
pub const LOG_ENV: &str = "GUARDCACHE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs a formatted `tracing` subscriber.
///
/// The filter is read from `GUARDCACHE_LOG`, then `RUST_LOG`, and falls back
/// to `warn`. Calling this more than once, or after the host installed its own
/// subscriber, is a no-op.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
