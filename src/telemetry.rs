use crate::error::Result;
use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Safe to call once per process;
/// a second call reports an error instead of panicking.
pub fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quartermaster=info,info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|err| crate::err!("failed to initialise tracing subscriber: {err}"))
}
