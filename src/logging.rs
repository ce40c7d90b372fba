use tracing::Level;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ROLLCALL_LOG";

fn build_filter(default_level: Level) -> EnvFilter {
    let from_env = std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v.trim()).ok());

    match from_env {
        Some(filter) => filter,
        None => EnvFilter::from_default_env().add_directive(default_level.into()),
    }
}

/// Install the stderr subscriber. Safe to call more than once; later calls are ignored.
pub fn init(default_level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
