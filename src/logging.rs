use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "LEARNDESK_LOG";
const DEFAULT_DIRECTIVE: &str = "learndeskd=info";

/// Installs a stderr subscriber. Stdout belongs to the IPC protocol, so
/// nothing may log there.
pub fn init_logging() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);
    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}
