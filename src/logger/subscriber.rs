// Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise dev mode logs crate debug output and
/// other builds only warnings. A second call leaves the first subscriber in place.
pub fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(config)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_ansi(!config.is_production());

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn default_filter(config: &Config) -> &'static str {
    if config.dev_mode {
        "tourdesk=debug,warn"
    } else {
        "tourdesk=warn"
    }
}
