//! Structured logging init (§10). The classifier and planner stay free of formatting
//! concerns (§9); this is the one place presentation is decided.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// Initializes the global `tracing` subscriber. `DEBUG=1` lowers the default level to
/// `debug` and switches to a human-readable pretty layer; otherwise logs are emitted as
/// JSON, the shape the swarm's log collector expects. `RUST_LOG` always overrides the
/// default level when set.
pub fn init(config: &Config) {
    let default_level = if config.is_debug() { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = if config.is_debug() {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).json().boxed()
    };

    tracing_subscriber::registry().with(fmt_layer.with_filter(env_filter)).init();
}
