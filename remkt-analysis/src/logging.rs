//! Tracing setup for the command-line tool
//!
//! The configured log level is only known once the config file is read, but
//! config loading logs too ("No config file at ...", "Loaded config from
//! ..."). Loading therefore runs under a scoped bootstrap subscriber at the
//! default level; the global subscriber is installed afterwards with the
//! configured level. `RUST_LOG` overrides both.

use crate::config::AnalysisConfig;
use remkt_common::config::LoggingConfig;
use remkt_common::Result;
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for `level`, unless `RUST_LOG` is set
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("remkt_analysis={level},remkt_common={level}", level = level).into()
    })
}

fn subscriber<W>(filter: EnvFilter, make_writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
}

/// Load the analysis config with its own log lines going to stderr
pub fn load_config(cli_path: Option<&Path>) -> Result<AnalysisConfig> {
    let level = LoggingConfig::default().level;
    load_config_with(cli_path, env_filter(&level), std::io::stderr)
}

/// Load the analysis config while `filter`/`make_writer` receive its logs
pub fn load_config_with<W>(
    cli_path: Option<&Path>,
    filter: EnvFilter,
    make_writer: W,
) -> Result<AnalysisConfig>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber(filter, make_writer), || {
        AnalysisConfig::load(cli_path)
    })
}

/// Install the global stderr subscriber at the configured level
pub fn init(logging: &LoggingConfig) {
    subscriber(env_filter(&logging.level), std::io::stderr).init();
}
