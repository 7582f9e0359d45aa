//! Command-line interface and tracing setup for the gateway binary

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the gateway.
#[derive(Debug, Parser)]
#[command(
    name = "carimbo-gateway",
    version,
    about = "Gateway serving Carimbo runtime releases and game bundles from GitHub Releases"
)]
pub struct Cli {
    /// Address to bind the HTTP listener on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the remote release store
    #[arg(long, env = "UPSTREAM_BASE_URL", default_value = carimbo_fetch::DEFAULT_BASE_URL)]
    pub upstream_base_url: String,

    /// Total timeout for one upstream request, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Log verbosity
    #[arg(long, short = 'l', value_enum, default_value_t = LogLevel::Info)]
    pub level: LogLevel,

    /// Emit logs as structured JSON
    #[arg(long)]
    pub json: bool,
}

/// Log level options for the CLI.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the CLI level when set.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(level: Level, json: bool) -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| miette::miette!("failed to initialize tracing: {e}"))
}
