//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use relay_observe::LogFormat;

/// Default configuration file, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

/// Relay between a LINE webhook and an OpenAI-compatible completion engine.
///
/// Secrets are read from CHANNEL_SECRET, CHANNEL_TOKEN and OPENAI_API_KEY.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ./relay.toml; missing is fine)
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port, overrides server.port
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Increase log verbosity (-v debug for relay crates, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format: pretty or json
    #[arg(long, default_value = "pretty", value_parser = parse_log_format)]
    pub log_format: LogFormat,

    /// Export spans through OpenTelemetry (stdout exporter)
    #[arg(long)]
    pub otel: bool,
}

impl Cli {
    /// Config path to load and whether the operator named it.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "info,relay_api=debug,relay_core=debug,relay_infra=debug",
            _ => "trace",
        }
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
}
