use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use fleetwatch_core::{gateways::Gateways, memory::MemoryStore};
use fleetwatch_store_firestore::{DEFAULT_DATABASE, FirestoreConfig, FirestoreStore};
use reqwest::Client;

#[derive(Debug, Parser)]
#[command(name = "fleetwatch-admin", version)]
#[command(about = "Weekly operator indicators and store provisioning checks for Fleetwatch", long_about = None)]
pub(crate) struct Cli {
    /// Where records are read from.
    #[arg(long, env = "FLEETWATCH_BACKEND", value_enum, default_value_t = Backend::Memory)]
    pub(crate) backend: Backend,

    /// Google Cloud project holding the Firestore database.
    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub(crate) project_id: Option<String>,

    #[arg(long, env = "FIRESTORE_DATABASE", default_value = DEFAULT_DATABASE)]
    pub(crate) database: String,

    /// OAuth access token, e.g. from `gcloud auth print-access-token`.
    #[arg(long, env = "FIRESTORE_ACCESS_TOKEN", hide_env_values = true)]
    pub(crate) access_token: Option<String>,

    /// Talk to a local emulator instead of production.
    #[arg(long, env = "FIRESTORE_EMULATOR_HOST")]
    pub(crate) emulator_host: Option<String>,

    /// IANA zone the reporting week is computed in.
    #[arg(long, env = "FLEETWATCH_TIMEZONE", default_value = "America/Sao_Paulo")]
    pub(crate) timezone: String,

    /// Upper bound for a report or system check, in seconds.
    #[arg(long, env = "FLEETWATCH_TIMEOUT_SECS", default_value_t = 30)]
    pub(crate) timeout_secs: u64,

    /// Log destination while the terminal UI owns the screen.
    #[arg(long, env = "FLEETWATCH_LOG_FILE", default_value = "fleetwatch.log")]
    pub(crate) log_file: PathBuf,

    #[arg(long, env = "FLEETWATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub(crate) log_format: LogFormat,

    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Backend {
    /// Built-in demo data.
    Memory,
    /// Firestore over REST.
    Firestore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Interactive terminal UI (default)
    Tui,
    /// Print this week's operator indicators
    Report {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Create missing default data and probe the store for missing indexes
    SystemCheck {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Cli {
    pub(crate) fn command(&self) -> Command {
        self.command.unwrap_or(Command::Tui)
    }

    pub(crate) fn time_zone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("unknown time zone '{}': {err}", self.timezone))
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn firestore_config(&self) -> Result<FirestoreConfig> {
        let project_id = self
            .project_id
            .as_deref()
            .context("the firestore backend needs --project-id or FIRESTORE_PROJECT_ID")?;

        let mut config = FirestoreConfig::new(project_id).with_database(&self.database);
        if let Some(host) = &self.emulator_host {
            config = config.with_emulator(host);
        }
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token);
        }
        Ok(config)
    }

    /// Gateways for the selected backend; the demo store is seeded around `now`.
    pub(crate) fn gateways(&self, now: DateTime<Utc>, time_zone: &Tz) -> Result<Gateways> {
        match self.backend {
            Backend::Memory => {
                let store = MemoryStore::demo(now, time_zone)?;
                Ok(Gateways::from_store(Arc::new(store)))
            }
            Backend::Firestore => {
                let config = self.firestore_config()?;
                let client = Client::builder()
                    .user_agent(concat!("fleetwatch-admin/", env!("CARGO_PKG_VERSION")))
                    .timeout(self.timeout())
                    .build()?;
                Ok(Gateways::from_store(Arc::new(FirestoreStore::new(client, config))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_demo_tui() {
        let cli = Cli::try_parse_from(["fleetwatch-admin"]).expect("no arguments needed");

        assert_eq!(cli.backend, Backend::Memory, "demo backend");
        assert_eq!(cli.command(), Command::Tui, "interactive by default");
        assert_eq!(cli.time_zone().expect("valid zone"), Tz::America__Sao_Paulo, "default zone");
    }

    #[test]
    fn firestore_needs_a_project() {
        let cli = Cli::try_parse_from(["fleetwatch-admin", "--backend", "firestore", "report"])
            .expect("parses");

        let err = cli.firestore_config().expect_err("project missing");

        assert!(err.to_string().contains("--project-id"), "flag named: {err}");
    }

    #[test]
    fn emulator_host_switches_the_endpoint() {
        let cli = Cli::try_parse_from([
            "fleetwatch-admin",
            "--backend",
            "firestore",
            "--project-id",
            "demo-fleet",
            "--emulator-host",
            "localhost:8080",
            "system-check",
            "--format",
            "json",
        ])
        .expect("parses");

        let config = cli.firestore_config().expect("complete config");

        assert_eq!(config.base_url, "http://localhost:8080/v1", "emulator endpoint");
        assert_eq!(
            cli.command(),
            Command::SystemCheck {
                format: OutputFormat::Json
            },
            "subcommand parsed"
        );
    }

    #[test]
    fn unknown_time_zones_are_rejected() {
        let cli = Cli::try_parse_from(["fleetwatch-admin", "--timezone", "Mars/Olympus"]).expect("parses");

        assert!(cli.time_zone().is_err(), "zone validated");
    }
}
