//! invsync - headless inventory replication session runner
//!
//! Loads a session script, replays it through an in-process server and
//! predicting client, and prints a JSON report.

mod config;
mod session;

use anyhow::Result;
use config::{SessionConfig, DEFAULT_SESSION_PATH};
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting invsync v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut config = SessionConfig::load_from_path(&cli.config);
    if let Some(items) = cli.items {
        config.items = items;
    }
    if let Some(recipes) = cli.recipes {
        config.recipes = recipes;
    }
    if let Some(pump_every) = cli.pump_every {
        config.pump_every = pump_every;
    }

    let report = session::run(&config)?;
    info!(
        actions = report.actions,
        rejected = report.rejected,
        resyncs = report.resyncs,
        settled = report.settled,
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.settled {
        anyhow::bail!("client view did not settle");
    }
    Ok(())
}

struct CliOptions {
    config: PathBuf,
    items: Option<PathBuf>,
    recipes: Option<PathBuf>,
    pump_every: Option<usize>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: PathBuf::from(DEFAULT_SESSION_PATH),
            items: None,
            recipes: None,
            pump_every: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = PathBuf::from(path);
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--items" => {
                    if let Some(path) = args.next() {
                        opts.items = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--items requires a file path");
                    }
                }
                "--recipes" => {
                    if let Some(path) = args.next() {
                        opts.recipes = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--recipes requires a file path");
                    }
                }
                "--pump-every" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<usize>() {
                            Ok(value) if value > 0 => opts.pump_every = Some(value),
                            _ => {
                                tracing::error!(
                                    value = %raw,
                                    "--pump-every must be a positive integer"
                                );
                            }
                        }
                    } else {
                        tracing::error!("--pump-every requires an integer");
                    }
                }
                other => tracing::warn!(arg = other, "ignoring unknown argument"),
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn cli_defaults() {
        let opts = CliOptions::parse(args(&[]));
        assert_eq!(opts.config, PathBuf::from(DEFAULT_SESSION_PATH));
        assert!(opts.items.is_none());
        assert!(opts.pump_every.is_none());
    }

    #[test]
    fn cli_overrides() {
        let opts = CliOptions::parse(args(&[
            "--config",
            "a.toml",
            "--recipes",
            "r.json",
            "--pump-every",
            "0",
            "--pump-every",
            "3",
        ]));
        assert_eq!(opts.config, PathBuf::from("a.toml"));
        assert_eq!(opts.recipes, Some(PathBuf::from("r.json")));
        assert_eq!(opts.pump_every, Some(3));
    }
}
