// src/cli.rs
use crate::config::Settings;
use crate::database::{self, Sample};
use crate::store::{CompactValueStore, RawValueStore};
use crate::utils::format_time;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indicator-values")]
#[command(about = "Raw and day-compacted indicator value store", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./indicator-values.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the value tables if they don't exist
    Init,

    /// Write samples for one indicator from a JSON file
    Push {
        /// Indicator ID
        #[arg(short, long)]
        indicator: i32,

        /// JSON array of {"timestamp": RFC 3339, "value": number}
        #[arg(short, long)]
        file: PathBuf,

        /// Write one raw row per sample instead of compacting by day
        #[arg(long)]
        raw: bool,
    },

    /// Show the decoded samples of one day bucket
    Show {
        /// Indicator ID
        #[arg(short, long)]
        indicator: i32,

        /// Day (YYYY-MM-DD, UTC)
        #[arg(short, long)]
        day: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse a `YYYY-MM-DD` date into its UTC day bucket.
pub fn parse_day(day: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Invalid day {:?}, expected YYYY-MM-DD", day))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

pub fn parse_samples(json: &str) -> Result<Vec<Sample>> {
    serde_json::from_str(json).context("Samples must be a JSON array of {timestamp, value}")
}

pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_samples(&json)
}

/// Execute a command from the CLI
pub async fn execute_command(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let storage = database::connect(&settings).await?;
    let retry = settings.retry_policy();

    match cli.command {
        Commands::Init => {
            storage.init_tables().await?;
            println!("Value tables are ready.");
        }

        Commands::Push {
            indicator,
            file,
            raw,
        } => {
            let samples = read_samples(&file)?;
            let count = samples.len();

            if raw {
                let store = RawValueStore::new(storage, retry);
                let rows = store.upsert_batch(indicator, samples).await?;
                println!("Upserted {} raw value(s) for indicator {}.", rows, indicator);
            } else {
                let store = CompactValueStore::new(storage, settings.value_codec()?, retry);
                let days = store.upsert_samples(indicator, samples).await?;
                println!(
                    "Appended {} sample(s) to {} day bucket(s) for indicator {}.",
                    count, days, indicator
                );
            }
        }

        Commands::Show {
            indicator,
            day,
            json,
        } => {
            let day = parse_day(&day)?;
            let store = CompactValueStore::new(storage, settings.value_codec()?, retry);

            let bucket = match store.get_bucket(indicator, day).await? {
                Some(bucket) => bucket,
                None => {
                    println!("No values stored for indicator {} on {}.", indicator, day.format("%Y-%m-%d"));
                    return Ok(());
                }
            };

            let values = CompactValueStore::decode_to_samples(&bucket)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                println!("{}", bucket);
                println!("{:<24} | {:>12}", "Timestamp", "Value");
                println!("{:-<24}-+-{:->12}", "", "");
                for value in &values {
                    println!("{:<24} | {:>12}", format_time(&value.timestamp), value.value.to_string());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day("2024-01-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_day("01/01/2024").is_err());
        assert!(parse_day("2024-13-01").is_err());
    }

    #[test]
    fn test_parse_samples() {
        let samples = parse_samples(
            r#"[
                {"timestamp": "2024-01-01T00:00:00Z", "value": 0.03},
                {"timestamp": "2024-01-01T15:53:00Z", "value": 3.5}
            ]"#,
        )
        .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 15, 53, 0).unwrap()
        );
        assert_eq!(samples[1].value, 3.5);

        assert!(parse_samples(r#"{"timestamp": "2024-01-01T00:00:00Z"}"#).is_err());
    }

    #[test]
    fn test_push_arguments() {
        let cli = Cli::try_parse_from([
            "indicator-values",
            "push",
            "--indicator",
            "42",
            "--file",
            "samples.json",
            "--raw",
        ])
        .unwrap();

        match cli.command {
            Commands::Push {
                indicator,
                file,
                raw,
            } => {
                assert_eq!(indicator, 42);
                assert_eq!(file, PathBuf::from("samples.json"));
                assert!(raw);
            }
            _ => panic!("expected push"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "indicator-values",
            "show",
            "-i",
            "7",
            "-d",
            "2024-01-01",
            "--config",
            "prod.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("prod.toml")));
        assert!(matches!(cli.command, Commands::Show { indicator: 7, json: false, .. }));
    }
}
