//! Feedgate Ingest - feed inspection tool
//!
//! Fetches or reads a supplier feed and prints the canonical rows it would
//! hand to the reconciler. Useful for validating a feed before wiring it
//! into a feed configuration.

use anyhow::Result;
use clap::Parser;
use feedgate_common::logging::{init_logging, LogConfig, LogLevel};
use feedgate_common::types::{FeedFormat, FieldMap};
use feedgate_ingest::fetch::{FeedFetcher, FetchConfig};
use feedgate_ingest::parser::decode_feed;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "feedgate-ingest")]
#[command(author, version, about = "Feedgate feed inspection tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Decode a local feed file and print its canonical rows
    Parse {
        /// Path to the feed file
        #[arg(short, long)]
        file: String,

        /// Declared feed format (csv, xml, json)
        #[arg(short = 'F', long)]
        format: FeedFormatArg,

        /// Source field carrying the item code
        #[arg(long, default_value = "code")]
        code_field: String,

        /// Source field carrying the item name
        #[arg(long, default_value = "name")]
        name_field: String,
    },

    /// Fetch a feed URL and print its canonical rows
    Fetch {
        /// Feed URL
        #[arg(short, long)]
        url: String,

        /// Declared feed format (csv, xml, json)
        #[arg(short = 'F', long)]
        format: FeedFormatArg,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum FeedFormatArg {
    Csv,
    Xml,
    Json,
}

impl From<FeedFormatArg> for FeedFormat {
    fn from(arg: FeedFormatArg) -> Self {
        match arg {
            FeedFormatArg::Csv => FeedFormat::Csv,
            FeedFormatArg::Xml => FeedFormat::Xml,
            FeedFormatArg::Json => FeedFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("feedgate-ingest".to_string())
        .build();
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    init_logging(&log_config)?;

    match cli.command {
        Command::Parse {
            file,
            format,
            code_field,
            name_field,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let map = FieldMap {
                item_code_field: code_field,
                item_name_field: name_field,
                ..FieldMap::default()
            };
            print_rows(format.into(), &bytes, &map)?;
        },
        Command::Fetch { url, format, timeout } => {
            let fetcher = FeedFetcher::new(FetchConfig {
                timeout_secs: timeout,
                ..FetchConfig::default()
            })?;
            let bytes = fetcher.fetch(&url).await?;
            print_rows(format.into(), &bytes, &FieldMap::default())?;
        },
    }

    Ok(())
}

fn print_rows(format: FeedFormat, bytes: &[u8], map: &FieldMap) -> Result<()> {
    let decoded = decode_feed(format, bytes, map)?;
    for row in &decoded.rows {
        println!("{}", serde_json::to_string(row)?);
    }
    info!(
        rows = decoded.rows.len(),
        skipped = decoded.skipped,
        "Feed decoded"
    );
    Ok(())
}
