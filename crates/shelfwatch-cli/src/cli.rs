//! CLI argument definitions for Shelfwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Run the slot scheduler until interrupted |
//! | `once` | Run one collection cycle over every report target |
//! | `slots` | Show the next and nearest slot for a point in time |
//! | `normalize` | Normalize a saved provider payload |
//!
//! # Global Options
//!
//! | Option | Environment | Description |
//! |--------|-------------|-------------|
//! | `--spreadsheet-id` | `SHELFWATCH_SPREADSHEET_ID` | Report spreadsheet |
//! | `--access-token` | `SHELFWATCH_ACCESS_TOKEN` | Sheets API bearer token |
//! | `--config-file` | `SHELFWATCH_CONFIG_FILE` | JSON config instead of config sheets |
//! | `--log-json` | | JSON log lines |
//! | `--pretty` | | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! shelfwatch --spreadsheet-id 1ibu... once
//! shelfwatch --config-file monitor.json slots --at 2024-05-10T13:59:00+03:00
//! shelfwatch normalize payload.json --provider oxylabs --url https://www.amazon.de/dp/B0CXYZ1234
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use shelfwatch_core::ProviderId;

/// Shelfwatch - marketplace listing monitor
#[derive(Debug, Parser)]
#[command(
    name = "shelfwatch",
    author,
    version,
    about = "Marketplace listing monitor publishing time-slotted comparison grids",
    long_about = "Shelfwatch collects listing data for a tracked company and up to five \
competitors through a scraping provider, normalizes it, and publishes a time-slotted \
comparison grid to a spreadsheet.\n\
\n\
Use 'shelfwatch <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Spreadsheet holding the config sheets and the report grids.
    #[arg(long, global = true, env = "SHELFWATCH_SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// OAuth bearer token for the Sheets API.
    #[arg(long, global = true, env = "SHELFWATCH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Read configuration from a JSON file instead of the config sheets.
    #[arg(long, global = true, env = "SHELFWATCH_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one cycle now, then at every configured slot until Ctrl-C.
    Run,

    /// Run a single cycle over every report target and print its report.
    Once,

    /// Show the configured wake slots with the next and nearest slot.
    ///
    /// # Examples
    ///
    ///   shelfwatch slots
    ///   shelfwatch slots --at 2024-05-10T23:00:00Z
    Slots(SlotsArgs),

    /// Normalize a saved provider response and print the canonical record.
    ///
    /// # Examples
    ///
    ///   shelfwatch normalize product.json --url https://www.amazon.de/dp/B0CXYZ1234
    ///   shelfwatch normalize page.html --provider scraperapi --url https://www.amazon.com/dp/B0CXYZ1234
    Normalize(NormalizeArgs),
}

#[derive(Debug, Args)]
pub struct SlotsArgs {
    /// RFC 3339 instant to evaluate instead of now.
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Saved response body.
    pub path: PathBuf,

    /// Provider that produced the body.
    #[arg(long, value_enum, default_value_t = ProviderArg::Scrapingdog)]
    pub provider: ProviderArg,

    /// Listing URL the body was fetched for; selects listing code and currency.
    #[arg(long)]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Scraperapi,
    Scrapingdog,
    Oxylabs,
}

impl From<ProviderArg> for ProviderId {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Scraperapi => Self::ScraperApi,
            ProviderArg::Scrapingdog => Self::ScrapingDog,
            ProviderArg::Oxylabs => Self::Oxylabs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "shelfwatch",
            "normalize",
            "payload.json",
            "--url",
            "https://www.amazon.de/dp/B0CXYZ1234",
            "--provider",
            "oxylabs",
            "--pretty",
        ]);
        assert!(cli.pretty);
        match cli.command {
            Command::Normalize(args) => {
                assert_eq!(ProviderId::from(args.provider), ProviderId::Oxylabs);
                assert_eq!(args.path, PathBuf::from("payload.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn slots_accepts_an_instant() {
        let cli = Cli::parse_from(["shelfwatch", "slots", "--at", "2024-05-10T13:59:00Z"]);
        assert!(matches!(cli.command, Command::Slots(SlotsArgs { at: Some(_) })));
    }
}
