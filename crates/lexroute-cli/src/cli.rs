//! CLI argument definitions for lexroute.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Dispatch a research query with fallback |
//! | `chain` | Show the ranked adapter chain for a query |
//! | `adapters` | List registered adapters and registry statistics |
//! | `health` | Probe every adapter and show circuit state |
//! | `cite` | Format a citation on a named adapter |
//! | `validate` | Validate a citation string on a named adapter |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | built-in | YAML router configuration |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Use the no-op transport |
//! | `-v`, `--verbose` | `false` | Debug logging on stderr |
//! | `-q`, `--quiet` | `false` | Errors only on stderr |
//!
//! # Examples
//!
//! ```bash
//! lexroute search "fair use" -j us --prefer-free
//! lexroute chain "emissions standards" -j us-fed --type regulation
//! lexroute cite courtlistener 108713 --format bluebook
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use time::macros::format_description;
use time::Date;

/// Legal research adapter routing CLI.
#[derive(Debug, Parser)]
#[command(
    name = "lexroute",
    author,
    version,
    about = "Route legal research queries across CourtListener, GovInfo and Westlaw",
    long_about = "lexroute picks the best available research source for a query, skips sources \
whose circuit is open, and falls back through the ranked chain until one succeeds.\n\
\n\
Credentials are read from the config file or from LEXROUTE_<ID>_API_KEY \
(COURTLISTENER_API_TOKEN, GOVINFO_API_KEY, WESTLAW_API_KEY)."
)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "LEXROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Debug-level logs on stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Only errors on stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Do not touch the network; adapters receive empty responses.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch a search and print the serving adapter, attempts and results.
    ///
    /// # Examples
    ///
    ///   lexroute search "fair use" -j us
    ///   lexroute search "negligence" -j us-ca -j us-ny --type case-law --limit 5
    Search(SearchArgs),

    /// Print the ranked adapter chain with scores without calling anything.
    Chain(ChainArgs),

    /// List registered adapters and registry statistics.
    Adapters,

    /// Run every adapter's health check concurrently.
    Health,

    /// Fetch a formatted citation from one adapter.
    Cite(CiteArgs),

    /// Validate a citation string on one adapter.
    Validate(ValidateArgs),
}

/// Query and ranking options shared by `search` and `chain`.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Free-text research query.
    pub text: String,

    /// Jurisdiction code, repeatable (`us`, `us-ca`, `us-fed`).
    #[arg(short = 'j', long = "jurisdiction", required = true, num_args = 1)]
    pub jurisdictions: Vec<String>,

    /// Query type: case-law, statute, regulation or mixed.
    #[arg(long = "type", default_value = "mixed")]
    pub query_type: String,

    /// Prefer sources that cost nothing.
    #[arg(long, default_value_t = false)]
    pub prefer_free: bool,

    /// Exclude sources whose estimated search cost exceeds this amount.
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Earliest decision or publication date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub from: Option<Date>,

    /// Latest decision or publication date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub to: Option<Date>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Drop scored results below this relevance (0.0 to 1.0).
    #[arg(long)]
    pub min_quality: Option<f64>,

    /// Maximum number of results.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Per-adapter timeout in milliseconds; adapter default when unset.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Ask adapters for cited-authority ids.
    #[arg(long, default_value_t = false)]
    pub citation_network: bool,
}

#[derive(Debug, Args)]
pub struct ChainArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Debug, Args)]
pub struct CiteArgs {
    /// Adapter id, e.g. `courtlistener`.
    pub adapter: String,

    /// Source-specific document id.
    pub id: String,

    /// Citation style: bluebook, alwd or apa.
    #[arg(long, default_value = "bluebook")]
    pub format: String,

    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Adapter id, e.g. `westlaw`.
    pub adapter: String,

    /// Citation text, e.g. "410 U.S. 113 (1973)".
    pub citation: String,
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected YYYY-MM-DD: {error}"))
}
