use clap::{Parser, Subcommand};

const DEFAULT_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

#[derive(Parser, Debug)]
#[command(name = "cartilla-backend")]
#[command(about = "Provider directory geo-search and affiliate lookup", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the directory HTTP API.
    Serve(ServeArgs),
    /// Print row counts for every configured source table.
    Stats(SourceArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Data directory holding cartilla.duckdb and an optional directory.json.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Read tables from a JSON fixture file instead of DuckDB.
    #[arg(long)]
    pub fixtures: Option<String>,

    /// Directory config (table names, affiliate sources, radius tiers).
    /// Defaults to <data-dir>/directory.json when present.
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8787)]
    pub port: u16,
}
