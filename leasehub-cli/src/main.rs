use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::{CompletionsArgs, InspectSheetArgs, ServeArgs};
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "leasehub",
    author,
    version,
    about = "Commercial real-estate leasing backend",
    long_about = "Serve the leasing REST API over MongoDB, and inspect property \
                  spreadsheets before uploading them."
)]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the `telemetry` feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Parse an .xlsx the way the bulk-upload endpoints do
    InspectSheet(InspectSheetArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::InspectSheet(args) => commands::run_inspect_sheet(args),
        Commands::Completions(args) => commands::run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["leasehub", "inspect-sheet", "offices.xlsx", "--debug"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::InspectSheet(_)));
    }
}
