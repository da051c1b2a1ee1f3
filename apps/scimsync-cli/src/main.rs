//! scimsync - Google Workspace to SCIM 2.0 synchronization
//!
//! Exit codes: 0 success, 1 run-level error, 2 configuration error.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

use scimsync_cli::config::{config_source_description, Config};
use scimsync_cli::error::{CliError, CliResult};
use scimsync_cli::logging::init_logging;
use scimsync_cli::runner::{self, ConfiguredSync};
use scimsync_cli::server;

/// Synchronize Google Workspace users and groups to a SCIM 2.0 endpoint
#[derive(Parser)]
#[command(name = "scimsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization and print the report
    Sync(SyncArgs),

    /// Check that both the Google Workspace and SCIM credentials work
    TestConnection,

    /// Serve an HTTP trigger that runs a synchronization per request
    Serve(ServeArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Report skipped records and log at debug level
    #[arg(long)]
    verbose: bool,

    /// Deletion policy: negative = safe, 0 = partial, positive = full
    #[arg(long, allow_hyphen_values = true)]
    destructive: Option<i32>,

    /// Skip the user phase (no user create/update/delete)
    #[arg(long)]
    no_update_users: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = Config::from_env().map_err(|e| {
        eprintln!("{}", config_source_description());
        CliError::from(e)
    })?;

    match cli.command {
        Commands::Sync(args) => {
            config.verbose |= args.verbose;
            if let Some(level) = args.destructive {
                config.destructive = level;
            }
            if args.no_update_users {
                config.update_users = false;
            }
            init_logging(config.verbose, cli.log_json);

            let stat = runner::run_sync(&config).await?;
            if args.json {
                let report = serde_json::to_string_pretty(&stat)
                    .map_err(|e| CliError::Setup(format!("Failed to encode report: {e}")))?;
                println!("{report}");
            } else {
                print!("{stat}");
            }
            Ok(())
        }
        Commands::TestConnection => {
            init_logging(config.verbose, cli.log_json);
            runner::test_connection(&config).await
        }
        Commands::Serve(args) => {
            init_logging(config.verbose, cli.log_json);
            server::serve(args.bind, Arc::new(ConfiguredSync::new(config))).await
        }
    }
}
