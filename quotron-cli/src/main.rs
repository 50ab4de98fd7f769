//! `quotron`: the daemon and offline ETL entry point (spec.md §6).

mod cli;
mod db;
mod etl_cmd;
mod run_cmd;

use clap::Parser;
use cli::{Cli, Commands};
use quotron_core::AppConfig;
use quotron_etl::EtlStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {:?}: {e}", cli.config);
            return std::process::ExitCode::from(1);
        }
    };
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Run => match run_cmd::run(config).await {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "daemon exited with an error");
                std::process::ExitCode::from(1)
            }
        },
        Commands::Etl(args) => {
            let input = match etl_cmd::prepare(&args.kind).await {
                Ok(input) => input,
                Err(e) => {
                    tracing::error!(error = %e, "invalid etl input");
                    return std::process::ExitCode::from(1);
                }
            };
            let pool = match PgPoolOptions::new().max_connections(5).connect(&db::url()).await {
                Ok(pool) => pool,
                Err(e) => {
                    eprintln!("failed to connect to database: {e}");
                    return std::process::ExitCode::from(1);
                }
            };
            let store = EtlStore::new(pool);
            std::process::ExitCode::from(etl_cmd::run(&store, input).await)
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
