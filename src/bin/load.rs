//! Bulk loader CLI: syncs the site directory and ingests site dump archives
//! into the same database the API server reads.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quarry_backend::config::Config;
use quarry_backend::db::{self, Repository};
use quarry_backend::loader::Loader;
use quarry_backend::siteinfo::SiteInfoService;

#[derive(Parser)]
#[command(name = "quarry-load", about = "Ingest Stack Exchange data dumps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the sites manifest and refresh the site directory
    SyncSites,
    /// Download and load one site's dump archive
    Site {
        /// Site name as listed in the sites manifest
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::from_env();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "load failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);
    let siteinfo = Arc::new(SiteInfoService::new());
    let loader = Loader::new(repo, siteinfo, &config)?;

    match cli.command {
        Command::SyncSites => {
            let count = loader.sync_sites().await?;
            tracing::info!(sites = count, "site directory refreshed");
        }
        Command::Site { name } => {
            let summary = loader.load_site(&name).await?;
            tracing::info!(
                site = %summary.site,
                reused_archive = summary.reused_archive,
                tags = summary.tags,
                users = summary.users,
                posts = summary.posts,
                badges = summary.badges,
                comments = summary.comments,
                history = summary.history,
                "site loaded"
            );
        }
    }
    Ok(())
}
