//! CLI entry point for notion-blog

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notion-blog")]
#[command(author = "Shaik Zhafir")]
#[command(version)]
#[command(about = "Personal blog server rendering Notion-backed posts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (overrides _config.yml)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (overrides _config.yml)
        #[arg(long)]
        host: Option<String>,
    },

    /// Refresh an integration data file once, like the cron endpoints do
    Refresh {
        /// Which integration to refresh
        target: RefreshTarget,
    },

    /// Display version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RefreshTarget {
    Strava,
    Manga,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "notion_blog=debug,info"
    } else {
        "notion_blog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = cli.cwd.unwrap_or_else(|| std::env::current_dir().unwrap());

    match cli.command {
        Commands::Serve { port, host } => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            notion_blog::server::start(&blog, host.as_deref(), port).await?;
        }

        Commands::Refresh { target } => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            let secrets = notion_blog::config::Secrets::from_env()?;

            match target {
                RefreshTarget::Strava => {
                    let strava = notion_blog::strava::StravaClient::new(
                        &blog.config.strava,
                        &secrets,
                        &blog.data_dir,
                    );
                    strava.refresh_and_update().await?;
                    println!("Strava data refreshed");
                }
                RefreshTarget::Manga => {
                    let manga = notion_blog::manga::MangaClient::new(
                        &blog.config.manga,
                        &secrets,
                        &blog.data_dir,
                    );
                    manga.update_data().await?;
                    println!("Manga data refreshed");
                }
            }
        }

        Commands::Version => {
            println!("notion-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
