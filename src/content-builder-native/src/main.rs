use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use movieshows_content_builder::config::{DEFAULT_API_BASE, DEFAULT_IMAGE_BASE, DEFAULT_OUTPUT};
use movieshows_content_builder::{output, sql, BuildConfig, BuildError, ContentBuilder, RetryPolicy};

/// Build the MovieShows content document and SQL seed
#[derive(Parser)]
#[command(name = "movieshows-content-builder")]
#[command(about = "Builds the MovieShows content document from TMDB", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listings and trailers from TMDB and write the content document
    Build {
        #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Pages fetched per listing
        #[arg(long, default_value_t = 2)]
        pages: u32,

        /// Extra per-year movie listings, e.g. --years 2023,2024
        #[arg(long, value_delimiter = ',')]
        years: Vec<u16>,

        /// Skip the Netflix provider listings
        #[arg(long)]
        no_netflix: bool,

        #[arg(long, default_value = "US")]
        region: String,

        #[arg(long, env = "TMDB_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,

        #[arg(long, default_value = DEFAULT_IMAGE_BASE)]
        image_base: String,

        /// Delay between retries of a failed request
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },
    /// Render a content document as an idempotent SQL seed
    Sql {
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            api_key,
            output: destination,
            pages,
            years,
            no_netflix,
            region,
            api_base,
            image_base,
            retry_delay_ms,
        } => {
            let config = BuildConfig {
                api_key: api_key.ok_or(BuildError::MissingApiKey)?,
                api_base,
                image_base,
                pages,
                years,
                include_netflix: !no_netflix,
                region,
                retry: RetryPolicy {
                    delay: Duration::from_millis(retry_delay_ms),
                    ..RetryPolicy::default()
                },
                output: destination,
            };

            let mut builder = ContentBuilder::new(config.clone())?;
            let document = builder.build().await?;
            let stats = builder.stats();
            tracing::info!(
                "Kept {} of {} listings ({} without trailer, {} trailer lookups failed, {} pages failed)",
                stats.kept,
                stats.listings_seen,
                stats.without_trailer,
                stats.trailers_failed,
                stats.pages_failed
            );

            let bytes = output::write_document(&config.output, &document)
                .await
                .with_context(|| format!("writing {}", config.output.display()))?;
            tracing::info!(
                "Wrote {} ({} movies, {} TV shows, {} now playing, {} bytes)",
                config.output.display(),
                document.movies,
                document.tv_shows,
                document.now_playing,
                bytes
            );
        }
        Commands::Sql { input, output: destination } => {
            let document = output::read_document(&input)
                .await
                .with_context(|| format!("reading {}", input.display()))?;
            let script = sql::emit_sql(&document);
            output::write_text(destination.as_deref(), &script).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `sql` can stream the script on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
