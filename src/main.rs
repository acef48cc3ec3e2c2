use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use jobscout::{
    api::{self, Context},
    jobs::JobSearchService,
    scraping::build_client,
    search::{SerpApiClient, SerpSearch},
    JobSearchRequest, Settings, DEFAULT_NUM_RESULTS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Searches job postings, analyzes application forms and stores resumes and cover letters.
#[derive(Parser)]
#[command(name = "jobscout", version, about)]
struct Cli {
    /// The settings file. Defaults to `jobscout.toml` in the working directory, when present.
    #[arg(short, long, global = true, env = "JOBSCOUT_SETTINGS_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the HTTP service.
    Serve,
    /// Runs a single job search and prints the results.
    Search {
        /// What to search for, e.g. "rust developer".
        query: String,
        #[arg(short, long)]
        location: Option<String>,
        /// Full-time, Part-time, Contract, ...
        #[arg(long)]
        job_type: Option<String>,
        #[arg(long)]
        experience_level: Option<String>,
        #[arg(short, long, default_value_t = DEFAULT_NUM_RESULTS)]
        num_results: u32,
    },
}

/// The main entry point of the application.
///
/// Loads `.env` and the settings, initializes logging and runs the chosen command.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env");
        }
    }

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    // Initialize logging
    let default_level = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Command::Serve => serve(settings).await,
        Command::Search {
            query,
            location,
            job_type,
            experience_level,
            num_results,
        } => {
            let request = JobSearchRequest {
                query,
                location,
                num_results,
                job_type,
                experience_level,
            };
            search(settings, request).await
        }
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    info!("Starting {}", settings.app_name);
    let addr = settings.bind_address()?;
    let ctx = Context::from_settings(settings).await.context("Failed to set up the service")?;

    let (addr, server) = warp::serve(api::routes(ctx))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("Failed to serve at '{}'", addr))?;
    info!("Now serving @ '{}'", addr);

    server.await;
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where there is one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut handler) => {
                handler.recv().await;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler, the service will not shut down gracefully on SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down gracefully...");
}

async fn search(settings: Settings, request: JobSearchRequest) -> anyhow::Result<()> {
    let client = build_client(&settings.scraper)?;
    let api = SerpApiClient::new(client, settings.search.serpapi_endpoint, settings.serpapi_api_key);
    let service = JobSearchService::new(Arc::new(SerpSearch::new(api)), settings.scraper.concurrent_requests);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Searching for '{}'...", request.query));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start_time = Instant::now();
    let results = service.search_jobs(&request).await;
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        warn!("No jobs found for the query: {}", request.query);
        return Ok(());
    }

    println!("\n=== Search Results ===");
    println!("Search Query: {}", JobSearchService::construct_search_query(&request));
    println!("Processing time: {:.2?}", start_time.elapsed());
    println!("Results: {}\n", results.len());

    for (i, job) in results.iter().enumerate() {
        println!("{}. {}", i + 1, job.title);
        if let Some(company) = job.company.as_deref().filter(|c| !c.is_empty()) {
            println!("   Company: {}", company);
        }
        if let Some(location) = job.location.as_deref().filter(|l| !l.is_empty()) {
            println!("   Location: {}", location);
        }
        if let Some(posted) = job.posted_date.as_deref().filter(|p| !p.is_empty()) {
            println!("   Posted: {}", posted);
        }
        println!("   {}", job.link);
    }

    Ok(())
}
