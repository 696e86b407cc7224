//! Pullwatch - Docker Hub pull-count tracker
//!
//! A CLI tool that polls the Docker Hub API for the pull counts of a
//! list of images, appends daily samples to per-image CSV history
//! files, and renders line charts plus a static index page.
//!
//! Exit codes:
//!   0 - Success (including runs where individual images failed and were skipped)
//!   1 - Runtime error (unreadable list/config, uncreatable directories, etc.)

mod aggregate;
mod cli;
mod config;
mod history;
mod models;
mod registry;
mod report;

use anyhow::{Context, Result};
use chrono::Local;
use cli::Args;
use config::Config;
use futures::stream::{self, StreamExt};
use history::HistoryStore;
use models::{ImageCount, TrackedList};
use registry::{FetchError, RegistryClient};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Pullwatch v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the tracker
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .pullwatch.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".pullwatch.toml");

    if path.exists() {
        eprintln!("⚠️  .pullwatch.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .pullwatch.toml")?;

    println!("✅ Created .pullwatch.toml with default settings.");
    println!("   Edit it to customize directories, registry URL, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete tracking workflow: fetch, aggregate, append, render.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Load the tracked-image list
    let Some(ref list_path) = args.list else {
        anyhow::bail!("A list file is required (--list)");
    };
    let list = TrackedList::load(list_path)?;
    info!(
        "Tracking {} images and {} sums from {}",
        list.images.len(),
        list.sums.len(),
        list_path.display()
    );

    // Step 1: Fetch current pull counts
    println!("📥 Fetching pull counts for {} images...", list.images.len());
    let client = RegistryClient::with_url_base(
        &config.registry.url_base,
        config.registry.timeout_seconds,
    )?;
    let fetched = fetch_counts(&client, &list.images, config.general.concurrency.max(1)).await;

    let mut entities: Vec<ImageCount> = Vec::new();
    let mut fetch_failures = 0usize;
    for (image, result) in fetched {
        match result {
            Ok(count) => entities.push(ImageCount { name: image, count }),
            Err(e) => {
                warn!("Skipping image '{}': {}", image, e);
                fetch_failures += 1;
            }
        }
    }

    // Step 2: Resolve sums from this run's counts. All raw images are
    // resolved before any sum is computed.
    let latest: HashMap<String, u64> = entities
        .iter()
        .map(|e| (e.name.clone(), e.count))
        .collect();
    entities.extend(aggregate::resolve_sums(&list.sums, &latest));

    // Handle --dry-run: print counts and exit
    if args.dry_run {
        return handle_dry_run(&entities, fetch_failures);
    }

    // Step 3: Append one sample per entity
    let store = HistoryStore::open(&config.general.data_dir)
        .with_context(|| format!("Failed to open data directory: {}", config.general.data_dir))?;
    let today = Local::now().date_naive();

    let mut appended: Vec<&ImageCount> = Vec::new();
    let mut append_failures = 0usize;
    for entity in &entities {
        match store.append_sample(&entity.name, entity.count, today) {
            Ok(sample) => {
                info!("Appended sample '{}' for '{}'", sample, entity.name);
                appended.push(entity);
            }
            Err(e) => {
                warn!("Skipping history update for '{}': {}", entity.name, e);
                append_failures += 1;
            }
        }
    }

    // Step 4: Render charts and the index
    let mut charts_rendered = 0usize;
    if !args.no_render {
        println!("📈 Rendering {} charts...", appended.len());

        let render_dir = Path::new(&config.general.render_dir);
        std::fs::create_dir_all(render_dir).with_context(|| {
            format!("Failed to create render directory: {}", render_dir.display())
        })?;

        for entity in &appended {
            match store.read_series(&entity.name) {
                Ok(series) => {
                    let releases = list.releases_for(&entity.name);
                    match report::write_chart(render_dir, &entity.name, &series, releases) {
                        Ok(path) => {
                            info!("Rendered chart for '{}' at {}", entity.name, path.display());
                            charts_rendered += 1;
                        }
                        Err(e) => warn!("Failed to render chart for '{}': {}", entity.name, e),
                    }
                }
                Err(e) => warn!("Failed to read series for '{}': {}", entity.name, e),
            }
        }

        let indexed: Vec<ImageCount> = appended.iter().map(|e| (*e).clone()).collect();
        report::write_index(
            Path::new(&config.report.index_file),
            render_link_prefix(&config.general.render_dir),
            &indexed,
        )?;
        info!("Wrote index to {}", config.report.index_file);
    }

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Run summary:");
    println!(
        "   Images fetched: {} ({} failed)",
        entities.len().saturating_sub(list.sums.len()),
        fetch_failures
    );
    println!(
        "   Samples appended: {} ({} failed)",
        appended.len(),
        append_failures
    );
    if !args.no_render {
        println!("   Charts rendered: {}", charts_rendered);
        println!("   Index: {}", config.report.index_file);
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Run complete.");

    Ok(())
}

/// Fetch the pull counts of all images, at most `concurrency` in flight.
/// Results keep the list order; failures are returned per image so one
/// unreachable image never aborts the run.
async fn fetch_counts(
    client: &RegistryClient,
    images: &[String],
    concurrency: usize,
) -> Vec<(String, Result<u64, FetchError>)> {
    stream::iter(images.iter().cloned())
        .map(|image| async move {
            info!("Fetching pull count for image '{}'", image);
            let result = client.fetch_pull_count(&image).await;
            (image, result)
        })
        .buffered(concurrency)
        .collect()
        .await
}

/// Handle --dry-run: print the fetched counts and computed sums, write nothing.
fn handle_dry_run(entities: &[ImageCount], fetch_failures: usize) -> Result<()> {
    println!("\n🔍 Dry run: current counts (nothing written)\n");

    for entity in entities {
        println!("   {:>15}  {}", entity.human_count(), entity.name);
    }
    if fetch_failures > 0 {
        println!("\n   {} images failed to fetch.", fetch_failures);
    }

    println!("\n✅ Dry run complete. No files were written.");
    Ok(())
}

/// Link prefix used by the index page to reach the rendered charts.
fn render_link_prefix(render_dir: &str) -> &str {
    render_dir.trim_start_matches("./").trim_end_matches('/')
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .pullwatch.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
