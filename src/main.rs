//! Note-Harvest main entry point
//!
//! This is the command-line interface for the Note-Harvest keyword crawler.

use anyhow::{bail, Context};
use clap::Parser;
use note_harvest::config::{load_config_with_hash, Config};
use note_harvest::output::{print_statistics, print_task_table, write_results_json, ResultSets};
use note_harvest::storage::{RecordSink, SqliteSink};
use note_harvest::Harvester;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Note-Harvest: a keyword-driven note crawler
///
/// Note-Harvest searches notes by keyword, keeps the recent ordinary ones,
/// ranks them by comment count and attaches their top comments. Keywords are
/// crawled concurrently by a polling scheduler.
#[derive(Parser, Debug)]
#[command(name = "note-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A keyword-driven note crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Keyword to crawl (repeatable)
    #[arg(short, long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,

    /// Maximum records kept per keyword
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(1..=200))]
    limit: u16,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl the keywords directly without the scheduler
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "search"])]
    once: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "search"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "search")]
    stats: bool,

    /// Search stored records by title or description and exit
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let keywords = dedup_keywords(&cli.keywords);
    let limit = usize::from(cli.limit);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &keywords, limit);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(text) = &cli.search {
        handle_search(&config, text, limit)?;
    } else if cli.once {
        handle_once(&config, &keywords, limit).await?;
    } else {
        handle_scheduled(&config, &keywords, limit).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("note_harvest=info,warn"),
            1 => EnvFilter::new("note_harvest=debug,info"),
            2 => EnvFilter::new("note_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Trims keywords and drops blanks and repeats, keeping first-seen order
fn dedup_keywords(raw: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::with_capacity(raw.len());
    for keyword in raw.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        if !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }
    keywords
}

fn require_keywords(keywords: &[String]) -> anyhow::Result<()> {
    if keywords.is_empty() {
        bail!("No keywords given; pass at least one --keyword");
    }
    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<SqliteSink> {
    let Some(path) = &config.output.database_path else {
        bail!("output.database-path is not configured");
    };
    println!("Database: {}\n", path);
    SqliteSink::new(Path::new(path)).with_context(|| format!("Failed to open {}", path))
}

fn export_results(config: &Config, results: ResultSets) -> anyhow::Result<()> {
    if let Some(path) = &config.output.results_path {
        write_results_json(Path::new(path), &results)?;
        println!("✓ Results exported to: {}", path);
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, keywords: &[String], limit: usize) {
    println!("=== Note-Harvest Dry Run ===\n");

    println!("Fetcher Configuration:");
    println!("  API base: {}", config.fetcher.api_base);
    println!("  Search path: {}", config.fetcher.search_path);
    println!("  Comment path: {}", config.fetcher.comment_path);
    println!(
        "  Request delay: {}ms (jitter {:.0}%)",
        config.fetcher.request_delay_ms,
        config.fetcher.jitter * 100.0
    );
    println!("  Concurrency: {}", config.fetcher.concurrency);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max connections: {}", config.fetcher.max_connections);
    println!(
        "  Cookies: {}",
        if config.fetcher.cookies.is_some() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nCrawler:");
    println!("  Comment limit: {}", config.crawler.comment_limit);
    println!("  Recency window: {} months", config.crawler.recency_months);
    println!("  Page retries: {}", config.crawler.page_retries);

    println!("\nScheduler:");
    println!("  Concurrency: {}", config.scheduler.concurrency);
    println!("  Poll interval: {}ms", config.scheduler.poll_interval_ms);
    match config.scheduler.crawl_timeout_secs {
        Some(secs) => println!("  Crawl timeout: {}s", secs),
        None => println!("  Crawl timeout: none"),
    }

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("-")
    );
    println!(
        "  Results: {}",
        config.output.results_path.as_deref().unwrap_or("-")
    );

    println!("\nKeywords ({}):", keywords.len());
    for keyword in keywords {
        println!("  - {}", keyword);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} keyword(s) with up to {} records each",
        keywords.len(),
        limit
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let sink = open_database(config)?;
    let stats = sink.statistics()?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --search mode: lists stored records matching the text
fn handle_search(config: &Config, text: &str, limit: usize) -> anyhow::Result<()> {
    let sink = open_database(config)?;
    let records = sink.search_records(text, limit)?;

    println!("=== {} record(s) matching '{}' ===\n", records.len(), text);
    for record in &records {
        println!(
            "{}  [{} comments, {} likes]  {}",
            record.id, record.commented_count, record.liked_count, record.title
        );
    }
    Ok(())
}

/// Handles the --once mode: crawls the keywords directly
async fn handle_once(config: &Config, keywords: &[String], limit: usize) -> anyhow::Result<()> {
    require_keywords(keywords)?;
    tracing::info!("Crawling {} keyword(s) without the scheduler", keywords.len());

    let results = note_harvest::crawler::crawl(config, keywords, limit).await?;
    for (keyword, records) in &results {
        tracing::info!("keyword={} records={}", keyword, records.len());
    }

    if let Some(path) = &config.output.database_path {
        let mut sink = SqliteSink::new(Path::new(path))?;
        for (keyword, records) in &results {
            sink.save_records(keyword, records)?;
        }
    }

    export_results(config, results.into_iter().collect())
}

/// Handles the main operation: schedules the keywords and waits for them
async fn handle_scheduled(
    config: &Config,
    keywords: &[String],
    limit: usize,
) -> anyhow::Result<()> {
    require_keywords(keywords)?;

    let mut harvester = Harvester::from_config(config)?;
    harvester.start();
    harvester.enqueue(keywords, limit).await;

    let poll = Duration::from_millis(config.scheduler.poll_interval_ms);
    tokio::select! {
        _ = harvester.wait_until_settled(keywords, poll) => {
            tracing::info!("All keywords settled");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::warn!("Interrupted, waiting for in-flight crawls to finish");
        }
    }

    harvester.shutdown().await;
    print_task_table(&harvester.list_tasks().await);

    let mut results = ResultSets::new();
    for keyword in keywords {
        if let Some(records) = harvester.get_result(keyword).await {
            results.insert(keyword.clone(), records);
        }
    }
    export_results(config, results)
}
