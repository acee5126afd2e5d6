//! # essay_translate
//!
//! Scrapes a static essay site and translates every essay into Simplified
//! Chinese, one paragraph at a time, through an OpenAI-compatible chat API.
//!
//! ## Usage
//!
//! ```sh
//! essay_translate index                  # articles.json, newest first
//! essay_translate extract                # processed/<slug>.json per essay
//! essay_translate translate batch        # first pass
//! essay_translate retranslate            # retry anything not complete
//! essay_translate status
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: read the essay list page and date each essay
//! 2. **Extraction**: download each essay and split it into paragraphs
//! 3. **Translation**: a sequential, rate-limited pass per article, persisted
//!    after every article; failures stay in the record as placeholders
//! 4. **Retry**: later runs select articles by status and translate them again

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod driver;
mod error;
mod index;
mod models;
mod processor;
mod retry;
mod scrapers;
mod state;
mod status;
mod store;
mod translator;
mod utils;

use cli::{BatchArgs, Cli, Command, TranslateCommand};
use config::Settings;
use driver::{BatchDriver, BatchOptions, BatchReport, Selection};
use processor::RetranslatePolicy;
use scrapers::content::{extract_all, ExtractOptions};
use status::StatusReport;
use store::JsonDirStore;
use translator::{ChatClient, Translator};
use utils::ensure_writable_dir;

/// Pause between articles when `check` retries them.
const CHECK_ARTICLE_PAUSE: Duration = Duration::from_secs(2);
/// Per-article deadline for `check` when the config sets none.
const CHECK_ARTICLE_TIMEOUT: Duration = Duration::from_secs(300);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    debug!(data_dir = %args.data_dir.display(), command = ?args.command, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref())?;

    match args.command {
        Command::Translate(_) | Command::Retranslate { .. } | Command::Check { .. } => {
            // A missing key fails before the data directory is touched.
            let client = match ChatClient::new(&settings.api, args.api_key.clone()) {
                Ok(client) => client,
                Err(e) => {
                    error!(error = %e, "Cannot start translation");
                    return Err(e.into());
                }
            };
            let translator = Translator::from_settings(client, &settings);
            let store = open_store(&args.data_dir).await?;
            run_translation(args.command, &store, &translator, &settings).await?;
        }
        command => {
            let store = open_store(&args.data_dir).await?;
            run_maintenance(command, &args.data_dir, &store, &settings).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn open_store(data_dir: &Path) -> Result<JsonDirStore, Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(data_dir).await {
        error!(
            path = %data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    Ok(JsonDirStore::open(data_dir).await?)
}

/// Commands that scrape or report; no API key needed.
async fn run_maintenance(
    command: Command,
    data_dir: &Path,
    store: &JsonDirStore,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Index => {
            let client = scrapers::http_client(&settings.site)?;
            let entries = scrapers::listing::index_articles(&client, &settings.site).await?;
            let entries = index::order_index(entries);
            index::save_index(data_dir, &entries).await?;
        }
        Command::FixDates => {
            let entries = index::order_index(index::load_index(data_dir).await?);
            index::save_index(data_dir, &entries).await?;
            println!("Newest articles:");
            for entry in entries.iter().take(5) {
                println!("{:3}. {} - {}", entry.id, entry.title, entry.date);
            }
        }
        Command::Extract { only, force } => {
            let entries = index::load_index(data_dir).await?;
            let client = scrapers::http_client(&settings.site)?;
            let options = ExtractOptions { force, only };
            let report = extract_all(&client, &entries, store, &settings.site, &options).await;
            println!(
                "Extraction done: {} created, {} skipped, {} failed",
                report.created, report.skipped, report.failed
            );
        }
        Command::Status => {
            print!("{}", StatusReport::build(store).await?);
        }
        Command::Translate(_) | Command::Retranslate { .. } | Command::Check { .. } => {
            unreachable!("translation commands are dispatched by main")
        }
    }
    Ok(())
}

/// Commands that call the translation API.
async fn run_translation(
    command: Command,
    store: &JsonDirStore,
    translator: &Translator<ChatClient>,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    let report = match command {
        Command::Translate(TranslateCommand::Single { id }) => {
            let options = BatchOptions::from_settings(Selection::Single(id.clone()), &settings.batch);
            BatchDriver::new(store, translator, options).run_for_id(&id).await?
        }
        Command::Translate(TranslateCommand::Batch(batch)) => {
            let options = batch_options(Selection::FirstPass, settings, &batch);
            BatchDriver::new(store, translator, options).run().await?
        }
        Command::Retranslate { target, failed_only, max_rounds } => {
            let selection = match target {
                Some(target) => Selection::Single(target),
                None => Selection::RetryFailures,
            };
            let mut options = BatchOptions::from_settings(selection, &settings.batch);
            options.max_rounds = max_rounds;
            if failed_only {
                options.policy = RetranslatePolicy::FailedOnly;
            }
            BatchDriver::new(store, translator, options).run().await?
        }
        Command::Check { auto } => {
            let mut options = BatchOptions::from_settings(Selection::RetryFailures, &settings.batch);
            options.article_pause = CHECK_ARTICLE_PAUSE;
            options.article_timeout.get_or_insert(CHECK_ARTICLE_TIMEOUT);
            let driver = BatchDriver::new(store, translator, options);

            let keys = driver.candidates().await?;
            if keys.is_empty() {
                println!("All articles are translated.");
                return Ok(());
            }
            println!("{} articles need translation:", keys.len());
            for (i, key) in keys.iter().enumerate() {
                println!("  {}. {key}", i + 1);
            }
            if !auto && !confirm("Retranslate these articles? (y/n): ").await? {
                info!("Cancelled by user");
                return Ok(());
            }
            driver.run().await?
        }
        Command::Index | Command::FixDates | Command::Extract { .. } | Command::Status => {
            unreachable!("maintenance commands are dispatched by main")
        }
    };
    print_report(&report);
    Ok(())
}

fn batch_options(selection: Selection, settings: &Settings, batch: &BatchArgs) -> BatchOptions {
    let mut options = BatchOptions::from_settings(selection, &settings.batch);
    options.max_rounds = batch.max_rounds;
    options.max_articles = batch.max_articles;
    options.time_budget = batch.time_budget_secs.map(Duration::from_secs);
    options
}

/// Ask on stdin; end of input counts as yes.
async fn confirm(question: &str) -> Result<bool, Box<dyn Error>> {
    print!("{question}");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await? {
        Some(answer) => Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")),
        None => {
            info!("No input available; continuing automatically");
            Ok(true)
        }
    }
}

fn print_report(report: &BatchReport) {
    println!(
        "Done: {} attempted, {} saved, {} failed, {} skipped, {} complete",
        report.attempted, report.succeeded, report.failed, report.skipped, report.completed
    );
}
