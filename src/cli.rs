//! Command-line interface definitions for essay_translate.
//!
//! Global options select the data directory, an optional YAML config file and
//! the translation API key. The key can also come from `TRANSLATE_API_KEY`,
//! including one set in a `.env` file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Scrape essays, then translate them paragraph by paragraph into Chinese.
///
/// # Examples
///
/// ```sh
/// essay_translate index
/// essay_translate extract
/// essay_translate translate batch --max-articles 20
/// essay_translate retranslate --failed-only
/// essay_translate check --auto
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding articles.json and processed/
    #[arg(short, long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Optional path to a config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Translation API key
    #[arg(long, global = true, env = "TRANSLATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the essay list and publication dates into articles.json
    Index,

    /// Re-validate dates in articles.json, then reorder and renumber it
    FixDates,

    /// Download indexed essays and split them into paragraphs
    Extract {
        /// Only this page filename, e.g. greatwork.html
        #[arg(long)]
        only: Option<String>,

        /// Re-extract essays that already have a record
        #[arg(long)]
        force: bool,
    },

    /// Print how many articles are untranslated, partial and complete
    Status,

    /// First-pass translation
    #[command(subcommand)]
    Translate(TranslateCommand),

    /// Translate again every article that is not complete, or one target
    Retranslate {
        /// Record filename; `.json` is appended when missing
        target: Option<String>,

        /// Keep paragraphs that are already translated
        #[arg(long)]
        failed_only: bool,

        #[arg(long, default_value_t = 1)]
        max_rounds: usize,
    },

    /// List unfinished articles and retranslate them after confirmation
    Check {
        /// Skip the confirmation prompt
        #[arg(long)]
        auto: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TranslateCommand {
    /// Translate one article by id (or record name without `.json`)
    Single { id: String },

    /// Translate every untranslated article
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Stop after this many articles
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Selection passes over the store
    #[arg(long, default_value_t = 1)]
    pub max_rounds: usize,

    /// Stop starting new articles after this many seconds
    #[arg(long)]
    pub time_budget_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["essay_translate", "status"]);
        assert_eq!(cli.data_dir, PathBuf::from("data"));
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "essay_translate",
            "extract",
            "--only",
            "greatwork.html",
            "--data-dir",
            "/tmp/essays",
            "--api-key",
            "sk-test",
        ]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/essays"));
        assert_eq!(cli.api_key.as_deref(), Some("sk-test"));
        match cli.command {
            Command::Extract { only, force } => {
                assert_eq!(only.as_deref(), Some("greatwork.html"));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_translate_batch_args() {
        let cli = Cli::parse_from([
            "essay_translate",
            "translate",
            "batch",
            "--max-articles",
            "5",
            "--time-budget-secs",
            "600",
        ]);
        match cli.command {
            Command::Translate(TranslateCommand::Batch(args)) => {
                assert_eq!(args.max_articles, Some(5));
                assert_eq!(args.max_rounds, 1);
                assert_eq!(args.time_budget_secs, Some(600));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_translate_single_and_retranslate() {
        let cli = Cli::parse_from(["essay_translate", "translate", "single", "42"]);
        assert!(matches!(
            cli.command,
            Command::Translate(TranslateCommand::Single { ref id }) if id == "42"
        ));

        let cli = Cli::parse_from(["essay_translate", "retranslate", "greatwork", "--failed-only"]);
        match cli.command {
            Command::Retranslate { target, failed_only, max_rounds } => {
                assert_eq!(target.as_deref(), Some("greatwork"));
                assert!(failed_only);
                assert_eq!(max_rounds, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_check_auto() {
        let cli = Cli::parse_from(["essay_translate", "check", "--auto"]);
        assert!(matches!(cli.command, Command::Check { auto: true }));
    }
}
