pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::aggregator::NewsAggregator;
use crate::config::LoggingConfig;
use crate::error::Result;
use crate::sources::ALL_CATEGORY;

#[derive(Parser)]
#[command(name = "news-station")]
#[command(about = "Aggregated, cached news from Hacker News, Reddit, GitHub Trending and RSS feeds")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the merged feed for a category
    Feed {
        #[arg(short = 'C', long, default_value = ALL_CATEGORY)]
        category: String,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Bypass the cache
        #[arg(short, long)]
        refresh: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show one article by id
    Article {
        id: String,

        /// Bypass the cache
        #[arg(short, long)]
        refresh: bool,

        #[arg(long)]
        json: bool,
    },

    /// Fetch the full text of an article
    Content { id: String },

    /// Show article counts per category
    Categories {
        #[arg(long)]
        json: bool,

        /// Also print feed and article cache statistics
        #[arg(long)]
        stats: bool,
    },

    /// Show the latest articles of one source
    Source {
        /// Source id, see `news-station sources`
        id: String,

        /// Only answer if the source belongs to this category
        #[arg(short = 'C', long, default_value = ALL_CATEGORY)]
        category: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long)]
        refresh: bool,

        #[arg(long)]
        json: bool,
    },

    /// List configured news sources
    Sources,

    /// Show the most engaged articles of the last day
    Trending {
        #[arg(short = 'C', long, default_value = ALL_CATEGORY)]
        category: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Completions { shell } => {
                commands::generate_completions(shell);
                Ok(())
            }
            Commands::Init { force } => {
                let _guard = commands::init_logging(self.debug, self.verbose, &LoggingConfig::default())?;
                commands::init(self.config, force).await
            }
            command => {
                let config = commands::load_config(self.config.as_deref())?;
                let _guard = commands::init_logging(self.debug, self.verbose, &config.logging)?;
                let aggregator = NewsAggregator::from_config(&config)?;

                execute(command, &aggregator).await
            }
        }
    }
}

async fn execute(command: Commands, aggregator: &NewsAggregator) -> Result<()> {
    match command {
        Commands::Feed { category, page, limit, refresh, json } => {
            commands::show_feed(aggregator, &category, page, limit, refresh, json).await
        }
        Commands::Article { id, refresh, json } => commands::show_article(aggregator, &id, refresh, json).await,
        Commands::Content { id } => commands::show_content(aggregator, &id).await,
        Commands::Categories { json, stats } => commands::list_categories(aggregator, json, stats).await,
        Commands::Source { id, category, limit, refresh, json } => {
            commands::show_source(aggregator, &id, &category, limit, refresh, json).await
        }
        Commands::Sources => commands::list_sources(aggregator).await,
        Commands::Trending { category, limit, json } => {
            commands::show_trending(aggregator, &category, limit, json).await
        }
        // Handled before configuration is loaded.
        Commands::Init { .. } | Commands::Completions { .. } => Ok(()),
    }
}
