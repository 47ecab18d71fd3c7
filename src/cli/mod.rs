//! Command-line interface.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;
mod helpers;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::load_settings;
use crate::models::SourceTable;
use crate::repository::{ArticleSearch, DateOrder};
use crate::services::DEFAULT_REANALYZE_LIMIT;

use commands::{grobid, harvest, init, pipeline, purge, search, serve, status};

#[derive(Parser)]
#[command(name = "sciharvest")]
#[command(about = "Scientific article harvesting, full-text extraction and controversy scoring")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding the database and downloaded PDFs
    #[arg(long, global = true, env = "SCIHARVEST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Which upstream a harvest run should list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HarvestTarget {
    /// OpenAlex works API
    Openalex,
    /// OAI-PMH endpoint (ArXiv)
    Oai,
    /// Every source, OpenAlex first
    #[default]
    All,
}

impl HarvestTarget {
    fn table(self) -> Option<SourceTable> {
        match self {
            HarvestTarget::Openalex => Some(SourceTable::OpenAlex),
            HarvestTarget::Oai => Some(SourceTable::Oai),
            HarvestTarget::All => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// List new records upstream, then download, extract and score them
    Harvest {
        /// Source to harvest
        #[arg(short, long, value_enum, default_value = "all")]
        source: HarvestTarget,
    },

    /// Extract text for stored articles that have none yet (no scoring)
    Backfill {
        /// Source table (defaults to the configured backfill source)
        #[arg(short, long)]
        source: Option<SourceTable>,
        /// Maximum articles to attempt
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Re-clean and re-score stored article text
    Reanalyze {
        /// Source table (openalex or oai)
        #[arg(short, long)]
        source: SourceTable,
        /// Maximum articles to re-score
        #[arg(short, long, default_value_t = DEFAULT_REANALYZE_LIMIT)]
        limit: i64,
    },

    /// Structured analysis through GROBID
    Grobid {
        #[command(subcommand)]
        command: GrobidCommands,
    },

    /// Run harvest, backfill and structured re-scoring in sequence
    Pipeline {
        /// Backfill limit for this run
        #[arg(short, long)]
        limit: Option<usize>,
        /// Keep running, one pass every interval
        #[arg(short, long)]
        daemon: bool,
        /// Seconds between passes in daemon mode
        #[arg(short, long, default_value = "86400")]
        interval: u64,
    },

    /// Search stored articles by keyword, author and publication date
    Search {
        /// Source table (openalex or oai)
        #[arg(short, long)]
        source: SourceTable,
        /// Keyword matched against title and abstract
        keyword: Option<String>,
        /// Author name fragment
        #[arg(short, long)]
        author: Option<String>,
        /// Earliest publication date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest publication date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Oldest first
        #[arg(long)]
        asc: bool,
        /// Result page, starting at 1
        #[arg(short, long, default_value = "1")]
        page: i64,
        /// Results per page
        #[arg(short, long, default_value = "10")]
        limit: i64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the web API and admin page
    Serve {
        /// Address to bind (port, host, or host:port)
        #[arg(short, long, default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Show row counts and the harvest watermark
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every article of one source
    Purge {
        /// Source table (openalex or oai)
        #[arg(short, long)]
        source: SourceTable,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum GrobidCommands {
    /// Analyze one stored article
    Analyze {
        /// Source table (openalex or oai)
        #[arg(short, long)]
        source: SourceTable,
        /// Article id
        #[arg(long)]
        id: i32,
    },
    /// Analyze articles with text and no structured record yet
    Batch {
        /// Maximum articles per source
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
    /// Re-score every stored TEI document
    Rescore,
}

/// Point the data directory elsewhere, moving a PDF directory that lived under it.
fn relocate_data_dir(settings: &mut crate::config::Settings, dir: &Path) {
    let pdf_rel = settings
        .pdf_dir
        .strip_prefix(&settings.data_dir)
        .map(Path::to_path_buf)
        .ok();
    settings.data_dir = dir.to_path_buf();
    if let Some(rel) = pdf_rel {
        settings.pdf_dir = settings.data_dir.join(rel);
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, config) = load_settings(cli.config.as_deref())
        .await
        .map_err(anyhow::Error::msg)?;
    if let Some(ref dir) = cli.data_dir {
        relocate_data_dir(&mut settings, dir);
    }
    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Harvest { source } => harvest::cmd_harvest(&settings, source.table()).await,
        Commands::Backfill { source, limit } => {
            harvest::cmd_backfill(&settings, source, limit).await
        }
        Commands::Reanalyze { source, limit } => {
            harvest::cmd_reanalyze(&settings, source, limit).await
        }
        Commands::Grobid { command } => match command {
            GrobidCommands::Analyze { source, id } => {
                grobid::cmd_grobid_analyze(&settings, source, id).await
            }
            GrobidCommands::Batch { limit } => grobid::cmd_grobid_batch(&settings, limit).await,
            GrobidCommands::Rescore => grobid::cmd_grobid_rescore(&settings).await,
        },
        Commands::Pipeline {
            limit,
            daemon,
            interval,
        } => pipeline::cmd_pipeline(&settings, limit, daemon, interval).await,
        Commands::Search {
            source,
            keyword,
            author,
            from,
            to,
            asc,
            page,
            limit,
            json,
        } => {
            let query = ArticleSearch {
                keyword,
                author,
                date_from: from,
                date_to: to,
                order: if asc { DateOrder::Asc } else { DateOrder::Desc },
            };
            search::cmd_search(&settings, source, &query, page.max(1), limit.clamp(1, 100), json)
                .await
        }
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::Status { json } => status::cmd_status(&settings, json).await,
        Commands::Purge { source, yes } => purge::cmd_purge(&settings, source, yes).await,
    }
}
