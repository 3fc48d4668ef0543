use clap::{Parser, Subcommand, ValueEnum};
use reviewdesk_core::{ArticleId, Role};
use std::path::PathBuf;

/// Top-level CLI parser for the `reviewdesk` binary.
#[derive(Debug, Parser)]
#[command(
    name = "reviewdesk",
    version,
    about = "Balanced two-reviewer article allocation and review tracking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file (defaults to ./reviewdesk.toml when present)
    #[arg(long, global = true, env = "REVIEWDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "REVIEWDESK_DB")]
    pub db: Option<PathBuf>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "REVIEWDESK_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "REVIEWDESK_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or migrate the database schema
    InitDb,
    /// Manage reviewer accounts
    Reviewer {
        #[command(subcommand)]
        action: ReviewerCommand,
    },
    /// Manage the article pool
    Article {
        #[command(subcommand)]
        action: ArticleCommand,
    },
    /// Record third-party analysis results
    Analysis {
        #[command(subcommand)]
        action: AnalysisCommand,
    },
    /// Regenerate all assignments (two distinct verificators per article)
    Allocate {
        /// Allow dropping assignments that already carry decisions
        #[arg(long)]
        discard_reviews: bool,
        /// Seed for a reproducible distribution
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Record a relevance decision
    Submit {
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        article: ArticleId,
        /// relevant|not_relevant (also true|false)
        #[arg(long)]
        decision: Option<String>,
    },
    /// Print a reviewer's ordered queue
    Queue {
        #[arg(long)]
        reviewer: String,
    },
    /// Print the article a reviewer should continue with
    Resume {
        #[arg(long)]
        reviewer: String,
    },
    /// Print previous/next articles around a queue position
    Neighbors {
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        article: ArticleId,
    },
    /// Show one article in a reviewer's workflow
    View {
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        article: ArticleId,
    },
    /// Show a reviewer's landing summary
    Dashboard {
        #[arg(long)]
        reviewer: String,
    },
    /// Completion counters, globally or for one reviewer
    Progress {
        #[arg(long)]
        reviewer: Option<String>,
    },
    /// Verificators ranked by completion
    Leaderboard,
    /// Relevant-analysis counts crossed with article source
    Breakdown,
}

#[derive(Debug, Subcommand)]
pub enum ReviewerCommand {
    /// Create a reviewer or update the role of an existing one
    Add {
        username: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Verificator)]
        role: RoleArg,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ArticleCommand {
    Add {
        #[arg(long)]
        id: ArticleId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        doi: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long = "abstract")]
        abstract_text: Option<String>,
    },
    List,
    /// Delete an article with its assignments and analyses
    Delete {
        id: ArticleId,
    },
}

#[derive(Debug, Subcommand)]
pub enum AnalysisCommand {
    Add {
        #[arg(long)]
        article: ArticleId,
        #[arg(long)]
        model: String,
        /// Verdict of the analysis; omit when it produced none
        #[arg(long)]
        relevant: Option<bool>,
        #[arg(long)]
        justification: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Verificator,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::Verificator => Role::Verificator,
        }
    }
}
