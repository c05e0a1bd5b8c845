mod cmd;
mod logging;

use std::path::PathBuf;

use actstats_core::config::ConfigLoader;
use actstats_core::query::terms::{Order, Select};
use actstats_core::service::TimeUnit;
use clap::{ArgGroup, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};

#[derive(Debug, Parser)]
#[command(
    name = "actstats",
    version,
    about = "Query and watch activity-scoped resource usage statistics"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resources database to use instead of the configured one
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Current activity for this process
    #[arg(long, global = true)]
    activity: Option<String>,

    /// Identity used for the :current agent
    #[arg(long, global = true)]
    application: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database schema and print resolved paths
    Init,

    /// Record uses of a resource
    Record(RecordArgs),

    /// Link a resource to an activity
    Link(LinkArgs),

    /// Remove a resource's link to an activity
    Unlink(LinkArgs),

    /// Set the title or mimetype of a resource
    Info(InfoArgs),

    /// Run a query once and print the results
    Query(QueryArgs),

    /// Forget usage statistics
    Forget(ForgetArgs),

    /// Keep a live view of a query, applying JSON events read from stdin
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct OwnerArgs {
    /// Agent, or :current / :global
    #[arg(long, default_value = ":current")]
    pub agent: String,

    /// Activity, or :current / :global
    #[arg(long = "in", default_value = ":current")]
    pub in_activity: String,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    pub resource: String,

    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Number of uses to record
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// When the use happened (RFC 3339), defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    pub resource: String,

    #[command(flatten)]
    pub owner: OwnerArgs,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("fields").required(true).multiple(true).args(["title", "mimetype"])))]
pub struct InfoArgs {
    pub resource: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub mimetype: Option<String>,
}

/// Terms shared by `query` and `watch`.
#[derive(Debug, Args)]
pub struct TermArgs {
    /// linked, used or all
    #[arg(long, default_value = "all")]
    pub select: Select,

    /// score, recently-used, recently-created, url or title
    #[arg(long, default_value = "score")]
    pub order: Order,

    #[arg(long = "agent")]
    pub agents: Vec<String>,

    /// Activities to search in
    #[arg(long = "in")]
    pub activities: Vec<String>,

    /// Mimetype globs, or :files / :directories
    #[arg(long = "type")]
    pub types: Vec<String>,

    #[arg(long = "url")]
    pub urls: Vec<String>,

    #[arg(long = "title")]
    pub titles: Vec<String>,

    /// YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub limit: u32,

    #[arg(long, default_value_t = 0, requires = "limit")]
    pub offset: u32,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub terms: TermArgs,

    /// Output one JSON object per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("what").required(true).args(["resource", "recent", "earlier"])))]
pub struct ForgetArgs {
    /// Resource or `*` glob to forget
    pub resource: Option<String>,

    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Forget the last COUNT units of statistics
    #[arg(long, value_name = "COUNT")]
    pub recent: Option<u32>,

    #[arg(long, default_value = "days", requires = "recent")]
    pub unit: TimeUnit,

    /// Forget statistics older than MONTHS months
    #[arg(long, value_name = "MONTHS")]
    pub earlier: Option<u32>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub terms: TermArgs,

    /// Client id under which manual orderings are stored
    #[arg(long)]
    pub client: Option<String>,

    /// Print the final rows when stdin is exhausted
    #[arg(long)]
    pub dump: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(cli.config.as_deref(), cli.application.as_deref())
        .map_err(|e| eyre!("Configuration error: {e}"))?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    logging::init(&config.logging)?;

    let env = cmd::Env::new(config, cli.activity);

    match cli.command {
        Commands::Init => cmd::init::run(&env),
        Commands::Record(args) => cmd::record::run(&env, args),
        Commands::Link(args) => cmd::link::run(&env, args, true),
        Commands::Unlink(args) => cmd::link::run(&env, args, false),
        Commands::Info(args) => cmd::info::run(&env, args),
        Commands::Query(args) => cmd::query::run(&env, args),
        Commands::Forget(args) => cmd::forget::run(&env, args),
        Commands::Watch(args) => cmd::watch::run(&env, args),
    }
}
