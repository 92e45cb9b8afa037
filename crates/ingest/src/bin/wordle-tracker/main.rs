use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ingest::{Directory, Settings};
use std::path::{Path, PathBuf};
use storage::{Database, MemoryStore, PgScoreStore, ScoreStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;

#[derive(Parser)]
#[command(name = "wordle-tracker")]
#[command(about = "Wordle group score tracker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Postgres connection; the JSON data files are used when absent
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "GUILD_ID", default_value = "default")]
    guild: String,

    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// JSON array of guild members used to resolve bare mentions
    #[arg(long)]
    members: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the scores of a streak message read from FILE or stdin
    Ingest { file: Option<PathBuf> },
    /// Retry unresolved participants against the members file
    Reresolve,
    /// Leaderboard, or the statistics of one participant
    Stats { user: Option<String> },
    /// Summary of one day, yesterday by default
    Daily { date: Option<NaiveDate> },
    /// Each score of a day against the day's and the player's average
    Relative { date: Option<NaiveDate> },
    /// Trends over the last DAYS days
    Recent { days: Option<u32> },
}

pub enum Backend {
    Postgres(PgScoreStore),
    Files(MemoryStore, bool),
}

impl Backend {
    async fn connect(
        database_url: Option<&str>,
        guild: &str,
        settings: &Settings,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match database_url {
            Some(url) => {
                tracing::debug!("Connecting to database...");
                let db = Database::new(url).await?;
                db.run_migrations().await?;
                Ok(Backend::Postgres(PgScoreStore::new(db.pool().clone(), guild)))
            }
            None => {
                let files = settings.data_files();
                let auto_save = files.auto_save;
                Ok(Backend::Files(MemoryStore::open(files).await?, auto_save))
            }
        }
    }

    pub fn store(&self) -> &dyn ScoreStore {
        match self {
            Backend::Postgres(store) => store,
            Backend::Files(store, _) => store,
        }
    }

    /// Warn when changes made through a file store stay in memory only
    pub fn report_unsaved(&self) {
        if let Backend::Files(_, false) = self {
            tracing::warn!("auto_save is off in the config; changes were not written");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "wordle_tracker={},ingest={},storage={}",
                    log_level, log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(&cli.config).await?;
    let directory = load_directory(cli.members.as_deref()).await?;
    let backend = Backend::connect(cli.database_url.as_deref(), &cli.guild, &settings).await?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Ingest { file } => {
            handlers::handle_ingest(file, today, &directory, &backend).await?;
        }
        Commands::Reresolve => {
            handlers::handle_reresolve(&directory, &backend).await?;
        }
        Commands::Stats { user } => {
            handlers::handle_stats(user, &directory, backend.store()).await?;
        }
        Commands::Daily { date } => {
            let date = report_date(date, today)?;
            handlers::handle_daily(date, &directory, backend.store()).await?;
        }
        Commands::Relative { date } => {
            let date = report_date(date, today)?;
            handlers::handle_relative(date, &directory, backend.store()).await?;
        }
        Commands::Recent { days } => {
            let days = settings.recent_days(days);
            handlers::handle_recent(days, today, &directory, backend.store()).await?;
        }
    }

    Ok(())
}

async fn load_directory(path: Option<&Path>) -> Result<Directory, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Directory::load(path).await?),
        None => {
            tracing::debug!("No members file given, bare mentions stay unresolved");
            Ok(Directory::empty())
        }
    }
}

fn report_date(
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match date {
        Some(date) => Ok(date),
        None => today
            .pred_opt()
            .ok_or_else(|| format!("No calendar day before {}", today).into()),
    }
}
