//! Command implementations.
//!
//! Every command returns the text to print so `main` owns stdout.

pub mod history;
pub mod progression;
pub mod referrals;
pub mod sweep;
pub mod tiers;

pub use self::history::execute_history;
pub use self::progression::{
    execute_agents, execute_enroll, execute_evaluate, execute_expire, execute_show,
    execute_start, execute_status,
};
pub use self::referrals::{execute_commission, execute_record_referrals};
pub use self::sweep::execute_sweep;
pub use self::tiers::execute_tiers;

use crate::cli::Command;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use ascend_engine::{ChallengeEngine, ProgressionService, SystemClock};
use ascend_store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Service wired to the SQLite store and wall-clock time.
pub type Service =
    ProgressionService<Arc<SqliteStore>, Arc<SqliteStore>, Arc<SqliteStore>, SystemClock>;

/// Everything a command needs.
pub struct App {
    /// Loaded configuration
    pub config: Config,
    /// Store backing every port
    pub store: Arc<SqliteStore>,
    /// Progression operations
    pub service: Arc<Service>,
    /// Output rendering
    pub formatter: Formatter,
}

impl App {
    /// Open the database named by `database`, or by the config.
    pub fn open(config: Config, database: Option<PathBuf>, formatter: Formatter) -> Result<Self> {
        let path = database.unwrap_or_else(|| config.database.clone());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!("Opening database {}", path.display());
        let store = Arc::new(SqliteStore::new(&path)?);
        Self::with_store(config, store, formatter)
    }

    /// Build around an already opened store.
    pub fn with_store(config: Config, store: Arc<SqliteStore>, formatter: Formatter) -> Result<Self> {
        let engine = ChallengeEngine::new(Arc::new(config.catalog()?), config.engine.clone());
        let service = Arc::new(ProgressionService::new(
            engine,
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            SystemClock,
        ));
        Ok(Self {
            config,
            store,
            service,
            formatter,
        })
    }
}

/// Run one parsed command.
pub async fn execute(command: Command, app: &App) -> Result<String> {
    match command {
        Command::Enroll(args) => execute_enroll(args, app),
        Command::Start(args) => execute_start(args, app),
        Command::Evaluate(args) => execute_evaluate(args, app),
        Command::Expire(args) => execute_expire(args, app),
        Command::Status(args) => execute_status(args, app),
        Command::Show(args) => execute_show(args, app),
        Command::Agents => execute_agents(app),
        Command::RecordReferrals(args) => execute_record_referrals(args, app),
        Command::Commission(args) => execute_commission(args, app),
        Command::History(args) => execute_history(args, app),
        Command::Tiers => execute_tiers(app),
        Command::Sweep(args) => execute_sweep(args, app).await,
    }
}
