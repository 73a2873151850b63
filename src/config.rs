use crate::adapter::AdapterConfig;
use crate::types::FetchMode;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "dbsplit")]
#[command(about = "dbsplit - run SQL through a read/write splitting router over SQLite", long_about = None)]
pub struct Config {
    // Backends
    #[arg(short, long, default_value = "sqlite.db", env = "DBSPLIT_PRIMARY", help = "Primary database path")]
    pub primary: String,

    #[arg(short, long, env = "DBSPLIT_REPLICA", help = "Replica database path; reads go to the primary when unset")]
    pub replica: Option<String>,

    #[arg(long, env = "DBSPLIT_REPLICA_READ_WRITE", help = "Open the replica read-write instead of read-only")]
    pub replica_read_write: bool,

    // SQLite PRAGMA settings, applied to writable connections only
    #[arg(long, default_value = "WAL", env = "DBSPLIT_JOURNAL_MODE", help = "SQLite journal mode (WAL, DELETE, TRUNCATE, etc.)")]
    pub journal_mode: String,

    #[arg(long, default_value = "NORMAL", env = "DBSPLIT_SYNCHRONOUS", help = "SQLite synchronous mode (NORMAL, FULL, OFF)")]
    pub synchronous: String,

    #[arg(long, default_value = "5000", env = "DBSPLIT_BUSY_TIMEOUT_MS", help = "SQLite busy timeout in milliseconds")]
    pub busy_timeout_ms: u64,

    // Output
    #[arg(long, default_value = "info", env = "DBSPLIT_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = FetchMode::Assoc, env = "DBSPLIT_FETCH_MODE")]
    pub fetch_mode: FetchMode,

    #[arg(long, env = "DBSPLIT_JSON", help = "Print results as JSON lines")]
    pub json: bool,

    #[arg(long, env = "DBSPLIT_PROFILE", help = "Print the query profile of each backend on exit")]
    pub profile: bool,

    /// Statements to run in order; `BEGIN`, `COMMIT` and `ROLLBACK` drive
    /// the router's transaction calls
    #[arg(required = true)]
    pub statements: Vec<String>,
}

impl Config {
    /// Resolve the configuration from CLI args and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn primary_config(&self) -> AdapterConfig {
        AdapterConfig::new("primary", &self.primary)
            .with_journal_mode(&self.journal_mode)
            .with_synchronous(&self.synchronous)
            .with_busy_timeout(self.busy_timeout_ms)
    }

    pub fn replica_config(&self) -> Option<AdapterConfig> {
        self.replica.as_ref().map(|path| {
            AdapterConfig::new("replica", path)
                .with_read_only(!self.replica_read_write)
                .with_busy_timeout(self.busy_timeout_ms)
        })
    }
}
