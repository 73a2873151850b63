//! Read/write splitting database router.
//!
//! [`session::ReplicationAdapter`] sits in front of a primary adapter and an
//! optional read replica, sending reads issued outside a transaction to the
//! replica and everything else to the primary.
//!
//! ```rust,ignore
//! use dbsplit::adapter::{AdapterConfig, DatabaseAdapter, SqliteAdapter};
//! use dbsplit::session::ReplicationAdapter;
//!
//! let primary = SqliteAdapter::new(AdapterConfig::new("primary", "app.db"));
//! let replica = SqliteAdapter::new(AdapterConfig::new("replica", "app-replica.db").with_read_only(true));
//! let mut db = ReplicationAdapter::with_replica(Box::new(primary), Box::new(replica));
//!
//! db.insert("users", &[("name", "ann".into())])?;          // primary
//! let users = db.fetch_all("SELECT * FROM users", &[])?;   // replica
//! ```

pub mod adapter;
pub mod config;
pub mod profiling;
pub mod query;
pub mod session;
pub mod types;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbSplitError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Feature not supported: {0}")]
    NotSupported(String),

    #[error("Adapter error: {0}")]
    Adapter(String),
}

pub type Result<T> = std::result::Result<T, DbSplitError>;

pub use adapter::DatabaseAdapter;
pub use session::ReplicationAdapter;
pub use types::Value;
