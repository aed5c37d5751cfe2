//! Storage module for persisting harvest data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Session tracking for every run
//! - Committed business records, unique by identifier
//! - Per-search progress used to resume later runs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a harvest session in the database
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub query: String,
    pub location: String,
    pub target: u64,
    pub achieved: u64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionStatus,
}

/// Stored progress for one (query, location) search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub query: String,
    pub location: String,
    pub committed_count: u64,
    pub cursor: u64,
    pub updated_at: String,
}

/// Status of a harvest session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Shortfall,
    Failed,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Shortfall => "shortfall",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "shortfall" => Some(Self::Shortfall),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> [SessionStatus; 4] {
        [Self::Running, Self::Completed, Self::Shortfall, Self::Failed]
    }
}
