//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::harvest::Business;
use crate::state::ProgressState;
use crate::storage::{ProgressRecord, SessionRecord, SessionStatus};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A uniqueness constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl StorageError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store is the only source of truth shared between runs. Callers must
/// treat every insert as possibly racing with another writer; uniqueness of
/// business identifiers is enforced here, not by the caller.
pub trait Storage {
    // ===== Session Management =====

    /// Creates a new session in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created session
    fn create_session(
        &mut self,
        query: &str,
        location: &str,
        target: usize,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Marks a session finished with its final status and achieved count
    fn finish_session(
        &mut self,
        session_id: i64,
        status: SessionStatus,
        achieved: usize,
    ) -> StorageResult<()>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord>;

    /// Gets the most recent session
    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>>;

    /// Gets sessions for a search that are still marked running
    fn running_sessions(&self, query: &str, location: &str) -> StorageResult<Vec<SessionRecord>>;

    // ===== Progress =====

    /// Loads the stored progress for a search, if any
    fn load_progress(&self, query: &str, location: &str) -> StorageResult<Option<ProgressRecord>>;

    /// Saves progress for a search
    ///
    /// Neither the committed count nor the cursor is ever lowered: on
    /// conflict the larger of the stored and supplied values is kept.
    fn save_progress(
        &mut self,
        query: &str,
        location: &str,
        state: ProgressState,
    ) -> StorageResult<()>;

    /// Lists progress for every search, most recently updated first
    fn list_progress(&self) -> StorageResult<Vec<ProgressRecord>>;

    // ===== Businesses =====

    /// Inserts a business record
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` when a record with the
    /// same identifier already exists.
    fn insert_business(
        &mut self,
        session_id: i64,
        query: &str,
        location: &str,
        business: &Business,
    ) -> StorageResult<i64>;

    /// Returns every stored business identifier
    fn known_identifiers(&self) -> StorageResult<HashSet<String>>;

    /// Returns up to `limit` records for a search, most recently created first
    fn recent_businesses(
        &self,
        query: &str,
        location: &str,
        limit: usize,
    ) -> StorageResult<Vec<Business>>;

    /// Counts all stored businesses
    fn count_businesses(&self) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Counts sessions by status
    fn count_sessions_by_status(&self, status: SessionStatus) -> StorageResult<u64>;
}
