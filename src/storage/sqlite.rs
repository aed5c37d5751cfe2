//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::fields::SocialLinks;
use crate::harvest::Business;
use crate::state::ProgressState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ProgressRecord, SessionRecord, SessionStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const SESSION_COLUMNS: &str =
    "id, query, location, target, achieved, started_at, finished_at, config_hash, status";

const BUSINESS_COLUMNS: &str =
    "identifier, name, address, phone, website, email, rating, review_count, category, social_links";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        query: row.get(1)?,
        location: row.get(2)?,
        target: row.get::<_, i64>(3)? as u64,
        achieved: row.get::<_, i64>(4)? as u64,
        started_at: row.get(5)?,
        finished_at: row.get(6)?,
        config_hash: row.get(7)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(8)?)
            .unwrap_or(SessionStatus::Failed),
    })
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    Ok(ProgressRecord {
        query: row.get(0)?,
        location: row.get(1)?,
        committed_count: row.get::<_, i64>(2)? as u64,
        cursor: row.get::<_, i64>(3)? as u64,
        updated_at: row.get(4)?,
    })
}

fn business_from_row(row: &Row<'_>) -> rusqlite::Result<Business> {
    let social = match row.get::<_, Option<String>>(9)? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
        None => SocialLinks::default(),
    };

    Ok(Business {
        identifier: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        website: row.get(4)?,
        email: row.get(5)?,
        rating: row.get::<_, Option<f64>>(6)?.map(|r| r as f32),
        review_count: row.get(7)?,
        category: row.get(8)?,
        social,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Storage for SqliteStorage {
    // ===== Session Management =====

    fn create_session(
        &mut self,
        query: &str,
        location: &str,
        target: usize,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (query, location, target, started_at, config_hash, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                query,
                location,
                target as i64,
                now,
                config_hash,
                SessionStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_session(
        &mut self,
        session_id: i64,
        status: SessionStatus,
        achieved: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sessions SET status = ?1, achieved = ?2, finished_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), achieved as i64, now, session_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                params![session_id],
                session_from_row,
            )
            .optional()?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        let session = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions ORDER BY id DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                [],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn running_sessions(&self, query: &str, location: &str) -> StorageResult<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE query = ?1 AND location = ?2 AND status = ?3 ORDER BY id",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map(
                params![query, location, SessionStatus::Running.to_db_string()],
                session_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    // ===== Progress =====

    fn load_progress(&self, query: &str, location: &str) -> StorageResult<Option<ProgressRecord>> {
        let progress = self
            .conn
            .query_row(
                "SELECT query, location, committed_count, cursor, updated_at
                 FROM search_progress WHERE query = ?1 AND location = ?2",
                params![query, location],
                progress_from_row,
            )
            .optional()?;
        Ok(progress)
    }

    fn save_progress(
        &mut self,
        query: &str,
        location: &str,
        state: ProgressState,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO search_progress (query, location, committed_count, cursor, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(query, location) DO UPDATE SET
                committed_count = MAX(committed_count, excluded.committed_count),
                cursor = MAX(cursor, excluded.cursor),
                updated_at = excluded.updated_at",
            params![
                query,
                location,
                state.committed_count as i64,
                state.cursor as i64,
                now
            ],
        )?;
        Ok(())
    }

    fn list_progress(&self) -> StorageResult<Vec<ProgressRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT query, location, committed_count, cursor, updated_at
             FROM search_progress ORDER BY updated_at DESC",
        )?;
        let records = stmt
            .query_map([], progress_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // ===== Businesses =====

    fn insert_business(
        &mut self,
        session_id: i64,
        query: &str,
        location: &str,
        business: &Business,
    ) -> StorageResult<i64> {
        let social = if business.social.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&business.social)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            )
        };
        let now = Utc::now().to_rfc3339();

        let result = self.conn.execute(
            &format!(
                "INSERT INTO businesses ({}, session_id, query, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                BUSINESS_COLUMNS
            ),
            params![
                business.identifier,
                business.name,
                business.address,
                business.phone,
                business.website,
                business.email,
                business.rating.map(f64::from),
                business.review_count,
                business.category,
                social,
                session_id,
                query,
                location,
                now
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::ConstraintViolation(
                business.identifier.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn known_identifiers(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT identifier FROM businesses")?;
        let identifiers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(identifiers)
    }

    fn recent_businesses(
        &self,
        query: &str,
        location: &str,
        limit: usize,
    ) -> StorageResult<Vec<Business>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM businesses WHERE query = ?1 AND location = ?2
             ORDER BY created_at DESC, id DESC LIMIT ?3",
            BUSINESS_COLUMNS
        ))?;
        let businesses = stmt
            .query_map(params![query, location, limit as i64], business_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(businesses)
    }

    fn count_businesses(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn count_sessions_by_status(&self, status: SessionStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
