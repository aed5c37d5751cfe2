//! Database schema definitions
//!
//! This module contains the SQL schema for the Places-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per harvest run
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    location TEXT NOT NULL,
    target INTEGER NOT NULL,
    achieved INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_search ON sessions(query, location);
CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);

-- Committed business records, unique by identifier across all runs
CREATE TABLE IF NOT EXISTS businesses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier TEXT NOT NULL UNIQUE,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    query TEXT NOT NULL,
    location TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    website TEXT,
    email TEXT,
    rating REAL,
    review_count INTEGER,
    category TEXT,
    social_links TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_businesses_search ON businesses(query, location);
CREATE INDEX IF NOT EXISTS idx_businesses_created ON businesses(created_at);

-- Resumption state per (query, location)
CREATE TABLE IF NOT EXISTS search_progress (
    query TEXT NOT NULL,
    location TEXT NOT NULL,
    committed_count INTEGER NOT NULL DEFAULT 0,
    cursor INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (query, location)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
