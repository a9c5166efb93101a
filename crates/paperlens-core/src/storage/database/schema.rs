use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 1;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS papers (
            id               TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            authors          TEXT NOT NULL DEFAULT '[]',
            abstract         TEXT NOT NULL DEFAULT '',
            full_text        TEXT NOT NULL,
            summary          TEXT NOT NULL DEFAULT '',
            keywords         TEXT NOT NULL DEFAULT '[]',
            year             INTEGER CHECK (year IS NULL OR year BETWEEN 1900 AND 2100),
            upload_timestamp TEXT NOT NULL,
            related_work     TEXT NOT NULL DEFAULT '[]'
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_papers_title  ON papers(title);
        CREATE INDEX IF NOT EXISTS idx_papers_year   ON papers(year);
        CREATE INDEX IF NOT EXISTS idx_papers_upload ON papers(upload_timestamp);
        ",
    )?;
    Ok(())
}
