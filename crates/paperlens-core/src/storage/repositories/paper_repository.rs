use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{IngestionResult, PaperId, PaperSummaryView, RelatedWork, StoredPaper};
use crate::storage::database::{self, ConnectionPool};

/// Persistence collaborator for ingested papers.
///
/// `create` is the only operation the ingestion pipeline needs; the read
/// path serves the CLI.
pub trait PaperStore: Send + Sync {
    fn create(&self, record: &IngestionResult) -> Result<PaperId>;
    fn find_by_id(&self, id: &PaperId) -> Result<Option<StoredPaper>>;
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<PaperSummaryView>>;
    fn count(&self) -> Result<usize>;
}

pub struct SqlitePaperStore {
    pool: ConnectionPool,
}

impl SqlitePaperStore {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        Ok(Self {
            pool: database::open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            pool: database::open_in_memory()?,
        })
    }

    fn row_to_paper(row: &Row) -> rusqlite::Result<StoredPaper> {
        Ok(StoredPaper {
            id: parse_id(row, 0)?,
            record: IngestionResult {
                title: row.get(1)?,
                authors: json_column(row, 2)?,
                abstract_text: row.get(3)?,
                full_text: row.get(4)?,
                summary: row.get(5)?,
                keywords: json_column(row, 6)?,
                year: row.get(7)?,
                upload_timestamp: parse_timestamp(row, 8)?,
                related_work: json_column(row, 9)?,
            },
        })
    }

    fn row_to_summary(row: &Row) -> rusqlite::Result<PaperSummaryView> {
        let related: Vec<RelatedWork> = json_column(row, 6)?;
        Ok(PaperSummaryView {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            authors: json_column(row, 2)?,
            year: row.get(3)?,
            keywords: json_column(row, 4)?,
            upload_timestamp: parse_timestamp(row, 5)?,
            related_work_count: related.len(),
        })
    }
}

impl PaperStore for SqlitePaperStore {
    fn create(&self, record: &IngestionResult) -> Result<PaperId> {
        let id = PaperId::new();
        let authors_json = serde_json::to_string(&record.authors)?;
        let keywords_json = serde_json::to_string(&record.keywords)?;
        let related_json = serde_json::to_string(&record.related_work)?;

        let conn = self.pool.get_connection();
        conn.execute(
            "INSERT INTO papers
                (id, title, authors, abstract, full_text, summary, keywords, year,
                 upload_timestamp, related_work)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id.to_string(),
                record.title,
                authors_json,
                record.abstract_text,
                record.full_text,
                record.summary,
                keywords_json,
                record.year,
                format_timestamp(&record.upload_timestamp),
                related_json,
            ],
        )?;

        tracing::debug!(%id, title = %record.title, "paper stored");
        Ok(id)
    }

    fn find_by_id(&self, id: &PaperId) -> Result<Option<StoredPaper>> {
        let conn = self.pool.get_connection();
        let mut stmt = conn.prepare(
            "SELECT id, title, authors, abstract, full_text, summary, keywords, year,
                    upload_timestamp, related_work
             FROM papers WHERE id = ?1",
        )?;
        let paper = stmt
            .query_row(params![id.to_string()], Self::row_to_paper)
            .optional()?;
        Ok(paper)
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<PaperSummaryView>> {
        let conn = self.pool.get_connection();
        let mut stmt = conn.prepare(
            "SELECT id, title, authors, year, keywords, upload_timestamp, related_work
             FROM papers
             ORDER BY upload_timestamp DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(
            params![limit as i64, offset as i64],
            Self::row_to_summary,
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.pool.get_connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

// Fixed-width timestamps keep lexicographic order equal to chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_id(row: &Row, idx: usize) -> rusqlite::Result<PaperId> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map(PaperId::from)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
