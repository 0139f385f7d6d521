//! SQLite storage implementation.
//!
//! This module provides a SQLite-based implementation of the `PaperStore` trait
//! using rusqlite. Rows are read leniently: a column holding an unexpected type
//! or an unparseable timestamp is treated as missing instead of failing the
//! whole query.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{PaperStore, StorageError, StorageResult};
use crate::models::{parse_timestamp, popularity_order, Paper};

const SCHEMA_SQL: &str = r#"
create table if not exists papers
(
    id             text primary key,
    title          text,
    authors        text,
    abstract       text,
    category       text,
    year_published integer,
    views          integer,
    uploaded_at    text
);
create index if not exists papers_category on papers (category);
"#;

const PAPER_COLUMNS: &str =
    "id, title, authors, abstract, category, year_published, views, uploaded_at";

/// SQLite-backed paper store.
///
/// The connection is shared behind an async mutex so the store can be used
/// from concurrently running aggregation tasks.
///
/// # Schema
/// A single `papers` table; see [`SqliteStore::initialize`].
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    ///
    /// # Errors
    /// Returns `StorageError::Unavailable` if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!(
                "Failed to open database at {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns `StorageError::Unavailable` if SQLite cannot allocate it
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create the `papers` table and its category index.
    ///
    /// Safe to call on an existing database.
    ///
    /// # Errors
    /// Returns `StorageError::SchemaError` if schema creation fails
    pub async fn initialize(&self) -> StorageResult<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StorageError::SchemaError(e.to_string()))
    }

    /// Insert or replace a paper row. Only used to seed databases; the
    /// discovery engines never write.
    ///
    /// # Errors
    /// Returns `StorageError::QueryError` if the insert fails
    pub async fn insert_paper(&self, paper: &Paper) -> StorageResult<()> {
        let views = paper
            .views
            .map(|v| i64::try_from(v).unwrap_or(i64::MAX));
        let uploaded_at = paper.uploaded_at.map(|t| t.to_rfc3339());

        let conn = self.conn.lock().await;
        conn.execute(
            "insert or replace into papers (id, title, authors, abstract, category, \
             year_published, views, uploaded_at) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                paper.id,
                paper.title,
                paper.authors,
                paper.abstract_text,
                paper.category,
                paper.year_published,
                views,
                uploaded_at,
            ],
        )
        .map_err(|e| {
            StorageError::QueryError(format!("Failed to insert paper {}: {}", paper.id, e))
        })?;
        Ok(())
    }

    fn query_papers<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> StorageResult<Vec<Paper>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        let rows = stmt
            .query_map(params, row_to_paper)
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row.map_err(|e| StorageError::SerializationError(e.to_string()))?);
        }
        Ok(papers)
    }
}

/// Read an integer column that may hold text or a real in a badly typed row.
fn lenient_integer(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) => Some(v as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Read a text column, treating a non-text value as missing.
fn lenient_text(row: &Row<'_>, idx: usize) -> Option<String> {
    row.get::<_, Option<String>>(idx).ok().flatten()
}

fn row_to_paper(row: &Row<'_>) -> rusqlite::Result<Paper> {
    let id = match row.get_ref(0)? {
        ValueRef::Integer(v) => v.to_string(),
        _ => row.get::<_, String>(0)?,
    };

    let year_published = lenient_integer(row, 5)?.and_then(|y| i32::try_from(y).ok());

    let views = lenient_integer(row, 6)?.and_then(|v| {
        let views = u64::try_from(v).ok();
        if views.is_none() {
            warn!("Paper {} has negative view count {}; treating as missing", id, v);
        }
        views
    });

    let uploaded_at = lenient_text(row, 7).and_then(|raw| {
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            warn!("Paper {} has unreadable uploaded_at {:?}", id, raw);
        }
        parsed
    });

    Ok(Paper {
        title: lenient_text(row, 1),
        authors: lenient_text(row, 2),
        abstract_text: lenient_text(row, 3),
        category: lenient_text(row, 4),
        year_published,
        views,
        uploaded_at,
        id,
    })
}

#[async_trait]
impl PaperStore for SqliteStore {
    async fn list_distinct_categories(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "select category from papers \
                 where category is not null and trim(category) <> '' \
                 group by category order by min(rowid)",
            )
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.map_err(|e| StorageError::SerializationError(e.to_string()))?);
        }
        debug!("Found {} distinct categories", categories.len());
        Ok(categories)
    }

    async fn count_by_category(&self, raw: &str) -> StorageResult<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "select count(*) from papers where category = ?1",
                [raw],
                |row| row.get(0),
            )
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn top_by_category(&self, raw: &str, limit: usize) -> StorageResult<Vec<Paper>> {
        // `uploaded_at` text mixes separators and offsets, so ties are broken
        // on the parsed timestamps rather than in SQL.
        let sql = format!(
            "select {} from papers where category = ?1 order by coalesce(views, 0) desc, rowid",
            PAPER_COLUMNS
        );
        let mut papers = {
            let conn = self.conn.lock().await;
            Self::query_papers(&conn, &sql, [raw])?
        };
        papers.sort_by(popularity_order);
        papers.truncate(limit);
        Ok(papers)
    }

    async fn list_all(&self, order_by_year_desc: bool) -> StorageResult<Vec<Paper>> {
        let order = if order_by_year_desc {
            "order by year_published desc, rowid"
        } else {
            "order by rowid"
        };
        let sql = format!("select {} from papers {}", PAPER_COLUMNS, order);
        let conn = self.conn.lock().await;
        Self::query_papers(&conn, &sql, [])
    }

    async fn get_paper_by_id(&self, id: &str) -> StorageResult<Paper> {
        let sql = format!("select {} from papers where id = ?1", PAPER_COLUMNS);
        let conn = self.conn.lock().await;
        conn.query_row(&sql, [id], row_to_paper)
            .optional()
            .map_err(|e| StorageError::QueryError(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(format!("Paper {} not found", id)))
    }
}
