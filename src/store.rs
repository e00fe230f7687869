//! Record storage backed by SQLite.
//!
//! One table holds every record:
//!
//! ```sql
//! documents(id INTEGER PRIMARY KEY AUTOINCREMENT,
//!           metadata TEXT NOT NULL,   -- serialised JSON object
//!           file_url TEXT NOT NULL)
//! ```
//!
//! `rusqlite` is blocking, so every operation runs on the blocking pool. Each
//! operation takes the connection lock, runs exactly one transaction and
//! releases the lock when the guard drops, on success and on error alike.
//! Concurrent writers are serialised by that lock; there is no optimistic
//! concurrency control, so the last update wins.

use crate::error::IntakeError;
use crate::output::{DocumentRecord, Metadata};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metadata TEXT NOT NULL,
    file_url TEXT NOT NULL
)";

/// Handle to the record store. Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self, IntakeError> {
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        let store = Self::from_connection(conn)?;
        info!("Opened document store at {}", path.display());
        Ok(store)
    }

    /// Open a fresh in-memory store.
    pub fn open_in_memory() -> Result<Self, IntakeError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, IntakeError> {
        conn.execute(SCHEMA, [])?;
        register_search_function(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Store a new record and return its id.
    pub async fn insert(&self, file_url: &str, metadata: &Metadata) -> Result<i64, IntakeError> {
        let json = serde_json::to_string(metadata)?;
        let file_url = file_url.to_string();

        let id = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO documents (metadata, file_url) VALUES (?1, ?2)",
                    params![json, file_url],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            })
            .await?;

        debug!("Inserted document {}", id);
        Ok(id)
    }

    /// Fetch one record; `None` when no record has that id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<DocumentRecord>, IntakeError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let record = tx
                .query_row(
                    "SELECT id, metadata, file_url FROM documents WHERE id = ?1",
                    params![id],
                    record_from_row,
                )
                .optional()?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    /// List records in ascending id order, skipping `offset` and returning at
    /// most `limit`.
    ///
    /// A non-empty `search` keeps only records whose serialised metadata
    /// contains it, ignoring case. The match is textual over the JSON text,
    /// so it also hits key names and punctuation.
    pub async fn list(
        &self,
        offset: i64,
        limit: i64,
        search: &str,
    ) -> Result<Vec<DocumentRecord>, IntakeError> {
        let search = search.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let records = {
                let mut stmt = tx.prepare(
                    "SELECT id, metadata, file_url FROM documents
                     WHERE ?1 = '' OR contains_ci(metadata, ?1)
                     ORDER BY id
                     LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(params![search, limit, offset], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;
            Ok(records)
        })
        .await
    }

    /// Replace the metadata of record `id` wholesale.
    ///
    /// Returns `false` (and changes nothing) when the record does not exist.
    pub async fn update_metadata(&self, id: i64, metadata: &Metadata) -> Result<bool, IntakeError> {
        let json = serde_json::to_string(metadata)?;

        let updated = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE documents SET metadata = ?1 WHERE id = ?2",
                    params![json, id],
                )?;
                tx.commit()?;
                Ok(changed > 0)
            })
            .await?;

        if !updated {
            debug!("Update skipped: document {} does not exist", id);
        }
        Ok(updated)
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, IntakeError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| IntakeError::Internal("database connection lock poisoned".into()))?;
            op(&mut guard).map_err(IntakeError::from)
        })
        .await
        .map_err(|e| IntakeError::Internal(format!("storage task failed: {e}")))?
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let raw: String = row.get(1)?;
    let metadata: Metadata = serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(DocumentRecord {
        id: row.get(0)?,
        metadata,
        file_url: row.get(2)?,
    })
}

/// `contains_ci(haystack, needle)`: Unicode-aware case-insensitive substring
/// test. Unlike `LIKE`, `%` and `_` in the needle are literal.
fn register_search_function(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: String = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> Metadata {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = DocumentStore::open_in_memory().unwrap();
        let id = store.insert("u", &meta(json!({"a": 1}))).await.unwrap();

        let record = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.file_url, "u");
        assert_eq!(record.metadata, meta(json!({"a": 1})));
    }

    #[tokio::test]
    async fn missing_id_is_none() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(store.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_increase_and_list_is_ordered() {
        let store = DocumentStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(store.insert("u", &meta(json!({"n": i}))).await.unwrap());
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let page = store.list(0, 3, "").await.unwrap();
        assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), ids[..3]);

        let rest = store.list(3, 3, "").await.unwrap();
        assert_eq!(rest.iter().map(|r| r.id).collect::<Vec<_>>(), ids[3..]);

        assert!(store.list(10, 3, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert("u1", &meta(json!({"title": "Doc One"}))).await.unwrap();
        store
            .insert("u2", &meta(json!({"title": "Another Doc"})))
            .await
            .unwrap();
        store.insert("u3", &meta(json!({"title": "Memo"}))).await.unwrap();

        let hits = store.list(0, 10, "doc").await.unwrap();
        let urls: Vec<&str> = hits.iter().map(|r| r.file_url.as_str()).collect();
        assert_eq!(urls, ["u1", "u2"]);

        assert_eq!(store.list(0, 10, "MEMO").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_matches_serialised_keys() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert("u1", &meta(json!({"title": "x"}))).await.unwrap();
        store.insert("u2", &meta(json!({"name": "title"}))).await.unwrap();
        store.insert("u3", &meta(json!({"name": "y"}))).await.unwrap();

        assert_eq!(store.list(0, 10, "title").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_wildcards_are_literal() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert("u1", &meta(json!({"discount": "50%"}))).await.unwrap();
        store.insert("u2", &meta(json!({"discount": "none"}))).await.unwrap();

        assert_eq!(store.list(0, 10, "%").await.unwrap().len(), 1);
        assert_eq!(store.list(0, 10, "_").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let store = DocumentStore::open_in_memory().unwrap();
        store.insert("u1", &meta(json!({"city": "ÅLESUND"}))).await.unwrap();
        assert_eq!(store.list(0, 10, "ålesund").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_applies_before_pagination() {
        let store = DocumentStore::open_in_memory().unwrap();
        for i in 0..6 {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            store.insert(&format!("u{i}"), &meta(json!({"tag": tag}))).await.unwrap();
        }
        let second_page = store.list(2, 2, "even").await.unwrap();
        let urls: Vec<&str> = second_page.iter().map(|r| r.file_url.as_str()).collect();
        assert_eq!(urls, ["u4"]);
    }

    #[tokio::test]
    async fn update_replaces_whole_metadata() {
        let store = DocumentStore::open_in_memory().unwrap();
        let id = store
            .insert("u", &meta(json!({"title": "Original", "extra": 1})))
            .await
            .unwrap();

        assert!(store
            .update_metadata(id, &meta(json!({"title": "Updated"})))
            .await
            .unwrap());

        let record = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(record.metadata, meta(json!({"title": "Updated"})));
        assert_eq!(record.file_url, "u");
    }

    #[tokio::test]
    async fn update_of_missing_id_is_noop() {
        let store = DocumentStore::open_in_memory().unwrap();
        assert!(!store
            .update_metadata(99, &meta(json!({"a": 1})))
            .await
            .unwrap());
        assert!(store.list(0, 10, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        let id = {
            let store = DocumentStore::open(&path).unwrap();
            store.insert("u", &meta(json!({"k": "v"}))).await.unwrap()
        };

        let reopened = DocumentStore::open(&path).unwrap();
        let record = reopened.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(record.metadata["k"], "v");
    }

    #[tokio::test]
    async fn ids_are_not_reused() {
        let store = DocumentStore::open_in_memory().unwrap();
        let first = store.insert("u", &meta(json!({}))).await.unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute("DELETE FROM documents WHERE id = ?1", params![first])
                .unwrap();
        }
        let second = store.insert("u", &meta(json!({}))).await.unwrap();
        assert!(second > first);
    }
}
