//! SQLite storage backend for the syncpub replication gateway.
//!
//! This crate provides [`SqliteStorage`], a persistent implementation of the
//! [`Storage`](syncpub_storage::Storage) trait. Each workspace lives in its own
//! database file:
//!
//! ```text
//! config(key TEXT PRIMARY KEY, value TEXT)   -- workspace, schema_version
//! docs(path, author, ..., PRIMARY KEY(path, author))
//! ```
//!
//! The `docs` table holds the current revision per path and author. Ingest is
//! a single conditional upsert, so the conflict rule is enforced by SQLite
//! itself and concurrent ingests cannot lose a winning revision.
//!
//! # Example
//!
//! ```ignore
//! use syncpub_storage::{Storage, WorkspaceId};
//! use syncpub_storage_sqlite::SqliteStorage;
//!
//! let workspace = WorkspaceId::parse("+gardening.pals")?;
//! let storage = SqliteStorage::open(workspace, "data/gardening.pals.sqlite").await?;
//! let paths = storage.paths().await?;
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use syncpub_storage::validate::check_document;
use syncpub_storage::{
    Document, DocumentQuery, IngestOutcome, Storage, StorageError, StorageErrorKind, WorkspaceId,
    latest_per_path, now_micros, sort_newest_first,
};

/// Backend identifier for error messages.
const BACKEND: &str = "Sqlite";

/// Schema version recorded in the `config` table.
const SCHEMA_VERSION: &str = "1";

const CREATE_CONFIG: &str = "
CREATE TABLE IF NOT EXISTS config (
    key TEXT NOT NULL PRIMARY KEY,
    value TEXT NOT NULL
)";

const CREATE_DOCS: &str = "
CREATE TABLE IF NOT EXISTS docs (
    path TEXT NOT NULL,
    author TEXT NOT NULL,
    format TEXT NOT NULL,
    workspace TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    delete_after INTEGER,
    signature TEXT NOT NULL,
    PRIMARY KEY (path, author)
)";

const UPSERT_DOC: &str = "
INSERT INTO docs (path, author, format, workspace, content_hash, content, timestamp, delete_after, signature)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT (path, author) DO UPDATE
SET format = excluded.format,
    workspace = excluded.workspace,
    content_hash = excluded.content_hash,
    content = excluded.content,
    timestamp = excluded.timestamp,
    delete_after = excluded.delete_after,
    signature = excluded.signature
WHERE excluded.timestamp > docs.timestamp
   OR (excluded.timestamp = docs.timestamp AND excluded.signature > docs.signature)";

const SELECT_DOCS: &str = "
SELECT path, author, format, workspace, content_hash, content, timestamp, delete_after, signature
FROM docs
WHERE (?1 IS NULL OR path = ?1)
  AND (delete_after IS NULL OR delete_after > ?2)";

const SELECT_PATHS: &str = "
SELECT DISTINCT path
FROM docs
WHERE delete_after IS NULL OR delete_after > ?1
ORDER BY path";

type DocRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    Option<i64>,
    String,
);

/// Create a storage error from a sqlx error.
fn sqlx_error(err: sqlx::Error, path: &Path) -> StorageError {
    let kind = match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StorageErrorKind::Unavailable,
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            StorageErrorKind::PermissionDenied
        }
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => StorageErrorKind::Corrupt,
        _ => StorageErrorKind::Other,
    };
    StorageError::new(kind)
        .with_backend(BACKEND)
        .with_path(path)
        .with_source(err)
}

fn row_to_document(row: DocRow) -> Document {
    let (path, author, format, workspace, content_hash, content, timestamp, delete_after, signature) =
        row;
    Document {
        format,
        workspace,
        path,
        content_hash,
        content,
        author,
        timestamp,
        delete_after,
        signature,
    }
}

/// Persistent storage for one workspace, backed by one SQLite file.
#[derive(Debug)]
pub struct SqliteStorage {
    workspace: WorkspaceId,
    filename: PathBuf,
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open an existing database file or create a new one.
    ///
    /// The workspace is recorded on first open. Opening a file that was
    /// created for a different workspace fails with
    /// [`StorageErrorKind::WorkspaceMismatch`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file cannot be opened or created, the
    /// schema cannot be initialised, or the workspace does not match.
    pub async fn open(
        workspace: WorkspaceId,
        filename: impl Into<PathBuf>,
    ) -> Result<Self, StorageError> {
        let filename = filename.into();
        let options = SqliteConnectOptions::new()
            .filename(&filename)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| sqlx_error(e, &filename))?;

        let storage = Self {
            workspace,
            filename,
            pool,
        };
        storage.init_schema().await?;
        tracing::trace!(
            workspace = %storage.workspace,
            filename = %storage.filename.display(),
            "Opened sqlite storage"
        );
        Ok(storage)
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Close the connection pool, flushing pending writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let err = |e| sqlx_error(e, &self.filename);

        sqlx::query(CREATE_CONFIG)
            .execute(&self.pool)
            .await
            .map_err(err)?;
        sqlx::query(CREATE_DOCS)
            .execute(&self.pool)
            .await
            .map_err(err)?;

        for (key, value) in [
            ("workspace", self.workspace.as_str()),
            ("schema_version", SCHEMA_VERSION),
        ] {
            sqlx::query("INSERT OR IGNORE INTO config (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await
                .map_err(err)?;
        }

        let stored: String = sqlx::query_scalar("SELECT value FROM config WHERE key = 'workspace'")
            .fetch_one(&self.pool)
            .await
            .map_err(err)?;
        if stored != self.workspace.as_str() {
            return Err(StorageError::new(StorageErrorKind::WorkspaceMismatch)
                .with_backend(BACKEND)
                .with_path(&self.filename));
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    async fn paths(&self) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar(SELECT_PATHS)
            .bind(now_micros())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| sqlx_error(e, &self.filename))
    }

    async fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>, StorageError> {
        let rows: Vec<DocRow> = sqlx::query_as(SELECT_DOCS)
            .bind(query.path.as_deref())
            .bind(now_micros())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| sqlx_error(e, &self.filename))?;

        let mut docs: Vec<Document> = rows.into_iter().map(row_to_document).collect();
        sort_newest_first(&mut docs);
        if query.include_history {
            Ok(docs)
        } else {
            Ok(latest_per_path(docs))
        }
    }

    async fn ingest(&self, doc: &Document) -> Result<IngestOutcome, StorageError> {
        let now = now_micros();
        if let Err(err) = check_document(doc, &self.workspace, now) {
            return Ok(IngestOutcome::Invalid(err));
        }
        if doc.is_expired(now) {
            return Ok(IngestOutcome::Ignored);
        }

        let affected = sqlx::query(UPSERT_DOC)
            .bind(&doc.path)
            .bind(&doc.author)
            .bind(&doc.format)
            .bind(&doc.workspace)
            .bind(&doc.content_hash)
            .bind(&doc.content)
            .bind(doc.timestamp)
            .bind(doc.delete_after)
            .bind(&doc.signature)
            .execute(&self.pool)
            .await
            .map_err(|e| sqlx_error(e, &self.filename))?
            .rows_affected();

        if affected == 0 {
            Ok(IngestOutcome::Ignored)
        } else {
            Ok(IngestOutcome::Accepted)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const AUTHOR: &str = "@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6ea";
    const OTHER: &str = "@suzy.bjzee56v2hd6mv5r5ar3xqg3x3oyugf7fejpxnvgquxcubov4rnta";

    fn workspace() -> WorkspaceId {
        WorkspaceId::parse("+garden.x").unwrap()
    }

    fn doc(author: &str, path: &str, content: &str, timestamp: i64) -> Document {
        Document::compose(&workspace(), author, path, content, timestamp)
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("garden.x.sqlite");

        let storage = SqliteStorage::open(workspace(), &filename).await.unwrap();

        assert!(filename.exists());
        assert_eq!(storage.filename(), filename.as_path());
        assert!(storage.paths().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(workspace(), dir.path().join("garden.x.sqlite"))
            .await
            .unwrap();
        let now = now_micros();
        let mine = doc(AUTHOR, "/a", "mine", now - 1_000);
        let theirs = doc(OTHER, "/a", "theirs", now);

        assert_eq!(storage.ingest(&mine).await.unwrap(), IngestOutcome::Accepted);
        assert_eq!(storage.ingest(&theirs).await.unwrap(), IngestOutcome::Accepted);

        let history = storage.documents(&DocumentQuery::history()).await.unwrap();
        assert_eq!(history, vec![theirs.clone(), mine]);
        let latest = storage.documents(&DocumentQuery::default()).await.unwrap();
        assert_eq!(latest, vec![theirs]);
        assert_eq!(storage.paths().await.unwrap(), vec!["/a".to_owned()]);
    }

    #[tokio::test]
    async fn test_conflict_rule() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(workspace(), dir.path().join("garden.x.sqlite"))
            .await
            .unwrap();
        let now = now_micros();
        let older = doc(AUTHOR, "/a", "one", now - 1_000);
        let newer = doc(AUTHOR, "/a", "two", now);

        assert!(storage.ingest(&newer).await.unwrap().is_accepted());
        assert_eq!(storage.ingest(&newer).await.unwrap(), IngestOutcome::Ignored);
        assert_eq!(storage.ingest(&older).await.unwrap(), IngestOutcome::Ignored);

        let docs = storage.documents(&DocumentQuery::history()).await.unwrap();
        assert_eq!(docs, vec![newer]);
    }

    #[tokio::test]
    async fn test_invalid_document_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(workspace(), dir.path().join("garden.x.sqlite"))
            .await
            .unwrap();
        let other_ws = WorkspaceId::parse("+other.y").unwrap();
        let wrong = Document::compose(&other_ws, AUTHOR, "/a", "x", now_micros());

        assert!(matches!(
            storage.ingest(&wrong).await.unwrap(),
            IngestOutcome::Invalid(_)
        ));
        assert!(storage.paths().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("garden.x.sqlite");
        let d = doc(AUTHOR, "/wiki/page", "kept", now_micros());

        let storage = SqliteStorage::open(workspace(), &filename).await.unwrap();
        storage.ingest(&d).await.unwrap();
        storage.close().await;

        let reopened = SqliteStorage::open(workspace(), &filename).await.unwrap();
        assert_eq!(
            reopened.documents(&DocumentQuery::history()).await.unwrap(),
            vec![d]
        );
    }

    #[tokio::test]
    async fn test_reopen_with_other_workspace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("garden.x.sqlite");

        let storage = SqliteStorage::open(workspace(), &filename).await.unwrap();
        storage.close().await;

        let other = WorkspaceId::parse("+other.y").unwrap();
        let err = SqliteStorage::open(other, &filename).await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::WorkspaceMismatch);
    }

    #[tokio::test]
    async fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("missing").join("garden.x.sqlite");

        assert!(SqliteStorage::open(workspace(), filename).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_documents_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(workspace(), dir.path().join("garden.x.sqlite"))
            .await
            .unwrap();
        let now = now_micros();
        let expired = doc(AUTHOR, "/chat/!gone", "x", now - 2_000_000).with_delete_after(now - 1_000_000);
        let live = doc(AUTHOR, "/chat/!here", "x", now).with_delete_after(now + 60_000_000);

        assert_eq!(storage.ingest(&expired).await.unwrap(), IngestOutcome::Ignored);
        assert!(storage.ingest(&live).await.unwrap().is_accepted());
        assert_eq!(storage.paths().await.unwrap(), vec!["/chat/!here".to_owned()]);
    }
}
