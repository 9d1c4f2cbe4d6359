//! Local signature store backed by SQLite.
//!
//! Holds `(kind, hex, text)` rows learned from the 4byte export plus one sync
//! watermark per kind. Every operation opens its own connection, so the store
//! is cheap to clone and safe to share between the sync writer and readers.

use crate::errors::StoreError;
use crate::signature::{CacheRecord, SignatureKind, SyncWatermark};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ffi::ErrorCode;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Span;

const MAX_LOCK_RETRIES: u32 = 6;
const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone)]
pub struct SignatureStore {
    path: PathBuf,
    span: Span,
}

impl SignatureStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>, span: Span) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self { path, span };
        store.ensure_schema()?;
        tracing::debug!(parent: &store.span, path = %store.path.display(), "signature store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.with_connection("ensure_schema", |conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS sign_mapping_fourbyte (
                    id          INTEGER PRIMARY KEY,
                    kind        TEXT NOT NULL,
                    hex_sign    TEXT NOT NULL,
                    string_sign TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sync_status_fourbyte (
                    kind             TEXT NOT NULL,
                    last_synced_page INTEGER NOT NULL
                );

                CREATE UNIQUE INDEX IF NOT EXISTS sync_status_fourbyte__kind_index
                    ON sync_status_fourbyte (kind);

                CREATE UNIQUE INDEX IF NOT EXISTS sign_mapping_fourbyte__unique_index
                    ON sign_mapping_fourbyte (kind, hex_sign, string_sign);

                CREATE INDEX IF NOT EXISTS sign_mapping_fourbyte__kind_hex_sign_index
                    ON sign_mapping_fourbyte (kind, hex_sign);
                "#,
            )?;
            // Readers keep working while a sync is writing. Connections stay at
            // the default `synchronous = FULL`, so a commit is durable on return.
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            Ok(())
        })
    }

    /// The earliest-created record for `(kind, hex)`, if any.
    pub fn query_earliest(
        &self,
        kind: SignatureKind,
        hex_signature: &str,
    ) -> Result<Option<CacheRecord>, StoreError> {
        let row = self.with_connection("query_earliest", |conn| {
            conn.query_row(
                "SELECT string_sign, created_at FROM sign_mapping_fourbyte \
                 WHERE kind = ?1 AND hex_sign = ?2 \
                 ORDER BY created_at, id LIMIT 1",
                params![kind.as_str(), hex_signature],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
        })?;

        row.map(|(text_signature, created_at)| {
            Ok(CacheRecord {
                kind,
                hex_signature: hex_signature.to_string(),
                text_signature,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    /// Insert every record in one transaction, skipping rows whose
    /// `(kind, hex, text)` already exists. Returns the number of new rows.
    pub fn insert_if_absent(&self, records: &[CacheRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let inserted = self.with_connection("insert_if_absent", |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0usize;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR IGNORE INTO sign_mapping_fourbyte \
                     (kind, hex_sign, string_sign, created_at) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for record in records {
                    inserted += stmt.execute(params![
                        record.kind.as_str(),
                        record.hex_signature,
                        record.text_signature,
                        format_timestamp(&record.created_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })?;
        tracing::trace!(parent: &self.span, offered = records.len(), inserted, "insert_if_absent");
        Ok(inserted)
    }

    /// Last committed page for `kind`, or `None` if it was never synced.
    pub fn watermark(&self, kind: SignatureKind) -> Result<Option<SyncWatermark>, StoreError> {
        let page = self.with_connection("watermark", |conn| {
            conn.query_row(
                "SELECT last_synced_page FROM sync_status_fourbyte WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })?;

        page.map(|page| {
            let last_synced_page = u64::try_from(page).map_err(|_| StoreError::CorruptRow {
                table: "sync_status_fourbyte",
                detail: format!("negative page {page} for {kind}"),
            })?;
            Ok(SyncWatermark {
                kind,
                last_synced_page,
            })
        })
        .transpose()
    }

    /// Create or move the watermark for `kind`.
    pub fn set_watermark(&self, kind: SignatureKind, page: u64) -> Result<(), StoreError> {
        let page = i64::try_from(page).map_err(|_| StoreError::PageOutOfRange(page))?;
        self.with_connection("set_watermark", |conn| {
            conn.execute(
                "INSERT INTO sync_status_fourbyte (kind, last_synced_page) VALUES (?1, ?2) \
                 ON CONFLICT(kind) DO UPDATE SET last_synced_page = excluded.last_synced_page",
                params![kind.as_str(), page],
            )
        })?;
        Ok(())
    }

    /// Number of stored records for `kind`.
    pub fn count(&self, kind: SignatureKind) -> Result<u64, StoreError> {
        let n = self.with_connection("count", |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sign_mapping_fourbyte WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get::<_, i64>(0),
            )
        })?;
        Ok(n.max(0) as u64)
    }

    /// Run `f` against a clone of this store on the blocking thread pool.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&SignatureStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }

    fn with_connection<T, F>(&self, op: &'static str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Connection) -> rusqlite::Result<T>,
    {
        let mut attempt = 1;
        loop {
            let mut conn = Connection::open(&self.path)
                .and_then(|conn| conn.busy_timeout(BUSY_TIMEOUT).map(|_| conn))
                .map_err(|source| StoreError::Sqlite { op, source })?;

            match f(&mut conn) {
                Ok(value) => return Ok(value),
                Err(err) if is_sqlite_locked_error(&err) && attempt < MAX_LOCK_RETRIES => {
                    tracing::debug!(parent: &self.span, op, attempt, "database locked, retrying");
                    attempt += 1;
                }
                Err(source) => return Err(StoreError::Sqlite { op, source }),
            }
        }
    }
}

fn is_sqlite_locked_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Fixed-width UTC so that lexical order in SQLite equals time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table: "sign_mapping_fourbyte",
            detail: format!("bad created_at `{raw}`: {e}"),
        })
}
