// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::fs;

use crate::fingerprint::Fingerprint;
use crate::status::{StatusError, StatusRecord, StatusStore};
use crate::types::{ETag, Href, Identity};

/// Status store backed by a SQLite database.
///
/// The pool holds a single connection, which serializes all writes. Every
/// write is one SQLite transaction, so an interrupted write is rolled back
/// by the journal on the next open instead of being read half-applied.
#[derive(Debug, Clone)]
pub struct SqliteStatus {
    pool: SqlitePool,
}

impl SqliteStatus {
    /// Opens the status database.
    /// If `filename` is `None`, it opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Corrupt`] if an existing file is not a healthy
    /// status database.
    pub async fn open(filename: Option<&Path>) -> Result<Self, StatusError> {
        let (options, existed) = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "opening status database");
            if let Some(parent) = filename.parent() {
                fs::create_dir_all(parent).await?;
            }
            let existed = fs::try_exists(filename).await?;
            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Full);
            (options, existed)
        } else {
            tracing::info!("opening in-memory status database");
            (SqliteConnectOptions::new().in_memory(true), false)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                if existed {
                    StatusError::Corrupt(e.to_string())
                } else {
                    StatusError::Database(e)
                }
            })?;

        let check: String = sqlx::query_scalar("PRAGMA quick_check;")
            .fetch_one(&pool)
            .await
            .map_err(|e| StatusError::Corrupt(e.to_string()))?;
        if check != "ok" {
            pool.close().await;
            return Err(StatusError::Corrupt(check));
        }

        sqlx::migrate!("src/status/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        tracing::debug!("status database ready");
        Ok(Self { pool })
    }

    /// Closes the underlying connection.
    pub async fn close(self) {
        tracing::debug!("closing status database");
        self.pool.close().await;
    }
}

#[async_trait]
impl StatusStore for SqliteStatus {
    async fn get(&self, uid: &str) -> Result<Option<StatusRecord>, StatusError> {
        const SQL: &str = "
SELECT uid, href_a, etag_a, href_b, etag_b, fingerprint
FROM status
WHERE uid = ?;
";

        let row: Option<StatusRow> = sqlx::query_as(SQL)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_record().1))
    }

    async fn put(&self, uid: &str, record: &StatusRecord) -> Result<(), StatusError> {
        sqlx::query(UPSERT_SQL)
            .bind(uid)
            .bind(record.a.href.as_str())
            .bind(record.a.etag.as_str())
            .bind(record.b.href.as_str())
            .bind(record.b.etag.as_str())
            .bind(record.fingerprint.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, uid: &str) -> Result<(), StatusError> {
        const SQL: &str = "DELETE FROM status WHERE uid = ?;";

        sqlx::query(SQL).bind(uid).execute(&self.pool).await?;
        Ok(())
    }

    async fn all_uids(&self) -> Result<BTreeSet<String>, StatusError> {
        const SQL: &str = "SELECT uid FROM status;";

        let uids: Vec<String> = sqlx::query_scalar(SQL).fetch_all(&self.pool).await?;
        Ok(uids.into_iter().collect())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, StatusRecord>, StatusError> {
        const SQL: &str = "
SELECT uid, href_a, etag_a, href_b, etag_b, fingerprint
FROM status;
";

        let rows: Vec<StatusRow> = sqlx::query_as(SQL).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(StatusRow::into_record).collect())
    }

    async fn replace_all(
        &self,
        records: &BTreeMap<String, StatusRecord>,
    ) -> Result<(), StatusError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM status;").execute(&mut *tx).await?;
        for (uid, record) in records {
            sqlx::query(UPSERT_SQL)
                .bind(uid)
                .bind(record.a.href.as_str())
                .bind(record.a.etag.as_str())
                .bind(record.b.href.as_str())
                .bind(record.b.etag.as_str())
                .bind(record.fingerprint.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

const UPSERT_SQL: &str = "
INSERT INTO status (uid, href_a, etag_a, href_b, etag_b, fingerprint)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(uid) DO UPDATE SET
    href_a = excluded.href_a,
    etag_a = excluded.etag_a,
    href_b = excluded.href_b,
    etag_b = excluded.etag_b,
    fingerprint = excluded.fingerprint;
";

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    uid: String,
    href_a: String,
    etag_a: String,
    href_b: String,
    etag_b: String,
    fingerprint: String,
}

impl StatusRow {
    fn into_record(self) -> (String, StatusRecord) {
        let record = StatusRecord::new(
            Identity::new(Href::new(self.href_a), ETag::new(self.etag_a)),
            Identity::new(Href::new(self.href_b), ETag::new(self.etag_b)),
            Fingerprint::new(self.fingerprint),
        );
        (self.uid, record)
    }
}
