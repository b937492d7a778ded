use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use snafu::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use super::error::{
    CreateSqliteDirectorySnafu, SqliteConnectOptionsSnafu, SqliteConnectSnafu, SqliteMigrateSnafu,
    SqlitePragmaSnafu, SqliteQuerySnafu, StorageError, StorageResult,
};
use super::ids::MessageId;
use super::memory::unix_timestamp_millis;
use super::types::{NewScoredMessage, ScoredMessage};
use super::{BoxFuture, MessageStore, validate_new_message};

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    database_url: String,
}

impl SqliteStorage {
    pub async fn open(database_location: &str) -> StorageResult<Self> {
        ensure_database_directory(database_location)?;

        let database_url = normalize_database_url(database_location);
        let connect_options = SqliteConnectOptions::from_str(&database_url)
            .context(SqliteConnectOptionsSnafu {
                stage: "sqlite-open-parse-url",
                database_url: database_url.clone(),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5_000));

        // One connection serializes inserts, and keeps `:memory:` databases alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .context(SqliteConnectSnafu {
                stage: "sqlite-open-connect",
                database_url: database_url.clone(),
            })?;

        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .context(SqlitePragmaSnafu {
                stage: "sqlite-open-pragma-busy-timeout",
                pragma: "busy_timeout",
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context(SqliteMigrateSnafu {
                stage: "sqlite-open-migrate",
            })?;

        tracing::info!(database_url = %database_url, "sqlite message store ready");
        Ok(Self { pool, database_url })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    async fn insert_message(&self, input: NewScoredMessage) -> StorageResult<ScoredMessage> {
        validate_new_message(&input, "sqlite-insert-validate")?;

        let mut tx = self.pool.begin().await.context(SqliteQuerySnafu {
            stage: "sqlite-insert-begin",
        })?;

        let last_created_at = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(created_at) FROM messages")
            .fetch_one(&mut *tx)
            .await
            .context(SqliteQuerySnafu {
                stage: "sqlite-insert-last-created-at",
            })?
            .unwrap_or(0);
        let now = u64_to_i64(unix_timestamp_millis(), "sqlite-insert-now")?;
        let created_at = now.max(last_created_at);
        let message_id = MessageId::new_v7();

        let seq = sqlx::query_scalar::<_, i64>(
            "INSERT INTO messages (id, content, sentiment_score, created_at) VALUES (?, ?, ?, ?) RETURNING seq",
        )
        .bind(message_id.to_string())
        .bind(input.content.as_str())
        .bind(input.sentiment_score)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .context(SqliteQuerySnafu {
            stage: "sqlite-insert-message",
        })?;

        tx.commit().await.context(SqliteQuerySnafu {
            stage: "sqlite-insert-commit",
        })?;

        Ok(ScoredMessage {
            id: message_id,
            seq: i64_to_u64(seq, "sqlite-insert-seq")?,
            content: input.content,
            sentiment_score: input.sentiment_score,
            created_at_unix_millis: i64_to_u64(created_at, "sqlite-insert-created-at")?,
        })
    }

    async fn list_recent_messages(&self, limit: usize) -> StorageResult<Vec<ScoredMessage>> {
        let limit = u64_to_i64(limit as u64, "sqlite-list-recent-limit")?;
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT seq, id, content, sentiment_score, created_at FROM messages ORDER BY seq DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context(SqliteQuerySnafu {
            stage: "sqlite-list-recent-query",
        })?;

        rows.into_iter().map(message_row_to_record).collect()
    }
}

impl MessageStore for SqliteStorage {
    fn insert<'a>(&'a self, input: NewScoredMessage) -> BoxFuture<'a, StorageResult<ScoredMessage>> {
        Box::pin(self.insert_message(input))
    }

    fn list_recent<'a>(&'a self, limit: usize) -> BoxFuture<'a, StorageResult<Vec<ScoredMessage>>> {
        Box::pin(self.list_recent_messages(limit))
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    seq: i64,
    id: String,
    content: String,
    sentiment_score: f64,
    created_at: i64,
}

fn message_row_to_record(row: MessageRow) -> StorageResult<ScoredMessage> {
    Ok(ScoredMessage {
        id: MessageId::parse(&row.id)?,
        seq: i64_to_u64(row.seq, "message-row-seq")?,
        content: row.content,
        sentiment_score: row.sentiment_score,
        created_at_unix_millis: i64_to_u64(row.created_at, "message-row-created-at")?,
    })
}

fn i64_to_u64(value: i64, stage: &'static str) -> StorageResult<u64> {
    value
        .try_into()
        .map_err(|_| StorageError::InvariantViolation {
            stage,
            details: format!("negative sqlite integer '{value}' cannot map to u64"),
        })
}

fn u64_to_i64(value: u64, stage: &'static str) -> StorageResult<i64> {
    value
        .try_into()
        .map_err(|_| StorageError::InvariantViolation {
            stage,
            details: format!("u64 '{value}' cannot map to sqlite i64"),
        })
}

fn ensure_database_directory(database_location: &str) -> StorageResult<()> {
    if database_location.starts_with("sqlite:") || database_location == ":memory:" {
        return Ok(());
    }

    let path = Path::new(database_location);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateSqliteDirectorySnafu {
            stage: "sqlite-open-create-directory",
            path: parent.display().to_string(),
        })?;
    }

    Ok(())
}

fn normalize_database_url(database_location: &str) -> String {
    if database_location.starts_with("sqlite:") {
        return database_location.to_string();
    }

    if database_location == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    format!("sqlite://{database_location}")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_memory() -> SqliteStorage {
        SqliteStorage::open(":memory:")
            .await
            .expect("in-memory sqlite opens")
    }

    #[test]
    fn normalize_database_url_handles_paths_and_memory() {
        assert_eq!(normalize_database_url(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_database_url("sqlite://already.db"),
            "sqlite://already.db"
        );
        assert_eq!(
            normalize_database_url("data/vibes.db"),
            "sqlite://data/vibes.db"
        );
    }

    #[tokio::test]
    async fn insert_then_list_recent_round_trips_records() {
        let store = open_memory().await;
        let inserted = store
            .insert(NewScoredMessage::new("hello arena", 0.25))
            .await
            .expect("insert succeeds");

        let recent = store.list_recent(10).await.expect("list succeeds");
        assert_eq!(recent, vec![inserted]);
    }

    #[tokio::test]
    async fn list_recent_orders_by_insertion_newest_first() {
        let store = open_memory().await;
        for (index, score) in [0.9, -0.9, 0.0, 0.6].into_iter().enumerate() {
            store
                .insert(NewScoredMessage::new(format!("message {index}"), score))
                .await
                .expect("insert succeeds");
        }

        let recent = store.list_recent(3).await.expect("list succeeds");
        let scores = recent
            .iter()
            .map(|message| message.sentiment_score)
            .collect::<Vec<_>>();
        assert_eq!(scores, vec![0.6, 0.0, -0.9]);
        assert!(
            recent
                .windows(2)
                .all(|pair| pair[0].created_at_unix_millis >= pair[1].created_at_unix_millis)
        );
    }

    #[tokio::test]
    async fn blank_content_is_rejected_before_reaching_sqlite() {
        let store = open_memory().await;
        let error = store
            .insert(NewScoredMessage::new(" \n", 0.0))
            .await
            .expect_err("blank content is rejected");

        assert!(matches!(error, StorageError::InvariantViolation { .. }));
        assert!(store.list_recent(1).await.expect("list succeeds").is_empty());
    }
}
