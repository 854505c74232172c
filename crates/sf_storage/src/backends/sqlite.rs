use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sf_core::{ApplyReport, Error, Item, ItemStorage, Result, UpsertPolicy};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite};

use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        url TEXT NOT NULL PRIMARY KEY,
        title TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        date_time_rss TEXT NOT NULL,
        description TEXT NOT NULL,
        image_url TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS items_timestamp ON items (timestamp DESC)",
];

const OVERWRITE_SQL: &str = r#"
    INSERT OR REPLACE INTO items
    (url, title, timestamp, date_time_rss, description, image_url)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const SKIP_KNOWN_SQL: &str = r#"
    INSERT OR IGNORE INTO items
    (url, title, timestamp, date_time_rss, description, image_url)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

const PRUNE_SQL: &str = r#"
    DELETE FROM items WHERE url NOT IN (
        SELECT url FROM items ORDER BY timestamp DESC, url ASC LIMIT ?
    )
"#;

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("{}: {}", context, e))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable inside the data directory"
    }

    async fn open(data_dir: &Path, site_id: &str) -> Result<Self> {
        let db_path = data_dir.join(format!("{}.sqlite", site_id));
        Self::new_with_path(&db_path).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

async fn upsert_with<'e, E>(executor: E, item: &Item, policy: UpsertPolicy) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = match policy {
        UpsertPolicy::Overwrite => OVERWRITE_SQL,
        UpsertPolicy::SkipKnown => SKIP_KNOWN_SQL,
    };

    let result = sqlx::query(sql)
        .bind(&item.url)
        .bind(&item.title)
        .bind(item.published_at)
        .bind(&item.published_at_rss)
        .bind(&item.body_html)
        .bind(item.image_url.as_deref())
        .execute(executor)
        .await
        .map_err(|e| db_error("Failed to store item", e))?;

    Ok(result.rows_affected() > 0)
}

async fn prune_with<'e, E>(executor: E, retention: usize) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(PRUNE_SQL)
        .bind(retention as i64)
        .execute(executor)
        .await
        .map_err(|e| db_error("Failed to prune items", e))?;

    Ok(result.rows_affected())
}

fn row_to_item(row: &SqliteRow) -> Result<Item> {
    let read = |e| db_error("Failed to read item row", e);
    Ok(Item {
        url: row.try_get("url").map_err(read)?,
        title: row.try_get("title").map_err(read)?,
        published_at: row.try_get("timestamp").map_err(read)?,
        published_at_rss: row.try_get("date_time_rss").map_err(read)?,
        body_html: row.try_get("description").map_err(read)?,
        image_url: row.try_get("image_url").map_err(read)?,
    })
}

#[async_trait]
impl ItemStorage for SQLiteStorage {
    async fn known_urls(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT url FROM items")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read stored urls", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("url")
                    .map_err(|e| db_error("Failed to read url", e))
            })
            .collect()
    }

    async fn upsert(&self, item: &Item, policy: UpsertPolicy) -> Result<bool> {
        upsert_with(&self.pool, item, policy).await
    }

    async fn prune(&self, retention: usize) -> Result<u64> {
        prune_with(&self.pool, retention).await
    }

    async fn apply(
        &self,
        items: &[Item],
        policy: UpsertPolicy,
        retention: usize,
    ) -> Result<ApplyReport> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let mut report = ApplyReport::default();
        for item in items {
            match upsert_with(&mut *tx, item, policy).await {
                Ok(true) => report.written += 1,
                Ok(false) => report.unchanged += 1,
                Err(e) => {
                    tracing::warn!(url = %item.url, "Skipping item: {}", e);
                    report.failed.push(item.url.clone());
                }
            }
        }
        report.pruned = prune_with(&mut *tx, retention).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        Ok(report)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT url, title, timestamp, date_time_rss, description, image_url
            FROM items
            ORDER BY timestamp DESC, url ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read items", e))?;

        rows.iter().map(row_to_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn item(url: &str, title: &str, timestamp: i64) -> Item {
        Item::new(
            url,
            title,
            &Utc.timestamp_opt(timestamp, 0).unwrap(),
            "<p>body</p>",
            None,
        )
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(temp_dir.path(), "test").await.unwrap();
        assert_eq!(storage.get_db_path(), temp_dir.path().join("test.sqlite"));

        let stored = item("http://example.com", "Test Article", 1700000000);
        assert!(storage.upsert(&stored, UpsertPolicy::Overwrite).await.unwrap());

        let latest = storage.latest(30).await.unwrap();
        assert_eq!(latest, vec![stored]);
        assert!(storage.known_urls().await.unwrap().contains("http://example.com"));
    }

    #[tokio::test]
    async fn test_quotes_survive_parameter_binding() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(temp_dir.path(), "quotes").await.unwrap();

        let mut tricky = item("https://x/'; DROP TABLE items; --", "It's \"quoted\"", 5);
        tricky.body_html = "<p class='a'>O'Reilly\u{0007}</p>".to_string();
        tricky.image_url = Some("https://x/i'.jpg".to_string());

        let report = storage
            .apply(std::slice::from_ref(&tricky), UpsertPolicy::Overwrite, 30)
            .await
            .unwrap();
        assert_eq!(report.written, 1);
        assert!(report.failed.is_empty());
        assert_eq!(storage.latest(30).await.unwrap(), vec![tricky]);
    }

    #[tokio::test]
    async fn test_policies() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(temp_dir.path(), "policies").await.unwrap();

        storage.upsert(&item("https://a", "first", 1), UpsertPolicy::Overwrite).await.unwrap();
        assert!(!storage.upsert(&item("https://a", "second", 2), UpsertPolicy::SkipKnown).await.unwrap());
        assert_eq!(storage.latest(1).await.unwrap()[0].title, "first");

        assert!(storage.upsert(&item("https://a", "third", 3), UpsertPolicy::Overwrite).await.unwrap());
        let latest = storage.latest(10).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].title, "third");
        assert_eq!(latest[0].published_at, 3);
    }

    #[tokio::test]
    async fn test_apply_prunes_to_retention() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(temp_dir.path(), "prune").await.unwrap();

        let items: Vec<Item> = (0..40)
            .map(|i| item(&format!("https://x/{:02}", i), "t", 1000 + (i % 20)))
            .collect();
        let report = storage.apply(&items, UpsertPolicy::Overwrite, 30).await.unwrap();
        assert_eq!(report.written, 40);
        assert_eq!(report.pruned, 10);

        let kept = storage.latest(100).await.unwrap();
        assert_eq!(kept.len(), 30);

        let kept_urls: HashSet<&str> = kept.iter().map(|i| i.url.as_str()).collect();
        let min_kept = kept.iter().map(|i| i.published_at).min().unwrap();
        for removed in items.iter().filter(|i| !kept_urls.contains(i.url.as_str())) {
            assert!(removed.published_at <= min_kept);
        }
    }

    #[tokio::test]
    async fn test_apply_keeps_going_after_failed_insert() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::open(temp_dir.path(), "reject").await.unwrap();
        sqlx::query(
            r#"
            CREATE TRIGGER reject_bad BEFORE INSERT ON items
            WHEN NEW.url = 'https://x/bad'
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END
            "#,
        )
        .execute(&storage.pool)
        .await
        .unwrap();

        let items = vec![
            item("https://x/a", "A", 3),
            item("https://x/bad", "Bad", 2),
            item("https://x/c", "C", 1),
        ];
        let report = storage.apply(&items, UpsertPolicy::Overwrite, 30).await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, vec!["https://x/bad".to_string()]);

        let urls: Vec<String> = storage
            .latest(30)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.url)
            .collect();
        assert_eq!(urls, vec!["https://x/a", "https://x/c"]);
    }

    #[tokio::test]
    async fn test_data_persists_across_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let storage = SQLiteStorage::open(temp_dir.path(), "persist").await.unwrap();
            storage.upsert(&item("https://a", "A", 1), UpsertPolicy::Overwrite).await.unwrap();
        }
        let storage = SQLiteStorage::open(temp_dir.path(), "persist").await.unwrap();
        assert_eq!(storage.latest(30).await.unwrap().len(), 1);
    }
}
