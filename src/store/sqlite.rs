use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use super::{Store, StoreResult};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    ns  TEXT NOT NULL,
    k   TEXT NOT NULL,
    v   TEXT NOT NULL,
    UNIQUE (ns, k)
)";

/// SQLite-backed store. The `UNIQUE (ns, k)` constraint makes
/// [`Store::insert_unique`] a single atomic statement, and `seq` keeps
/// insertion order for [`Store::list`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_unique(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool> {
        let done =
            sqlx::query("INSERT INTO records (ns,k,v) VALUES (?,?,?) ON CONFLICT (ns,k) DO NOTHING")
                .bind(ns)
                .bind(key)
                .bind(value.to_string())
                .execute(&self.pool)
                .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn get(&self, ns: &str, key: &str) -> StoreResult<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT v FROM records WHERE ns=? AND k=?")
            .bind(ns)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(v,)| serde_json::from_str(&v))
            .transpose()
            .map_err(Into::into)
    }

    async fn update(&self, ns: &str, key: &str, value: Value) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE records SET v=? WHERE ns=? AND k=?")
            .bind(value.to_string())
            .bind(ns)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn remove(&self, ns: &str, key: &str) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM records WHERE ns=? AND k=?")
            .bind(ns)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() >= 1)
    }

    async fn list(&self, ns: &str) -> StoreResult<Vec<Value>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT v FROM records WHERE ns=? ORDER BY seq")
            .bind(ns)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(v,)| serde_json::from_str(&v).map_err(Into::into))
            .collect()
    }
}
