use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use dealflow_core::config::StoreConfig;
use dealflow_core::store::{Filter, FilterOp, RecordStore};
use dealflow_core::{DealflowError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dealflow_records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data JSONB NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

/// Postgres [`RecordStore`] keeping every record as a JSONB row.
///
/// One table holds all collections. `update_where` compiles its guard
/// into the UPDATE's WHERE clause, so the check and the write are a
/// single statement and the claim protocol stays atomic across
/// processes.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Connect and ensure the backing table exists.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(DealflowError::Config(
                "Postgres backend requires store.url".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DealflowError::Store(format!("Failed to connect to Postgres: {}", e)))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| DealflowError::Store(format!("Failed to ensure schema: {}", e)))?;

        tracing::info!(
            pool_size = config.pool_size,
            "Connected Postgres record store"
        );
        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// Compile filters into WHERE fragments; values are bound in order
// starting at `first_param`. Field names come from compile-time call
// sites, never user input.
fn filter_clause(filters: &[Filter], first_param: usize) -> String {
    let mut sql = String::new();
    for (i, filter) in filters.iter().enumerate() {
        let param = first_param + i;
        match &filter.op {
            FilterOp::Eq(_) => {
                sql.push_str(&format!(" AND data->'{}' = ${}", filter.field, param));
            }
            FilterOp::AtOrBefore(_) => {
                sql.push_str(&format!(
                    " AND (data->>'{}')::timestamptz <= ${}",
                    filter.field, param
                ));
            }
        }
    }
    sql
}

fn bind_filters<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    filters: &'q [Filter],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for filter in filters {
        query = match &filter.op {
            FilterOp::Eq(value) => query.bind(value),
            FilterOp::AtOrBefore(instant) => query.bind(*instant),
        };
    }
    query
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let row =
            sqlx::query("SELECT data FROM dealflow_records WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DealflowError::Store(format!("Failed to read record: {}", e)))?;
        Ok(row.map(|r| r.get("data")))
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT data FROM dealflow_records WHERE collection = $1{}",
            filter_clause(filters, 2)
        );
        let query = bind_filters(sqlx::query(&sql).bind(collection), filters);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DealflowError::Store(format!("Failed to query records: {}", e)))?;
        Ok(rows.into_iter().map(|r| r.get("data")).collect())
    }

    async fn set(&self, collection: &str, id: Uuid, record: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dealflow_records (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(collection)
        .bind(id.to_string())
        .bind(record)
        .execute(&self.pool)
        .await
        .map_err(|e| DealflowError::Store(format!("Failed to write record: {}", e)))?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<()> {
        let result = sqlx::query(
            "UPDATE dealflow_records SET data = data || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id.to_string())
        .bind(patch)
        .execute(&self.pool)
        .await
        .map_err(|e| DealflowError::Store(format!("Failed to update record: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DealflowError::NotFound(format!(
                "Record {} in {}",
                id, collection
            )));
        }
        Ok(())
    }

    async fn update_where(
        &self,
        collection: &str,
        id: Uuid,
        guard: &[Filter],
        patch: Value,
    ) -> Result<bool> {
        let sql = format!(
            "UPDATE dealflow_records SET data = data || $3 WHERE collection = $1 AND id = $2{}",
            filter_clause(guard, 4)
        );
        let query = bind_filters(
            sqlx::query(&sql)
                .bind(collection)
                .bind(id.to_string())
                .bind(patch),
            guard,
        );
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| DealflowError::Store(format!("Failed to update record: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM dealflow_records WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DealflowError::Store(format!("Failed to delete record: {}", e)))?;
        Ok(())
    }
}
