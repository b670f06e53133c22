//! Database Connection Pool Module
//!
//! PostgreSQL storage backend built on deadpool-postgres. Every entity type
//! gets its own table (`danesh_<type>`) with fixed bookkeeping columns and a
//! JSONB attribute column. Unique fields become unique expression indexes and
//! references are checked inside the writing transaction.

use async_trait::async_trait;
use danesh_core::{
    attributes_from_value, Attributes, DaneshError, DaneshResult, Entity, EntityId, EntitySchema,
    EntityType, NewEntity, Timestamp,
};
use danesh_storage::StorageBackend;
use deadpool_postgres::{Config, GenericClient, ManagerConfig, Pool, RecyclingMethod, Runtime};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: SecretString,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait timeout for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "danesh".to_string(),
            user: "postgres".to_string(),
            password: SecretString::from(String::new()),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("DANESH_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("DANESH_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("DANESH_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("DANESH_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("DANESH_DB_PASSWORD")
                .map(SecretString::from)
                .unwrap_or(defaults.password),
            max_size: std::env::var("DANESH_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: Duration::from_secs(
                std::env::var("DANESH_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.expose_secret().to_string());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
            ApiError::storage_unavailable(format!("Failed to create pool: {}", e))
        })
    }
}

// ============================================================================
// SQL HELPERS
// ============================================================================

const COLUMNS: &str = "id, created_time, updated_time, delete_flag, owner_id, attributes";

/// Table name for an entity type. Type names are validated lowercase
/// identifiers, so they are safe to splice into SQL.
pub fn table_name(entity_type: &EntityType) -> String {
    format!("danesh_{}", entity_type.as_str())
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn index_suffix(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// DDL that creates the table and indexes for a schema.
pub fn table_ddl(schema: &EntitySchema) -> String {
    let table = table_name(schema.entity_type());
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            created_time TIMESTAMPTZ NOT NULL,
            updated_time TIMESTAMPTZ NOT NULL,
            delete_flag BOOLEAN NOT NULL DEFAULT FALSE,
            owner_id BIGINT,
            attributes JSONB NOT NULL DEFAULT '{{}}'::jsonb
        );
        CREATE INDEX IF NOT EXISTS {table}_current_idx ON {table} (id DESC) WHERE delete_flag = FALSE;"
    );
    for field in schema.unique_fields() {
        ddl.push_str(&format!(
            "\nCREATE UNIQUE INDEX IF NOT EXISTS {table}_{suffix}_key ON {table} ((attributes->>{literal}));",
            suffix = index_suffix(&field.name),
            literal = quote_literal(&field.name),
        ));
    }
    ddl
}

fn row_to_entity(row: &Row, entity_type: &EntityType) -> DaneshResult<Entity> {
    let read = |e: tokio_postgres::Error| {
        DaneshError::storage(format!("malformed {entity_type} row: {e}"))
    };
    let attributes: Value = row.try_get("attributes").map_err(read)?;
    Ok(Entity {
        id: row.try_get("id").map_err(read)?,
        entity_type: entity_type.clone(),
        created_at: row.try_get("created_time").map_err(read)?,
        updated_at: row.try_get("updated_time").map_err(read)?,
        deleted: row.try_get("delete_flag").map_err(read)?,
        owner: row.try_get("owner_id").map_err(read)?,
        attributes: attributes_from_value(attributes).map_err(|e| {
            DaneshError::storage(format!("malformed {entity_type} attributes: {e}"))
        })?,
    })
}

/// Map a Postgres error: unique and foreign-key violations are constraint
/// violations, everything else means storage is unavailable.
fn pg_error(err: tokio_postgres::Error, entity_type: &EntityType) -> DaneshError {
    if let Some(db) = err.as_db_error() {
        let code = db.code();
        if *code == SqlState::UNIQUE_VIOLATION || *code == SqlState::FOREIGN_KEY_VIOLATION {
            let constraint = db
                .constraint()
                .map(str::to_string)
                .unwrap_or_else(|| table_name(entity_type));
            return DaneshError::constraint(constraint, db.message().to_string());
        }
    }
    tracing::error!(entity_type = %entity_type, error = %err, "Database error");
    DaneshError::storage(format!("database error: {err}"))
}

fn pool_error(err: deadpool_postgres::PoolError) -> DaneshError {
    tracing::error!(error = %err, "Database pool error");
    DaneshError::storage(format!("connection pool: {err}"))
}

// ============================================================================
// POSTGRES BACKEND
// ============================================================================

/// Storage backend over a Postgres connection pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: Pool,
}

impl PgBackend {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a backend from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    async fn client(&self) -> DaneshResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Reject references to rows that do not exist. Soft-deleted targets
    /// still count as existing.
    async fn check_references<C: GenericClient>(
        client: &C,
        schema: &EntitySchema,
        attributes: &Attributes,
    ) -> DaneshResult<()> {
        let entity_type = schema.entity_type();
        for (field, target) in schema.references() {
            let Some(id) = attributes.get(field).and_then(Value::as_i64) else {
                continue;
            };
            let sql = format!("SELECT 1 FROM {} WHERE id = $1", table_name(target));
            let found = client
                .query_opt(&sql, &[&id])
                .await
                .map_err(|e| pg_error(e, entity_type))?;
            if found.is_none() {
                return Err(DaneshError::constraint(
                    format!("{entity_type}.{field}"),
                    format!("{target} {id} does not exist"),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn prepare(&self, schema: &EntitySchema) -> DaneshResult<()> {
        let client = self.client().await?;
        client
            .batch_execute(&table_ddl(schema))
            .await
            .map_err(|e| pg_error(e, schema.entity_type()))
    }

    async fn query_current(&self, entity_type: &EntityType) -> DaneshResult<Vec<Entity>> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE delete_flag = FALSE ORDER BY id DESC",
            table_name(entity_type)
        );
        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| pg_error(e, entity_type))?;
        rows.iter().map(|row| row_to_entity(row, entity_type)).collect()
    }

    async fn insert(&self, schema: &EntitySchema, row: NewEntity) -> DaneshResult<Entity> {
        let entity_type = schema.entity_type();
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| pg_error(e, entity_type))?;

        Self::check_references(&tx, schema, &row.attributes).await?;

        let sql = format!(
            "INSERT INTO {} (created_time, updated_time, delete_flag, owner_id, attributes)
             VALUES ($1, $1, FALSE, $2, $3)
             RETURNING {COLUMNS}",
            table_name(entity_type)
        );
        let attributes = Value::Object(row.attributes);
        let inserted = tx
            .query_one(&sql, &[&row.created_at, &row.owner, &attributes])
            .await
            .map_err(|e| pg_error(e, entity_type))?;
        let entity = row_to_entity(&inserted, entity_type)?;

        tx.commit().await.map_err(|e| pg_error(e, entity_type))?;
        Ok(entity)
    }

    async fn update_current(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        patch: Attributes,
        updated_at: Timestamp,
    ) -> DaneshResult<Option<Entity>> {
        let entity_type = schema.entity_type();
        let mut client = self.client().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| pg_error(e, entity_type))?;

        Self::check_references(&tx, schema, &patch).await?;

        let sql = format!(
            "UPDATE {} SET attributes = attributes || $2::jsonb, updated_time = $3
             WHERE id = $1 AND delete_flag = FALSE
             RETURNING {COLUMNS}",
            table_name(entity_type)
        );
        let patch = Value::Object(patch);
        let updated = tx
            .query_opt(&sql, &[&id, &patch, &updated_at])
            .await
            .map_err(|e| pg_error(e, entity_type))?;
        let entity = updated
            .map(|row| row_to_entity(&row, entity_type))
            .transpose()?;

        tx.commit().await.map_err(|e| pg_error(e, entity_type))?;
        Ok(entity)
    }

    async fn soft_delete(
        &self,
        entity_type: &EntityType,
        id: EntityId,
        updated_at: Timestamp,
    ) -> DaneshResult<bool> {
        let client = self.client().await?;
        let sql = format!(
            "UPDATE {} SET delete_flag = TRUE, updated_time = $2
             WHERE id = $1 AND delete_flag = FALSE",
            table_name(entity_type)
        );
        let affected = client
            .execute(&sql, &[&id, &updated_at])
            .await
            .map_err(|e| pg_error(e, entity_type))?;
        Ok(affected == 1)
    }

    async fn ping(&self) -> DaneshResult<()> {
        let client = self.client().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| DaneshError::storage(format!("ping failed: {e}")))
    }
}

impl std::fmt::Debug for PgBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgBackend")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}
