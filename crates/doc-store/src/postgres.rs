use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, DocumentUpdate, NewDocument, Result, SortOrder,
    StoreError, Version, store::DocumentStore,
};

const UNIQUE_KEY_CONSTRAINT: &str = "documents_collection_key_idx";
const PRIMARY_KEY_CONSTRAINT: &str = "documents_pkey";

const SELECT_COLUMNS: &str =
    "SELECT collection, id, key, version, created_at, updated_at, body FROM documents";

/// PostgreSQL-backed document store implementation.
///
/// Documents live in a single `documents` table with a JSONB body.
/// Compare-and-set is a single `UPDATE … WHERE version = $expected`, so the
/// predicate and the write are one statement.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        tracing::debug!(max_connections = 5, "connected to postgres document store");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("document store migrations applied");
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            key: row.try_get("key")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    /// Appends the WHERE clause of a query and returns the next parameter index.
    fn push_filters(sql: &mut String, query: &DocumentQuery) -> usize {
        let mut param_count = 1;
        sql.push_str(" WHERE collection = $1");

        if !query.filters.is_empty() {
            param_count += 1;
            sql.push_str(&format!(" AND body @> ${param_count}"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }
        param_count
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, document: NewDocument) -> Result<Document> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, key, version, created_at, updated_at, body)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING collection, id, key, version, created_at, updated_at, body
            "#,
        )
        .bind(&document.collection)
        .bind(document.id.as_uuid())
        .bind(&document.key)
        .bind(Version::first().as_i64())
        .bind(document.created_at)
        .bind(&document.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some(UNIQUE_KEY_CONSTRAINT) => {
                        return StoreError::DuplicateKey {
                            collection: document.collection.clone(),
                            key: document.key.clone().unwrap_or_default(),
                        };
                    }
                    Some(PRIMARY_KEY_CONSTRAINT) => {
                        return StoreError::DuplicateKey {
                            collection: document.collection.clone(),
                            key: document.id.to_string(),
                        };
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Self::row_to_document(row)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE collection = $1 AND id = $2"
        ))
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE collection = $1 AND key = $2"
        ))
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn replace(&self, update: DocumentUpdate) -> Result<Document> {
        let row = sqlx::query(
            r#"
            UPDATE documents
            SET body = $1, version = version + 1, updated_at = $2
            WHERE collection = $3 AND id = $4 AND version = $5
            RETURNING collection, id, key, version, created_at, updated_at, body
            "#,
        )
        .bind(&update.body)
        .bind(update.updated_at)
        .bind(&update.collection)
        .bind(update.id.as_uuid())
        .bind(update.expected_version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_document(row);
        }

        // Nothing matched: tell a lost race apart from a missing document.
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(&update.collection)
                .bind(update.id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => {
                tracing::debug!(
                    collection = %update.collection,
                    id = %update.id,
                    expected = update.expected_version.as_i64(),
                    actual,
                    "compare-and-set lost to a concurrent write"
                );
                Err(StoreError::VersionConflict {
                    collection: update.collection,
                    id: update.id,
                    expected: update.expected_version,
                    actual: Version::new(actual),
                })
            }
            None => Err(StoreError::NotFound {
                collection: update.collection,
                id: update.id,
            }),
        }
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut sql = String::from(SELECT_COLUMNS);
        let mut param_count = Self::push_filters(&mut sql, &query);

        match query.sort {
            SortOrder::CreatedAsc => sql.push_str(" ORDER BY created_at ASC, id ASC"),
            SortOrder::CreatedDesc => sql.push_str(" ORDER BY created_at DESC, id DESC"),
        }

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(&query.collection);
        if !query.filters.is_empty() {
            sqlx_query = sqlx_query.bind(query.filter_object());
        }
        if let Some(from) = query.created_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.created_to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM documents");
        Self::push_filters(&mut sql, &query);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql).bind(&query.collection);
        if !query.filters.is_empty() {
            sqlx_query = sqlx_query.bind(query.filter_object());
        }
        if let Some(from) = query.created_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.created_to {
            sqlx_query = sqlx_query.bind(to);
        }

        let count = sqlx_query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn increment_counter(&self, name: &str) -> Result<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, value) VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }
}
