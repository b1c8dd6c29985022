//! PostgreSQL repository backed by sqlx

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{MediaRepository, RepositoryError, RepositoryResult};
use crate::models::{MediaOwner, MediaRecord};

const SELECT_COLUMNS: &str = "SELECT id, model_type, model_id, uuid, collection_name, name, file_name, mime_type, disk, conversions_disk, size, manipulations, custom_properties, generated_conversions, responsive_images, order_column, created_at, updated_at FROM media";

const ORDER_BY: &str = "ORDER BY order_column ASC NULLS LAST, id ASC";

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Media records in the `media` table
#[derive(Debug, Clone)]
pub struct PgMediaRepository {
    pool: PgPool,
}

impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `media` table and its owner index when missing
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS media (
             id BIGSERIAL PRIMARY KEY,
             model_type VARCHAR(255),
             model_id BIGINT,
             uuid UUID NOT NULL UNIQUE,
             collection_name VARCHAR(255) NOT NULL,
             name VARCHAR(255) NOT NULL,
             file_name VARCHAR(255) NOT NULL,
             mime_type VARCHAR(255) NOT NULL,
             disk VARCHAR(255) NOT NULL,
             conversions_disk VARCHAR(255) NOT NULL,
             size BIGINT NOT NULL DEFAULT 0,
             manipulations JSONB NOT NULL DEFAULT '{}',
             custom_properties JSONB NOT NULL DEFAULT '{}',
             generated_conversions JSONB NOT NULL DEFAULT '{}',
             responsive_images JSONB NOT NULL DEFAULT '{}',
             order_column INTEGER,
             created_at TIMESTAMPTZ NOT NULL,
             updated_at TIMESTAMPTZ NOT NULL
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Schema)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS media_model_type_model_id_index ON media (model_type, model_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Schema)?;

        info!("Media table is ready");
        Ok(())
    }

    async fn fetch_many(&self, query: PgQuery<'_>) -> RepositoryResult<Vec<MediaRecord>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(decode_row).collect()
    }
}

/// JSON columns as stored
struct EncodedColumns {
    custom_properties: Value,
    generated_conversions: Value,
    responsive_images: Value,
}

fn encode_columns(media: &MediaRecord) -> RepositoryResult<EncodedColumns> {
    let encode = |field: &'static str, value: Result<Value, serde_json::Error>| {
        value.map_err(|source| RepositoryError::Encode { field, source })
    };

    Ok(EncodedColumns {
        custom_properties: Value::Object(media.custom_properties.clone()),
        generated_conversions: encode(
            "generated_conversions",
            serde_json::to_value(&media.generated_conversions),
        )?,
        responsive_images: encode(
            "responsive_images",
            serde_json::to_value(&media.responsive_images),
        )?,
    })
}

fn to_db_int(value: u64, column: &str) -> RepositoryResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{} {} exceeds BIGINT", column, value)))
}

fn from_db_int(value: i64, column: &str) -> RepositoryResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{} {} is negative", column, value)))
}

fn decode_json<T: serde::de::DeserializeOwned>(value: Value, column: &str) -> RepositoryResult<T> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Decode(format!("{}: {}", column, e)))
}

fn decode_row(row: &PgRow) -> RepositoryResult<MediaRecord> {
    let get_err = |e: sqlx::Error| RepositoryError::Database(DatabaseError::Query(e));

    let id: i64 = row.try_get("id").map_err(get_err)?;
    let model_type: Option<String> = row.try_get("model_type").map_err(get_err)?;
    let model_id: Option<i64> = row.try_get("model_id").map_err(get_err)?;
    let size: i64 = row.try_get("size").map_err(get_err)?;

    let owner = match (model_type, model_id) {
        (Some(owner_type), Some(owner_id)) => Some(MediaOwner {
            owner_type,
            owner_id: from_db_int(owner_id, "model_id")?,
        }),
        _ => None,
    };

    let custom_properties: Value = row.try_get("custom_properties").map_err(get_err)?;
    let generated_conversions: Value = row.try_get("generated_conversions").map_err(get_err)?;
    let responsive_images: Value = row.try_get("responsive_images").map_err(get_err)?;
    let uuid: Uuid = row.try_get("uuid").map_err(get_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    Ok(MediaRecord {
        id: Some(from_db_int(id, "id")?),
        uuid,
        owner,
        collection_name: row.try_get("collection_name").map_err(get_err)?,
        name: row.try_get("name").map_err(get_err)?,
        file_name: row.try_get("file_name").map_err(get_err)?,
        mime_type: row.try_get("mime_type").map_err(get_err)?,
        disk: row.try_get("disk").map_err(get_err)?,
        conversions_disk: row.try_get("conversions_disk").map_err(get_err)?,
        size: from_db_int(size, "size")?,
        manipulations: row.try_get("manipulations").map_err(get_err)?,
        custom_properties: decode_json(custom_properties, "custom_properties")?,
        generated_conversions: decode_json(generated_conversions, "generated_conversions")?,
        responsive_images: decode_json(responsive_images, "responsive_images")?,
        order_column: row.try_get("order_column").map_err(get_err)?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    async fn save(&self, media: &mut MediaRecord) -> RepositoryResult<()> {
        let columns = encode_columns(media)?;
        let owner_type = media.owner.as_ref().map(|o| o.owner_type.clone());
        let owner_id = media
            .owner
            .as_ref()
            .map(|o| to_db_int(o.owner_id, "model_id"))
            .transpose()?;
        let size = to_db_int(media.size, "size")?;
        let updated_at = Utc::now();

        match media.id {
            Some(id) if id != 0 => {
                let result = sqlx::query(
                    "UPDATE media SET
                     model_type = $1, model_id = $2, collection_name = $3, name = $4,
                     file_name = $5, mime_type = $6, disk = $7, conversions_disk = $8,
                     size = $9, manipulations = $10, custom_properties = $11,
                     generated_conversions = $12, responsive_images = $13,
                     order_column = $14, updated_at = $15
                     WHERE id = $16",
                )
                .bind(&owner_type)
                .bind(owner_id)
                .bind(&media.collection_name)
                .bind(&media.name)
                .bind(&media.file_name)
                .bind(&media.mime_type)
                .bind(&media.disk)
                .bind(&media.conversions_disk)
                .bind(size)
                .bind(&media.manipulations)
                .bind(&columns.custom_properties)
                .bind(&columns.generated_conversions)
                .bind(&columns.responsive_images)
                .bind(media.order_column)
                .bind(updated_at)
                .bind(to_db_int(id, "id")?)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::Missing(id));
                }
                debug!("Updated media record {}", id);
            }
            _ => {
                let row = sqlx::query(
                    "INSERT INTO media (model_type, model_id, uuid, collection_name, name, file_name, mime_type, disk, conversions_disk, size, manipulations, custom_properties, generated_conversions, responsive_images, order_column, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                     RETURNING id",
                )
                .bind(&owner_type)
                .bind(owner_id)
                .bind(media.uuid)
                .bind(&media.collection_name)
                .bind(&media.name)
                .bind(&media.file_name)
                .bind(&media.mime_type)
                .bind(&media.disk)
                .bind(&media.conversions_disk)
                .bind(size)
                .bind(&media.manipulations)
                .bind(&columns.custom_properties)
                .bind(&columns.generated_conversions)
                .bind(&columns.responsive_images)
                .bind(media.order_column)
                .bind(media.created_at)
                .bind(updated_at)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

                let id: i64 = row.try_get("id").map_err(DatabaseError::Query)?;
                media.id = Some(from_db_int(id, "id")?);
                debug!("Inserted media record {}", id);
            }
        }

        media.updated_at = updated_at;
        Ok(())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MediaRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(to_db_int(id, "id")?)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn delete(&self, media: &MediaRecord) -> RepositoryResult<()> {
        let id = media.id.ok_or(RepositoryError::Unpersisted)?;

        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(to_db_int(id, "id")?)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_id: u64,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        let sql = format!(
            "{} WHERE model_type = $1 AND model_id = $2 {}",
            SELECT_COLUMNS, ORDER_BY
        );
        let query = sqlx::query(&sql)
            .bind(owner_type)
            .bind(to_db_int(owner_id, "model_id")?);

        self.fetch_many(query).await
    }

    async fn find_by_owner_and_collection(
        &self,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        let sql = format!(
            "{} WHERE model_type = $1 AND model_id = $2 AND collection_name = $3 {}",
            SELECT_COLUMNS, ORDER_BY
        );
        let query = sqlx::query(&sql)
            .bind(owner_type)
            .bind(to_db_int(owner_id, "model_id")?)
            .bind(collection);

        self.fetch_many(query).await
    }

    async fn find_by_collection(&self, collection: &str) -> RepositoryResult<Vec<MediaRecord>> {
        let sql = format!("{} WHERE collection_name = $1 {}", SELECT_COLUMNS, ORDER_BY);
        let query = sqlx::query(&sql).bind(collection);

        self.fetch_many(query).await
    }
}
