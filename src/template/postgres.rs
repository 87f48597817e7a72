//! PostgreSQL-backed template source.
//!
//! Reads from a `templates` table shaped like:
//!
//! ```sql
//! CREATE TABLE templates (
//!     id UUID PRIMARY KEY,
//!     template_key TEXT NOT NULL,
//!     name TEXT NOT NULL,
//!     body_template TEXT NOT NULL,
//!     subject_template TEXT,
//!     variables_description JSONB,
//!     channel_type TEXT NOT NULL,
//!     enterprise_id TEXT,
//!     publish_status TEXT NOT NULL,
//!     deactivated BOOLEAN NOT NULL DEFAULT false,
//!     description TEXT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::source::TemplateSource;
use super::types::{ChannelType, PublishStatus, Template, TemplateFilter, TemplateStoreError};

const TEMPLATE_COLUMNS: &str = "id, template_key, name, body_template, subject_template, \
     variables_description, channel_type, enterprise_id, publish_status, deactivated, \
     description, created_at, updated_at";

/// Row as stored; enum columns are plain text
#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    template_key: String,
    name: String,
    body_template: String,
    subject_template: Option<String>,
    variables_description: Option<serde_json::Value>,
    channel_type: String,
    enterprise_id: Option<String>,
    publish_status: String,
    deactivated: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        let publish_status = match row.publish_status.as_str() {
            "PUBLISH" => PublishStatus::Published,
            "ARCHIVED" => PublishStatus::Archived,
            _ => PublishStatus::Draft,
        };

        Template {
            id: row.id,
            template_key: row.template_key,
            name: row.name,
            body_template: row.body_template,
            subject_template: row.subject_template,
            variables_description: row.variables_description,
            channel_type: ChannelType::parse_or_default(&row.channel_type),
            enterprise_id: row.enterprise_id,
            publish_status,
            deactivated: row.deactivated,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL template source
pub struct PostgresTemplateSource {
    pool: PgPool,
}

impl PostgresTemplateSource {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await?;

        tracing::info!(pool_size = config.pool_size, "PostgreSQL template pool created");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TemplateSource for PostgresTemplateSource {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(
        &self,
        template_key: &str,
        enterprise_id: Option<&str>,
    ) -> Result<Option<Template>, TemplateStoreError> {
        // Tenant rows sort before global rows; a NULL tenant parameter only matches globals
        let query = format!(
            "SELECT {} FROM templates \
             WHERE template_key = $1 \
               AND publish_status = 'PUBLISH' \
               AND deactivated = false \
               AND (enterprise_id = $2 OR enterprise_id IS NULL) \
             ORDER BY enterprise_id NULLS LAST \
             LIMIT 1",
            TEMPLATE_COLUMNS
        );

        let row: Option<TemplateRow> = sqlx::query_as(&query)
            .bind(template_key)
            .bind(enterprise_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TemplateStoreError::load(template_key, e))?;

        Ok(row.map(Template::from))
    }

    async fn list(&self, filter: &TemplateFilter) -> Result<Vec<Template>, TemplateStoreError> {
        let query = format!(
            "SELECT {} FROM templates \
             WHERE publish_status = 'PUBLISH' \
               AND deactivated = false \
               AND (enterprise_id IS NULL OR enterprise_id = $1) \
               AND ($2::text IS NULL OR channel_type = $2) \
               AND ($3::text IS NULL OR template_key LIKE $3 || '%') \
             ORDER BY template_key",
            TEMPLATE_COLUMNS
        );

        let rows: Vec<TemplateRow> = sqlx::query_as(&query)
            .bind(filter.enterprise_id.as_deref())
            .bind(filter.channel_type.map(|c| c.as_str()))
            .bind(filter.key_prefix.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TemplateStoreError::load("*", e))?;

        Ok(rows.into_iter().map(Template::from).collect())
    }
}
