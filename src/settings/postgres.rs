use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::OptionStore;

/// Options persisted in the `options` table (see `migrations/`)
pub struct PgOptionStore {
    pool: PgPool,
}

impl PgOptionStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl OptionStore for PgOptionStore {
    #[tracing::instrument(name = "Reading option", skip(self))]
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>, anyhow::Error> {
        sqlx::query_scalar::<_, String>("SELECT option_value FROM options WHERE option_name = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read option {key}"))
    }

    // values are not logged, they may be API keys
    #[tracing::instrument(name = "Writing option", skip(self, value))]
    async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
        INSERT INTO options (option_name, option_value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (option_name) DO UPDATE
        SET option_value = EXCLUDED.option_value,
            updated_at = EXCLUDED.updated_at
    "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write option {key}"))?;
        Ok(())
    }

    #[tracing::instrument(name = "Deleting option", skip(self))]
    async fn delete(
        &self,
        key: &str,
    ) -> Result<(), anyhow::Error> {
        sqlx::query("DELETE FROM options WHERE option_name = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete option {key}"))?;
        Ok(())
    }
}
