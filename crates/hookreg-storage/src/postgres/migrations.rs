use hookreg_core::document::Table;
use sqlx::PgPool;

/// Creates one document table per collection. Safe to run repeatedly.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for table in Table::ALL {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id          TEXT PRIMARY KEY,
                doc         JSONB NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        );
        sqlx::query(&create_table).execute(pool).await?;

        let create_index =
            format!("CREATE INDEX IF NOT EXISTS idx_{table}_doc ON {table} USING GIN (doc)");
        sqlx::query(&create_index).execute(pool).await?;
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_username ON accounts ((doc->>'username'))",
    )
    .execute(pool)
    .await?;

    tracing::debug!(tables = Table::ALL.len(), "document tables ready");
    Ok(())
}
