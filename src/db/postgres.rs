use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::db::{Point, ReadingSink};

pub async fn new_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    Ok(pool)
}

pub async fn bulk_insert_points(pool: &PgPool, points: &[Point]) -> Result<()> {
    if points.is_empty() {
        return Ok(());
    }

    let measurements: Vec<&str> = points.iter().map(|p| p.measurement).collect();
    let sources: Vec<&str> = points.iter().map(|p| p.source.as_str()).collect();
    let values: Vec<f32> = points.iter().map(|p| p.value).collect();
    let measured_ats: Vec<DateTime<Utc>> = points.iter().map(|p| p.measured_at).collect();

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query(
        r#"
        INSERT INTO measurements (measurement, source, value, measured_at)
        SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::REAL[], $4::TIMESTAMPTZ[])
        "#,
    )
    .bind(&measurements)
    .bind(&sources)
    .bind(&values)
    .bind(&measured_ats)
    .execute(&mut *tx)
    .await
    .context("failed to execute bulk insert query")?;

    tx.commit().await.context("failed to commit transaction")?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingSink for PgSink {
    async fn write(&self, points: &[Point]) -> Result<()> {
        bulk_insert_points(&self.pool, points).await
    }
}
