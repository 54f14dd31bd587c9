//! Database schema management for the reading archive.
//!
//! Ensures required tables and indexes exist before the watcher starts
//! writing. Applied once on startup from `main.rs`, and only when a
//! `DATABASE_URL` is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the archive schema (idempotent).
///
/// `stations` holds the latest snapshot per station; `station_readings` is
/// append-only, one row per accepted realtime push. Safe to call on every
/// startup.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            station_id        TEXT PRIMARY KEY,
            name              TEXT        NOT NULL,
            location          TEXT        NOT NULL DEFAULT '',
            lat               DOUBLE PRECISION,
            lng               DOUBLE PRECISION,
            device_id         TEXT,
            device_model      TEXT,
            battery           DOUBLE PRECISION,
            latest_aqi        INTEGER,
            latest_pm25       DOUBLE PRECISION,
            latest_pm10       DOUBLE PRECISION,
            latest_at         TIMESTAMPTZ NOT NULL,
            created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at        TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_readings (
            id                UUID PRIMARY KEY,
            station_id        TEXT        NOT NULL,
            aqi               INTEGER,
            pm25              DOUBLE PRECISION,
            pm10              DOUBLE PRECISION,
            co                DOUBLE PRECISION,
            no2               DOUBLE PRECISION,
            so2               DOUBLE PRECISION,
            o3                DOUBLE PRECISION,
            eco2_ppm          DOUBLE PRECISION,
            tvoc_ppb          DOUBLE PRECISION,
            lat               DOUBLE PRECISION,
            lng               DOUBLE PRECISION,
            battery           DOUBLE PRECISION,
            device_id         TEXT,
            device_model      TEXT,
            sensor_readings   TEXT,
            data_timestamp    TIMESTAMPTZ NOT NULL,
            created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_station_readings_station_time
            ON station_readings (station_id, data_timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
