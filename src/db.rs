//! Postgres sink: schema bootstrap, single-row insert, recent-rows query.
//!
//! The loader opens one connection per run, scoped to the insert call and
//! released on every exit path. The dashboard keeps a small bounded pool.
//! Schema bootstrap is idempotent and runs on both paths so either process
//! can come up first.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, PgConnection};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::errors::LoadError;
use crate::models::WeatherRecord;

/// Columns of `weather.weather_data`, in insert/select order.
const RECORD_COLUMNS: &str = "city, temperature_c, thermal_sensation_c, temp_min_c, temp_max_c, \
     humidity, pressure, wind_speed, wind_direction, latitude, longitude, \
     weather_main, weather_description, weather_icon, \
     sys_country, sys_sunrise, sys_sunset, collection_timestamp";

/// Maximum connections for the dashboard pool.
const POOL_MAX_CONNECTIONS: u32 = 5;

/// Build connect options from explicit config.
///
/// Options are assembled field by field rather than as a URL string, so
/// credentials never need escaping.
fn connect_options(db: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.dbname)
}

/// Open the long-lived pool used by the dashboard.
///
/// # Errors
///
/// Returns an error if the sink is unreachable.
pub async fn connect_pool(db: &DbConfig) -> Result<PgPool, LoadError> {
    let pool = PgPoolOptions::new()
        .max_connections(POOL_MAX_CONNECTIONS)
        .connect_with(connect_options(db))
        .await?;
    Ok(pool)
}

/// Ping the sink. Used at dashboard startup to fail fast when the
/// database is unreachable.
///
/// # Errors
///
/// Returns an error if the query cannot be executed.
pub async fn ping(pool: &PgPool) -> Result<(), LoadError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the `weather` schema and `weather.weather_data` table if they do
/// not exist. Safe to call on every run.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<(), LoadError> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS weather")
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS weather.weather_data (
            id                   BIGSERIAL PRIMARY KEY,
            city                 TEXT             NOT NULL,
            temperature_c        DOUBLE PRECISION NOT NULL,
            thermal_sensation_c  DOUBLE PRECISION NOT NULL,
            temp_min_c           DOUBLE PRECISION NOT NULL,
            temp_max_c           DOUBLE PRECISION NOT NULL,
            humidity             INTEGER          NOT NULL,
            pressure             INTEGER          NOT NULL,
            wind_speed           DOUBLE PRECISION NOT NULL,
            wind_direction       INTEGER          NOT NULL,
            latitude             DOUBLE PRECISION NOT NULL,
            longitude            DOUBLE PRECISION NOT NULL,
            weather_main         TEXT             NOT NULL,
            weather_description  TEXT             NOT NULL,
            weather_icon         TEXT             NOT NULL,
            sys_country          TEXT             NOT NULL,
            sys_sunrise          TIMESTAMPTZ      NOT NULL,
            sys_sunset           TIMESTAMPTZ      NOT NULL,
            collection_timestamp TIMESTAMPTZ      NOT NULL
        )
        ",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r"
        CREATE INDEX IF NOT EXISTS idx_weather_data_city_time
            ON weather.weather_data (city, collection_timestamp)
        ",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert one record, returning the new row id.
///
/// Opens a connection scoped to this call: dropped on error, closed on
/// success. Append-only; duplicate timestamps are allowed and never
/// deduplicated.
///
/// # Errors
///
/// Returns an error on connection failure, DDL failure, or insert failure.
/// The insert is a single atomic statement, so a failed run commits nothing.
pub async fn load(record: &WeatherRecord, db: &DbConfig) -> Result<i64, LoadError> {
    let mut conn: PgConnection = connect_options(db).connect().await?;

    ensure_schema(&mut conn).await?;

    let sql = format!(
        "INSERT INTO weather.weather_data ({RECORD_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
         RETURNING id"
    );

    let (id,): (i64,) = sqlx::query_as(&sql)
        .bind(&record.city)
        .bind(record.temperature_c)
        .bind(record.thermal_sensation_c)
        .bind(record.temp_min_c)
        .bind(record.temp_max_c)
        .bind(record.humidity)
        .bind(record.pressure)
        .bind(record.wind_speed)
        .bind(record.wind_direction)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(&record.weather_main)
        .bind(&record.weather_description)
        .bind(&record.weather_icon)
        .bind(&record.sys_country)
        .bind(record.sys_sunrise)
        .bind(record.sys_sunset)
        .bind(record.collection_timestamp)
        .fetch_one(&mut conn)
        .await?;

    conn.close().await?;

    info!(row_id = id, city = %record.city, "inserted weather record");
    Ok(id)
}

/// Fetch rows newer than the given window, ascending by collection time
/// (chart order), capped at `limit` most recent rows.
///
/// An empty table yields an empty vec, not an error.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn recent_records(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<WeatherRecord>, LoadError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM ( \
             SELECT {RECORD_COLUMNS} FROM weather.weather_data \
             WHERE collection_timestamp >= $1 \
             ORDER BY collection_timestamp DESC \
             LIMIT $2 \
         ) recent \
         ORDER BY collection_timestamp ASC"
    );

    let rows: Vec<WeatherRecord> = sqlx::query_as(&sql)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    debug!(rows = rows.len(), "fetched recent records");
    Ok(rows)
}

/// Fetch the most recent record, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn latest_record(pool: &PgPool) -> Result<Option<WeatherRecord>, LoadError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM weather.weather_data \
         ORDER BY collection_timestamp DESC LIMIT 1"
    );

    let row = sqlx::query_as(&sql).fetch_optional(pool).await?;
    Ok(row)
}
