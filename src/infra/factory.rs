use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::error::AppError;
use crate::state::{AppState, Repositories};
use crate::infra::crm::http_lead_store::HttpLeadStore;
use crate::infra::messaging::http_message_channel::HttpMessageChannel;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_job_repo::PostgresJobRepo,
    postgres_message_log_repo::PostgresMessageLogRepo, postgres_slot_repo::PostgresSlotRepo,
    postgres_template_repo::PostgresTemplateRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_job_repo::SqliteJobRepo,
    sqlite_message_log_repo::SqliteMessageLogRepo, sqlite_slot_repo::SqliteSlotRepo,
    sqlite_template_repo::SqliteTemplateRepo,
};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let timeout = Duration::from_secs(config.sync_timeout_secs);
    let message_channel = Arc::new(HttpMessageChannel::new(
        config.message_service_url.clone(),
        config.message_service_token.clone(),
        timeout,
    )?);
    let lead_store = Arc::new(HttpLeadStore::new(
        config.crm_service_url.clone(),
        config.crm_service_token.clone(),
        timeout,
    )?);

    let database_url = &config.database_url;
    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");
        postgres_repositories(connect_postgres(database_url).await?)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");
        sqlite_repositories(connect_sqlite(database_url).await?)
    };

    AppState::new(config.clone(), repos, message_channel, lead_store)
}

pub async fn connect_postgres(database_url: &str) -> Result<PgPool, AppError> {
    let mut opts: PgConnectOptions = database_url.parse()?;
    opts = opts.log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/postgres")
        .run(&pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))?;
    Ok(pool)
}

/// Opens (creating if needed) and migrates a SQLite database in WAL mode.
pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/sqlite")
        .run(&pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))?;
    Ok(pool)
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        templates: Arc::new(PostgresTemplateRepo::new(pool.clone())),
        slots: Arc::new(PostgresSlotRepo::new(pool.clone())),
        bookings: Arc::new(PostgresBookingRepo::new(pool.clone())),
        jobs: Arc::new(PostgresJobRepo::new(pool.clone())),
        message_logs: Arc::new(PostgresMessageLogRepo::new(pool)),
    }
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        templates: Arc::new(SqliteTemplateRepo::new(pool.clone())),
        slots: Arc::new(SqliteSlotRepo::new(pool.clone())),
        bookings: Arc::new(SqliteBookingRepo::new(pool.clone())),
        jobs: Arc::new(SqliteJobRepo::new(pool.clone())),
        message_logs: Arc::new(SqliteMessageLogRepo::new(pool)),
    }
}
