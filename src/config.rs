use std::env;
use std::str::FromStr;
use chrono_tz::Tz;
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Zone in which slot dates and times are wall-clock values.
    pub timezone: Tz,
    pub message_service_url: String,
    pub message_service_token: String,
    pub crm_service_url: String,
    pub crm_service_token: String,
    pub reminder_lead_hours: i64,
    pub job_max_attempts: i32,
    pub sync_timeout_secs: u64,
    pub pipeline_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let timezone_name = var_or("ACADEMY_TIMEZONE", "UTC");
        let timezone = Tz::from_str(&timezone_name)
            .map_err(|_| AppError::Validation(format!("ACADEMY_TIMEZONE '{}' is not a known timezone", timezone_name)))?;

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://academy.db?mode=rwc"),
            port: parse_var("PORT", 3000)?,
            timezone,
            message_service_url: var_or("MESSAGE_SERVICE_URL", "http://localhost:8000/api/v1/messages"),
            message_service_token: var_or("MESSAGE_SERVICE_TOKEN", "test-token-1"),
            crm_service_url: var_or("CRM_SERVICE_URL", "http://localhost:8100/api/v1"),
            crm_service_token: var_or("CRM_SERVICE_TOKEN", "test-token-1"),
            reminder_lead_hours: parse_var("REMINDER_LEAD_HOURS", 24)?,
            job_max_attempts: parse_var("JOB_MAX_ATTEMPTS", 5)?,
            sync_timeout_secs: parse_var("SYNC_TIMEOUT_SECS", 10)?,
            pipeline_sweep_secs: parse_var("PIPELINE_SWEEP_SECS", 300)?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse()
            .map_err(|_| AppError::Validation(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
