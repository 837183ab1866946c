use anyhow::{Context, Result, anyhow};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    /// Full error details in 500 responses
    pub debug: bool,
    /// Wall-clock zone used for "today" and for scan timestamps
    pub utc_offset: FixedOffset,
    pub session_ttl: u64,

    pub analytics_url: String,
    pub analytics_timeout_secs: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    pub log_dir: String,
    pub log_level: tracing::Level,

    /// Seeded as the first admin when the users table is empty
    pub bootstrap_admin: Option<(String, String)>,
}

fn var_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}"))
}

/// Parses offsets written as `+05:00`, `-0330` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let offset = raw
        .parse::<FixedOffset>()
        .map_err(|e| anyhow!("offset {raw:?} is invalid: {e}"))?;

    // No zone is further than 14 hours from UTC
    if offset.local_minus_utc().abs() > 14 * 3600 {
        return Err(anyhow!("offset {raw:?} is out of range"));
    }
    Ok(offset)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(u), Ok(p)) if !u.trim().is_empty() && !p.is_empty() => {
                Some((u.trim().to_string(), p))
            }
            _ => None,
        };

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            debug: var_or("APP_DEBUG", "false")?,
            utc_offset: parse_utc_offset(
                &env::var("APP_UTC_OFFSET").unwrap_or_else(|_| "+05:00".to_string()),
            )?,
            session_ttl: var_or("SESSION_TTL", "3600")?, // 1 hour

            analytics_url: env::var("ANALYTICS_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            analytics_timeout_secs: var_or("ANALYTICS_TIMEOUT_SECS", "10")?,

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_scan_per_min: var_or("RATE_SCAN_PER_MIN", "120")?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", "debug")?,

            bootstrap_admin,
        })
    }

    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}
