use anyhow::Context;
use billwise_core::constants::DEFAULT_TIMEZONE;
use std::{net::SocketAddr, str::FromStr, time::Duration};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub default_timezone: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub tick_interval: Duration,
    pub initial_delay: Duration,
    /// Webhook that relays reminders to chat channels. Without it reminders
    /// are only logged.
    pub notifier_url: Option<String>,
    pub notifier_timeout: Duration,
    pub notify_retries: u32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("BILLWISE_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8088".to_string())
            .parse()
            .context("Invalid BILLWISE_LISTEN_ADDR")?;
        let db_path =
            std::env::var("BILLWISE_DB_PATH").unwrap_or_else(|_| "./db/billwise.db".into());
        let default_timezone = std::env::var("BILLWISE_DEFAULT_TIMEZONE")
            .ok()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let cors_allow = std::env::var("BILLWISE_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let notifier_url = std::env::var("BILLWISE_NOTIFIER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            listen_addr,
            db_path,
            default_timezone,
            cors_allow,
            request_timeout: Duration::from_millis(env_or("BILLWISE_REQUEST_TIMEOUT_MS", 30_000)),
            tick_interval: Duration::from_secs(env_or("BILLWISE_TICK_INTERVAL_SECS", 3_600).max(1)),
            initial_delay: Duration::from_secs(env_or("BILLWISE_INITIAL_DELAY_SECS", 5)),
            notifier_url,
            notifier_timeout: Duration::from_millis(env_or("BILLWISE_NOTIFIER_TIMEOUT_MS", 10_000)),
            notify_retries: env_or("BILLWISE_NOTIFY_RETRIES", 2),
        })
    }
}
