use std::time::Duration as StdDuration;

use anyhow::{Context, bail};
use time::Duration;

/// Runtime settings, all env-driven (a `.env` file works too).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Set ⇒ SQLite store at this URL; unset ⇒ in-memory store.
    pub database_url: Option<String>,
    /// How stale a participant may get before the sweeper evicts them.
    /// Keep it above the heartbeat cadence clients actually use.
    pub inactivity_threshold: Duration,
    pub sweep_interval: StdDuration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let threshold = secs_var("INACTIVITY_THRESHOLD_SECS", 10)?;
        let interval = secs_var("SWEEP_INTERVAL_SECS", 15)?;
        Ok(Self {
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            database_url: dotenv::var("DATABASE_URL").ok(),
            inactivity_threshold: Duration::seconds(threshold as i64),
            sweep_interval: StdDuration::from_secs(interval),
        })
    }
}

fn secs_var(name: &str, default: u64) -> anyhow::Result<u64> {
    let Ok(raw) = dotenv::var(name) else {
        return Ok(default);
    };
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{name} must be an integer number of seconds"))?;
    if secs == 0 {
        bail!("{name} must be positive");
    }
    Ok(secs)
}
