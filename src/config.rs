//! Application configuration structure
use std::{net::SocketAddr, str::FromStr};

use anyhow::{Context, Result, bail};

use crate::srs::{DEFAULT_MASTERY_THRESHOLD_DAYS, DEFAULT_MAX_INTERVAL_DAYS, SchedulerConfig};

pub const DEFAULT_LOG_FILTER: &str = "sandstone=info,tower_http=info";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REVIEW_BATCH_SIZE: usize = 20;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub mastery_threshold_days: i32,
    pub max_interval_days: i32,
    pub review_batch_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            mastery_threshold_days: DEFAULT_MASTERY_THRESHOLD_DAYS,
            max_interval_days: DEFAULT_MAX_INTERVAL_DAYS,
            review_batch_size: DEFAULT_REVIEW_BATCH_SIZE,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            addr: parse_var(&lookup, "SANDSTONE_ADDR", DEFAULT_ADDR)?,
            mastery_threshold_days: parse_var(
                &lookup,
                "SANDSTONE_MASTERY_THRESHOLD_DAYS",
                &DEFAULT_MASTERY_THRESHOLD_DAYS.to_string(),
            )?,
            max_interval_days: parse_var(
                &lookup,
                "SANDSTONE_MAX_INTERVAL_DAYS",
                &DEFAULT_MAX_INTERVAL_DAYS.to_string(),
            )?,
            review_batch_size: parse_var(
                &lookup,
                "SANDSTONE_REVIEW_BATCH_SIZE",
                &DEFAULT_REVIEW_BATCH_SIZE.to_string(),
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.mastery_threshold_days < 1 {
            bail!("mastery threshold must be at least one day");
        }
        if self.max_interval_days < 1 {
            bail!("maximum interval must be at least one day");
        }
        if self.max_interval_days < self.mastery_threshold_days {
            bail!(
                "maximum interval ({} days) is below the mastery threshold ({} days), no card could be mastered",
                self.max_interval_days,
                self.mastery_threshold_days
            );
        }
        if self.review_batch_size == 0 {
            bail!("review batch size must be positive");
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            mastery_threshold_days: self.mastery_threshold_days,
            max_interval_days: self.max_interval_days,
        }
    }
}
