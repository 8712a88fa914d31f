use crate::error::{Result, ShopError};
use chrono::Duration;
use std::env;

/// Runtime configuration loaded from the environment (and an optional `.env`
/// file next to the process).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// ISO currency code used on issued invoices.
    pub currency: String,
    /// Users allowed to run the catalog administration wizards.
    pub admin_ids: Vec<i64>,
    /// How long an unpaid reservation stays in the ledger before the expiry
    /// sweep may drop it.
    pub pending_retention: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let currency = env::var("CURRENCY").unwrap_or_else(|_| "MDL".to_string());

        let admin_ids = env::var("ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|e| ShopError::Config(format!("invalid ADMIN_IDS entry {s:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let retention_hours = env::var("PENDING_RETENTION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()
            .map_err(|e| ShopError::Config(format!("invalid PENDING_RETENTION_HOURS: {e}")))?;

        Ok(Self {
            currency,
            admin_ids,
            pending_retention: Duration::hours(retention_hours),
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            currency: "MDL".to_string(),
            admin_ids: Vec::new(),
            pending_retention: Duration::hours(24),
        }
    }
}
