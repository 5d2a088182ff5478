use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::domain::billing::{
  BillingServiceConfig, DEFAULT_DUE_DATE_OFFSET_DAYS, TimesheetStatus,
};

fn default_due_date_offset_days() -> i64 {
  DEFAULT_DUE_DATE_OFFSET_DAYS
}

fn default_billable_status() -> String {
  "approved".to_string()
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub billing: BillingConfig,
}

/// Billing policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
  /// Days added to the derived minimum due date when pre-filling a
  /// create-mode draft.
  #[serde(default = "default_due_date_offset_days")]
  pub due_date_offset_days: i64,
  /// Timesheet status considered billable when fetching candidates.
  #[serde(default = "default_billable_status")]
  pub billable_status: String,
}

impl Default for BillingConfig {
  fn default() -> Self {
    Self {
      due_date_offset_days: default_due_date_offset_days(),
      billable_status: default_billable_status(),
    }
  }
}

impl Config {
  /// Load configuration from files and environment variables
  ///
  /// Configuration is loaded in the following order (later sources
  /// override earlier ones):
  /// 1. config/default.toml (optional; every key has a default)
  /// 2. config/local.toml (if exists)
  /// 3. config/{RUN_MODE}.toml (if exists)
  /// 4. Environment variables with LEXBILL_ prefix, double-underscore
  ///    separated: `LEXBILL_BILLING__DUE_DATE_OFFSET_DAYS=45`
  pub fn load() -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let config = ConfigBuilder::builder()
      .add_source(File::with_name("config/default").required(false))
      .add_source(File::with_name("config/local").required(false))
      .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
      .add_source(
        Environment::with_prefix("LEXBILL")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    config.try_deserialize()
  }

  /// Maps the loaded settings into the domain service's configuration.
  pub fn billing_service_config(&self) -> Result<BillingServiceConfig, ConfigError> {
    let billable_status = TimesheetStatus::from_str(&self.billing.billable_status)
      .map_err(|e| ConfigError::Message(e.to_string()))?;
    Ok(BillingServiceConfig {
      due_date_offset_days: self.billing.due_date_offset_days,
      billable_status,
    })
  }
}
