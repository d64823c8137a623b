//! Workflow tuning loaded from environment variables.

use std::time::Duration;

use atelier_core::approval::DUPLICATE_WINDOW_SECS;
use atelier_core::credits::{FRONT_VIEW_COST, REMAINING_VIEWS_COST};
use atelier_core::generation::{
    DEFAULT_FALLBACK_MODEL, DEFAULT_PRIMARY_MODEL, DEFAULT_RETRY_BUDGET, DEFAULT_STYLE,
};
use atelier_core::retry::{RetryPolicy, DEFAULT_PERSIST_ATTEMPTS};
use atelier_core::types::Credits;

use crate::ports::GenerationOptions;

/// Default object-store preset for uploaded views.
pub const DEFAULT_UPLOAD_PRESET: &str = "product-views";

/// Default age after which a row left mid-phase can be reclaimed. Longer
/// than the generator's worst-case retry schedule for a full batch.
pub const DEFAULT_STALE_PHASE_SECS: i64 = 1800;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} must be {expected} (got {value:?})")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Costs, windows and retry settings for the four phases.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub front_view_cost: Credits,
    pub remaining_views_cost: Credits,
    pub duplicate_window_secs: i64,
    pub generation: GenerationOptions,
    pub persist_policy: RetryPolicy,
    pub style: String,
    pub upload_preset: String,
    /// Seconds after which a row stuck mid-phase may be claimed again.
    pub stale_phase_secs: i64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            front_view_cost: FRONT_VIEW_COST,
            remaining_views_cost: REMAINING_VIEWS_COST,
            duplicate_window_secs: DUPLICATE_WINDOW_SECS,
            generation: GenerationOptions {
                retry_budget: DEFAULT_RETRY_BUDGET,
                fallback_enabled: true,
                preferred_model: Some(DEFAULT_PRIMARY_MODEL.to_string()),
            },
            persist_policy: RetryPolicy::default(),
            style: DEFAULT_STYLE.to_string(),
            upload_preset: DEFAULT_UPLOAD_PRESET.to_string(),
            stale_phase_secs: DEFAULT_STALE_PHASE_SECS,
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                  |
    /// |-------------------------------|--------------------------|
    /// | `FRONT_VIEW_CREDIT_COST`      | `2`                      |
    /// | `REMAINING_VIEWS_CREDIT_COST` | `3`                      |
    /// | `DUPLICATE_WINDOW_SECS`       | `5`                      |
    /// | `GENERATOR_RETRY_BUDGET`      | `5`                      |
    /// | `GENERATOR_FALLBACK_ENABLED`  | `true`                   |
    /// | `GENERATOR_PRIMARY_MODEL`     | `gemini-2.5-flash-image` |
    /// | `PERSIST_MAX_ATTEMPTS`        | `3`                      |
    /// | `PERSIST_RETRY_DELAY_MS`      | `500`                    |
    /// | `IMAGE_STYLE`                 | `product-photography`    |
    /// | `UPLOAD_PRESET`               | `product-views`          |
    /// | `STALE_PHASE_SECS`            | `1800`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let persist_attempts: u32 = parse_var("PERSIST_MAX_ATTEMPTS", DEFAULT_PERSIST_ATTEMPTS)?;
        let persist_delay_ms: u64 = parse_var("PERSIST_RETRY_DELAY_MS", 500)?;

        Ok(Self {
            front_view_cost: positive_credits("FRONT_VIEW_CREDIT_COST", FRONT_VIEW_COST)?,
            remaining_views_cost: positive_credits(
                "REMAINING_VIEWS_CREDIT_COST",
                REMAINING_VIEWS_COST,
            )?,
            duplicate_window_secs: parse_var("DUPLICATE_WINDOW_SECS", DUPLICATE_WINDOW_SECS)?,
            generation: GenerationOptions {
                retry_budget: parse_var("GENERATOR_RETRY_BUDGET", DEFAULT_RETRY_BUDGET)?,
                fallback_enabled: parse_var("GENERATOR_FALLBACK_ENABLED", true)?,
                preferred_model: Some(string_var("GENERATOR_PRIMARY_MODEL", DEFAULT_PRIMARY_MODEL)),
            },
            persist_policy: RetryPolicy::fixed(
                persist_attempts,
                Duration::from_millis(persist_delay_ms),
            ),
            style: string_var("IMAGE_STYLE", DEFAULT_STYLE),
            upload_preset: string_var("UPLOAD_PRESET", DEFAULT_UPLOAD_PRESET),
            stale_phase_secs: parse_var("STALE_PHASE_SECS", DEFAULT_STALE_PHASE_SECS)?,
        })
    }
}

/// Base URLs and model names for the HTTP collaborators.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub image_generator_url: String,
    pub object_store_url: String,
    pub feature_extractor_url: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// | Env Var                    | Default            |
    /// |----------------------------|--------------------|
    /// | `IMAGE_GENERATOR_URL`      | required           |
    /// | `OBJECT_STORE_URL`         | required           |
    /// | `FEATURE_EXTRACTOR_URL`    | required           |
    /// | `GENERATOR_FALLBACK_MODEL` | `flux-kontext-pro` |
    /// | `SERVICE_TIMEOUT_SECS`     | `120`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            image_generator_url: required_var("IMAGE_GENERATOR_URL")?,
            object_store_url: required_var("OBJECT_STORE_URL")?,
            feature_extractor_url: required_var("FEATURE_EXTRACTOR_URL")?,
            primary_model: string_var("GENERATOR_PRIMARY_MODEL", DEFAULT_PRIMARY_MODEL),
            fallback_model: string_var("GENERATOR_FALLBACK_MODEL", DEFAULT_FALLBACK_MODEL),
            request_timeout: Duration::from_secs(parse_var("SERVICE_TIMEOUT_SECS", 120)?),
        })
    }
}

// ---- env helpers ----

fn string_var(name: &'static str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name })
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                expected: std::any::type_name::<T>(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}

fn positive_credits(name: &'static str, default: Credits) -> Result<Credits, ConfigError> {
    let value: Credits = parse_var(name, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            expected: "a positive integer",
            value: value.to_string(),
        });
    }
    Ok(value)
}
