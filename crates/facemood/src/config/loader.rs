use std::collections::HashSet;

use figment::{
    providers::{Env, Serialized},
    Figment,
};

use crate::config::schema::Settings;
use crate::error::ConfigError;

/// Environment variables read into [`Settings`].
pub const ENV_KEYS: &[&str] = &[
    "DATABASE_PATH",
    "DATABASE_NAME",
    "ML_CLIENT_URL",
    "DEEPFACE_MODELS",
    "DEEPFACE_BACKEND",
    "DETECTOR_THRESHOLD",
    "ENFORCE_DETECTION",
    "FACE_MODEL_PATH",
    "SECRET_KEY",
    "DEBUG_MODE",
    "MAX_IMAGE_SIZE",
    "BIND_ADDRESS",
    "PORT",
    "ANALYSIS_MODE",
    "ANALYZER_TIMEOUT_SECS",
    "ID_SCHEME",
    "WORKER_ENABLED",
    "WORKER_POLL_INTERVAL_SECS",
    "CLAIM_LEASE_SECS",
    "LOG_FORMAT",
];

/// Loads settings from compiled defaults overridden by the process environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(build_figment())
}

/// Defaults merged with the whitelisted environment variables.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Env::raw().only(ENV_KEYS))
}

/// Extracts and validates settings from an arbitrary figment.
pub fn load_config_from(figment: Figment) -> Result<Settings, ConfigError> {
    let settings: Settings = figment.extract().map_err(Box::new)?;

    validate_config(&settings)?;

    Ok(settings)
}

pub fn validate_config(settings: &Settings) -> Result<(), ConfigError> {
    if settings.database_name.is_empty()
        || !settings
            .database_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation {
            message: format!("Invalid database name: '{}'", settings.database_name),
        });
    }

    if reqwest::Url::parse(&settings.ml_client_url).is_err() {
        return Err(ConfigError::Validation {
            message: format!("ML_CLIENT_URL is not a valid URL: '{}'", settings.ml_client_url),
        });
    }

    if settings.deepface_models.is_empty() {
        return Err(ConfigError::Validation {
            message: "DEEPFACE_MODELS must name at least one attribute".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for attribute in &settings.deepface_models {
        if !seen.insert(attribute) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate analysis attribute: {}", attribute),
            });
        }
    }

    if !(0.0..=1.0).contains(&settings.detector_threshold) {
        return Err(ConfigError::Validation {
            message: format!(
                "DETECTOR_THRESHOLD must be between 0 and 1, got {}",
                settings.detector_threshold
            ),
        });
    }

    if settings.max_image_size == 0 {
        return Err(ConfigError::Validation {
            message: "MAX_IMAGE_SIZE must be greater than zero".to_string(),
        });
    }

    for (name, value) in [
        ("ANALYZER_TIMEOUT_SECS", settings.analyzer_timeout_secs),
        ("WORKER_POLL_INTERVAL_SECS", settings.worker_poll_interval_secs),
        ("CLAIM_LEASE_SECS", settings.claim_lease_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than zero", name),
            });
        }
    }

    // A claim lease shorter than one analyzer call would let a second worker
    // take over a document that is still being analyzed.
    if settings.claim_lease_secs < settings.analyzer_timeout_secs {
        return Err(ConfigError::Validation {
            message: format!(
                "CLAIM_LEASE_SECS ({}) must not be shorter than ANALYZER_TIMEOUT_SECS ({})",
                settings.claim_lease_secs, settings.analyzer_timeout_secs
            ),
        });
    }

    if settings.secret_key.is_none() && !settings.debug_mode {
        log::warn!("SECRET_KEY is not set");
    }

    Ok(())
}
