use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::store::IdScheme;

/// Runtime settings shared by the web app and the analysis service.
///
/// Every field maps to an environment variable of the same name in upper
/// case (`database_path` <- `DATABASE_PATH`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Analysis endpoint the web app posts encoded images to.
    #[serde(default = "default_ml_client_url")]
    pub ml_client_url: String,

    #[serde(
        default = "default_models",
        deserialize_with = "deserialize_attributes"
    )]
    pub deepface_models: Vec<AnalysisAttribute>,
    #[serde(default)]
    pub deepface_backend: DetectorBackend,
    #[serde(default = "default_threshold")]
    pub detector_threshold: f32,
    #[serde(default = "default_true")]
    pub enforce_detection: bool,
    /// Path to the ONNX face model used by the in-process analyzer.
    #[serde(default)]
    pub face_model_path: Option<String>,

    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_secret"
    )]
    pub secret_key: Option<SecretString>,
    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Listen port. Each binary has its own fallback when unset.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub analysis_mode: AnalysisMode,
    #[serde(default = "default_analyzer_timeout")]
    pub analyzer_timeout_secs: u64,
    #[serde(default)]
    pub id_scheme: IdScheme,

    #[serde(default = "default_true")]
    pub worker_enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub worker_poll_interval_secs: u64,
    #[serde(default = "default_claim_lease")]
    pub claim_lease_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_database_path() -> String {
    "data".to_string()
}

fn default_database_name() -> String {
    "facemood".to_string()
}

fn default_ml_client_url() -> String {
    "http://localhost:5002/analyze".to_string()
}

fn default_models() -> Vec<AnalysisAttribute> {
    vec![
        AnalysisAttribute::Age,
        AnalysisAttribute::Gender,
        AnalysisAttribute::Emotion,
    ]
}

fn default_threshold() -> f32 {
    0.9
}

fn default_true() -> bool {
    true
}

fn default_max_image_size() -> u64 {
    16 * 1024 * 1024
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_analyzer_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5
}

fn default_claim_lease() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            database_name: default_database_name(),
            ml_client_url: default_ml_client_url(),
            deepface_models: default_models(),
            deepface_backend: DetectorBackend::default(),
            detector_threshold: default_threshold(),
            enforce_detection: true,
            face_model_path: None,
            secret_key: None,
            debug_mode: false,
            max_image_size: default_max_image_size(),
            bind_address: default_bind_address(),
            port: None,
            analysis_mode: AnalysisMode::default(),
            analyzer_timeout_secs: default_analyzer_timeout(),
            id_scheme: IdScheme::default(),
            worker_enabled: true,
            worker_poll_interval_secs: default_poll_interval(),
            claim_lease_secs: default_claim_lease(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// `DATABASE_PATH/DATABASE_NAME.db`
    pub fn database_file(&self) -> PathBuf {
        crate::db::database_file(std::path::Path::new(&self.database_path), &self.database_name)
    }

    pub fn listen_address(&self, fallback_port: u16) -> String {
        format!("{}:{}", self.bind_address, self.port.unwrap_or(fallback_port))
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.worker_poll_interval_secs)
    }

    pub fn claim_lease(&self) -> Duration {
        Duration::from_secs(self.claim_lease_secs)
    }
}

/// Facial attributes an analyzer can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisAttribute {
    Age,
    Gender,
    Emotion,
    Race,
}

impl AnalysisAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisAttribute::Age => "age",
            AnalysisAttribute::Gender => "gender",
            AnalysisAttribute::Emotion => "emotion",
            AnalysisAttribute::Race => "race",
        }
    }
}

impl fmt::Display for AnalysisAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisAttribute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "age" => Ok(AnalysisAttribute::Age),
            "gender" => Ok(AnalysisAttribute::Gender),
            "emotion" => Ok(AnalysisAttribute::Emotion),
            "race" => Ok(AnalysisAttribute::Race),
            _ => Err(ConfigError::UnknownAttribute(s.trim().to_string())),
        }
    }
}

/// Accepts either a comma separated string (`age,gender,emotion`, the form an
/// environment variable takes) or a sequence.
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<Vec<AnalysisAttribute>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let names = match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse::<AnalysisAttribute>().map_err(D::Error::custom))
        .collect()
}

/// Environment values that look numeric arrive as numbers; a secret is
/// always kept as text.
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(SecretString::from(s)),
        other => Some(SecretString::from(other.to_string())),
    }))
}

/// Face region selection used by the in-process model.
///
/// `opencv` crops the centred square where a framed face is expected,
/// `skip` feeds the whole frame to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    #[default]
    Opencv,
    Skip,
}

/// Whether the web app analyzes uploads inline or leaves them to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Sync,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse() {
        assert_eq!("Age".parse::<AnalysisAttribute>().unwrap(), AnalysisAttribute::Age);
        assert_eq!(
            " emotion ".parse::<AnalysisAttribute>().unwrap(),
            AnalysisAttribute::Emotion
        );
        assert!(matches!(
            "mood".parse::<AnalysisAttribute>(),
            Err(ConfigError::UnknownAttribute(name)) if name == "mood"
        ));
    }

    #[test]
    fn test_models_from_joined_string() {
        let settings: Settings =
            serde_json::from_str(r#"{"deepface_models": "emotion,age"}"#).unwrap();
        assert_eq!(
            settings.deepface_models,
            vec![AnalysisAttribute::Emotion, AnalysisAttribute::Age]
        );
    }

    #[test]
    fn test_models_from_list() {
        let settings: Settings =
            serde_json::from_str(r#"{"deepface_models": ["gender"]}"#).unwrap();
        assert_eq!(settings.deepface_models, vec![AnalysisAttribute::Gender]);
    }

    #[test]
    fn test_defaults_from_empty_object() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.database_name, "facemood");
        assert_eq!(settings.max_image_size, 16 * 1024 * 1024);
        assert_eq!(settings.analysis_mode, AnalysisMode::Sync);
        assert_eq!(settings.deepface_backend, DetectorBackend::Opencv);
        assert!(settings.enforce_detection);
        assert!(settings.secret_key.is_none());
    }

    #[test]
    fn test_numeric_secret_is_kept_as_text() {
        use secrecy::ExposeSecret;

        let settings: Settings = serde_json::from_str(r#"{"secret_key": 12345}"#).unwrap();
        assert_eq!(settings.secret_key.unwrap().expose_secret(), "12345");
    }

    #[test]
    fn test_secret_not_serialized() {
        let settings: Settings = serde_json::from_str(r#"{"secret_key": "hunter2"}"#).unwrap();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_database_file_and_address() {
        let settings = Settings {
            database_path: "/var/lib/facemood".to_string(),
            port: Some(8080),
            ..Settings::default()
        };
        assert!(settings.database_file().ends_with("facemood/facemood.db"));
        assert_eq!(settings.listen_address(5001), "0.0.0.0:8080");
        assert_eq!(Settings::default().listen_address(5001), "0.0.0.0:5001");
    }
}
