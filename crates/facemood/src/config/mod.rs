pub mod loader;
pub mod schema;

pub use loader::{build_figment, load_config, load_config_from, validate_config, ENV_KEYS};
pub use schema::{AnalysisAttribute, AnalysisMode, DetectorBackend, LogFormat, Settings};
