pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;

pub use analyzer::{Analysis, Analyzer, AnalyzerSettings, LocalAnalyzer, RemoteAnalyzer};
pub use config::{load_config, Settings};
pub use db::Database;
pub use error::{
    AnalyzeError, ConfigError, FacemoodError, NormalizeError, Result, StoreError,
};
pub use pipeline::{AnalysisPipeline, PipelineError, UploadPipeline, UploadReceipt};
pub use store::{DocumentId, DocumentStore, IdScheme, SqliteStore};
pub use worker::{AnalysisWorker, ScanReport};
