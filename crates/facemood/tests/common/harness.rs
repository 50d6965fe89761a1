//! Isolated environment for service-level tests.

use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use facemood::config::AnalysisMode;
use facemood::http::{self, AnalysisState, WebState};
use facemood::{
    AnalysisPipeline, Analyzer, AnalyzerSettings, Database, LocalAnalyzer, RemoteAnalyzer,
    Settings, SqliteStore, UploadPipeline,
};

use super::fixtures::BrightnessModel;

pub struct TestHarness {
    temp_dir: TempDir,
    pub settings: Settings,
    pub store: Arc<SqliteStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Points the database at a fresh temp directory, keeping everything else.
    pub fn with_settings(mut settings: Settings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        settings.database_path = temp_dir.path().display().to_string();
        settings.database_name = "facemood_it".to_string();

        let store = Arc::new(Self::open(&settings));
        Self {
            temp_dir,
            settings,
            store,
        }
    }

    fn open(settings: &Settings) -> SqliteStore {
        let db = Database::open(&settings.database_file()).expect("Failed to open database");
        SqliteStore::new(db, settings.id_scheme, settings.claim_lease())
    }

    /// A second handle on the same database file.
    pub fn reopen(&self) -> SqliteStore {
        Self::open(&self.settings)
    }

    pub fn local_analyzer(&self) -> Arc<LocalAnalyzer> {
        Arc::new(LocalAnalyzer::new(
            Arc::new(BrightnessModel),
            AnalyzerSettings::from_settings(&self.settings),
        ))
    }

    pub fn remote_analyzer(&self, url: &str) -> Arc<RemoteAnalyzer> {
        Arc::new(
            RemoteAnalyzer::new(url, self.settings.analyzer_timeout())
                .expect("Failed to build HTTP client"),
        )
    }

    pub fn web_router(&self, analyzer: Arc<dyn Analyzer>, mode: AnalysisMode) -> axum::Router {
        let pipeline = UploadPipeline::new(
            self.store.clone(),
            analyzer,
            mode,
            self.settings.max_image_size,
        );
        http::web_router(
            WebState {
                pipeline: Arc::new(pipeline),
            },
            http::body_limit(self.settings.max_image_size),
        )
    }

    pub fn analysis_router(&self) -> axum::Router {
        let analyzer = self.local_analyzer();
        let models = analyzer.settings().model_names();
        let pipeline = AnalysisPipeline::new(
            self.store.clone(),
            analyzer,
            models,
            self.settings.max_image_size,
        );
        http::analysis_router(
            AnalysisState {
                pipeline: Arc::new(pipeline),
            },
            http::body_limit(self.settings.max_image_size),
        )
    }

    /// Serves the analysis service on an ephemeral port and returns its
    /// `/analyze` URL.
    pub async fn spawn_analysis_service(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        let router = self.analysis_router();
        tokio::spawn(async move {
            let _ = http::serve(listener, router, std::future::pending()).await;
        });
        format!("http://{}/analyze", addr)
    }
}
