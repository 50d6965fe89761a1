//! facemood analysis service: runs the face model behind `POST /analyze`
//! and drains pending documents in the background.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use facemood::analyzer::model::load_face_model;
use facemood::http::{self, AnalysisState};
use facemood::{load_config, AnalysisPipeline, AnalysisWorker, AnalyzerSettings, LocalAnalyzer, Settings};
use facemood_server::{open_store, shutdown, telemetry};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 5002;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("facemood-analyzer: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(settings.log_format, settings.debug_mode) {
        eprintln!("facemood-analyzer: {}", e);
        return ExitCode::FAILURE;
    }

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("facemood-analyzer failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> facemood::Result<()> {
    info!("Starting facemood analyzer v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(open_store(&settings)?);
    let model = load_face_model(settings.face_model_path.as_deref().map(Path::new))?;
    let analyzer_settings = AnalyzerSettings::from_settings(&settings);
    let models = analyzer_settings.model_names();
    info!(
        "Analyzing {} with {:?} detector (threshold {}, enforce {})",
        models.join(","),
        analyzer_settings.backend,
        analyzer_settings.threshold,
        analyzer_settings.enforce_detection
    );
    let analyzer = Arc::new(LocalAnalyzer::new(model, analyzer_settings));

    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = if settings.worker_enabled {
        let worker = AnalysisWorker::new(store.clone(), analyzer.clone(), settings.poll_interval());
        Some(worker.spawn(stop_rx))
    } else {
        info!("Background worker disabled");
        None
    };

    let pipeline = AnalysisPipeline::new(store, analyzer, models, settings.max_image_size);
    let router = http::analysis_router(
        AnalysisState {
            pipeline: Arc::new(pipeline),
        },
        http::body_limit(settings.max_image_size),
    );

    let listener = TcpListener::bind(settings.listen_address(DEFAULT_PORT)).await?;
    let served = http::serve(listener, router, shutdown::signal_and_notify(stop_tx)).await;

    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            warn!("Worker task ended abnormally: {}", e);
        }
    }

    served?;
    info!("facemood analyzer stopped");
    Ok(())
}
