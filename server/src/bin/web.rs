//! facemood web app: accepts uploads, forwards them to the analysis
//! service and serves stored images.

use std::process::ExitCode;
use std::sync::Arc;

use facemood::http::{self, WebState};
use facemood::{load_config, RemoteAnalyzer, Settings, UploadPipeline};
use facemood_server::{open_store, shutdown, telemetry};
use tokio::net::TcpListener;
use tracing::{error, info};

const DEFAULT_PORT: u16 = 5001;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("facemood-web: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(settings.log_format, settings.debug_mode) {
        eprintln!("facemood-web: {}", e);
        return ExitCode::FAILURE;
    }

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("facemood-web failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> facemood::Result<()> {
    info!("Starting facemood web v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(open_store(&settings)?);
    let analyzer = Arc::new(RemoteAnalyzer::new(
        settings.ml_client_url.clone(),
        settings.analyzer_timeout(),
    )?);
    info!(
        "Analysis mode {:?}, ML service at {}",
        settings.analysis_mode,
        analyzer.url()
    );

    let pipeline = UploadPipeline::new(
        store,
        analyzer,
        settings.analysis_mode,
        settings.max_image_size,
    );
    let router = http::web_router(
        WebState {
            pipeline: Arc::new(pipeline),
        },
        http::body_limit(settings.max_image_size),
    );

    let listener = TcpListener::bind(settings.listen_address(DEFAULT_PORT)).await?;
    http::serve(listener, router, shutdown::signal()).await?;

    info!("facemood web stopped");
    Ok(())
}
