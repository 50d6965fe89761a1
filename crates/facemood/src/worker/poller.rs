use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::analyzer::Analyzer;
use crate::error::StoreError;
use crate::store::{DocumentStore, ImageDocument, Prediction};

/// What happened to one document during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Another worker held the lease, or the document finished meanwhile.
    Skipped,
    /// Stored bytes did not decode; the document went back to `pending`.
    Released,
    /// Analyzed and recorded.
    Completed,
    /// Analyzer failed; the error was recorded as the prediction.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub found: usize,
    pub skipped: usize,
    pub released: usize,
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Released => self.released += 1,
            Outcome::Completed => self.completed += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Polls the store for pending documents and analyzes them one at a time.
pub struct AnalysisWorker {
    store: Arc<dyn DocumentStore>,
    analyzer: Arc<dyn Analyzer>,
    poll_interval: Duration,
}

impl AnalysisWorker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        analyzer: Arc<dyn Analyzer>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            analyzer,
            poll_interval,
        }
    }

    /// Runs the loop on a tokio task until `shutdown` turns true.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Analysis worker started (poll interval {:?}, analyzer {})",
            self.poll_interval,
            self.analyzer.name()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.scan_once().await {
                Ok(report) if report.found > 0 => info!(?report, "Scan finished"),
                Ok(_) => debug!("No pending documents"),
                Err(e) => error!("Scan failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Analysis worker stopped");
    }

    /// One pass over every currently pending document.
    pub async fn scan_once(&self) -> Result<ScanReport, StoreError> {
        let pending = self.store.list_pending().await?;
        let mut report = ScanReport {
            found: pending.len(),
            ..ScanReport::default()
        };

        for doc in pending {
            let span = info_span!("analyze_document", id = %doc.id);
            match self.process(doc).instrument(span).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!("Document processing failed: {}", e);
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    async fn process(&self, doc: ImageDocument) -> Result<Outcome, StoreError> {
        let Some(lease) = self.store.claim(&doc.id).await? else {
            debug!("Lost claim on {}", doc.id);
            return Ok(Outcome::Skipped);
        };

        let ImageDocument { id, data, .. } = doc;

        let (data, decodable) = tokio::task::spawn_blocking(move || {
            let decodable = image::load_from_memory(&data).is_ok();
            (data, decodable)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?;

        if !decodable {
            warn!("Stored image {} could not be decoded; returning it to pending", id);
            if !self.store.release(&lease).await? {
                debug!("Lease on {} was taken over before release", id);
            }
            return Ok(Outcome::Released);
        }

        let (prediction, outcome) = match self.analyzer.analyze(&data).await {
            Ok(analysis) => (Prediction::Result(analysis.into_value()), Outcome::Completed),
            Err(e) => {
                warn!("Analysis of {} failed: {}", id, e);
                (Prediction::Error(e.to_string()), Outcome::Failed)
            }
        };

        if !self.store.mark_complete(&id, &prediction).await? {
            debug!("{} was completed elsewhere; result discarded", id);
            return Ok(Outcome::Skipped);
        }

        Ok(outcome)
    }
}
