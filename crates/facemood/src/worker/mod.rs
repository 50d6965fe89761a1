pub mod poller;

pub use poller::{AnalysisWorker, Outcome, ScanReport};
