pub mod analysis;
pub mod encode;
pub mod error;
pub mod upload;

pub use analysis::AnalysisPipeline;
pub use encode::{prepare, PreparedImage};
pub use error::PipelineError;
pub use upload::{UploadPipeline, UploadReceipt};
