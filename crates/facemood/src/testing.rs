//! Shared fixtures for unit tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::analyzer::{Analysis, Analyzer};
use crate::db::Database;
use crate::error::AnalyzeError;
use crate::store::{IdScheme, SqliteStore};

/// Analyzer double that answers with a fixed outcome and counts calls.
pub struct CountingAnalyzer {
    calls: AtomicUsize,
    outcome: Result<serde_json::Value, String>,
}

impl CountingAnalyzer {
    pub fn returning(value: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Ok(value),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome: Err(message.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for CountingAnalyzer {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn analyze(&self, _jpeg: &[u8]) -> Result<Analysis, AnalyzeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(value) => Ok(Analysis(value.clone())),
            Err(message) => Err(AnalyzeError::Status {
                status: 503,
                body: message.clone(),
            }),
        }
    }
}

pub fn memory_store() -> Arc<SqliteStore> {
    let db = Database::open_in_memory().expect("in-memory database");
    Arc::new(SqliteStore::new(db, IdScheme::Uuid, Duration::from_secs(300)))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .expect("fixture image encodes");
    buf.into_inner()
}

pub fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))),
        ImageFormat::Jpeg,
    )
}

/// Incompressible pixels so the encoded JPEG stays large.
pub fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x1234_5678;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgb([next(), next(), next()])
    }))
}
