//! Document identifiers.
//!
//! A deployment picks one [`IdScheme`]; every id it hands out and every id it
//! accepts on lookup follows that scheme. Callers only ever see the opaque
//! [`DocumentId`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Opaque, canonicalised document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an id read back from storage. Stored ids were produced by
    /// [`IdScheme::generate`] and are not re-validated.
    pub(crate) fn from_stored(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How document ids are generated and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// Hyphenated lowercase UUID v4.
    #[default]
    Uuid,
    /// 24 hex characters: 4-byte timestamp, 5 random bytes, 3-byte counter.
    #[serde(alias = "object_id")]
    ObjectId,
}

static OBJECT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

impl IdScheme {
    pub fn generate(&self) -> DocumentId {
        match self {
            IdScheme::Uuid => DocumentId(Uuid::new_v4().hyphenated().to_string()),
            IdScheme::ObjectId => DocumentId(generate_object_id()),
        }
    }

    /// Validates and canonicalises an externally supplied id.
    pub fn parse(&self, raw: &str) -> Result<DocumentId, StoreError> {
        let raw = raw.trim();
        match self {
            IdScheme::Uuid => Uuid::try_parse(raw)
                .map(|uuid| DocumentId(uuid.hyphenated().to_string()))
                .map_err(|_| StoreError::MalformedId(raw.to_string())),
            IdScheme::ObjectId => {
                if raw.len() == 24 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(DocumentId(raw.to_ascii_lowercase()))
                } else {
                    Err(StoreError::MalformedId(raw.to_string()))
                }
            }
        }
    }
}

fn generate_object_id() -> String {
    let seconds = chrono::Utc::now().timestamp() as u32;
    let random = Uuid::new_v4();
    let counter = OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    bytes[4..9].copy_from_slice(&random.as_bytes()[..5]);
    bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);

    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
