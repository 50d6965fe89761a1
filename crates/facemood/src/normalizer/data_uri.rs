//! `data:<mime>;base64,<payload>` parsing for camera captures.

use base64::Engine;

use crate::error::NormalizeError;

/// Image types a data-URI may declare.
const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub payload: Vec<u8>,
}

/// Splits the header from the payload, checks the declared type, then
/// decodes the base64 payload. The type check runs before decoding so an
/// unsupported type is reported even when its payload is also broken.
pub fn parse(uri: &str) -> Result<DataUri, NormalizeError> {
    let (header, payload) = uri
        .trim()
        .split_once(',')
        .ok_or(NormalizeError::MalformedDataUri)?;

    let mime = header
        .strip_prefix("data:")
        .unwrap_or(header)
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(NormalizeError::UnsupportedType(if mime.is_empty() {
            "unknown".to_string()
        } else {
            mime
        }));
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let payload = base64::engine::general_purpose::STANDARD.decode(compact)?;

    Ok(DataUri { mime, payload })
}

/// Encodes bytes as a `data:<mime>;base64,...` URI.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
