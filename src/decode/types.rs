//! Decoder trait and format dispatch

use super::decoders::{decode_parquet, CsvDecoder, JsonDecoder, JsonlDecoder};
use crate::error::{Error, Result};
use crate::types::FileFormat;
use bytes::Bytes;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use serde_json::Value;
use std::borrow::Cow;

/// Trait for decoding text bodies into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the body into a list of records. `source` names the file or
    /// object in errors.
    fn decode(&self, body: &str, source: &str) -> Result<Vec<Value>>;
}

/// Decode a text body in the given format
pub fn decode_text(format: FileFormat, body: &str, source: &str) -> Result<Vec<Value>> {
    match format {
        FileFormat::Csv => CsvDecoder::new().decode(body, source),
        FileFormat::Json => JsonDecoder::new().decode(body, source),
        FileFormat::Jsonl => JsonlDecoder::new().decode(body, source),
        FileFormat::Parquet => Err(Error::decode(source, "parquet is a binary format")),
    }
}

/// Decode raw file bytes.
///
/// Returns the records and, when the text was not UTF-8, the name of the
/// encoding it was converted from. Parquet is binary and never converted.
pub fn decode_bytes(
    format: FileFormat,
    bytes: Bytes,
    source: &str,
) -> Result<(Vec<Value>, Option<&'static str>)> {
    if format == FileFormat::Parquet {
        return Ok((decode_parquet(bytes, source)?, None));
    }

    let (decoded, converted) = to_utf8(&bytes);
    let text: &str = &decoded;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok((decode_text(format, text, source)?, converted))
}

/// Read bytes as UTF-8 text.
///
/// A UTF-16 byte order mark selects UTF-16. Otherwise valid UTF-8 is
/// borrowed as is, and anything else is decoded from the encoding
/// `chardetng` detects (windows-1252 when the content gives no better hint).
/// Unmappable bytes become U+FFFD.
pub fn to_utf8(bytes: &[u8]) -> (Cow<'_, str>, Option<&'static str>) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding != UTF_8 {
            let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            return (text, Some(encoding.name()));
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (Cow::Borrowed(text), None);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, false);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    (text, Some(encoding.name()))
}
