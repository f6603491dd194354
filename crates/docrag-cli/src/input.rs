//! Parsing of command-line arguments into catalog inputs

use serde_json::Value;
use std::fs;
use std::path::Path;

use docrag_core::{Error, IngestRequest, MetadataMap, Result};

/// Parse `key=value`. The value is read as JSON when it parses, otherwise kept as a string.
pub fn parse_key_value(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::InvalidInput(format!("expected key=value, got '{}'", raw)))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput(format!("missing key in '{}'", raw)));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect repeated `key=value` arguments into a metadata map; later keys win
pub fn parse_metadata<S: AsRef<str>>(pairs: &[S]) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();
    for pair in pairs {
        let (key, value) = parse_key_value(pair.as_ref())?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Read a UTF-8 text file into an ingest request.
///
/// The document is named after the file unless `name` is given; the file size on disk
/// is recorded as the document size.
pub fn read_document(path: &Path, name: Option<&str>) -> Result<IngestRequest> {
    let bytes = fs::read(path)?;
    let size = bytes.len() as u64;
    let text = String::from_utf8(bytes).map_err(|_| {
        Error::InvalidInput(format!("{} is not valid UTF-8 text", path.display()))
    })?;

    let filename = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidInput(format!("cannot derive a name from {}", path.display()))
            })?,
    };

    Ok(IngestRequest::new(filename, text).with_file_size(size))
}
