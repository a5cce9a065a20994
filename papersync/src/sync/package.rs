use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use serde::Serialize;
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::model::StableId;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The `.content` member the device reads to render an imported document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentMetadata<'a> {
    extra_metadata: BTreeMap<String, String>,
    file_type: &'a str,
    last_opened_page: u32,
    line_height: i32,
    margins: u32,
    page_count: u32,
    text_scale: u32,
    transform: BTreeMap<String, String>,
}

impl<'a> ContentMetadata<'a> {
    fn for_file_type(file_type: &'a str) -> Self {
        Self {
            extra_metadata: BTreeMap::new(),
            file_type,
            last_opened_page: 0,
            line_height: -1,
            margins: 100,
            // The device counts pages itself after import.
            page_count: 0,
            text_scale: 1,
            transform: BTreeMap::new(),
        }
    }
}

/// Extension as the device expects it: everything after the last dot, or the
/// whole name when there is none.
pub fn file_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

pub fn package_document(
    id: &StableId,
    source_name: &str,
    content: &[u8],
) -> Result<Vec<u8>, PackageError> {
    let ext = file_extension(source_name);
    let metadata = serde_json::to_vec(&ContentMetadata::for_file_type(ext))?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file(format!("{id}.{ext}"), options)?;
    zip.write_all(content)?;
    zip.start_file(format!("{id}.pagedata"), options)?;
    zip.start_file(format!("{id}.content"), options)?;
    zip.write_all(&metadata)?;
    Ok(zip.finish()?.into_inner())
}

pub fn package_collection(id: &StableId) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(format!("{id}.content"), SimpleFileOptions::default())?;
    zip.write_all(b"{}")?;
    Ok(zip.finish()?.into_inner())
}
