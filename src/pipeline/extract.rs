//! PDF text extraction and plain-text artifact handling.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while turning an uploaded PDF into plain text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The uploaded bytes could not be parsed as a PDF.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),
    /// The PDF parsed but carries no text layer, typical of scanned documents.
    #[error("PDF contains no extractable text")]
    NoTextLayer,
}

/// Extract the full plain text of a PDF held in memory.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| ExtractError::Parse(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::NoTextLayer);
    }
    Ok(text)
}

/// Reduce an uploaded filename to a safe artifact stem.
///
/// The extension is dropped and every remaining character outside `[A-Za-z0-9]`
/// becomes an underscore, so the stem is usable as a file name and as a
/// metadata key.
pub fn clean_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Persist extracted text under `dir` as `<stem>.txt`, creating the directory
/// when needed. Returns the path written.
pub fn write_text_artifact(dir: &str, stem: &str, text: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = Path::new(dir).join(format!("{stem}.txt"));
    fs::write(&path, text)?;
    Ok(path)
}
