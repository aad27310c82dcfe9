use std::fs;
use std::path::Path;

use crate::backup::zip_backup;
use crate::error::Result;
use crate::export::{ExportOpts, export_runtime_module};
use crate::model::Document;

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOpts {
    /// Zip the file being overwritten before writing the new content.
    pub backup: bool,
}

pub fn load_document_file(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)?;
    let doc = Document::from_json_str(&text)?;
    tracing::info!(path = %path.display(), "loaded document");
    Ok(doc)
}

/// Writes the document as-is: pretty JSON, UTF-8, non-ASCII unescaped.
pub fn save_document_file(path: &Path, doc: &Document, opts: SaveOpts) -> Result<()> {
    if opts.backup && path.is_file() {
        let zip = zip_backup(path)?;
        tracing::info!(backup = %zip.display(), "backed up previous document");
    }
    let s = doc.to_json_pretty()?;
    fs::write(path, s)?;
    tracing::info!(path = %path.display(), "saved document");
    Ok(())
}

pub fn write_export_file(path: &Path, doc: &Document, opts: &ExportOpts) -> Result<()> {
    let js = export_runtime_module(doc, opts)?;
    fs::write(path, js)?;
    tracing::info!(path = %path.display(), "wrote runtime module");
    Ok(())
}
