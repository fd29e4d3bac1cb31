//! Document sources for plain text and PDF files

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, warn};

use docqa_core::{Document, DocumentSource, Error, Result};

/// Page separator emitted by `pdftotext`
pub const PAGE_SEPARATOR: char = '\u{0C}';

/// Loads UTF-8 text files whose pages are separated by form feeds
///
/// A file without form feeds is a single page. The document id is the file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextDocumentSource;

impl TextDocumentSource {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(id: impl Into<String>, text: &str) -> Document {
        let mut pages: Vec<&str> = text.split(PAGE_SEPARATOR).collect();
        // a trailing separator ends the last page rather than starting a new one
        if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
            pages.pop();
        }
        Document::from_pages(id, pages)
    }
}

#[async_trait]
impl DocumentSource for TextDocumentSource {
    async fn load(&self, path: &Path) -> Result<Document> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::DocumentLoad(format!("{}: {}", path.display(), e)))?;

        let document = Self::parse(document_id(path), &text);
        debug!(document = %document.id, pages = document.pages.len(), "loaded document");
        Ok(document)
    }
}

/// Extracts the text layer of a PDF, one page per PDF page
///
/// Pages without extractable text (scans, images) become blank pages so page
/// numbers stay aligned with the file. The document id is the file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfDocumentSource;

impl PdfDocumentSource {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(id: impl Into<String>, data: &[u8]) -> Result<Document> {
        let id = id.into();
        let pdf = lopdf::Document::load_mem(data)
            .map_err(|e| Error::DocumentLoad(format!("{}: failed to load PDF: {}", id, e)))?;

        let pages: Vec<String> = pdf
            .get_pages()
            .into_keys()
            .map(|page_number| match pdf.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(document = %id, page = page_number, error = %e, "no text on page");
                    String::new()
                }
            })
            .collect();

        Ok(Document::from_pages(id, pages))
    }
}

#[async_trait]
impl DocumentSource for PdfDocumentSource {
    async fn load(&self, path: &Path) -> Result<Document> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::DocumentLoad(format!("{}: {}", path.display(), e)))?;

        let document = Self::parse(document_id(path), &data)?;
        debug!(document = %document.id, pages = document.pages.len(), "loaded PDF");
        Ok(document)
    }
}

/// Source for `path` by extension: `.pdf` (any case) is read as PDF, anything else as text
pub fn document_source_for(path: &Path) -> Box<dyn DocumentSource> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Box::new(PdfDocumentSource::new())
    } else {
        Box::new(TextDocumentSource::new())
    }
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
