//! Document source trait

use async_trait::async_trait;
use std::path::Path;

use crate::{Document, Result};

/// Loads a document's page texts from storage
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load a document, failing with `Error::DocumentLoad` on missing or unreadable input
    async fn load(&self, path: &Path) -> Result<Document>;
}
