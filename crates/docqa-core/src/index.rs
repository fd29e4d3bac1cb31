//! Vector database control plane trait

use async_trait::async_trait;
use std::sync::Arc;

use crate::{IndexDescriptor, IndexSchema, Result, VectorStore};

/// Index create/delete/describe surface of a vector database
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    /// Store type handed out for a provisioned index
    type Store: VectorStore + 'static;

    /// All indexes the service knows about
    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>>;

    /// Current state of one index, `None` if it does not exist
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescriptor>>;

    /// Request creation of an index; it may not be ready on return
    async fn create_index(&self, schema: &IndexSchema) -> Result<()>;

    /// Destroy an index and every vector in it
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// Data-plane handle for a provisioned index
    async fn open_store(&self, descriptor: &IndexDescriptor) -> Result<Arc<Self::Store>>;
}
