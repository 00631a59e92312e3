//! Remote collection gateway
//!
//! The sync core talks to the remote document store only through
//! [`RemoteCollectionGateway`]. Adapters:
//! - [`MemoryGateway`]: in-process store with failure injection
//! - [`crate::database::SqliteGateway`]: durable SQLite-backed store

pub mod memory;

pub use memory::{GatewayCall, MemoryGateway};

use crate::database::Document;
use crate::error::Result;
use crate::session::OwnerId;
use async_trait::async_trait;
use uuid::Uuid;

/// Keyed document access scoped to one owner's collections.
///
/// Implementations report a missing target as `AppError::NotFound` and any
/// transport or service failure as `AppError::RemoteUnavailable`.
#[async_trait]
pub trait RemoteCollectionGateway: Send + Sync {
    /// Fetch one document; `Ok(None)` when it does not exist and
    /// `NotFound` when the stored body cannot be read as a document
    async fn get(&self, owner: &OwnerId, collection: &str, doc_id: &str)
        -> Result<Option<Document>>;

    /// Fetch every document in a collection as `(doc_id, body)` pairs.
    /// Unreadable bodies are left out.
    async fn get_all(&self, owner: &OwnerId, collection: &str) -> Result<Vec<(String, Document)>>;

    /// Create or fully overwrite a document
    async fn set(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        doc: Document,
    ) -> Result<()>;

    /// Merge top-level fields into a document, creating it if absent
    async fn set_merge(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        fields: Document,
    ) -> Result<()>;

    /// Remove a document; `NotFound` if it does not exist
    async fn delete(&self, owner: &OwnerId, collection: &str, doc_id: &str) -> Result<()>;

    /// Allocate an identifier for a document about to be written
    fn new_doc_id(&self, _owner: &OwnerId, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Merge `fields` over `base` at the top level
pub(crate) fn merge_documents(base: &mut Document, fields: Document) {
    for (key, value) in fields {
        base.insert(key, value);
    }
}
