//! In-memory gateway
//!
//! Keeps every owner's collections in a map behind a tokio mutex. Records
//! each call so tests can assert exactly which requests reached the store,
//! and can be told to fail or hold requests to exercise error and race paths.

use super::{merge_documents, RemoteCollectionGateway};
use crate::database::Document;
use crate::error::{AppError, Result};
use crate::session::OwnerId;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

type CollectionKey = (String, String);

/// A request observed by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Get { collection: String, doc_id: String },
    GetAll { collection: String },
    Set { collection: String, doc_id: String },
    SetMerge { collection: String, doc_id: String },
    Delete { collection: String, doc_id: String },
}

#[derive(Default)]
struct State {
    // BTreeMap keeps get_all ordering stable per collection
    collections: HashMap<CollectionKey, BTreeMap<String, Document>>,
    calls: Vec<GatewayCall>,
    unavailable: Option<String>,
}

/// In-process [`RemoteCollectionGateway`]
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
    read_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without recording a call
    pub async fn insert(&self, owner: &OwnerId, collection: &str, doc_id: &str, doc: Document) {
        let mut state = self.state.lock().await;
        state
            .collections
            .entry((owner.as_str().to_string(), collection.to_string()))
            .or_default()
            .insert(doc_id.to_string(), doc);
    }

    /// Make every subsequent call fail with `RemoteUnavailable(message)`
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().await.unavailable = Some(message.into());
    }

    pub async fn recover(&self) {
        self.state.lock().await.unavailable = None;
    }

    /// Hold every subsequent `get` and `get_all` until the returned handle
    /// is notified. Held reads return what was stored when they started.
    pub async fn hold_reads(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.read_gate.lock().await = Some(notify.clone());
        notify
    }

    /// Stop holding reads that start from now on
    pub async fn release_reads(&self) {
        *self.read_gate.lock().await = None;
    }

    async fn wait_at_gate(&self, gate: Option<Arc<Notify>>) {
        if let Some(notify) = gate {
            notify.notified().await;
        }
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    pub async fn document_count(&self, owner: &OwnerId, collection: &str) -> usize {
        let state = self.state.lock().await;
        state
            .collections
            .get(&(owner.as_str().to_string(), collection.to_string()))
            .map_or(0, BTreeMap::len)
    }

    async fn record(&self, call: GatewayCall) -> Result<tokio::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        if let Some(message) = &state.unavailable {
            return Err(AppError::RemoteUnavailable(message.clone()));
        }
        Ok(state)
    }
}

fn key(owner: &OwnerId, collection: &str) -> CollectionKey {
    (owner.as_str().to_string(), collection.to_string())
}

#[async_trait]
impl RemoteCollectionGateway for MemoryGateway {
    async fn get(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Document>> {
        let gate = self.read_gate.lock().await.clone();

        let state = self
            .record(GatewayCall::Get {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })
            .await?;
        let doc = state
            .collections
            .get(&key(owner, collection))
            .and_then(|docs| docs.get(doc_id))
            .cloned();
        drop(state);

        self.wait_at_gate(gate).await;
        Ok(doc)
    }

    async fn get_all(&self, owner: &OwnerId, collection: &str) -> Result<Vec<(String, Document)>> {
        let gate = self.read_gate.lock().await.clone();

        let state = self
            .record(GatewayCall::GetAll {
                collection: collection.to_string(),
            })
            .await?;
        let docs: Vec<(String, Document)> = state
            .collections
            .get(&key(owner, collection))
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        self.wait_at_gate(gate).await;
        Ok(docs)
    }

    async fn set(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        doc: Document,
    ) -> Result<()> {
        let mut state = self
            .record(GatewayCall::Set {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })
            .await?;

        state
            .collections
            .entry(key(owner, collection))
            .or_default()
            .insert(doc_id.to_string(), doc);
        Ok(())
    }

    async fn set_merge(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        fields: Document,
    ) -> Result<()> {
        let mut state = self
            .record(GatewayCall::SetMerge {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })
            .await?;

        let existing = state
            .collections
            .entry(key(owner, collection))
            .or_default()
            .entry(doc_id.to_string())
            .or_default();
        merge_documents(existing, fields);
        Ok(())
    }

    async fn delete(&self, owner: &OwnerId, collection: &str, doc_id: &str) -> Result<()> {
        let mut state = self
            .record(GatewayCall::Delete {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })
            .await?;

        state
            .collections
            .get_mut(&key(owner, collection))
            .and_then(|docs| docs.remove(doc_id))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(doc_id.to_string()))
    }
}
