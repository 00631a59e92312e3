//! Recipes service
//!
//! Synchronizes an owner's saved recipes between the remote collection and
//! the local [`CollectionCache`]. List refreshes always clear and repopulate
//! the cache; single-record writes never touch it and are followed by a
//! caller-triggered reload. Nothing is retried automatically.

use crate::cache::CollectionCache;
use crate::cancel::{run_cancellable, CancelToken};
use crate::config::{CACHE_EVENT_CAPACITY, RECIPES_COLLECTION};
use crate::database::{DisplayContext, Document, Recipe, RecipeForm};
use crate::error::{AppError, Result};
use crate::gateway::RemoteCollectionGateway;
use crate::services::deletion::{ConfirmResponse, DeletionGate, GateDecision};
use crate::session::OwnerId;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const TITLE_REQUIRED: &str = "Recipe title is required!";

/// Notification sent to observers whenever a refresh lands in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The cache now holds `count` records for `owner`. Zero is a valid,
    /// reportable state ("no saved recipes yet").
    Updated { owner: OwnerId, count: usize },
}

impl CacheEvent {
    pub fn is_empty(&self) -> bool {
        match self {
            CacheEvent::Updated { count, .. } => *count == 0,
        }
    }
}

/// Service for synchronizing saved recipes
#[derive(Clone)]
pub struct RecipesService {
    gateway: Arc<dyn RemoteCollectionGateway>,
    cache: Arc<RwLock<CollectionCache>>,
    events: broadcast::Sender<CacheEvent>,
}

impl RecipesService {
    pub fn new(gateway: Arc<dyn RemoteCollectionGateway>) -> Self {
        let (events, _) = broadcast::channel(CACHE_EVENT_CAPACITY);
        Self {
            gateway,
            cache: Arc::new(RwLock::new(CollectionCache::new())),
            events,
        }
    }

    /// Receive a [`CacheEvent`] after every applied refresh
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the cached records
    pub async fn cached(&self) -> Vec<Recipe> {
        self.cache.read().await.records().to_vec()
    }

    pub async fn cached_by_id(&self, remote_id: &str) -> Option<Recipe> {
        self.cache.read().await.find(remote_id).cloned()
    }

    /// Drop all cached records, e.g. when the owner signs out
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Fetch the owner's whole collection and replace the cache with it
    pub async fn load_all(&self, owner: &OwnerId) -> Result<Vec<Recipe>> {
        self.load_all_inner(owner, None).await
    }

    pub async fn load_all_cancellable(
        &self,
        owner: &OwnerId,
        cancel: &CancelToken,
    ) -> Result<Vec<Recipe>> {
        self.load_all_inner(owner, Some(cancel)).await
    }

    async fn load_all_inner(
        &self,
        owner: &OwnerId,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<Recipe>> {
        let ticket = self.cache.write().await.begin_refresh();
        tracing::debug!("Loading recipes for {} (refresh #{})", owner, ticket.seq());

        let docs = run_cancellable(cancel, self.gateway.get_all(owner, RECIPES_COLLECTION))
            .await
            .map_err(|e| {
                tracing::warn!("Failed to load recipes for {}: {}", owner, e);
                e
            })?;

        let records = parse_collection(docs);

        if let Some(token) = cancel {
            token.checkpoint()?;
        }

        let mut cache = self.cache.write().await;
        if !cache.apply(ticket, owner.clone(), records.clone()) {
            tracing::debug!(
                "Discarding stale refresh #{} for {}; a newer one already landed",
                ticket.seq(),
                owner
            );
            // the newer contents may belong to another owner
            if cache.owner() == Some(owner) {
                return Ok(cache.records().to_vec());
            }
            return Ok(records);
        }
        drop(cache);

        if records.is_empty() {
            tracing::info!("No saved recipes yet for {}", owner);
        } else {
            tracing::info!("Loaded {} recipes for {}", records.len(), owner);
        }

        // No receivers is fine; nobody is rendering the list
        let _ = self.events.send(CacheEvent::Updated {
            owner: owner.clone(),
            count: records.len(),
        });

        Ok(records)
    }

    /// Fetch a single recipe. Absent or unparseable documents are `NotFound`.
    pub async fn load_one(&self, owner: &OwnerId, remote_id: &str) -> Result<Recipe> {
        self.load_one_inner(owner, remote_id, None).await
    }

    pub async fn load_one_cancellable(
        &self,
        owner: &OwnerId,
        remote_id: &str,
        cancel: &CancelToken,
    ) -> Result<Recipe> {
        self.load_one_inner(owner, remote_id, Some(cancel)).await
    }

    async fn load_one_inner(
        &self,
        owner: &OwnerId,
        remote_id: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Recipe> {
        let doc = run_cancellable(
            cancel,
            self.gateway.get(owner, RECIPES_COLLECTION, remote_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(remote_id.to_string()))?;

        parse_one(remote_id, &doc)
    }

    /// Upsert a recipe and return its remote id.
    ///
    /// The stored copy always has `custom_title` set to the submitted
    /// `title`. The target id is `existing_remote_id`, else the record's own
    /// id, else a freshly allocated one.
    pub async fn save(
        &self,
        owner: &OwnerId,
        recipe: &Recipe,
        existing_remote_id: Option<&str>,
    ) -> Result<String> {
        self.save_inner(owner, recipe, existing_remote_id, None)
            .await
    }

    pub async fn save_cancellable(
        &self,
        owner: &OwnerId,
        recipe: &Recipe,
        existing_remote_id: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<String> {
        self.save_inner(owner, recipe, existing_remote_id, Some(cancel))
            .await
    }

    async fn save_inner(
        &self,
        owner: &OwnerId,
        recipe: &Recipe,
        existing_remote_id: Option<&str>,
        cancel: Option<&CancelToken>,
    ) -> Result<String> {
        validate_title(&recipe.title)?;

        let target = match (existing_remote_id, recipe.remote_id.as_deref()) {
            (Some(existing), Some(own)) if existing != own => {
                return Err(AppError::validation(
                    "remote_id",
                    format!("Recipe {} cannot be saved over {}", own, existing),
                ));
            }
            (Some(id), _) | (None, Some(id)) => Some(id.to_string()),
            (None, None) => None,
        };

        let is_new = target.is_none();
        let remote_id =
            target.unwrap_or_else(|| self.gateway.new_doc_id(owner, RECIPES_COLLECTION));

        let mut stored = recipe.clone();
        stored.custom_title = stored.title.clone();
        stored.remote_id = Some(remote_id.clone());

        run_cancellable(
            cancel,
            self.gateway
                .set(owner, RECIPES_COLLECTION, &remote_id, stored.to_document()),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Failed to save recipe {}: {}", remote_id, e);
            e
        })?;

        if is_new {
            tracing::info!(
                "Recipe added: {} ({})",
                remote_id,
                stored.display_title(DisplayContext::PersonalCollection)
            );
        } else {
            tracing::info!("Recipe updated: {}", remote_id);
        }

        Ok(remote_id)
    }

    /// Save the add/edit form.
    ///
    /// When editing, the stored record is read first so identity fields the
    /// form does not carry (catalog id) survive the full overwrite.
    pub async fn save_form(
        &self,
        owner: &OwnerId,
        form: &RecipeForm,
        existing_remote_id: Option<&str>,
    ) -> Result<String> {
        self.save_form_inner(owner, form, existing_remote_id, None)
            .await
    }

    pub async fn save_form_cancellable(
        &self,
        owner: &OwnerId,
        form: &RecipeForm,
        existing_remote_id: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<String> {
        self.save_form_inner(owner, form, existing_remote_id, Some(cancel))
            .await
    }

    async fn save_form_inner(
        &self,
        owner: &OwnerId,
        form: &RecipeForm,
        existing_remote_id: Option<&str>,
        cancel: Option<&CancelToken>,
    ) -> Result<String> {
        validate_title(&form.title)?;

        let mut record = match existing_remote_id {
            Some(id) => {
                let stored =
                    run_cancellable(cancel, self.gateway.get(owner, RECIPES_COLLECTION, id))
                        .await?;
                match stored {
                    Some(doc) => parse_one(id, &doc)?,
                    None => Recipe {
                        remote_id: Some(id.to_string()),
                        ..Recipe::new_custom()
                    },
                }
            }
            None => Recipe::new_custom(),
        };
        record.apply_form(form);

        self.save_inner(owner, &record, existing_remote_id, cancel)
            .await
    }

    /// Remove a recipe, then refresh the whole collection.
    ///
    /// Returns the refreshed records. If the removal fails the cache is left
    /// as it was. If the removal succeeds but the refresh fails, the refresh
    /// error is returned and the cache still shows the previous list.
    pub async fn delete(&self, owner: &OwnerId, remote_id: &str) -> Result<Vec<Recipe>> {
        self.delete_inner(owner, remote_id, None).await
    }

    pub async fn delete_cancellable(
        &self,
        owner: &OwnerId,
        remote_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Recipe>> {
        self.delete_inner(owner, remote_id, Some(cancel)).await
    }

    async fn delete_inner(
        &self,
        owner: &OwnerId,
        remote_id: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<Recipe>> {
        tracing::info!("Deleting recipe: {}", remote_id);

        run_cancellable(
            cancel,
            self.gateway.delete(owner, RECIPES_COLLECTION, remote_id),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Error removing recipe {}: {}", remote_id, e);
            e
        })?;

        tracing::info!("Recipe removed: {}", remote_id);

        self.load_all_inner(owner, cancel).await
    }

    /// Resolve a confirmation prompt and delete only on an explicit confirm.
    ///
    /// Returns `None` when the prompt was cancelled, dismissed, or never shown.
    pub async fn delete_confirmed(
        &self,
        owner: &OwnerId,
        gate: &mut DeletionGate,
        response: ConfirmResponse,
    ) -> Result<Option<Vec<Recipe>>> {
        self.delete_confirmed_inner(owner, gate, response, None)
            .await
    }

    pub async fn delete_confirmed_cancellable(
        &self,
        owner: &OwnerId,
        gate: &mut DeletionGate,
        response: ConfirmResponse,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<Recipe>>> {
        self.delete_confirmed_inner(owner, gate, response, Some(cancel))
            .await
    }

    async fn delete_confirmed_inner(
        &self,
        owner: &OwnerId,
        gate: &mut DeletionGate,
        response: ConfirmResponse,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<Vec<Recipe>>> {
        match gate.respond(response) {
            GateDecision::Proceed(remote_id) => self
                .delete_inner(owner, &remote_id, cancel)
                .await
                .map(Some),
            GateDecision::Abandoned => {
                tracing::debug!("Recipe removal cancelled");
                Ok(None)
            }
            GateDecision::NoPendingRequest => Ok(None),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title", TITLE_REQUIRED));
    }
    Ok(())
}

fn parse_one(remote_id: &str, doc: &Document) -> Result<Recipe> {
    Recipe::from_document(remote_id, doc).map_err(|e| {
        tracing::warn!("Recipe {} could not be parsed: {}", remote_id, e);
        AppError::NotFound(remote_id.to_string())
    })
}

/// Parse every document, skipping the ones that do not map to a recipe
fn parse_collection(docs: Vec<(String, Document)>) -> Vec<Recipe> {
    docs.into_iter()
        .filter_map(|(id, doc)| match Recipe::from_document(id.as_str(), &doc) {
            Ok(recipe) => Some(recipe),
            Err(e) => {
                tracing::warn!("Skipping recipe {}: {}", id, e);
                None
            }
        })
        .collect()
}
