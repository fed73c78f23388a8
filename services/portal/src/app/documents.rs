//! services/portal/src/app/documents.rs
//!
//! The document repository: ingestion with the skip-on-duplicate policy, listing,
//! viewing and deletion on top of any `DocumentStore`.

use chrono::{SubsecRound, Utc};
use docuhub_core::domain::{AccountProfile, Document, NewDocument};
use docuhub_core::ports::{DocumentStore, InsertOutcome, PortError, PortResult};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Narrows an owner's documents the way the dashboard filters do.
/// `None` (or a blank search) matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    /// Case-insensitive substring of the original filename.
    pub search: Option<String>,
    pub category: Option<String>,
    pub period: Option<String>,
}

impl DocumentQuery {
    pub fn matches(&self, document: &Document) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => document
                .original_filename
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| document.category == c);
        let period_ok = self
            .period
            .as_deref()
            .map_or(true, |p| document.period == p);
        search_ok && category_ok && period_ok
    }
}

/// Distinct filter values for one owner, in newest-first order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFacets {
    pub categories: Vec<String>,
    pub periods: Vec<String>,
}

#[derive(Clone)]
pub struct DocumentRepository {
    store: Arc<dyn DocumentStore>,
}

impl DocumentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persists every candidate whose `(owner_id, original_filename)` is new and
    /// returns the ones actually stored.
    ///
    /// Duplicates, including repeats inside the same batch, are skipped and never
    /// overwrite the stored copy. A storage failure stops the batch; candidates
    /// before it stay stored.
    pub async fn ingest(&self, batch: Vec<NewDocument>) -> PortResult<Vec<Document>> {
        let total = batch.len();
        let mut stored = Vec::with_capacity(total);
        for candidate in batch {
            if let Some(document) = self.ingest_one(candidate).await? {
                stored.push(document);
            }
        }
        info!("Ingested {} of {} document(s)", stored.len(), total);
        Ok(stored)
    }

    /// Single-candidate form of [`ingest`](Self::ingest); `None` means skipped as duplicate.
    pub async fn ingest_one(&self, candidate: NewDocument) -> PortResult<Option<Document>> {
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: candidate.owner_id,
            category: candidate.category,
            period: candidate.period,
            original_filename: candidate.original_filename,
            content: candidate.content,
            // Storage keeps microseconds; truncate so stored and returned values agree.
            uploaded_at: Utc::now().trunc_subsecs(6),
            view_count: 0,
        };

        // Skip policy: an existing (owner, filename) pair wins.
        match self.store.insert_document_if_absent(document.clone()).await? {
            InsertOutcome::Inserted => Ok(Some(document)),
            InsertOutcome::Duplicate => {
                debug!(
                    "Skipping duplicate {} for owner {}",
                    document.original_filename, document.owner_id
                );
                Ok(None)
            }
        }
    }

    /// All documents, newest upload first.
    pub async fn list_all(&self) -> PortResult<Vec<Document>> {
        self.store.list_documents().await
    }

    /// Documents whose owner id matches exactly (case-sensitive), newest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> PortResult<Vec<Document>> {
        self.store.list_documents_for_owner(owner_id).await
    }

    pub async fn search(&self, owner_id: &str, query: &DocumentQuery) -> PortResult<Vec<Document>> {
        let mut documents = self.list_for_owner(owner_id).await?;
        documents.retain(|d| query.matches(d));
        Ok(documents)
    }

    pub async fn facets(&self, owner_id: &str) -> PortResult<DocumentFacets> {
        let mut facets = DocumentFacets::default();
        for document in self.list_for_owner(owner_id).await? {
            if !facets.categories.contains(&document.category) {
                facets.categories.push(document.category);
            }
            if !facets.periods.contains(&document.period) {
                facets.periods.push(document.period);
            }
        }
        Ok(facets)
    }

    /// Removes the document. Unknown ids are a no-op.
    pub async fn delete(&self, id: Uuid) -> PortResult<()> {
        if self.store.delete_document(id).await? {
            info!("Deleted document {}", id);
        } else {
            debug!("Delete of unknown document {} ignored", id);
        }
        Ok(())
    }

    /// Adds one view. Unknown ids are a no-op.
    pub async fn increment_view(&self, id: Uuid) -> PortResult<()> {
        if self.store.increment_view_count(id).await?.is_none() {
            debug!("View of unknown document {} ignored", id);
        }
        Ok(())
    }

    /// Fetches a document for display and counts the view.
    ///
    /// Members may only open documents assigned to their own login id.
    pub async fn open(&self, id: Uuid, viewer: &AccountProfile) -> PortResult<Document> {
        let mut document = self
            .store
            .get_document(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))?;

        if !viewer.is_admin() && document.owner_id != viewer.login_id {
            warn!("{} tried to open document {} owned by {}", viewer.login_id, id, document.owner_id);
            return Err(PortError::Unauthorized);
        }

        document.view_count = self
            .store
            .increment_view_count(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))?;
        Ok(document)
    }
}
