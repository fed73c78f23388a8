//! services/portal/src/adapters/memory.rs
//!
//! In-memory implementation of every storage port. Each port call holds the one
//! mutex for its whole duration, so calls are serialized like a single writer.

use async_trait::async_trait;
use docuhub_core::domain::{Account, AccountPatch, AccountProfile, Document};
use docuhub_core::ports::{
    AccountStore, DocumentStore, InsertOutcome, PortResult, PreferenceStore, SessionStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    // Insertion order; listing sorts a copy.
    documents: Vec<Document>,
    accounts: Vec<Account>,
    session: Option<AccountProfile>,
    preferences: HashMap<String, String>,
}

/// A process-local store. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<'a>(documents: impl DoubleEndedIterator<Item = &'a Document>) -> Vec<Document> {
    // Reverse insertion order first so the stable sort keeps later inserts ahead on ties.
    let mut listed: Vec<Document> = documents.rev().cloned().collect();
    listed.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    listed
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document_if_absent(&self, document: Document) -> PortResult<InsertOutcome> {
        let mut state = self.state.lock().await;
        let exists = state.documents.iter().any(|d| {
            d.owner_id == document.owner_id && d.original_filename == document.original_filename
        });
        if exists {
            return Ok(InsertOutcome::Duplicate);
        }
        state.documents.push(document);
        Ok(InsertOutcome::Inserted)
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        let state = self.state.lock().await;
        Ok(newest_first(state.documents.iter()))
    }

    async fn list_documents_for_owner(&self, owner_id: &str) -> PortResult<Vec<Document>> {
        let state = self.state.lock().await;
        let owned: Vec<&Document> = state
            .documents
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .collect();
        Ok(newest_first(owned.into_iter()))
    }

    async fn get_document(&self, id: Uuid) -> PortResult<Option<Document>> {
        let state = self.state.lock().await;
        Ok(state.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn delete_document(&self, id: Uuid) -> PortResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        Ok(state.documents.len() != before)
    }

    async fn increment_view_count(&self, id: Uuid) -> PortResult<Option<u64>> {
        let mut state = self.state.lock().await;
        Ok(state.documents.iter_mut().find(|d| d.id == id).map(|d| {
            d.view_count += 1;
            d.view_count
        }))
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for MemoryStore {
    async fn count_accounts(&self) -> PortResult<usize> {
        Ok(self.state.lock().await.accounts.len())
    }

    async fn get_account(&self, login_id: &str) -> PortResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().find(|a| a.login_id == login_id).cloned())
    }

    async fn insert_account(&self, account: Account) -> PortResult<InsertOutcome> {
        let mut state = self.state.lock().await;
        if state.accounts.iter().any(|a| a.login_id == account.login_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        state.accounts.push(account);
        Ok(InsertOutcome::Inserted)
    }

    async fn upsert_account(&self, account: Account) -> PortResult<()> {
        let mut state = self.state.lock().await;
        match state.accounts.iter_mut().find(|a| a.login_id == account.login_id) {
            Some(existing) => *existing = account,
            None => state.accounts.push(account),
        }
        Ok(())
    }

    async fn update_account(&self, login_id: &str, patch: AccountPatch) -> PortResult<Option<Account>> {
        let mut state = self.state.lock().await;
        Ok(state
            .accounts
            .iter_mut()
            .find(|a| a.login_id == login_id)
            .map(|account| {
                patch.apply(account);
                account.clone()
            }))
    }

    async fn delete_account(&self, login_id: &str) -> PortResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.accounts.len();
        state.accounts.retain(|a| a.login_id != login_id);
        Ok(state.accounts.len() != before)
    }

    async fn list_accounts(&self) -> PortResult<Vec<Account>> {
        Ok(self.state.lock().await.accounts.clone())
    }
}

//=========================================================================================
// `SessionStore` and `PreferenceStore` Trait Implementations
//=========================================================================================

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self) -> PortResult<Option<AccountProfile>> {
        Ok(self.state.lock().await.session.clone())
    }

    async fn save_session(&self, profile: &AccountProfile) -> PortResult<()> {
        self.state.lock().await.session = Some(profile.clone());
        Ok(())
    }

    async fn clear_session(&self) -> PortResult<()> {
        self.state.lock().await.session = None;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_preference(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.state.lock().await.preferences.get(key).cloned())
    }

    async fn set_preference(&self, key: &str, value: &str) -> PortResult<()> {
        self.state
            .lock()
            .await
            .preferences
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
