//! services/portal/src/app/state.rs
//!
//! Defines the portal's shared state: every repository and service wired over one
//! storage backend, created once at startup and handed to the presentation layer.

use chrono::{DateTime, Duration, Utc};
use docuhub_core::domain::Role;
use docuhub_core::ports::{AccountStore, DocumentStore, PortResult, PreferenceStore, SessionStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::adapters::{Argon2Hasher, DbAdapter, MemoryStore};
use crate::app::{
    AccountImport, AccountRepository, DocumentRepository, FileIntake, Preferences, SessionService,
};
use crate::config::Config;
use crate::error::PortalError;

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortalOverview {
    pub total_documents: usize,
    pub member_accounts: usize,
    pub uploaded_last_day: usize,
    pub total_views: u64,
}

/// The shared portal state. Cloning is cheap; every clone sees the same storage.
#[derive(Clone)]
pub struct PortalState {
    pub config: Arc<Config>,
    pub documents: DocumentRepository,
    pub accounts: AccountRepository,
    pub session: SessionService,
    pub intake: FileIntake,
    pub import: AccountImport,
    pub preferences: Preferences,
    db: Option<DbAdapter>,
}

impl PortalState {
    /// Opens the SQLite database named by `config.database_url`, applies the
    /// migrations and seeds the root administrator if the account table is empty.
    pub async fn open(config: Config) -> Result<Self, PortalError> {
        info!("Connecting to database...");
        let db = DbAdapter::connect(&config).await?;
        info!("Running database migrations...");
        db.run_migrations().await?;
        info!("Database migrations complete.");

        let state = Self::assemble(config, Arc::new(db.clone()), Some(db))?;
        state.accounts.bootstrap().await?;
        Ok(state)
    }

    /// Same wiring over a volatile in-process store.
    pub async fn in_memory(config: Config) -> Result<Self, PortalError> {
        let state = Self::assemble(config, Arc::new(MemoryStore::new()), None)?;
        state.accounts.bootstrap().await?;
        Ok(state)
    }

    fn assemble<S>(config: Config, store: Arc<S>, db: Option<DbAdapter>) -> Result<Self, PortalError>
    where
        S: DocumentStore + AccountStore + SessionStore + PreferenceStore + 'static,
    {
        let hasher = Arc::new(Argon2Hasher::new(config.hash_cost)?);
        let documents = DocumentRepository::new(store.clone() as Arc<dyn DocumentStore>);
        let accounts = AccountRepository::new(
            store.clone() as Arc<dyn AccountStore>,
            hasher,
            config.root.clone(),
        );
        let session = SessionService::new(accounts.clone(), store.clone() as Arc<dyn SessionStore>);
        let intake = FileIntake::new(documents.clone(), config.intake_concurrency);
        let import = AccountImport::new(accounts.clone());
        let preferences = Preferences::new(store as Arc<dyn PreferenceStore>);

        Ok(Self {
            config: Arc::new(config),
            documents,
            accounts,
            session,
            intake,
            import,
            preferences,
            db,
        })
    }

    pub async fn overview(&self, now: DateTime<Utc>) -> PortResult<PortalOverview> {
        let documents = self.documents.list_all().await?;
        let accounts = self.accounts.list_profiles().await?;
        let since = now - Duration::hours(24);

        Ok(PortalOverview {
            total_documents: documents.len(),
            member_accounts: accounts.iter().filter(|a| a.role == Role::Member).count(),
            uploaded_last_day: documents
                .iter()
                .filter(|d| d.uploaded_at > since && d.uploaded_at <= now)
                .count(),
            total_views: documents
                .iter()
                .fold(0u64, |sum, d| sum.saturating_add(d.view_count)),
        })
    }

    /// Closes the database pool, if any. Other clones must not be used afterwards.
    pub async fn shutdown(self) {
        if let Some(db) = self.db {
            db.close().await;
            info!("Database connections closed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{new_account, test_config};
    use crate::app::IncomingFile;

    #[tokio::test]
    async fn test_in_memory_state_seeds_root() {
        let state = PortalState::in_memory(test_config()).await.unwrap();
        let profile = state.session.login("admin", "admin-secret").await.unwrap().unwrap();
        assert!(profile.is_admin());
    }

    #[tokio::test]
    async fn test_missing_root_secret_fails_startup() {
        let mut config = test_config();
        config.root.secret = None;
        let err = PortalState::in_memory(config).await.err().unwrap();
        assert!(matches!(err, PortalError::Config(_)));
    }

    #[tokio::test]
    async fn test_overview_counts() {
        let state = PortalState::in_memory(test_config()).await.unwrap();
        state.accounts.create(new_account("1001", "pass", Role::Member)).await.unwrap();
        state.accounts.create(new_account("1002", "pass", Role::Member)).await.unwrap();
        state
            .intake
            .run(vec![
                IncomingFile::new("1001_Finance_May.pdf", &b"%PDF"[..]),
                IncomingFile::new("1002_Legal_May.pdf", &b"%PDF"[..]),
            ])
            .await
            .unwrap();

        let admin = state.session.login("admin", "admin-secret").await.unwrap().unwrap();
        let owned = state.documents.list_for_owner("1001").await.unwrap();
        state.documents.open(owned[0].id, &admin).await.unwrap();
        state.documents.open(owned[0].id, &admin).await.unwrap();
        let other = state.documents.list_for_owner("1002").await.unwrap();
        state.documents.increment_view(other[0].id).await.unwrap();

        let now = Utc::now();
        let overview = state.overview(now).await.unwrap();
        assert_eq!(
            overview,
            PortalOverview {
                total_documents: 2,
                member_accounts: 2,
                uploaded_last_day: 2,
                total_views: 3,
            }
        );

        let later = state.overview(now + Duration::days(2)).await.unwrap();
        assert_eq!(later.uploaded_last_day, 0);
        assert_eq!(later.total_documents, 2);
        assert_eq!(later.total_views, 3);
    }
}
