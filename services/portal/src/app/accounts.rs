//! services/portal/src/app/accounts.rs
//!
//! The account repository: seeding, credential checks, and the create/import/edit/
//! delete rules on top of any `AccountStore`. Secrets are hashed before they reach
//! the store and never leave it except as a hash.

use docuhub_core::domain::{
    Account, AccountPatch, AccountProfile, AccountUpdate, NewAccount, Role,
};
use docuhub_core::ports::{AccountStore, InsertOutcome, PortError, PortResult, SecretHasher};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigError, RootAccount};
use crate::error::PortalError;

#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn SecretHasher>,
    root: RootAccount,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn AccountStore>, hasher: Arc<dyn SecretHasher>, root: RootAccount) -> Self {
        Self { store, hasher, root }
    }

    pub fn root_login_id(&self) -> &str {
        &self.root.login_id
    }

    /// Seeds the root administrator when the store holds no accounts at all.
    ///
    /// Returns whether a seed was written. An empty store without a configured
    /// root secret is a configuration error.
    pub async fn bootstrap(&self) -> Result<bool, PortalError> {
        if self.store.count_accounts().await? > 0 {
            return Ok(false);
        }
        let secret = self
            .root
            .secret
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("ROOT_SECRET".to_string()))?;

        let seed = NewAccount {
            login_id: self.root.login_id.clone(),
            secret,
            department: self.root.department.clone(),
            role: Role::Admin,
        };
        let account = hash_account(self.hasher.as_ref(), seed)?;
        match self.store.insert_account(account).await? {
            InsertOutcome::Inserted => {
                info!("Seeded root administrator '{}'", self.root.login_id);
                Ok(true)
            }
            InsertOutcome::Duplicate => {
                warn!("Root administrator '{}' was seeded concurrently", self.root.login_id);
                Ok(false)
            }
        }
    }

    /// Exact login id plus a secret that verifies against the stored hash.
    pub async fn find_by_credentials(&self, login_id: &str, secret: &str) -> PortResult<Option<AccountProfile>> {
        let Some(account) = self.store.get_account(login_id).await? else {
            return Ok(None);
        };
        if self.hasher.verify_secret(secret, &account.secret_hash)? {
            Ok(Some(account.profile()))
        } else {
            Ok(None)
        }
    }

    pub async fn find(&self, login_id: &str) -> PortResult<Option<AccountProfile>> {
        Ok(self.store.get_account(login_id).await?.map(|a| a.profile()))
    }

    /// Creates one account. A taken login id is reported, never overwritten.
    pub async fn create(&self, account: NewAccount) -> PortResult<AccountProfile> {
        let account = hash_account(self.hasher.as_ref(), account)?;
        let profile = account.profile();
        match self.store.insert_account(account).await? {
            InsertOutcome::Inserted => {
                info!("Created account '{}'", profile.login_id);
                Ok(profile)
            }
            InsertOutcome::Duplicate => Err(PortError::DuplicateId(profile.login_id)),
        }
    }

    /// Imports accounts with last-write-wins: an existing login id is replaced
    /// wholesale, a new one is appended. Safe to re-run with the same input.
    ///
    /// Every entry is validated and hashed, on the blocking pool, before the
    /// first write.
    pub async fn bulk_upsert(&self, accounts: Vec<NewAccount>) -> PortResult<usize> {
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || {
            accounts
                .into_iter()
                .map(|a| hash_account(hasher.as_ref(), a))
                .collect::<PortResult<Vec<Account>>>()
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("Hashing task failed: {}", e)))??;
        let count = hashed.len();
        for account in hashed {
            self.store.upsert_account(account).await?;
        }
        info!("Upserted {} account(s)", count);
        Ok(count)
    }

    /// Merges the given fields into an existing account.
    pub async fn update(&self, login_id: &str, update: AccountUpdate) -> PortResult<AccountProfile> {
        let secret_hash = match update.secret {
            Some(secret) => {
                require_secret(&secret)?;
                Some(self.hasher.hash_secret(&secret)?)
            }
            None => None,
        };
        let patch = AccountPatch {
            department: update.department,
            role: update.role,
            secret_hash,
        };
        self.store
            .update_account(login_id, patch)
            .await?
            .map(|a| a.profile())
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", login_id)))
    }

    pub async fn change_secret(&self, login_id: &str, new_secret: &str) -> PortResult<()> {
        self.update(
            login_id,
            AccountUpdate {
                secret: Some(new_secret.to_string()),
                ..Default::default()
            },
        )
        .await?;
        info!("Secret changed for '{}'", login_id);
        Ok(())
    }

    /// Deletes an account. The root administrator can never be deleted.
    pub async fn delete(&self, login_id: &str) -> PortResult<()> {
        if login_id == self.root.login_id {
            warn!("Refused to delete root administrator '{}'", login_id);
            return Err(PortError::Protected(login_id.to_string()));
        }
        if self.store.delete_account(login_id).await? {
            info!("Deleted account '{}'", login_id);
            Ok(())
        } else {
            Err(PortError::NotFound(format!("Account {} not found", login_id)))
        }
    }

    /// Every stored account including secret hashes. Internal use only; hand
    /// [`list_profiles`](Self::list_profiles) to anything that displays accounts.
    pub async fn list_all(&self) -> PortResult<Vec<Account>> {
        self.store.list_accounts().await
    }

    pub async fn list_profiles(&self) -> PortResult<Vec<AccountProfile>> {
        Ok(self.list_all().await?.iter().map(Account::profile).collect())
    }
}

fn hash_account(hasher: &dyn SecretHasher, account: NewAccount) -> PortResult<Account> {
    if account.login_id.trim().is_empty() {
        return Err(PortError::InvalidInput("login id must not be blank".to_string()));
    }
    require_secret(&account.secret)?;
    Ok(Account {
        secret_hash: hasher.hash_secret(&account.secret)?,
        login_id: account.login_id,
        department: account.department,
        role: account.role,
    })
}

fn require_secret(secret: &str) -> PortResult<()> {
    if secret.is_empty() {
        return Err(PortError::InvalidInput("secret must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{accounts, new_account, root};
    use crate::adapters::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::thread::ThreadId;

    #[tokio::test]
    async fn test_bootstrap_seeds_only_an_empty_store() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        assert!(repo.bootstrap().await.unwrap());
        assert!(!repo.bootstrap().await.unwrap());

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].login_id, "admin");
        assert_eq!(all[0].role, Role::Admin);
        assert_ne!(all[0].secret_hash, "admin-secret");
    }

    #[tokio::test]
    async fn test_bootstrap_without_secret_is_a_config_error() {
        let mut root = root();
        root.secret = None;
        let repo = AccountRepository::new(
            Arc::new(MemoryStore::new()),
            crate::app::testing::hasher(),
            root,
        );
        let err = repo.bootstrap().await.unwrap_err();
        assert!(matches!(err, PortalError::Config(ConfigError::MissingVar(_))));
    }

    #[tokio::test]
    async fn test_credentials_must_both_match() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1023", "pass123", Role::Member)).await.unwrap();

        let found = repo.find_by_credentials("1023", "pass123").await.unwrap().unwrap();
        assert_eq!(found.login_id, "1023");
        assert!(repo.find_by_credentials("1023", "wrong").await.unwrap().is_none());
        assert!(repo.find_by_credentials("1024", "pass123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_taken_login_id() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1023", "pass123", Role::Member)).await.unwrap();
        let err = repo.create(new_account("1023", "other", Role::Admin)).await.unwrap_err();
        assert!(matches!(err, PortError::DuplicateId(id) if id == "1023"));

        let err = repo.create(new_account(" ", "pass", Role::Member)).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_bulk_upsert_overwrites_and_appends() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1001", "old", Role::Member)).await.unwrap();

        let mut replacement = new_account("1001", "new", Role::Admin);
        replacement.department = "Marketing".to_string();
        let count = repo
            .bulk_upsert(vec![replacement, new_account("1002", "pass456", Role::Member)])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let profiles = repo.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].login_id, "1001");
        assert_eq!(profiles[0].department, "Marketing");
        assert_eq!(profiles[0].role, Role::Admin);
        assert_eq!(profiles[1].login_id, "1002");
        assert!(repo.find_by_credentials("1001", "new").await.unwrap().is_some());
        assert!(repo.find_by_credentials("1001", "old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_upsert_writes_nothing_when_one_entry_is_invalid() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        let err = repo
            .bulk_upsert(vec![new_account("1001", "ok", Role::Member), new_account("1002", "", Role::Member)])
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_reports_missing() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1023", "pass123", Role::Member)).await.unwrap();

        let updated = repo
            .update(
                "1023",
                AccountUpdate {
                    department: Some("Legal".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.department, "Legal");
        assert_eq!(updated.role, Role::Member);
        assert!(repo.find_by_credentials("1023", "pass123").await.unwrap().is_some());

        repo.change_secret("1023", "fresh").await.unwrap();
        assert!(repo.find_by_credentials("1023", "fresh").await.unwrap().is_some());

        let err = repo.update("ghost", AccountUpdate::default()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_root_cannot_be_deleted() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.bootstrap().await.unwrap();
        repo.update(
            "admin",
            AccountUpdate {
                role: Some(Role::Member),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = repo.delete("admin").await.unwrap_err();
        assert!(matches!(err, PortError::Protected(id) if id == "admin"));
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    /// Reports an empty store even after another writer seeded it.
    struct StaleCountStore(MemoryStore);

    #[async_trait]
    impl AccountStore for StaleCountStore {
        async fn count_accounts(&self) -> PortResult<usize> {
            Ok(0)
        }

        async fn get_account(&self, login_id: &str) -> PortResult<Option<Account>> {
            self.0.get_account(login_id).await
        }

        async fn insert_account(&self, account: Account) -> PortResult<InsertOutcome> {
            self.0.insert_account(account).await
        }

        async fn upsert_account(&self, account: Account) -> PortResult<()> {
            self.0.upsert_account(account).await
        }

        async fn update_account(&self, login_id: &str, patch: AccountPatch) -> PortResult<Option<Account>> {
            self.0.update_account(login_id, patch).await
        }

        async fn delete_account(&self, login_id: &str) -> PortResult<bool> {
            self.0.delete_account(login_id).await
        }

        async fn list_accounts(&self) -> PortResult<Vec<Account>> {
            self.0.list_accounts().await
        }
    }

    #[tokio::test]
    async fn test_bootstrap_reports_a_concurrent_seed() {
        let inner = MemoryStore::new();
        accounts(Arc::new(inner.clone())).bootstrap().await.unwrap();

        let racing = AccountRepository::new(
            Arc::new(StaleCountStore(inner.clone())),
            crate::app::testing::hasher(),
            root(),
        );
        assert!(!racing.bootstrap().await.unwrap());
        assert_eq!(inner.list_accounts().await.unwrap().len(), 1);
    }

    /// Records which thread each hash ran on.
    #[derive(Default)]
    struct ThreadRecordingHasher {
        threads: StdMutex<Vec<ThreadId>>,
    }

    impl SecretHasher for ThreadRecordingHasher {
        fn hash_secret(&self, secret: &str) -> PortResult<String> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(format!("plain:{}", secret))
        }

        fn verify_secret(&self, secret: &str, hash: &str) -> PortResult<bool> {
            Ok(hash == format!("plain:{}", secret))
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_bulk_upsert_hashes_off_the_runtime_thread() {
        let hasher = Arc::new(ThreadRecordingHasher::default());
        let repo = AccountRepository::new(Arc::new(MemoryStore::new()), hasher.clone(), root());
        let runtime_thread = std::thread::current().id();

        let count = repo
            .bulk_upsert(vec![
                new_account("1001", "a", Role::Member),
                new_account("1002", "b", Role::Member),
            ])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let threads = hasher.threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }

    #[tokio::test]
    async fn test_delete_missing_account() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1023", "pass123", Role::Member)).await.unwrap();
        repo.delete("1023").await.unwrap();
        let err = repo.delete("1023").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
