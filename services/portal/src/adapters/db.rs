//! services/portal/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the storage ports from the `core` crate. It handles all interactions with an
//! embedded SQLite database using `sqlx`.
//!
//! Every port call is a single SQL statement, so two writers sharing the pool
//! cannot interleave a read-modify-write.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use docuhub_core::domain::{Account, AccountPatch, AccountProfile, Document, Role};
use docuhub_core::ports::{
    AccountStore, DocumentStore, InsertOutcome, PortError, PortResult, PreferenceStore,
    SessionStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Config;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every storage port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (and creates, if needed) the database named by the configuration.
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory_database() {
            // Each connection to `:memory:` is a separate database; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for in-flight statements and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn storage_err(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

fn corrupted(what: &str, e: impl Display) -> PortError {
    PortError::Storage(format!("Corrupted {}: {}", what, e))
}

// Fixed precision keeps lexical order equal to chronological order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_count(value: i64, what: &str) -> PortResult<u64> {
    u64::try_from(value).map_err(|e| corrupted(what, e))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const DOCUMENT_COLUMNS: &str =
    "id, owner_id, category, period, original_filename, content, uploaded_at, view_count";

#[derive(FromRow)]
struct DocumentRecord {
    id: String,
    owner_id: String,
    category: String,
    period: String,
    original_filename: String,
    content: String,
    uploaded_at: String,
    view_count: i64,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let id = Uuid::parse_str(&self.id).map_err(|e| corrupted("document id", e))?;
        let content = STANDARD
            .decode(self.content.as_bytes())
            .map_err(|e| corrupted(&format!("content of document {}", id), e))?;
        let uploaded_at = DateTime::parse_from_rfc3339(&self.uploaded_at)
            .map_err(|e| corrupted(&format!("timestamp of document {}", id), e))?
            .with_timezone(&Utc);
        Ok(Document {
            id,
            owner_id: self.owner_id,
            category: self.category,
            period: self.period,
            original_filename: self.original_filename,
            content: content.into(),
            uploaded_at,
            view_count: to_count(self.view_count, "view count")?,
        })
    }
}

#[derive(FromRow)]
struct AccountRecord {
    login_id: String,
    secret_hash: String,
    department: String,
    role: String,
}
impl AccountRecord {
    fn to_domain(self) -> PortResult<Account> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| corrupted(&format!("role of account {}", self.login_id), e))?;
        Ok(Account {
            login_id: self.login_id,
            secret_hash: self.secret_hash,
            department: self.department,
            role,
        })
    }
}

fn collect_documents(records: Vec<DocumentRecord>) -> PortResult<Vec<Document>> {
    records.into_iter().map(DocumentRecord::to_domain).collect()
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn insert_document_if_absent(&self, document: Document) -> PortResult<InsertOutcome> {
        let view_count = i64::try_from(document.view_count)
            .map_err(|_| PortError::InvalidInput("view count out of range".to_string()))?;
        let result = sqlx::query(
            "INSERT INTO documents (id, owner_id, category, period, original_filename, content, uploaded_at, view_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (owner_id, original_filename) DO NOTHING",
        )
        .bind(document.id.to_string())
        .bind(document.owner_id)
        .bind(document.category)
        .bind(document.period)
        .bind(document.original_filename)
        .bind(STANDARD.encode(&document.content))
        .bind(format_timestamp(document.uploaded_at))
        .bind(view_count)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents ORDER BY uploaded_at DESC, seq DESC",
            DOCUMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        collect_documents(records)
    }

    async fn list_documents_for_owner(&self, owner_id: &str) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE owner_id = ? ORDER BY uploaded_at DESC, seq DESC",
            DOCUMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        collect_documents(records)
    }

    async fn get_document(&self, id: Uuid) -> PortResult<Option<Document>> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        record.map(DocumentRecord::to_domain).transpose()
    }

    async fn delete_document(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view_count(&self, id: Uuid) -> PortResult<Option<u64>> {
        let count = sqlx::query_scalar::<_, i64>(
            "UPDATE documents SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        count.map(|c| to_count(c, "view count")).transpose()
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn count_accounts(&self) -> PortResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        usize::try_from(count).map_err(|e| corrupted("account count", e))
    }

    async fn get_account(&self, login_id: &str) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT login_id, secret_hash, department, role FROM accounts WHERE login_id = ?",
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        record.map(AccountRecord::to_domain).transpose()
    }

    async fn insert_account(&self, account: Account) -> PortResult<InsertOutcome> {
        let result = sqlx::query(
            "INSERT INTO accounts (login_id, secret_hash, department, role) VALUES (?, ?, ?, ?) \
             ON CONFLICT (login_id) DO NOTHING",
        )
        .bind(account.login_id)
        .bind(account.secret_hash)
        .bind(account.department)
        .bind(account.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    async fn upsert_account(&self, account: Account) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO accounts (login_id, secret_hash, department, role) VALUES (?, ?, ?, ?) \
             ON CONFLICT (login_id) DO UPDATE SET \
             secret_hash = excluded.secret_hash, department = excluded.department, role = excluded.role",
        )
        .bind(account.login_id)
        .bind(account.secret_hash)
        .bind(account.department)
        .bind(account.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn update_account(&self, login_id: &str, patch: AccountPatch) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "UPDATE accounts SET \
             department = COALESCE(?, department), \
             role = COALESCE(?, role), \
             secret_hash = COALESCE(?, secret_hash) \
             WHERE login_id = ? \
             RETURNING login_id, secret_hash, department, role",
        )
        .bind(patch.department)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.secret_hash)
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        record.map(AccountRecord::to_domain).transpose()
    }

    async fn delete_account(&self, login_id: &str) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE login_id = ?")
            .bind(login_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_accounts(&self) -> PortResult<Vec<Account>> {
        let records = sqlx::query_as::<_, AccountRecord>(
            "SELECT login_id, secret_hash, department, role FROM accounts ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        records.into_iter().map(AccountRecord::to_domain).collect()
    }
}

//=========================================================================================
// `SessionStore` and `PreferenceStore` Trait Implementations
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn load_session(&self) -> PortResult<Option<AccountProfile>> {
        let payload = sqlx::query_scalar::<_, String>("SELECT payload FROM session WHERE slot = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(|e| corrupted("session payload", e)))
            .transpose()
    }

    async fn save_session(&self, profile: &AccountProfile) -> PortResult<()> {
        let payload = serde_json::to_string(profile)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode session: {}", e)))?;
        sqlx::query(
            "INSERT INTO session (slot, payload) VALUES (1, ?) \
             ON CONFLICT (slot) DO UPDATE SET payload = excluded.payload",
        )
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn clear_session(&self) -> PortResult<()> {
        sqlx::query("DELETE FROM session")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for DbAdapter {
    async fn get_preference(&self, key: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn set_preference(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}
