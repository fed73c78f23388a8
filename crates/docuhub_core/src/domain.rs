//! crates/docuhub_core/src/domain.rs
//!
//! Defines the pure, core data structures for the portal.
//! These structs are independent of any storage medium or presentation layer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Accounts
//=========================================================================================

/// What an account may do in the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts `admin` and `member`, plus the legacy `user` spelling of `member`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" | "user" => Ok(Role::Member),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A stored account. Only used inside the repositories; carries the secret hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub login_id: String,
    pub secret_hash: String,
    pub department: String,
    pub role: Role,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            login_id: self.login_id.clone(),
            department: self.department.clone(),
            role: self.role,
        }
    }
}

/// The redacted view of an account, safe to hand to the presentation layer
/// and to keep in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub login_id: String,
    pub department: String,
    pub role: Role,
}

impl AccountProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An account as supplied by an administrator or an import, secret in clear text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub login_id: String,
    pub secret: String,
    pub department: String,
    pub role: Role,
}

/// Partial edit of an account. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub department: Option<String>,
    pub role: Option<Role>,
    pub secret: Option<String>,
}

/// The storage-facing form of [`AccountUpdate`], with the secret already hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub department: Option<String>,
    pub role: Option<Role>,
    pub secret_hash: Option<String>,
}

impl AccountPatch {
    pub fn apply(&self, account: &mut Account) {
        if let Some(department) = &self.department {
            account.department = department.clone();
        }
        if let Some(role) = self.role {
            account.role = role;
        }
        if let Some(secret_hash) = &self.secret_hash {
            account.secret_hash = secret_hash.clone();
        }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// A PDF assigned to an owner id. Immutable apart from `view_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: String,
    pub category: String,
    pub period: String,
    pub original_filename: String,
    pub content: Bytes,
    pub uploaded_at: DateTime<Utc>,
    pub view_count: u64,
}

impl Document {
    /// Renders the payload as a `data:` URL for inline viewers and downloads.
    pub fn data_url(&self) -> String {
        format!("data:application/pdf;base64,{}", STANDARD.encode(&self.content))
    }
}

/// A parsed upload waiting for an id and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub owner_id: String,
    pub category: String,
    pub period: String,
    pub original_filename: String,
    pub content: Bytes,
}

//=========================================================================================
// Session
//=========================================================================================

/// Who, if anyone, is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(AccountProfile),
}

impl SessionState {
    pub fn profile(&self) -> Option<&AccountProfile> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(profile) => Some(profile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Member ".parse::<Role>(), Ok(Role::Member));
        assert_eq!("USER".parse::<Role>(), Ok(Role::Member));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }

    #[test]
    fn test_profile_drops_secret() {
        let account = Account {
            login_id: "1023".to_string(),
            secret_hash: "$argon2id$v=19$...".to_string(),
            department: "Finance".to_string(),
            role: Role::Member,
        };
        let json = serde_json::to_value(account.profile()).unwrap();
        assert_eq!(json["login_id"], "1023");
        assert!(json.get("secret_hash").is_none());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut account = Account {
            login_id: "1023".to_string(),
            secret_hash: "old".to_string(),
            department: "Finance".to_string(),
            role: Role::Member,
        };
        AccountPatch {
            role: Some(Role::Admin),
            ..Default::default()
        }
        .apply(&mut account);
        assert_eq!(account.role, Role::Admin);
        assert_eq!(account.department, "Finance");
        assert_eq!(account.secret_hash, "old");
    }

    #[test]
    fn test_data_url() {
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: "1".to_string(),
            category: "Finance".to_string(),
            period: "May".to_string(),
            original_filename: "1_Finance_May.pdf".to_string(),
            content: Bytes::from_static(b"%PDF"),
            uploaded_at: Utc::now(),
            view_count: 0,
        };
        assert_eq!(document.data_url(), "data:application/pdf;base64,JVBERg==");
    }
}
