//! services/portal/src/app/session.rs
//!
//! The session state machine: `Anonymous` → login → `Authenticated` → logout →
//! `Anonymous`. The signed-in profile is persisted through a `SessionStore`, so a
//! fresh `SessionService` over the same store resumes it. There is no expiry.

use docuhub_core::domain::{AccountProfile, SessionState};
use docuhub_core::ports::{PortError, PortResult, SessionStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::accounts::AccountRepository;

#[derive(Clone)]
pub struct SessionService {
    accounts: AccountRepository,
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(accounts: AccountRepository, store: Arc<dyn SessionStore>) -> Self {
        Self { accounts, store }
    }

    /// Loads the session and re-validates it against the account store.
    ///
    /// A session whose account was deleted is cleared here; a changed role or
    /// department replaces the stored projection.
    pub async fn current(&self) -> PortResult<SessionState> {
        let Some(saved) = self.store.load_session().await? else {
            return Ok(SessionState::Anonymous);
        };

        match self.accounts.find(&saved.login_id).await? {
            Some(profile) => {
                if profile != saved {
                    self.store.save_session(&profile).await?;
                }
                Ok(SessionState::Authenticated(profile))
            }
            None => {
                info!("Account '{}' no longer exists; ending its session", saved.login_id);
                self.store.clear_session().await?;
                Ok(SessionState::Anonymous)
            }
        }
    }

    /// Signs in with a login id and secret.
    ///
    /// Returns `None` and stays `Anonymous` when the credentials do not match.
    /// Fails with `SessionActive` if someone is already signed in.
    pub async fn login(&self, login_id: &str, secret: &str) -> PortResult<Option<AccountProfile>> {
        if let SessionState::Authenticated(active) = self.current().await? {
            return Err(PortError::SessionActive(active.login_id));
        }

        match self.accounts.find_by_credentials(login_id, secret).await? {
            Some(profile) => {
                self.store.save_session(&profile).await?;
                info!("'{}' signed in", profile.login_id);
                Ok(Some(profile))
            }
            None => {
                warn!("Rejected sign-in for '{}'", login_id);
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> PortResult<()> {
        self.store.clear_session().await?;
        info!("Signed out");
        Ok(())
    }

    pub async fn require_authenticated(&self) -> PortResult<AccountProfile> {
        match self.current().await? {
            SessionState::Authenticated(profile) => Ok(profile),
            SessionState::Anonymous => Err(PortError::Unauthorized),
        }
    }

    pub async fn require_admin(&self) -> PortResult<AccountProfile> {
        let profile = self.require_authenticated().await?;
        if profile.is_admin() {
            Ok(profile)
        } else {
            Err(PortError::Unauthorized)
        }
    }

    /// Self-service secret change for whoever is signed in.
    pub async fn change_own_secret(&self, new_secret: &str) -> PortResult<()> {
        let profile = self.require_authenticated().await?;
        self.accounts.change_secret(&profile.login_id, new_secret).await
    }
}
