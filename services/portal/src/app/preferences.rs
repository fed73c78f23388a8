//! services/portal/src/app/preferences.rs
//!
//! Language and theme preferences. The values are opaque to the portal; only the
//! presentation layer interprets them.

use docuhub_core::ports::{PortResult, PreferenceStore};
use std::sync::Arc;

const LANGUAGE_KEY: &str = "language";
const THEME_KEY: &str = "theme";

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub async fn language(&self) -> PortResult<Option<String>> {
        self.store.get_preference(LANGUAGE_KEY).await
    }

    pub async fn set_language(&self, language: &str) -> PortResult<()> {
        self.store.set_preference(LANGUAGE_KEY, language).await
    }

    pub async fn theme(&self) -> PortResult<Option<String>> {
        self.store.get_preference(THEME_KEY).await
    }

    pub async fn set_theme(&self, theme: &str) -> PortResult<()> {
        self.store.set_preference(THEME_KEY, theme).await
    }
}
