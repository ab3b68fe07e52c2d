//! Session/theme store: the explicit context handed to every view.
//!
//! Holds the credential and theme, reads them once from the durable config
//! file and writes the file back on every change.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::Theme;

/// Delay between reporting an expired session and the forced logout.
pub const EXPIRY_LOGOUT_DELAY: Duration = Duration::from_secs(2);

pub struct SessionStore {
    path: PathBuf,
    config: Config,
}

impl SessionStore {
    /// Open the store backed by `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        tracing::debug!("Loaded session store from {}", path.display());
        Ok(Self { path, config })
    }

    /// Open the store at the platform config location.
    pub fn open_default() -> Result<Self> {
        Self::open(Config::default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Override the backend URL for this process only.
    pub fn override_api_base(&mut self, api_base: String) {
        self.config.api_base = api_base;
    }

    pub fn credential(&self) -> Option<String> {
        self.config.get_token().map(|t| t.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.config.has_token()
    }

    /// Adopt a credential and persist it. Nothing changes if the write fails.
    pub fn set_credential(&mut self, token: impl Into<String>) -> Result<()> {
        let mut next = self.config.clone();
        next.set_token(token.into());
        self.commit(next)?;
        tracing::info!("Credential stored");
        Ok(())
    }

    /// Drop the credential and persist. `/chat` resolves to the auth view
    /// from here on.
    pub fn clear_credential(&mut self) -> Result<()> {
        let mut next = self.config.clone();
        next.clear_token();
        self.commit(next)?;
        tracing::info!("Credential cleared");
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    /// Flip the theme and persist. Returns the new theme.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let mut next = self.config.clone();
        next.theme = next.theme.toggled();
        self.commit(next)?;
        Ok(self.config.theme)
    }

    /// Write `next` to disk, then make it current.
    fn commit(&mut self, next: Config) -> Result<()> {
        // The process-level api_base override must not leak into the file.
        let mut on_disk = Config::load_from(&self.path)?;
        on_disk.token = next.token.clone();
        on_disk.theme = next.theme;
        on_disk.save_to(&self.path)?;
        self.config = next;
        Ok(())
    }
}

/// Forced logout after a session-expiry notice: wait the fixed delay, then
/// clear the credential.
pub async fn logout_after(store: &mut SessionStore, delay: Duration) -> Result<()> {
    tokio::time::sleep(delay).await;
    tracing::info!("Session expired, logging out");
    store.clear_credential()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn temp_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("config.toml")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_credential_persists_across_reopen() {
        let (dir, mut store) = temp_store();
        assert!(!store.is_authenticated());
        assert_ok!(store.set_credential("t1"));

        let reopened = SessionStore::open(dir.path().join("config.toml")).unwrap();
        assert_eq!(reopened.credential().as_deref(), Some("t1"));
    }

    #[test]
    fn test_clear_credential_persists() {
        let (dir, mut store) = temp_store();
        store.set_credential("t1").unwrap();
        store.clear_credential().unwrap();
        assert!(store.credential().is_none());

        let reopened = SessionStore::open(dir.path().join("config.toml")).unwrap();
        assert!(!reopened.is_authenticated());
    }

    #[test]
    fn test_toggle_theme_twice_persists_final_value() {
        let (dir, mut store) = temp_store();
        let original = store.theme();

        assert_eq!(store.toggle_theme().unwrap(), original.toggled());
        assert_eq!(store.toggle_theme().unwrap(), original);

        let reopened = SessionStore::open(dir.path().join("config.toml")).unwrap();
        assert_eq!(reopened.theme(), original);
    }

    #[test]
    fn test_api_base_override_not_persisted() {
        let (dir, mut store) = temp_store();
        store.override_api_base("http://localhost:9999".to_string());
        store.set_credential("t1").unwrap();
        assert_eq!(store.config().api_base(), "http://localhost:9999");

        let reopened = SessionStore::open(dir.path().join("config.toml")).unwrap();
        assert_eq!(reopened.config().api_base(), crate::config::DEFAULT_API_BASE);
    }

    /// A store whose config path sits under a regular file, so every save fails.
    fn unwritable_store() -> (tempfile::NamedTempFile, SessionStore) {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let store = SessionStore::open(blocker.path().join("config.toml")).unwrap();
        (blocker, store)
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let (_blocker, mut store) = unwritable_store();
        let theme = store.theme();

        assert!(store.set_credential("tX").is_err());
        assert!(!store.is_authenticated());
        assert!(store.credential().is_none());

        assert!(store.toggle_theme().is_err());
        assert_eq!(store.theme(), theme);
    }

    #[test]
    fn test_unparseable_file_is_not_overwritten() {
        let (dir, mut store) = temp_store();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base = [not toml").unwrap();

        assert!(store.set_credential("t1").is_err());
        assert!(!store.is_authenticated());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "api_base = [not toml"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_after_waits_fixed_delay() {
        let (_dir, mut store) = temp_store();
        store.set_credential("t1").unwrap();

        let started = tokio::time::Instant::now();
        logout_after(&mut store, EXPIRY_LOGOUT_DELAY).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= EXPIRY_LOGOUT_DELAY);
        assert!(elapsed < EXPIRY_LOGOUT_DELAY + Duration::from_millis(10));
        assert!(store.credential().is_none());
    }
}
