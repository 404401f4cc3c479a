use crate::store::{KeyValueStore, StoreError};
use std::{fmt, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Storage key the API key lives under.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

/// Source of the secret that authorizes model calls.
///
/// An empty string means no credential is configured.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> String;

    /// Watch the active credential. The receiver observes every value
    /// published after the call. A provider whose value can never change may
    /// return a receiver whose sender is already closed.
    fn subscribe(&self) -> watch::Receiver<String>;
}

/// The single API key, persisted in a [`KeyValueStore`].
///
/// The active value is held in memory and published to subscribers, so a new
/// key takes effect for the next request without restarting anything.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    active: watch::Sender<String>,
}

impl CredentialStore {
    /// Create a store and load the persisted key, if any.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = load(store.as_ref());
        let (active, _) = watch::channel(initial);
        Self { store, active }
    }

    /// The active key, or `""` when none is set.
    #[must_use]
    pub fn get(&self) -> String {
        self.active.borrow().clone()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.active.borrow().is_empty()
    }

    /// The active key in display form. See [`mask`].
    #[must_use]
    pub fn masked(&self) -> String {
        mask(&self.active.borrow())
    }

    /// Persist `value` and make it active. Setting `""` clears the key.
    ///
    /// The active value only changes once the write succeeded.
    pub fn set(&self, value: impl Into<String>) -> Result<(), StoreError> {
        let value = value.into();
        if value.is_empty() {
            self.store.remove(CREDENTIAL_KEY)?;
        } else {
            self.store.set(CREDENTIAL_KEY, &value)?;
        }
        debug!(credential = %mask(&value), "credential saved");
        self.publish(value);
        Ok(())
    }

    /// Re-read the backing store, e.g. after another process changed it.
    /// Returns whether the active key changed.
    pub fn reload(&self) -> bool {
        let changed = self.publish(load(self.store.as_ref()));
        if changed {
            debug!(credential = %self.masked(), "credential reloaded");
        }
        changed
    }

    fn publish(&self, value: String) -> bool {
        self.active.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl CredentialProvider for CredentialStore {
    fn credential(&self) -> String {
        self.get()
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        self.active.subscribe()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("credential", &self.masked())
            .finish_non_exhaustive()
    }
}

fn load(store: &dyn KeyValueStore) -> String {
    match store.get(CREDENTIAL_KEY) {
        Ok(value) => value.unwrap_or_default(),
        Err(error) => {
            warn!(%error, "failed to read stored credential, treating it as unset");
            String::new()
        }
    }
}

/// A credential fixed at construction, e.g. read from the environment.
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl CredentialProvider for StaticCredential {
    fn credential(&self) -> String {
        self.0.clone()
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        watch::channel(self.0.clone()).1
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticCredential").field(&mask(&self.0)).finish()
    }
}

/// Display form of a secret: keys of up to 8 characters are fully starred,
/// longer keys keep their first and last 4 characters.
#[must_use]
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len <= 8 {
        return "*".repeat(len);
    }

    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..4]);
    masked.push_str(&"*".repeat(len - 8));
    masked.extend(&chars[len - 4..]);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_edges_of_long_keys() {
        assert_eq!(mask("AIzaSyABCDEFGHIJKL"), "AIza**********IJKL");
        assert_eq!(mask("123456789"), "1234*6789");
    }

    #[test]
    fn mask_stars_short_keys() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("12345678"), "********");
        assert_eq!(mask(""), "");
    }

    #[test]
    fn mask_counts_characters_not_bytes() {
        assert_eq!(mask("鍵鍵鍵鍵秘密鍵鍵鍵鍵"), "鍵鍵鍵鍵**鍵鍵鍵鍵");
        assert_eq!(mask("秘密の鍵"), "****");
    }

    #[test]
    fn static_credential_debug_is_masked() {
        let credential = StaticCredential::new("AIzaSyABCDEFGHIJKL");
        assert_eq!(
            format!("{credential:?}"),
            "StaticCredential(\"AIza**********IJKL\")"
        );
        assert_eq!(credential.credential(), "AIzaSyABCDEFGHIJKL");
    }
}
