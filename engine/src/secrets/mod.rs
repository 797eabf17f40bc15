use keyring::Entry;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keychain service name under which EDITH stores its secrets
pub const SERVICE_NAME: &str = "edith";

/// Keychain key for a provider's API key, e.g. `openai_api_key`
pub fn api_key_name(provider: &str) -> String {
    format!("{}_api_key", provider.to_lowercase())
}

/// Somewhere to put secrets collected at setup time
pub trait SecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError>;

    /// `None` if the secret was never stored
    fn get_secret(&self, key: &str) -> Result<Option<String>, EngineError>;
}

/// SecretManager handles secure storage and retrieval of secrets using the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
pub struct SecretManager {
    service_name: String,
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    ///
    /// The service name is used to namespace secrets in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }
}

impl Default for SecretManager {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl SecretStore for SecretManager {
    /// Stores a secret in the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }
}

/// Process-local secret store for tests and keychain-less hosts
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, EngineError> {
        self.secrets
            .lock()
            .map_err(|_| EngineError::KeyringError("secret store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.lock()?.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_manager_creation() {
        let manager = SecretManager::default();
        assert_eq!(manager.service_name, "edith");
    }

    #[test]
    fn test_api_key_name() {
        assert_eq!(api_key_name("openai"), "openai_api_key");
        assert_eq!(api_key_name("Groq"), "groq_api_key");
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySecretStore::new();
        assert!(store.get_secret("gemini_api_key").unwrap().is_none());

        store.set_secret("gemini_api_key", "abc").unwrap();
        store.set_secret("gemini_api_key", "def").unwrap();
        assert_eq!(
            store.get_secret("gemini_api_key").unwrap().as_deref(),
            Some("def")
        );
    }

    #[test]
    #[ignore = "needs an OS keychain"]
    fn test_keychain_set_get() {
        let manager = SecretManager::new("edith-test");
        let key = "test_key_12345";

        assert!(manager.get_secret("never_stored_key").unwrap().is_none());

        manager.set_secret(key, "test_secret_value").unwrap();
        assert_eq!(
            manager.get_secret(key).unwrap().as_deref(),
            Some("test_secret_value")
        );

        Entry::new("edith-test", key).unwrap().delete_password().unwrap();
    }
}
