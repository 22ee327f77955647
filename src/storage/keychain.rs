//! Keychain access for mailbox credentials.
//!
//! Wraps the keyring crate so provider secrets never live in the settings file.

use thiserror::Error;

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn blocking task: {0}")]
    TaskFailed(String),
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Provides access to the OS keychain.
///
/// Entries are namespaced by the service name; keys identify the account and
/// the kind of secret.
#[derive(Debug, Clone)]
pub struct KeychainAccess {
    service_name: String,
}

impl KeychainAccess {
    /// Default service name for mailreap credentials.
    pub const DEFAULT_SERVICE: &'static str = "io.mailreap";

    /// Creates a new KeychainAccess with the default service name.
    pub fn new() -> Self {
        Self {
            service_name: Self::DEFAULT_SERVICE.to_string(),
        }
    }

    /// Retrieves a credential. Returns `None` if no credential exists for the key.
    pub async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        let service = self.service_name.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &key)?;
            match entry.get_password() {
                Ok(password) => Ok(Some(password)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(KeychainError::Keyring(e)),
            }
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Retrieves a credential, failing with [`KeychainError::NotFound`] when absent.
    pub async fn require(&self, key: &str) -> Result<String> {
        self.retrieve(key)
            .await?
            .ok_or_else(|| KeychainError::NotFound(key.to_string()))
    }

    /// Returns the service name used for this keychain access.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Keychain key holding an account's Gmail OAuth client credentials (JSON).
    pub fn gmail_credentials_key(account_id: &str) -> String {
        format!("gmail.credentials.{}", account_id)
    }
}

impl Default for KeychainAccess {
    fn default() -> Self {
        Self::new()
    }
}
