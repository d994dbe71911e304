//! Loader decryption keys
//!
//! Keys for the first- and second-stage loaders come from an external key
//! provider keyed by device identifier, board and build version. Unknown
//! combinations produce empty values rather than errors.

use crate::error::KeyError;

/// Lookup key for a device/firmware combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQuery {
    /// Device identifier, e.g. `iPhone9,3`
    pub identifier: String,
    /// Board config, lower-case
    pub board: String,
    /// Product build version from the manifest
    pub build: String,
}

/// Hex-encoded IV/key pairs for both loader stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderKeys {
    pub ibss_iv: String,
    pub ibss_key: String,
    pub ibec_iv: String,
    pub ibec_key: String,
}

impl LoaderKeys {
    /// Whether all four values are present
    pub fn is_complete(&self) -> bool {
        self.ibss().is_some() && self.ibec().is_some()
    }

    /// Concatenated IV+key for the first-stage loader
    pub fn ibss(&self) -> Option<String> {
        combine(&self.ibss_iv, &self.ibss_key)
    }

    /// Concatenated IV+key for the second-stage loader
    pub fn ibec(&self) -> Option<String> {
        combine(&self.ibec_iv, &self.ibec_key)
    }

    /// Drop any value that is not valid hex
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            ibss_iv: hex_or_empty(self.ibss_iv),
            ibss_key: hex_or_empty(self.ibss_key),
            ibec_iv: hex_or_empty(self.ibec_iv),
            ibec_key: hex_or_empty(self.ibec_key),
        }
    }
}

fn combine(iv: &str, key: &str) -> Option<String> {
    if iv.is_empty() || key.is_empty() {
        None
    } else {
        Some(format!("{iv}{key}"))
    }
}

fn hex_or_empty(value: String) -> String {
    let value = value.trim().to_string();
    if hex::decode(&value).is_ok() {
        value
    } else {
        tracing::debug!("Discarding non-hex key material");
        String::new()
    }
}

/// Source of loader decryption keys
#[allow(async_fn_in_trait)]
pub trait KeyProvider {
    /// Look up keys; unknown devices yield empty values, not errors
    async fn loader_keys(&self, query: &KeyQuery) -> Result<LoaderKeys, KeyError>;
}

/// Provider that always answers with the same keys
#[derive(Debug, Clone, Default)]
pub struct StaticKeyProvider {
    keys: LoaderKeys,
}

impl StaticKeyProvider {
    pub fn new(keys: LoaderKeys) -> Self {
        Self { keys }
    }
}

impl KeyProvider for StaticKeyProvider {
    async fn loader_keys(&self, _query: &KeyQuery) -> Result<LoaderKeys, KeyError> {
        Ok(self.keys.clone())
    }
}
