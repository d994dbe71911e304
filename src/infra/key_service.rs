//! HTTP key provider
//!
//! Queries `GET <base>/<identifier>/<board>/<build>` and expects a document
//! of the form `{"keys": [{"image": "iBSS", "iv": "…", "key": "…"}, …]}`.

use std::time::Duration;

use serde::Deserialize;

use crate::core::keys::{KeyProvider, KeyQuery, LoaderKeys};
use crate::error::KeyError;

#[derive(Debug, Deserialize)]
struct KeyDocument {
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    image: String,
    #[serde(default)]
    iv: String,
    #[serde(default)]
    key: String,
}

/// Key provider backed by the firmware key proxy
#[derive(Debug, Clone)]
pub struct HttpKeyProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKeyProvider {
    /// Create a provider for a custom base URL
    pub fn with_url(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, query: &KeyQuery) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, query.identifier, query.board, query.build
        )
    }
}

impl KeyProvider for HttpKeyProvider {
    async fn loader_keys(&self, query: &KeyQuery) -> Result<LoaderKeys, KeyError> {
        let url = self.url_for(query);
        tracing::debug!("Fetching loader keys from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KeyError::Request {
                url: url.clone(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            tracing::debug!("Key service answered {}", response.status());
            return Ok(LoaderKeys::default());
        }

        let document: KeyDocument = response.json().await.map_err(|e| KeyError::Decode {
            url: url.clone(),
            error: e.to_string(),
        })?;

        let mut keys = LoaderKeys::default();
        for entry in document.keys {
            match entry.image.as_str() {
                "iBSS" => {
                    keys.ibss_iv = entry.iv;
                    keys.ibss_key = entry.key;
                }
                "iBEC" => {
                    keys.ibec_iv = entry.iv;
                    keys.ibec_key = entry.key;
                }
                _ => {}
            }
        }

        Ok(keys.sanitized())
    }
}
