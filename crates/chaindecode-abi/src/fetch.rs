//! Remote ABI fetching for the single-contract shortcut path.
//!
//! One HTTPS `GET` against Sourcify — decentralized, no API key required.
//! This is the only network interaction in the whole pipeline.

use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ABI not found for {address} on chain {chain_id}")]
    NotFound { chain_id: u64, address: String },

    #[error("rate limited by Sourcify")]
    RateLimited,

    #[error("invalid ABI JSON returned from Sourcify: {reason}")]
    InvalidAbi { reason: String },
}

/// Remote ABI fetcher backed by Sourcify.
pub struct AbiFetcher {
    client: Client,
    base: String,
}

impl AbiFetcher {
    /// Create a fetcher against the public Sourcify endpoint.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("chaindecode/0.1 (https://github.com/DarshanKumar89/chainfoundry)")
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base: "https://sourcify.dev/server".into(),
        }
    }

    /// Set a custom Sourcify base URL (for private/self-hosted instances).
    pub fn with_base(mut self, url: impl Into<String>) -> Self {
        self.base = url.into();
        self
    }

    /// Fetch the ABI JSON array for one contract.
    ///
    /// # Arguments
    /// * `chain_id` - EVM chain ID (1 = Ethereum, 137 = Polygon, etc.)
    /// * `address` - contract address (checksummed or lowercase)
    pub async fn fetch_abi(&self, chain_id: u64, address: &str) -> Result<String, FetchError> {
        let address = address.to_lowercase();
        let address = if address.starts_with("0x") {
            address
        } else {
            format!("0x{address}")
        };

        let url = format!("{}/v2/contract/{chain_id}/{address}", self.base);
        let resp = self
            .client
            .get(&url)
            .query(&[("fields", "abi")])
            .send()
            .await?;

        match resp.status().as_u16() {
            200 => {
                let json: serde_json::Value = resp.json().await?;
                let abi = json.get("abi").ok_or_else(|| FetchError::InvalidAbi {
                    reason: "response has no 'abi' field".into(),
                })?;
                if !abi.is_array() {
                    return Err(FetchError::InvalidAbi {
                        reason: "'abi' field is not an array".into(),
                    });
                }
                Ok(abi.to_string())
            }
            404 => Err(FetchError::NotFound { chain_id, address }),
            429 => Err(FetchError::RateLimited),
            status => Err(FetchError::InvalidAbi {
                reason: format!("unexpected status {status}"),
            }),
        }
    }
}

impl Default for AbiFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    // Integration tests require network access; skip in CI unless INTEGRATION=1
    #[tokio::test]
    #[ignore = "requires network access"]
    async fn fetch_usdc_abi_from_sourcify() {
        let fetcher = super::AbiFetcher::new();
        // USDC proxy on Ethereum mainnet
        let result = fetcher
            .fetch_abi(1, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
            .await;
        assert!(matches!(
            result,
            Ok(_) | Err(super::FetchError::NotFound { .. })
        ));
    }
}
