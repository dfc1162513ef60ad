use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, Provider, Ws};
use ethers::types::{Address, Bytes, TransactionReceipt, H256};
use tracing::info;

use crate::wait::ChainBackend;
use abibind_core::config::DeployConfig;
use abibind_core::{Error, Result};

/// Ethereum provider types
#[derive(Debug, Clone)]
pub enum EthereumProvider {
    /// HTTP provider
    Http(Arc<Provider<Http>>),

    /// WebSocket provider
    Websocket(Arc<Provider<Ws>>),
}

impl EthereumProvider {
    /// Connect to a node, over WebSocket for `ws://` and `wss://` URLs
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        if rpc_url.starts_with("ws://") || rpc_url.starts_with("wss://") {
            let ws_provider = Provider::<Ws>::connect(rpc_url)
                .await
                .map_err(|e| Error::chain(format!("Failed to connect to Ethereum node via WebSocket: {}", e)))?;

            info!(rpc_url, "connected over websocket");
            Ok(Self::Websocket(Arc::new(ws_provider)))
        } else {
            let http_provider = Provider::<Http>::try_from(rpc_url)
                .map_err(|e| Error::chain(format!("Failed to create Ethereum HTTP provider: {}", e)))?;

            info!(rpc_url, "using http provider");
            Ok(Self::Http(Arc::new(http_provider)))
        }
    }

    /// Connect using the deployment settings
    pub async fn from_config(config: &DeployConfig) -> Result<Self> {
        config.validate()?;
        Self::connect(&config.rpc_url).await
    }
}

/// Receipt polling interval of the deployment settings
pub fn poll_interval(config: &DeployConfig) -> Duration {
    Duration::from_millis(config.poll_interval_ms)
}

#[async_trait]
impl ChainBackend for EthereumProvider {
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        match self {
            Self::Http(provider) => provider.transaction_receipt(hash).await,
            Self::Websocket(provider) => provider.transaction_receipt(hash).await,
        }
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        match self {
            Self::Http(provider) => provider.code_at(address).await,
            Self::Websocket(provider) => provider.code_at(address).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_provider_from_config() {
        let config = DeployConfig::default();
        let provider = EthereumProvider::from_config(&config).await.unwrap();
        assert!(matches!(provider, EthereumProvider::Http(_)));
        assert_eq!(poll_interval(&config), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = DeployConfig {
            rpc_url: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            EthereumProvider::from_config(&config).await,
            Err(Error::Config(_))
        ));
    }
}
