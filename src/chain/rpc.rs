use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use tracing::{debug, info};

use super::ChainClient;
use crate::errors::ChainError;

/// HTTP JSON-RPC chain client over a single configured endpoint.
pub struct HttpChainClient {
    provider: Arc<Provider<Http>>,
}

impl HttpChainClient {
    pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
        info!("🔌 Initializing chain RPC client: {}", rpc_url);
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Call(format!("invalid RPC url {}: {}", rpc_url, e)))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    async fn eth_call(&self, tx: TransactionRequest) -> Result<Bytes, ChainError> {
        let typed: TypedTransaction = tx.into();
        self.provider
            .call(&typed, None)
            .await
            .map_err(|e| ChainError::classify(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        debug!("eth_call to {:?} ({} bytes)", to, data.len());
        self.eth_call(TransactionRequest::new().to(to).data(data))
            .await
    }

    async fn simulate(
        &self,
        to: Address,
        data: Bytes,
        from: Address,
    ) -> Result<Bytes, ChainError> {
        debug!("simulated call to {:?} as {:?}", to, from);
        self.eth_call(TransactionRequest::new().to(to).data(data).from(from))
            .await
    }
}
