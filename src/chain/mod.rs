pub mod rpc;

pub use rpc::HttpChainClient;

use async_trait::async_trait;
use ethers::types::{Address, Bytes};

use crate::errors::ChainError;

/// Read-only access to the configured network endpoint.
///
/// Both methods take pre-encoded calldata; decoding the returned bytes is
/// the caller's concern.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Plain `eth_call` against `to`.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// `eth_call` executed as `from`, for contracts whose view methods care
    /// about the caller (the quoter's simulated swap does).
    async fn simulate(&self, to: Address, data: Bytes, from: Address) -> Result<Bytes, ChainError>;
}
