use std::sync::Arc;

use ethers::types::Address;
use tracing::debug;

use crate::chain::ChainClient;
use crate::constants::{is_zero_address, FACTORY};
use crate::encode::{decode_address, SwapCodec};
use crate::errors::ChainError;
use crate::types::PoolFee;

/// Finds a live liquidity pool for a token pair by probing candidate fee
/// tiers against the factory.
pub struct FeeDiscoverer {
    chain: Arc<dyn ChainClient>,
    codec: SwapCodec,
}

impl FeeDiscoverer {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            codec: SwapCodec::new(),
        }
    }

    /// Try `candidate_fees` strictly in the given order; the first tier the
    /// factory maps to a non-zero pool address wins. `None` means no pool
    /// exists at any candidate tier, which is a normal outcome rather than
    /// a transport error. No attempt is made to pick the best-quoting tier.
    pub async fn discover(
        &self,
        token_a: Address,
        token_b: Address,
        candidate_fees: &[u32],
    ) -> Result<Option<PoolFee>, ChainError> {
        for &fee in candidate_fees {
            let calldata = self.codec.encode_get_pool(token_a, token_b, fee);
            let raw = self.chain.call(*FACTORY, calldata).await?;
            let pool = decode_address(&raw)?;
            if !is_zero_address(pool) {
                debug!("Pool for fee tier {} found at {:?}", fee, pool);
                return Ok(Some(PoolFee { fee, pool }));
            }
            debug!("No pool at fee tier {}", fee);
        }
        Ok(None)
    }
}
