use std::sync::Arc;

use ethers::types::{Address, U256};
use tracing::debug;

use crate::chain::ChainClient;
use crate::constants::QUOTER;
use crate::encode::{decode_first_uint, SwapCodec};
use crate::errors::ChainError;

/// Simulates exact-input-single quotes against the quoter contract.
pub struct Quoter {
    chain: Arc<dyn ChainClient>,
    codec: SwapCodec,
}

impl Quoter {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            codec: SwapCodec::new(),
        }
    }

    /// Expected output for swapping `amount_in` of `token_in` at `fee`,
    /// simulated as `simulate_as`. A returned zero is a valid response
    /// meaning "no liquidity at this price"; the caller decides what to do
    /// with it.
    pub async fn quote_exact_input(
        &self,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
        fee: u32,
        simulate_as: Address,
    ) -> Result<U256, ChainError> {
        let calldata = self
            .codec
            .encode_quote_exact_input_single(token_in, token_out, amount_in, fee);
        let raw = self.chain.simulate(*QUOTER, calldata, simulate_as).await?;
        let amount_out = decode_first_uint(&raw)?;
        debug!(
            "quoteExactInputSingle: {} in -> {} out at fee {}",
            amount_in, amount_out, fee
        );
        Ok(amount_out)
    }
}
