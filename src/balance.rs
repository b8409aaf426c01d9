use std::sync::Arc;

use ethers::types::{Address, U256};
use tracing::debug;

use crate::chain::ChainClient;
use crate::constants::USDC;
use crate::encode::{decode_first_uint, SwapCodec};
use crate::errors::ChainError;

/// Reads ERC-20 balances through the chain read client.
pub struct BalanceReader {
    chain: Arc<dyn ChainClient>,
    codec: SwapCodec,
}

impl BalanceReader {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            codec: SwapCodec::new(),
        }
    }

    /// Balance of `account` in the token's smallest units. When `token` is
    /// omitted the designated stable token (USDC) is read.
    pub async fn read(&self, account: Address, token: Option<Address>) -> Result<U256, ChainError> {
        let token = token.unwrap_or(*USDC);
        let calldata = self.codec.encode_balance_of(account);
        let raw = self.chain.call(token, calldata).await?;
        let balance = decode_first_uint(&raw)?;
        debug!("balanceOf({:?}) on {:?} = {}", account, token, balance);
        Ok(balance)
    }
}
