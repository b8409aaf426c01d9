//! Programmable stand-ins for the chain endpoint and the bundled-transaction
//! submitter, used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::chain::ChainClient;
use crate::errors::{ChainError, SubmitterError};
use crate::swap::BundleSubmitter;
use crate::types::{BundleReceipt, BundledCall, FeeCaps};

// Selectors the mock chain understands
const SEL_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
const SEL_GET_POOL: [u8; 4] = [0x16, 0x98, 0xee, 0x82];
const SEL_QUOTE: [u8; 4] = [0xc6, 0xa5, 0x02, 0x6a];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    pub to: Address,
    pub selector: [u8; 4],
    pub simulated_as: Option<Address>,
}

/// In-memory chain endpoint: scripted balances, pools, and quotes, with
/// call recording and optional rate-limit fault injection.
#[derive(Default)]
pub struct MockChainClient {
    balances: Mutex<HashMap<(Address, Address), U256>>,
    pools: Mutex<HashMap<u32, Address>>,
    quote_out: Mutex<U256>,
    rate_limit_budget: AtomicU32,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the balance of `account` on `token`.
    pub fn with_balance(self, token: Address, account: Address, balance: U256) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert((token, account), balance);
        self
    }

    /// Script the factory's pool address for a fee tier.
    pub fn with_pool(self, fee: u32, pool: Address) -> Self {
        self.pools.lock().unwrap().insert(fee, pool);
        self
    }

    /// Script the quoter's simulated output amount.
    pub fn with_quote(self, amount_out: U256) -> Self {
        *self.quote_out.lock().unwrap() = amount_out;
        self
    }

    /// Make the next `count` requests fail with a rate-limit error.
    pub fn fail_rate_limited(self, count: u32) -> Self {
        self.rate_limit_budget.store(count, Ordering::SeqCst);
        self
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn recorded_selectors(&self) -> Vec<[u8; 4]> {
        self.recorded_calls().iter().map(|c| c.selector).collect()
    }

    pub fn simulations_as(&self, account: Address) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|c| c.simulated_as == Some(account))
            .count()
    }

    fn respond(
        &self,
        to: Address,
        data: &Bytes,
        simulated_as: Option<Address>,
    ) -> Result<Bytes, ChainError> {
        if data.len() < 4 {
            return Err(ChainError::Call("calldata shorter than a selector".to_string()));
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        self.calls.lock().unwrap().push(RecordedCall {
            to,
            selector,
            simulated_as,
        });

        if self
            .rate_limit_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChainError::classify("HTTP error 429: too many requests"));
        }

        match selector {
            SEL_BALANCE_OF => {
                let account = Address::from_slice(&data[16..36]);
                let balance = self
                    .balances
                    .lock()
                    .unwrap()
                    .get(&(to, account))
                    .copied()
                    .unwrap_or_default();
                Ok(uint_word(balance))
            }
            SEL_GET_POOL => {
                let fee = U256::from_big_endian(&data[68..100]).as_u32();
                let pool = self
                    .pools
                    .lock()
                    .unwrap()
                    .get(&fee)
                    .copied()
                    .unwrap_or_default();
                Ok(address_word(pool))
            }
            SEL_QUOTE => {
                // QuoterV2 returns four words; only the first carries the
                // output amount.
                let amount_out = *self.quote_out.lock().unwrap();
                let mut data = uint_word(amount_out).to_vec();
                data.extend_from_slice(&[0u8; 96]);
                Ok(Bytes::from(data))
            }
            other => Err(ChainError::Call(format!(
                "mock has no handler for selector 0x{}",
                hex::encode(other)
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.respond(to, &data, None)
    }

    async fn simulate(&self, to: Address, data: Bytes, from: Address) -> Result<Bytes, ChainError> {
        self.respond(to, &data, Some(from))
    }
}

fn uint_word(value: U256) -> Bytes {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    Bytes::from(word.to_vec())
}

fn address_word(address: Address) -> Bytes {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    Bytes::from(word.to_vec())
}

/// Scripted bundled-transaction submitter: records what was sent and
/// returns a fixed receipt, a rejection, or an on-chain revert.
pub struct MockBundleSubmitter {
    transaction_hash: H256,
    reject_with: Option<String>,
    revert_on_chain: bool,
    confirmation_delay: Option<Duration>,
    sent: Mutex<Vec<(Vec<BundledCall>, FeeCaps)>>,
}

impl MockBundleSubmitter {
    pub fn confirming(transaction_hash: H256) -> Self {
        Self {
            transaction_hash,
            reject_with: None,
            revert_on_chain: false,
            confirmation_delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Self::confirming(H256::zero())
        }
    }

    pub fn reverting(transaction_hash: H256) -> Self {
        Self {
            revert_on_chain: true,
            ..Self::confirming(transaction_hash)
        }
    }

    /// Delay receipt confirmation, to keep a swap in flight during tests.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = Some(delay);
        self
    }

    pub fn sent_operations(&self) -> Vec<(Vec<BundledCall>, FeeCaps)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BundleSubmitter for MockBundleSubmitter {
    async fn send_bundled_operation(
        &self,
        calls: Vec<BundledCall>,
        fee_caps: FeeCaps,
    ) -> Result<H256, SubmitterError> {
        if let Some(message) = &self.reject_with {
            return Err(SubmitterError(message.clone()));
        }
        self.sent.lock().unwrap().push((calls, fee_caps));
        Ok(self.transaction_hash)
    }

    async fn await_receipt(&self, _operation: H256) -> Result<BundleReceipt, SubmitterError> {
        if let Some(delay) = self.confirmation_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(BundleReceipt {
            transaction_hash: self.transaction_hash,
            success: !self.revert_on_chain,
        })
    }
}
