use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ERC-20 token as the orchestrator tracks it.
///
/// `address` and `decimals` are immutable identity; `balance` is a cached,
/// periodically refreshed decimal-string view of on-chain state. It is not
/// authoritative and is invalidated by time or an explicit forced refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub symbol: String,
    pub name: String,
    pub address: Address,
    pub decimals: u8,
    pub balance: String,
}

/// A fee tier together with the pool address the factory resolved for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolFee {
    pub fee: u32,
    pub pool: Address,
}

/// A simulated quote. Ephemeral: rebuilt on every input change, never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_tier: u32,
}

impl Quote {
    /// Display-unit exchange rate (out per one in), for presentation only.
    pub fn rate(&self, in_decimals: u8, out_decimals: u8) -> f64 {
        let amount_in = self.amount_in.as_u128() as f64 / 10f64.powi(in_decimals as i32);
        let amount_out = self.amount_out.as_u128() as f64 / 10f64.powi(out_decimals as i32);
        if amount_in == 0.0 {
            return 0.0;
        }
        amount_out / amount_in
    }
}

/// Parameters for one swap attempt, constructed fresh each time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapRequest {
    pub from_amount: String,
    pub fee_tier: u32,
    pub min_out: U256,
    pub caller: Address,
}

/// Terminal outcome of a confirmed swap. Never retried automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwapResult {
    pub id: Uuid,
    pub transaction_hash: H256,
    pub settled_at: DateTime<Utc>,
}

/// One call inside a bundled user operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundledCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl BundledCall {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            value: U256::zero(),
        }
    }
}

/// Fee caps attached to a bundled operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeeCaps {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeCaps {
    /// Zero caps: execution sponsorship is entirely the submitter's concern.
    pub fn sponsored() -> Self {
        Self::default()
    }
}

/// Receipt returned by the bundled-transaction submitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleReceipt {
    pub transaction_hash: H256,
    pub success: bool,
}

/// Orchestrator output events consumed by a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SwapEvent {
    BalanceUpdated { token: Token },
    QuoteReady { quote: Quote },
    SwapSettled { result: SwapResult },
    SwapFailed { reason: String },
}

impl std::fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapEvent::BalanceUpdated { token } => {
                write!(f, "BalanceUpdated({} = {})", token.symbol, token.balance)
            }
            SwapEvent::QuoteReady { quote } => write!(
                f,
                "QuoteReady({} -> {} @ fee {})",
                quote.amount_in, quote.amount_out, quote.fee_tier
            ),
            SwapEvent::SwapSettled { result } => {
                write!(f, "SwapSettled({:?})", result.transaction_hash)
            }
            SwapEvent::SwapFailed { reason } => write!(f, "SwapFailed({})", reason),
        }
    }
}
