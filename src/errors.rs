use ethers::types::U256;
use thiserror::Error;

/// Transport-level failure from the chain read client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("chain read failed: {0}")]
    Call(String),
}

impl ChainError {
    /// Classify a raw transport error message. HTTP 429 and the usual
    /// provider rate-limit markers are the only retryable shape.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if message.contains("429")
            || lowered.contains("rate limit")
            || lowered.contains("too many requests")
        {
            ChainError::RateLimited(message)
        } else {
            ChainError::Call(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChainError::RateLimited(_))
    }
}

/// Failure reported by the external bundled-transaction submitter.
/// The message is surfaced to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SubmitterError(pub String);

/// Everything a swap or quote attempt can fail with. None of these are
/// fatal to the process; each returns the orchestrator to idle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error(transparent)]
    ChainRead(#[from] ChainError),

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("no liquidity pool found at the tried fee tiers")]
    NoPoolFound,

    #[error("quote returned 0 - no liquidity in the discovered pool")]
    NoLiquidity,

    #[error("{0}")]
    Submission(String),

    #[error("bundler client not available")]
    SubmitterUnavailable,

    #[error("a swap is already in flight")]
    ConcurrentOperationRejected,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<SubmitterError> for SwapError {
    fn from(err: SubmitterError) -> Self {
        SwapError::Submission(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_shapes() {
        assert!(ChainError::classify("HTTP error 429").is_rate_limited());
        assert!(ChainError::classify("Too Many Requests").is_rate_limited());
        assert!(ChainError::classify("rate limit exceeded").is_rate_limited());
        assert!(!ChainError::classify("execution reverted").is_rate_limited());
        assert!(!ChainError::classify("connection refused").is_rate_limited());
    }

    #[test]
    fn test_submitter_message_surfaced_verbatim() {
        let err = SubmitterError("AA21 didn't pay prefund".to_string());
        let swap_err: SwapError = err.into();
        assert_eq!(swap_err.to_string(), "AA21 didn't pay prefund");
    }
}
