// Gasless swap orchestration core

pub mod balance;
pub mod chain;
pub mod config;
pub mod constants;
pub mod dex;
pub mod encode;
pub mod errors;
pub mod mocks;
pub mod retry;
pub mod swap;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use chain::{ChainClient, HttpChainClient};
pub use config::Config;
pub use errors::{ChainError, SubmitterError, SwapError};
pub use retry::RetryPolicy;
pub use swap::{BundleSubmitter, SwapOrchestrator};
pub use types::*;
