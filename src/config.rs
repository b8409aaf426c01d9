use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

// Recognized environment variables
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_FEE_LIST: &str = "FEE_LIST";
pub const ENV_SLIPPAGE_BPS: &str = "SLIPPAGE_BPS";
pub const ENV_BALANCE_REFRESH_SECS: &str = "BALANCE_REFRESH_SECS";
pub const ENV_MAX_RETRY_ATTEMPTS: &str = "MAX_RETRY_ATTEMPTS";

// Defaults
pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";
pub const DEFAULT_FEE_LIST: &str = "500,3000";
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;
pub const DEFAULT_BALANCE_REFRESH_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Environment-sourced configuration for the swap core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    /// Fee tiers tried in order during pool discovery; first match wins.
    pub fee_tier_candidates: Vec<u32>,
    /// Tolerated quote shortfall in basis points. Must be <= 10000.
    pub slippage_bps: u32,
    /// Minimum seconds between non-forced balance refreshes.
    pub balance_refresh_secs: u64,
    /// Total attempts for rate-limited chain reads.
    pub max_retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            fee_tier_candidates: parse_number_list(DEFAULT_FEE_LIST),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            balance_refresh_secs: DEFAULT_BALANCE_REFRESH_SECS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

impl Config {
    /// Build from the process environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            rpc_url: env::var(ENV_RPC_URL).unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            fee_tier_candidates: parse_number_list(
                &env::var(ENV_FEE_LIST).unwrap_or_else(|_| DEFAULT_FEE_LIST.to_string()),
            ),
            slippage_bps: env::var(ENV_SLIPPAGE_BPS)
                .unwrap_or_default()
                .parse()
                .unwrap_or(DEFAULT_SLIPPAGE_BPS),
            balance_refresh_secs: env::var(ENV_BALANCE_REFRESH_SECS)
                .unwrap_or_default()
                .parse()
                .unwrap_or(DEFAULT_BALANCE_REFRESH_SECS),
            max_retry_attempts: env::var(ENV_MAX_RETRY_ATTEMPTS)
                .unwrap_or_default()
                .parse()
                .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slippage_bps > 10_000 {
            bail!(
                "slippage of {} bps exceeds 10000 (100%)",
                self.slippage_bps
            );
        }
        if self.fee_tier_candidates.is_empty() {
            bail!("fee tier candidate list is empty");
        }
        if self.max_retry_attempts == 0 {
            bail!("max retry attempts must be at least 1");
        }
        Ok(())
    }
}

/// Parse a comma-separated list of fee tiers, dropping anything that is not
/// a positive integer (mirrors how the tier list env var has always been
/// read). An empty result falls back to the default list.
pub fn parse_number_list(raw: &str) -> Vec<u32> {
    let parsed: Vec<u32> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .collect();
    if parsed.is_empty() {
        DEFAULT_FEE_LIST
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    } else {
        parsed
    }
}
