//! Display and amount-conversion helpers.

use ethers::types::{H256, U256};
use ethers::utils::{format_units, parse_units, ParseUnits};

use crate::errors::SwapError;

/// Shorten a 0x-prefixed hex string for display: `0x036C...CF7e`.
pub fn truncate_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Truncated display form of a transaction hash.
pub fn truncate_hash(hash: &H256) -> String {
    truncate_address(&format!("{:#x}", hash))
}

/// A user-entered amount is swappable only if it is a number strictly
/// greater than zero.
pub fn is_valid_positive_number(value: &str) -> bool {
    match value.trim().parse::<f64>() {
        Ok(parsed) => parsed.is_finite() && parsed > 0.0,
        Err(_) => false,
    }
}

/// Convert a human decimal string into smallest units using the token's own
/// decimal count. Rejects empty, non-numeric, and non-positive input.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, SwapError> {
    if !is_valid_positive_number(amount) {
        return Err(SwapError::InvalidAmount(amount.to_string()));
    }
    let parsed = parse_units(amount.trim(), u32::from(decimals))
        .map_err(|e| SwapError::InvalidAmount(format!("{}: {}", amount, e)))?;
    match parsed {
        ParseUnits::U256(value) => Ok(value),
        // Unreachable after the positivity check, but never panic on input.
        ParseUnits::I256(_) => Err(SwapError::InvalidAmount(amount.to_string())),
    }
}

/// Convert smallest units back into a decimal string using the token's own
/// decimal count, trimming insignificant trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    let formatted = format_units(amount, u32::from(decimals)).unwrap_or_else(|_| "0".to_string());
    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        formatted
    }
}

/// Minimum acceptable output after slippage:
/// `floor(out * (10000 - slippage_bps) / 10000)`.
pub fn min_out_after_slippage(out: U256, slippage_bps: u32) -> U256 {
    let slippage_bps = slippage_bps.min(10_000);
    out * U256::from(10_000 - slippage_bps) / U256::from(10_000)
}
