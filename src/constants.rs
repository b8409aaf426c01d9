use ethers::types::Address;
use once_cell::sync::Lazy;
use std::str::FromStr;

use crate::types::Token;

// Uniswap V3 contracts (Base Sepolia)
pub const FACTORY_ADDRESS: &str = "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24";
pub const ROUTER_ADDRESS: &str = "0x94cC0AaC535CCDB3C01d6787D6413C739ae12bc4";
pub const QUOTER_ADDRESS: &str = "0xC5290058841028F1614F3A6F0F5816cAd0df5E27";

// Token addresses (Base Sepolia)
pub const USDC_ADDRESS: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";
pub const WETH_ADDRESS: &str = "0x4200000000000000000000000000000000000006";

// Token decimals
pub const USDC_DECIMALS: u8 = 6;
pub const WETH_DECIMALS: u8 = 18;

pub static FACTORY: Lazy<Address> = Lazy::new(|| FACTORY_ADDRESS.parse().unwrap());
pub static ROUTER: Lazy<Address> = Lazy::new(|| ROUTER_ADDRESS.parse().unwrap());
pub static QUOTER: Lazy<Address> = Lazy::new(|| QUOTER_ADDRESS.parse().unwrap());
pub static USDC: Lazy<Address> = Lazy::new(|| USDC_ADDRESS.parse().unwrap());
pub static WETH: Lazy<Address> = Lazy::new(|| WETH_ADDRESS.parse().unwrap());

/// The factory returns the zero address when no pool exists for a pair/fee.
pub fn is_zero_address(address: Address) -> bool {
    address == Address::zero()
}

/// Get token address by symbol
pub fn get_token_address(symbol: &str) -> Option<Address> {
    match symbol.to_uppercase().as_str() {
        "USDC" => Some(Address::from_str(USDC_ADDRESS).unwrap()),
        "WETH" => Some(Address::from_str(WETH_ADDRESS).unwrap()),
        _ => None,
    }
}

/// The swappable token pair: USDC in, WETH out. Balances start at zero and
/// are filled in by the orchestrator's refresh.
pub fn swap_tokens() -> (Token, Token) {
    (
        Token {
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
            address: *USDC,
            decimals: USDC_DECIMALS,
            balance: "0".to_string(),
        },
        Token {
            symbol: "WETH".to_string(),
            name: "Wrapped Ethereum".to_string(),
            address: *WETH,
            decimals: WETH_DECIMALS,
            balance: "0".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_addresses() {
        assert!(get_token_address("USDC").is_some());
        assert!(get_token_address("WETH").is_some());
        assert!(get_token_address("NONEXISTENT").is_none());

        // Case insensitivity
        assert_eq!(get_token_address("usdc"), get_token_address("USDC"));
        assert_eq!(get_token_address("weth"), get_token_address("WETH"));
    }

    #[test]
    fn test_contract_addresses_parse() {
        assert!(!is_zero_address(*FACTORY));
        assert!(!is_zero_address(*ROUTER));
        assert!(!is_zero_address(*QUOTER));
        assert!(is_zero_address(Address::zero()));
    }

    #[test]
    fn test_swap_tokens() {
        let (from, to) = swap_tokens();
        assert_eq!(from.symbol, "USDC");
        assert_eq!(from.decimals, 6);
        assert_eq!(to.symbol, "WETH");
        assert_eq!(to.decimals, 18);
        assert_eq!(from.balance, "0");
    }
}
