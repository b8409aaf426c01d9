use ethers::abi::{encode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;

use crate::constants::{ROUTER, USDC, WETH};
use crate::errors::ChainError;

/// ABI encoder for the fixed contract surface this core talks to: the
/// ERC-20 pair, the Uniswap V3 factory/quoter, and the swap router.
///
/// Everything here is pure and deterministic; the byte layout is dictated
/// by the deployed contracts and must be reproduced exactly.
pub struct SwapCodec {
    /// Pre-computed function selectors
    function_selectors: HashMap<String, [u8; 4]>,
}

impl SwapCodec {
    pub fn new() -> Self {
        let mut function_selectors = HashMap::new();

        // ERC20
        function_selectors.insert(
            "balanceOf".to_string(),
            [0x70, 0xa0, 0x82, 0x31], // balanceOf(address)
        );
        function_selectors.insert(
            "approve".to_string(),
            [0x09, 0x5e, 0xa7, 0xb3], // approve(address,uint256)
        );

        // Uniswap V3 factory
        function_selectors.insert(
            "getPool".to_string(),
            [0x16, 0x98, 0xee, 0x82], // getPool(address,address,uint24)
        );

        // Uniswap V3 QuoterV2
        function_selectors.insert(
            "quoteExactInputSingle".to_string(),
            // quoteExactInputSingle((address,address,uint256,uint24,uint160))
            [0xc6, 0xa5, 0x02, 0x6a],
        );

        // Uniswap V3 SwapRouter02 (no deadline field in the params struct)
        function_selectors.insert(
            "exactInputSingle".to_string(),
            // exactInputSingle((address,address,uint24,address,uint256,uint256,uint160))
            [0x04, 0xe4, 0x5a, 0xaf],
        );

        Self { function_selectors }
    }

    fn selector(&self, function_name: &str) -> [u8; 4] {
        *self
            .function_selectors
            .get(function_name)
            .expect("selector registered in new()")
    }

    fn encode_call(&self, function_name: &str, tokens: &[Token]) -> Bytes {
        let mut calldata = self.selector(function_name).to_vec();
        calldata.extend_from_slice(&encode(tokens));
        Bytes::from(calldata)
    }

    /// Encode ERC20 balanceOf call
    pub fn encode_balance_of(&self, account: Address) -> Bytes {
        self.encode_call("balanceOf", &[Token::Address(account)])
    }

    /// Encode ERC20 approve call
    pub fn encode_approve(&self, spender: Address, amount: U256) -> Bytes {
        self.encode_call("approve", &[Token::Address(spender), Token::Uint(amount)])
    }

    /// Encode the factory pool lookup for a pair at one fee tier
    pub fn encode_get_pool(&self, token_a: Address, token_b: Address, fee: u32) -> Bytes {
        self.encode_call(
            "getPool",
            &[
                Token::Address(token_a),
                Token::Address(token_b),
                Token::Uint(U256::from(fee)),
            ],
        )
    }

    /// Encode the quoter's exact-input-single simulation.
    /// sqrtPriceLimitX96 is fixed at zero.
    pub fn encode_quote_exact_input_single(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> Bytes {
        self.encode_call(
            "quoteExactInputSingle",
            &[Token::Tuple(vec![
                Token::Address(token_in),
                Token::Address(token_out),
                Token::Uint(amount_in),
                Token::Uint(U256::from(fee)),
                Token::Uint(U256::zero()), // sqrtPriceLimitX96
            ])],
        )
    }

    /// Encode the router's exact-input-single swap.
    /// sqrtPriceLimitX96 is fixed at zero; min_out is the only price floor.
    pub fn encode_exact_input_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee: u32,
        recipient: Address,
        amount_in: U256,
        min_out: U256,
    ) -> Bytes {
        self.encode_call(
            "exactInputSingle",
            &[Token::Tuple(vec![
                Token::Address(token_in),
                Token::Address(token_out),
                Token::Uint(U256::from(fee)),
                Token::Address(recipient),
                Token::Uint(amount_in),
                Token::Uint(min_out),
                Token::Uint(U256::zero()), // sqrtPriceLimitX96
            ])],
        )
    }

    /// Build the approve + swap calldata pair for one USDC -> WETH swap:
    /// the approval authorizes the router to spend exactly `amount_in`, and
    /// the swap sends the output to `recipient`.
    pub fn encode_approve_and_swap(
        &self,
        amount_in: U256,
        fee: u32,
        min_out: U256,
        recipient: Address,
    ) -> ApproveAndSwap {
        ApproveAndSwap {
            approve: self.encode_approve(*ROUTER, amount_in),
            swap: self.encode_exact_input_single(*USDC, *WETH, fee, recipient, amount_in, min_out),
        }
    }

    /// Get function selector for a function name
    pub fn get_function_selector(&self, function_name: &str) -> Option<[u8; 4]> {
        self.function_selectors.get(function_name).copied()
    }
}

impl Default for SwapCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// The two calls of one bundled swap operation, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveAndSwap {
    pub approve: Bytes,
    pub swap: Bytes,
}

/// Decode a single returned address word (e.g. factory getPool).
pub fn decode_address(data: &[u8]) -> Result<Address, ChainError> {
    let tokens = ethers::abi::decode(&[ParamType::Address], data)
        .map_err(|e| ChainError::Call(format!("malformed address return data: {}", e)))?;
    match tokens.into_iter().next() {
        Some(Token::Address(address)) => Ok(address),
        _ => Err(ChainError::Call("empty address return data".to_string())),
    }
}

/// Decode the first uint256 word of return data. The quoter returns
/// (amountOut, sqrtPriceX96After, initializedTicksCrossed, gasEstimate);
/// only the first word matters here.
pub fn decode_first_uint(data: &[u8]) -> Result<U256, ChainError> {
    if data.len() < 32 {
        return Err(ChainError::Call(format!(
            "return data too short for uint256: {} bytes",
            data.len()
        )));
    }
    Ok(U256::from_big_endian(&data[..32]))
}
