use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use ethers::types::Address;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gasless_swap::chain::HttpChainClient;
use gasless_swap::config::Config;
use gasless_swap::swap::SwapOrchestrator;
use gasless_swap::utils::{format_token_amount, min_out_after_slippage};

/// Read-only quote tool: balance check, fee-tier discovery, and a simulated
/// exact-input-single quote against a live endpoint. Submission needs a
/// bundler client and is not wired here.
#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("swap-quote")
        .version("0.1.0")
        .about("Quote a gasless USDC -> WETH swap on Base Sepolia")
        .arg(
            Arg::new("account")
                .short('a')
                .long("account")
                .value_name("ADDRESS")
                .help("Smart account address to quote for")
                .required(true),
        )
        .arg(
            Arg::new("amount")
                .short('n')
                .long("amount")
                .value_name("AMOUNT")
                .help("USDC amount to swap, in display units")
                .default_value("1"),
        )
        .arg(
            Arg::new("rpc-url")
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint (overrides RPC_URL)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .get_matches();

    dotenvy::dotenv().ok();

    let log_level = matches.get_one::<String>("log-level").unwrap();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let account: Address = matches
        .get_one::<String>("account")
        .unwrap()
        .parse()
        .context("invalid account address")?;
    let amount = matches.get_one::<String>("amount").unwrap();

    let mut config = Config::from_env()?;
    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = rpc_url.clone();
    }
    info!(
        "Fee tiers {:?}, slippage {} bps, endpoint {}",
        config.fee_tier_candidates, config.slippage_bps, config.rpc_url
    );

    let chain = Arc::new(HttpChainClient::new(&config.rpc_url)?);
    let orchestrator = SwapOrchestrator::new(chain, None, config.clone(), account);

    orchestrator.refresh_balances(false).await?;
    let (from_token, to_token) = orchestrator.tokens().await;
    info!(
        "Balances: {} {}, {} {}",
        from_token.balance, from_token.symbol, to_token.balance, to_token.symbol
    );

    if !orchestrator.has_sufficient_balance(amount).await? {
        info!(
            "Note: {} {} exceeds the current balance; a swap of this size would be rejected",
            amount, from_token.symbol
        );
    }

    let quote = orchestrator.quote(amount).await?;
    let min_out = min_out_after_slippage(quote.amount_out, config.slippage_bps);
    info!(
        "Quote: {} {} -> {} {} at fee tier {}",
        amount,
        from_token.symbol,
        format_token_amount(quote.amount_out, to_token.decimals),
        to_token.symbol,
        quote.fee_tier
    );
    info!(
        "Rate: 1 {} = {:.6} {}",
        from_token.symbol,
        quote.rate(from_token.decimals, to_token.decimals),
        to_token.symbol
    );
    info!(
        "Minimum acceptable output ({} bps slippage): {} {}",
        config.slippage_bps,
        format_token_amount(min_out, to_token.decimals),
        to_token.symbol
    );

    Ok(())
}
