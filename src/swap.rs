use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, H256, U256};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::balance::BalanceReader;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::constants::{swap_tokens, ROUTER, USDC};
use crate::dex::{FeeDiscoverer, Quoter};
use crate::encode::SwapCodec;
use crate::errors::{SubmitterError, SwapError};
use crate::retry::RetryPolicy;
use crate::types::{
    BundleReceipt, BundledCall, FeeCaps, Quote, SwapEvent, SwapRequest, SwapResult, Token,
};
use crate::utils::{format_token_amount, min_out_after_slippage, parse_token_amount};

/// The bundled-transaction relay owned by the authentication SDK. Out of
/// scope for this core; the orchestrator only drives it through this seam.
#[async_trait]
pub trait BundleSubmitter: Send + Sync {
    /// Submit the ordered calls as one atomic user operation and return a
    /// handle for it.
    async fn send_bundled_operation(
        &self,
        calls: Vec<BundledCall>,
        fee_caps: FeeCaps,
    ) -> Result<H256, SubmitterError>;

    /// Block until the operation is included and return its receipt.
    async fn await_receipt(&self, operation: H256) -> Result<BundleReceipt, SubmitterError>;
}

/// Per-session state owned by the orchestrator instance: the connected
/// account, the token pair with cached balances, and the refresh clock.
/// Created per UI session and discarded with the orchestrator on logout.
struct SwapSession {
    account: Address,
    from_token: Token,
    to_token: Token,
    from_balance: U256,
    last_balance_fetch: Option<Instant>,
}

/// Coordinates one full gasless swap: balance preflight, fee-tier
/// discovery, quote simulation, slippage floor, calldata encoding, bundled
/// submission, and post-confirmation balance refresh.
///
/// Not reentrant-safe: concurrent invocations would race on the session
/// balance cache and could submit duplicate on-chain operations, so a
/// second `swap` while one is in flight is rejected with
/// `ConcurrentOperationRejected`. Once submission has happened the
/// operation cannot be cancelled from this layer.
pub struct SwapOrchestrator {
    config: Config,
    submitter: Option<Arc<dyn BundleSubmitter>>,
    codec: SwapCodec,
    balances: BalanceReader,
    fees: FeeDiscoverer,
    quoter: Quoter,
    retry: RetryPolicy,
    session: RwLock<SwapSession>,
    busy: AtomicBool,
    event_tx: Mutex<Option<UnboundedSender<SwapEvent>>>,
}

impl SwapOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        submitter: Option<Arc<dyn BundleSubmitter>>,
        config: Config,
        account: Address,
    ) -> Self {
        let (from_token, to_token) = swap_tokens();
        let retry = RetryPolicy::new(config.max_retry_attempts);
        Self {
            submitter,
            codec: SwapCodec::new(),
            balances: BalanceReader::new(chain.clone()),
            fees: FeeDiscoverer::new(chain.clone()),
            quoter: Quoter::new(chain),
            retry,
            session: RwLock::new(SwapSession {
                account,
                from_token,
                to_token,
                from_balance: U256::zero(),
                last_balance_fetch: None,
            }),
            busy: AtomicBool::new(false),
            event_tx: Mutex::new(None),
            config,
        }
    }

    /// Open the event stream. Subscribing again replaces the previous
    /// receiver.
    pub fn subscribe(&self) -> UnboundedReceiver<SwapEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.event_tx.lock().unwrap() = Some(tx);
        rx
    }

    fn emit(&self, event: SwapEvent) {
        debug!("event: {}", event);
        let mut guard = self.event_tx.lock().unwrap();
        if let Some(tx) = guard.as_ref() {
            if tx.send(event).is_err() {
                // Receiver dropped; stop emitting until resubscribed.
                *guard = None;
            }
        }
    }

    /// Current snapshot of the session token pair, cached balances included.
    pub async fn tokens(&self) -> (Token, Token) {
        let session = self.session.read().await;
        (session.from_token.clone(), session.to_token.clone())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Input-time sufficiency check against the cached balance, for UI
    /// feedback only; the swap path re-checks with a fresh read.
    pub async fn has_sufficient_balance(&self, from_amount: &str) -> Result<bool, SwapError> {
        let session = self.session.read().await;
        let amount_in = parse_token_amount(from_amount, session.from_token.decimals)?;
        Ok(amount_in <= session.from_balance)
    }

    /// Refresh both cached token balances. Non-forced refreshes are
    /// rate-limited client-side to once per configured interval; a skipped
    /// refresh just keeps serving the stale cache. The two token reads are
    /// issued independently.
    pub async fn refresh_balances(&self, force: bool) -> Result<(), SwapError> {
        let (account, from_address, to_address) = {
            let session = self.session.read().await;
            if !force {
                if let Some(last) = session.last_balance_fetch {
                    let interval = Duration::from_secs(self.config.balance_refresh_secs);
                    if last.elapsed() < interval {
                        debug!("Rate limited: balance fetch too recent, serving cached values");
                        return Ok(());
                    }
                }
            }
            (
                session.account,
                session.from_token.address,
                session.to_token.address,
            )
        };

        let fetched_at = Instant::now();
        let (from_balance, to_balance) = futures::join!(
            self.retry
                .run(|| self.balances.read(account, Some(from_address))),
            self.retry
                .run(|| self.balances.read(account, Some(to_address))),
        );
        let from_balance = from_balance?;
        let to_balance = to_balance?;

        let (from_token, to_token) = {
            let mut session = self.session.write().await;
            session.from_balance = from_balance;
            session.from_token.balance =
                format_token_amount(from_balance, session.from_token.decimals);
            session.to_token.balance = format_token_amount(to_balance, session.to_token.decimals);
            session.last_balance_fetch = Some(fetched_at);
            (session.from_token.clone(), session.to_token.clone())
        };
        self.emit(SwapEvent::BalanceUpdated { token: from_token });
        self.emit(SwapEvent::BalanceUpdated { token: to_token });
        Ok(())
    }

    /// Read-only quote for a user-entered amount: discover a fee tier,
    /// simulate the swap, and emit `QuoteReady`. Zero output is surfaced as
    /// `NoLiquidity`; no state changes, nothing is submitted.
    pub async fn quote(&self, from_amount: &str) -> Result<Quote, SwapError> {
        let (account, from_token, to_token) = {
            let session = self.session.read().await;
            (
                session.account,
                session.from_token.clone(),
                session.to_token.clone(),
            )
        };
        let amount_in = parse_token_amount(from_amount, from_token.decimals)?;

        let pool = self
            .fees
            .discover(
                from_token.address,
                to_token.address,
                &self.config.fee_tier_candidates,
            )
            .await?
            .ok_or(SwapError::NoPoolFound)?;

        let amount_out = self
            .retry
            .run(|| {
                self.quoter.quote_exact_input(
                    amount_in,
                    from_token.address,
                    to_token.address,
                    pool.fee,
                    account,
                )
            })
            .await?;
        if amount_out.is_zero() {
            return Err(SwapError::NoLiquidity);
        }

        let quote = Quote {
            amount_in,
            amount_out,
            fee_tier: pool.fee,
        };
        self.emit(SwapEvent::QuoteReady { quote });
        Ok(quote)
    }

    /// Execute a full swap for a user-entered amount. One linear path per
    /// invocation; every failure aborts and returns the orchestrator to
    /// idle, ready for the next user-triggered attempt.
    pub async fn swap(&self, from_amount: &str) -> Result<SwapResult, SwapError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SwapError::ConcurrentOperationRejected);
        }
        let result = self.execute_swap(from_amount).await;
        self.busy.store(false, Ordering::SeqCst);
        if let Err(error) = &result {
            warn!("Swap failed: {}", error);
            self.emit(SwapEvent::SwapFailed {
                reason: error.to_string(),
            });
        }
        result
    }

    async fn execute_swap(&self, from_amount: &str) -> Result<SwapResult, SwapError> {
        let submitter = self
            .submitter
            .clone()
            .ok_or(SwapError::SubmitterUnavailable)?;

        let (account, from_token, to_token) = {
            let session = self.session.read().await;
            (
                session.account,
                session.from_token.clone(),
                session.to_token.clone(),
            )
        };
        let amount_in = parse_token_amount(from_amount, from_token.decimals)?;

        // Preflight: fresh balance read, never the cached value
        let balance = self
            .retry
            .run(|| self.balances.read(account, Some(from_token.address)))
            .await?;
        if amount_in > balance {
            return Err(SwapError::InsufficientBalance {
                required: amount_in,
                available: balance,
            });
        }

        let pool = self
            .fees
            .discover(
                from_token.address,
                to_token.address,
                &self.config.fee_tier_candidates,
            )
            .await?
            .ok_or(SwapError::NoPoolFound)?;
        info!("Using fee tier: {}", pool.fee);

        let amount_out = self
            .retry
            .run(|| {
                self.quoter.quote_exact_input(
                    amount_in,
                    from_token.address,
                    to_token.address,
                    pool.fee,
                    account,
                )
            })
            .await?;
        if amount_out.is_zero() {
            return Err(SwapError::NoLiquidity);
        }

        let min_out = min_out_after_slippage(amount_out, self.config.slippage_bps);
        info!(
            "Quote: {} wei {}; minOut ({} bps): {}",
            amount_out, to_token.symbol, self.config.slippage_bps, min_out
        );
        let request = SwapRequest {
            from_amount: from_amount.to_string(),
            fee_tier: pool.fee,
            min_out,
            caller: account,
        };

        let encoded =
            self.codec
                .encode_approve_and_swap(amount_in, request.fee_tier, request.min_out, account);
        let calls = vec![
            BundledCall::new(*USDC, encoded.approve),
            BundledCall::new(*ROUTER, encoded.swap),
        ];

        // Fee sponsorship is the submitter's concern: zero explicit caps.
        let operation = submitter
            .send_bundled_operation(calls, FeeCaps::sponsored())
            .await?;
        debug!("Bundled operation submitted: {:?}", operation);

        let receipt = submitter.await_receipt(operation).await?;
        if !receipt.success {
            return Err(SwapError::Submission(
                "user operation reverted on-chain".to_string(),
            ));
        }

        let result = SwapResult {
            id: Uuid::new_v4(),
            transaction_hash: receipt.transaction_hash,
            settled_at: Utc::now(),
        };
        info!("Transaction successful: {:?}", result.transaction_hash);
        self.emit(SwapEvent::SwapSettled {
            result: result.clone(),
        });

        // The settled swap just moved both balances; bypass the client-side
        // rate limit. A refresh failure must not fail the settled swap.
        if let Err(error) = self.refresh_balances(true).await {
            warn!("Post-swap balance refresh failed: {}", error);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WETH;
    use crate::mocks::{MockBundleSubmitter, MockChainClient};
    use crate::utils::truncate_hash;
    use std::str::FromStr;
    use tokio_test::assert_ok;

    const SEL_BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

    fn account() -> Address {
        "0x7777777777777777777777777777777777777777".parse().unwrap()
    }

    fn pool() -> Address {
        "0x8888888888888888888888888888888888888888".parse().unwrap()
    }

    /// A hash whose truncated display form is `0x1234...abcd`.
    fn tx_hash() -> H256 {
        "0x123456789000000000000000000000000000000000000000000000000000abcd"
            .parse()
            .unwrap()
    }

    fn quoted_out() -> U256 {
        U256::from_str("50000000000000000000").unwrap()
    }

    /// Mock chain for the happy path: 150 USDC balance, a pool at the 3000
    /// tier only, 50 WETH quoted out.
    fn scripted_chain() -> MockChainClient {
        MockChainClient::new()
            .with_balance(*USDC, account(), U256::from(150_000_000u64))
            .with_balance(*WETH, account(), U256::zero())
            .with_pool(3000, pool())
            .with_quote(quoted_out())
    }

    fn orchestrator(
        chain: Arc<MockChainClient>,
        submitter: Option<Arc<dyn BundleSubmitter>>,
    ) -> SwapOrchestrator {
        SwapOrchestrator::new(chain, submitter, Config::default(), account())
    }

    #[tokio::test]
    async fn test_end_to_end_swap() {
        let chain = Arc::new(scripted_chain());
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain.clone(), Some(submitter.clone()));
        let mut events = orchestrator.subscribe();

        let result = assert_ok!(orchestrator.swap("100").await);
        assert_eq!(result.transaction_hash, tx_hash());
        assert_eq!(truncate_hash(&result.transaction_hash), "0x1234...abcd");

        // Exactly one bundled operation, approve then swap, zero fee caps
        let sent = submitter.sent_operations();
        assert_eq!(sent.len(), 1);
        let (calls, fee_caps) = &sent[0];
        assert_eq!(fee_caps, &FeeCaps::sponsored());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].to, *USDC);
        assert_eq!(&calls[0].data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(calls[1].to, *ROUTER);
        assert_eq!(&calls[1].data[..4], &[0x04, 0xe4, 0x5a, 0xaf]);
        assert!(calls.iter().all(|c| c.value.is_zero()));

        // approve spends exactly amountIn = 100 USDC
        assert_eq!(
            U256::from_big_endian(&calls[0].data[36..68]),
            U256::from(100_000_000u64)
        );
        // swap carries minOut = floor(50e18 * 9950 / 10000) = 49.75e18
        assert_eq!(
            U256::from_big_endian(&calls[1].data[4 + 5 * 32..4 + 6 * 32]),
            U256::from_str("49750000000000000000").unwrap()
        );

        // Settled event, then the forced post-swap balance refresh
        assert!(matches!(
            events.recv().await,
            Some(SwapEvent::SwapSettled { .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(SwapEvent::BalanceUpdated { .. })
        ));
        let (from_token, _) = orchestrator.tokens().await;
        assert_eq!(from_token.balance, "150");
    }

    #[tokio::test]
    async fn test_insufficient_balance_aborts_before_any_other_chain_call() {
        let chain = Arc::new(
            MockChainClient::new().with_balance(*USDC, account(), U256::from(50_000_000u64)),
        );
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain.clone(), Some(submitter.clone()));

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(
            err,
            SwapError::InsufficientBalance {
                required: U256::from(100_000_000u64),
                available: U256::from(50_000_000u64),
            }
        );
        // Only the preflight balance read reached the chain
        assert_eq!(chain.recorded_selectors(), vec![SEL_BALANCE_OF]);
        assert!(submitter.sent_operations().is_empty());
    }

    #[tokio::test]
    async fn test_no_pool_found() {
        let chain = Arc::new(
            MockChainClient::new().with_balance(*USDC, account(), U256::from(150_000_000u64)),
        );
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain, Some(submitter.clone()));

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(err, SwapError::NoPoolFound);
        assert!(submitter.sent_operations().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quote_aborts_before_submission() {
        let chain = Arc::new(scripted_chain().with_quote(U256::zero()));
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain, Some(submitter.clone()));
        let mut events = orchestrator.subscribe();

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(err, SwapError::NoLiquidity);
        assert!(submitter.sent_operations().is_empty());
        assert!(matches!(
            events.recv().await,
            Some(SwapEvent::SwapFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_submitter_rejection_is_surfaced_verbatim() {
        let chain = Arc::new(scripted_chain());
        let submitter = Arc::new(MockBundleSubmitter::rejecting("AA21 didn't pay prefund"));
        let orchestrator = orchestrator(chain, Some(submitter));

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(err.to_string(), "AA21 didn't pay prefund");
    }

    #[tokio::test]
    async fn test_reverted_operation_is_a_submission_failure() {
        let chain = Arc::new(scripted_chain());
        let submitter = Arc::new(MockBundleSubmitter::reverting(tx_hash()));
        let orchestrator = orchestrator(chain, Some(submitter));

        let err = orchestrator.swap("100").await.unwrap_err();
        assert!(matches!(err, SwapError::Submission(_)));
    }

    #[tokio::test]
    async fn test_missing_submitter_is_a_typed_error() {
        let chain = Arc::new(scripted_chain());
        let orchestrator = orchestrator(chain.clone(), None);

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(err, SwapError::SubmitterUnavailable);
        assert!(chain.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_amount_is_rejected() {
        let chain = Arc::new(scripted_chain());
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain, Some(submitter));

        assert!(matches!(
            orchestrator.swap("not a number").await.unwrap_err(),
            SwapError::InvalidAmount(_)
        ));
        assert!(matches!(
            orchestrator.swap("0").await.unwrap_err(),
            SwapError::InvalidAmount(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_swap_is_rejected() {
        let chain = Arc::new(scripted_chain());
        let submitter = Arc::new(
            MockBundleSubmitter::confirming(tx_hash())
                .with_confirmation_delay(Duration::from_millis(250)),
        );
        let orchestrator = Arc::new(orchestrator(chain, Some(submitter)));

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.swap("100").await })
        };
        // Let the first swap run up to its in-flight confirmation wait
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.is_busy());

        let err = orchestrator.swap("100").await.unwrap_err();
        assert_eq!(err, SwapError::ConcurrentOperationRejected);

        // The first swap still settles normally
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.transaction_hash, tx_hash());
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_balance_read_is_retried() {
        let chain = Arc::new(scripted_chain().fail_rate_limited(2));
        let submitter = Arc::new(MockBundleSubmitter::confirming(tx_hash()));
        let orchestrator = orchestrator(chain.clone(), Some(submitter));

        let result = orchestrator.swap("100").await.unwrap();
        assert_eq!(result.transaction_hash, tx_hash());
        // Preflight read failed twice with 429 before succeeding
        let selectors = chain.recorded_selectors();
        assert_eq!(&selectors[..3], &[SEL_BALANCE_OF; 3]);
    }

    #[tokio::test]
    async fn test_quote_emits_event_and_skips_submission() {
        let chain = Arc::new(scripted_chain());
        let orchestrator = orchestrator(chain, None);
        let mut events = orchestrator.subscribe();

        let quote = orchestrator.quote("100").await.unwrap();
        assert_eq!(quote.amount_in, U256::from(100_000_000u64));
        assert_eq!(quote.amount_out, quoted_out());
        assert_eq!(quote.fee_tier, 3000);
        // 100 USDC -> 50 WETH is a rate of 0.5
        assert!((quote.rate(6, 18) - 0.5).abs() < 1e-12);
        assert!(matches!(
            events.recv().await,
            Some(SwapEvent::QuoteReady { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_refresh_is_rate_limited_client_side() {
        let chain = Arc::new(scripted_chain());
        let orchestrator = orchestrator(chain.clone(), None);

        orchestrator.refresh_balances(false).await.unwrap();
        assert_eq!(chain.recorded_calls().len(), 2);

        // Within the 30s window a non-forced refresh serves the cache
        orchestrator.refresh_balances(false).await.unwrap();
        assert_eq!(chain.recorded_calls().len(), 2);

        // A forced refresh bypasses the limit
        orchestrator.refresh_balances(true).await.unwrap();
        assert_eq!(chain.recorded_calls().len(), 4);

        // And the window expires on its own
        tokio::time::advance(Duration::from_secs(31)).await;
        orchestrator.refresh_balances(false).await.unwrap();
        assert_eq!(chain.recorded_calls().len(), 6);
    }

    #[tokio::test]
    async fn test_has_sufficient_balance_uses_cached_value() {
        let chain = Arc::new(scripted_chain());
        let orchestrator = orchestrator(chain, None);

        // Nothing fetched yet: the cache is zero
        assert!(!orchestrator.has_sufficient_balance("100").await.unwrap());

        orchestrator.refresh_balances(false).await.unwrap();
        assert!(orchestrator.has_sufficient_balance("100").await.unwrap());
        assert!(orchestrator.has_sufficient_balance("150").await.unwrap());
        assert!(!orchestrator.has_sufficient_balance("150.000001").await.unwrap());
    }

    #[tokio::test]
    async fn test_balances_formatted_with_token_decimals() {
        let chain = Arc::new(
            MockChainClient::new()
                .with_balance(*USDC, account(), U256::from(150_000_000u64))
                .with_balance(*WETH, account(), U256::from_str("500000000000000000").unwrap()),
        );
        let orchestrator = orchestrator(chain, None);

        orchestrator.refresh_balances(false).await.unwrap();
        let (from_token, to_token) = orchestrator.tokens().await;
        assert_eq!(from_token.balance, "150");
        assert_eq!(to_token.balance, "0.5");
    }
}
