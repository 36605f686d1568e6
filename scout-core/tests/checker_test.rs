use async_trait::async_trait;
use parking_lot::Mutex;
use scout_core::{
    ApiEndpoints, BalanceChecker, Chain, CheckError, CheckResult, Credential, HttpResponse,
    HttpTransport, PoolError, PooledClient, RateLimiter, Resource, ResourcePool, TransportError,
    MAX_ATTEMPTS,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Reply = Result<HttpResponse, TransportError>;

/// Replays queued replies, then repeats `fallback` forever.
struct ScriptedTransport {
    label: String,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(label: &str, script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn always(label: &str, reply: Reply) -> Arc<Self> {
        Self::new(label, Vec::new(), reply)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

fn ok(body: &str) -> Reply {
    Ok(HttpResponse::new(200, body))
}

fn dead(label: &str) -> Reply {
    Err(TransportError {
        client: label.to_string(),
        reason: "connection refused".to_string(),
    })
}

const BTC_OK: &str = r#"{"1Alpha":{"final_balance":0,"n_tx":0,"total_received":0}}"#;
const ETH_RATE_LIMITED: &str =
    r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;

fn client_pool(transports: &[Arc<ScriptedTransport>]) -> ResourcePool {
    let pool = ResourcePool::new("client");
    for t in transports {
        let transport: Arc<dyn HttpTransport> = t.clone();
        pool.add(Resource::Client(PooledClient::new(
            t.label.clone(),
            transport,
            RateLimiter::per_minute(600),
        )));
    }
    pool
}

fn credential_pool(keys: &[&str]) -> ResourcePool {
    let pool = ResourcePool::new("credential");
    for key in keys {
        pool.add(Resource::Credential(Credential::new(*key)));
    }
    pool
}

fn build_checker(keys: &[&str], transports: &[Arc<ScriptedTransport>]) -> BalanceChecker {
    BalanceChecker::new(
        credential_pool(keys),
        client_pool(transports),
        ApiEndpoints::default(),
    )
}

fn addresses(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("0x{:040x}", i)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_oversize_batch_makes_no_request() {
    let transport = ScriptedTransport::always("local", ok("{}"));
    let checker = build_checker(&["K1"], &[transport.clone()]);

    let err = checker.check(Chain::Eth, &addresses(21)).await.unwrap_err();
    assert_eq!(
        err,
        CheckError::BatchTooLarge {
            chain: "eth",
            size: 21,
            max: 20
        }
    );
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_makes_no_request() {
    let transport = ScriptedTransport::always("local", ok("{}"));
    let checker = build_checker(&[], &[transport.clone()]);

    let outcome = checker.check(Chain::Btc, &[]).await.unwrap();
    assert!(outcome.results.is_empty());
    assert!(!outcome.any_found);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_clients_are_evicted_until_one_succeeds() {
    let a = ScriptedTransport::always("a", dead("a"));
    let b = ScriptedTransport::always("b", dead("b"));
    let c = ScriptedTransport::always("c", ok(BTC_OK));
    let checker = build_checker(&[], &[a.clone(), b.clone(), c.clone()]);

    let outcome = checker
        .check(Chain::Btc, &["1Alpha".to_string()])
        .await
        .unwrap();

    assert!(!outcome.any_found);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));
    assert_eq!(checker.available_clients(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejections_exhaust_budget_without_eviction() {
    let transport = ScriptedTransport::always("local", ok(ETH_RATE_LIMITED));
    let checker = build_checker(&["K1", "K2"], &[transport.clone()]);

    let err = checker.check(Chain::Eth, &addresses(3)).await.unwrap_err();
    assert_eq!(
        err,
        CheckError::Rejected {
            endpoint: "api.etherscan.io".to_string(),
            status: "0".to_string(),
            message: "NOTOK: Max rate limit reached".to_string(),
        }
    );
    assert_eq!(transport.calls(), MAX_ATTEMPTS as usize);
    assert_eq!(checker.available_clients(), 1);
    assert_eq!(checker.available_credentials(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_credentials_rotate_between_attempts() {
    let transport = ScriptedTransport::new(
        "local",
        vec![ok(ETH_RATE_LIMITED)],
        ok(r#"{"status":"1","message":"OK","result":[]}"#),
    );
    let checker = build_checker(&["K1", "K2"], &[transport.clone()]);

    checker.check(Chain::Eth, &addresses(1)).await.unwrap();

    let urls = transport.urls.lock().clone();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].contains("apikey=K1"));
    assert!(urls[1].contains("apikey=K2"));
}

#[tokio::test(start_paused = true)]
async fn test_http_status_is_retried() {
    let transport = ScriptedTransport::new(
        "local",
        vec![Ok(HttpResponse::new(502, "bad gateway"))],
        ok(BTC_OK),
    );
    let checker = build_checker(&[], &[transport.clone()]);

    let outcome = checker.check(Chain::Btc, &["1Alpha".to_string()]).await;
    assert!(outcome.is_ok());
    assert_eq!(transport.calls(), 2);
    assert_eq!(checker.available_clients(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_error_is_reported_after_budget() {
    let transport = ScriptedTransport::always("local", Ok(HttpResponse::new(503, "")));
    let checker = build_checker(&[], &[transport.clone()]);

    let err = checker
        .check(Chain::Btc, &["1Alpha".to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CheckError::Status {
            endpoint: "blockchain.info".to_string(),
            status_code: 503
        }
    );
    assert_eq!(transport.calls(), MAX_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_terminal() {
    let transport = ScriptedTransport::always("local", ok("<html>busy</html>"));
    let checker = build_checker(&[], &[transport.clone()]);

    let err = checker
        .check(Chain::Btc, &["1Alpha".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CheckError::Decode { .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_last_client_eviction_empties_pool() {
    let transport = ScriptedTransport::always("local", dead("local"));
    let checker = build_checker(&[], &[transport.clone()]);

    let err = checker
        .check(Chain::Btc, &["1Alpha".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err, CheckError::Pool(PoolError::Empty { pool: "client" }));
    assert_eq!(transport.calls(), 1);
    assert_eq!(checker.available_clients(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_only_transport_failures_yields_no_attempt_completed() {
    let transports: Vec<_> = (0..MAX_ATTEMPTS)
        .map(|i| {
            let label = format!("p{i}");
            ScriptedTransport::always(&label, dead(&label))
        })
        .collect();
    let checker = build_checker(&[], &transports);

    let err = checker
        .check(Chain::Btc, &["1Alpha".to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CheckError::NoAttemptCompleted {
            attempts: MAX_ATTEMPTS
        }
    );
    assert!(transports.iter().all(|t| t.calls() == 1));
    assert_eq!(checker.available_clients(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_fails_before_request() {
    let transport = ScriptedTransport::always("local", ok("{}"));
    let checker = build_checker(&[], &[transport.clone()]);

    let err = checker.check(Chain::Bsc, &addresses(2)).await.unwrap_err();
    assert_eq!(
        err,
        CheckError::Pool(PoolError::Empty { pool: "credential" })
    );
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_any_found_for_multi_balance() {
    let funded = ScriptedTransport::always(
        "local",
        ok(r#"{"status":"1","message":"OK","result":[
            {"account":"0xa","balance":"0"},
            {"account":"0xb","balance":"12000000000000000000000"}
        ]}"#),
    );
    let checker = build_checker(&["K1"], &[funded]);
    let outcome = checker
        .check(Chain::Eth, &["0xa".to_string(), "0xb".to_string()])
        .await
        .unwrap();
    assert!(outcome.any_found);
    match outcome.results {
        CheckResult::Multi(accounts) => assert_eq!(accounts.len(), 2),
        other => panic!("unexpected result {:?}", other),
    }

    let empty = ScriptedTransport::always(
        "local",
        ok(r#"{"status":"1","message":"OK","result":[{"account":"0xa","balance":"000"}]}"#),
    );
    let checker = build_checker(&["K1"], &[empty]);
    let outcome = checker
        .check(Chain::Eth, &["0xa".to_string()])
        .await
        .unwrap();
    assert!(!outcome.any_found);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_checks_share_one_client() {
    let transport = ScriptedTransport::always("local", ok(BTC_OK));
    let checker = Arc::new(build_checker(&[], &[transport.clone()]));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let checker = Arc::clone(&checker);
        handles.push(tokio::spawn(async move {
            checker.check(Chain::Btc, &["1Alpha".to_string()]).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(transport.calls(), 4);
}
