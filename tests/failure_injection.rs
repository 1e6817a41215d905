//! Failure injection tests: routing, failover, exhaustion and health checks
//! against real sockets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use url::Url;

mod common;

#[tokio::test]
async fn test_requests_split_evenly_between_two_backends() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let proxy = common::start_proxy(common::config_for(&[a, b])).await;
    let client = common::client();

    let mut hits: HashMap<String, usize> = HashMap::new();
    for _ in 0..4 {
        let res = client.get(proxy.url("/")).send().await.expect("Proxy unreachable");
        assert_eq!(res.status(), 200);
        *hits.entry(res.text().await.unwrap()).or_default() += 1;
    }

    assert_eq!(hits.get("a"), Some(&2));
    assert_eq!(hits.get("b"), Some(&2));
}

#[tokio::test]
async fn test_dead_backend_is_skipped() {
    let a_calls = Arc::new(AtomicU32::new(0));
    let ac = a_calls.clone();
    let a = common::start_programmable_backend(move || {
        let ac = ac.clone();
        async move {
            ac.fetch_add(1, Ordering::SeqCst);
            (200, "a".into())
        }
    })
    .await;
    let b = common::start_mock_backend("b").await;

    let proxy = common::start_proxy(common::config_for(&[a, b])).await;
    let a_url = Url::parse(&format!("http://{}", a)).unwrap();
    assert!(proxy.pool.mark_backend_status(&a_url, false));

    let client = common::client();
    for _ in 0..5 {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "b");
    }
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_pool_returns_503() {
    let proxy = common::start_proxy(common::config_for(&[])).await;

    let res = common::client().get(proxy.url("/foo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unreachable_backend_marked_dead_then_503() {
    let dead = common::closed_addr().await;
    let proxy = common::start_proxy(common::config_for(&[dead])).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!proxy.pool.backends()[0].is_alive());
}

#[tokio::test]
async fn test_failover_to_live_backend() {
    let dead = common::closed_addr().await;
    let live = common::start_mock_backend("live").await;
    let proxy = common::start_proxy(common::config_for(&[dead, live])).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "live");
    assert!(!proxy.pool.backends()[0].is_alive());
    assert!(proxy.pool.backends()[1].is_alive());
}

#[tokio::test]
async fn test_backend_5xx_is_passed_through_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let backend = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (500, "boom".into())
        }
    })
    .await;
    let proxy = common::start_proxy(common::config_for(&[backend])).await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "boom");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(proxy.pool.backends()[0].is_alive());
}

#[tokio::test]
async fn test_retry_replays_request_body() {
    let backend = common::start_flaky_echo_backend(2).await;
    let proxy = common::start_proxy(common::config_for(&[backend])).await;

    let res = common::client()
        .post(proxy.url("/echo"))
        .body("hello backend")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello backend");
    assert!(proxy.pool.backends()[0].is_alive());
}

#[tokio::test]
async fn test_health_check_eviction_and_recovery() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::closed_addr().await;

    let mut config = common::config_for(&[b1, b2]);
    config.health_check.enabled = true;
    config.health_check.interval_secs = 1;
    config.health_check.timeout_secs = 1;
    let proxy = common::start_proxy(config).await;

    // The first sweep runs immediately and evicts b2.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!proxy.pool.backends()[1].is_alive());

    let client = common::client();
    for _ in 0..6 {
        let res = client.get(proxy.url("/")).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "b1");
    }

    // b2 comes up on its old port; within one interval plus one timeout it is back.
    let b2_up = Arc::new(AtomicBool::new(false));
    let listener = tokio::net::TcpListener::bind(b2).await.unwrap();
    let flag = b2_up.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            flag.store(true, Ordering::SeqCst);
            drop(socket);
        }
    });

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(proxy.pool.backends()[1].is_alive());
    assert!(b2_up.load(Ordering::SeqCst), "probe should have connected");
}

#[tokio::test]
async fn test_client_disconnect_leaves_backend_alive() {
    let (silent, accepted) = common::start_silent_backend().await;
    let mut config = common::config_for(&[silent]);
    config.timeouts.request_secs = 1;
    let proxy = common::start_proxy(config).await;

    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    stream
        .write_all(b"GET /slow HTTP/1.1\r\nHost: lb\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(stream);

    // Longer than every retry the request could have made had it kept running.
    tokio::time::sleep(Duration::from_millis(4500)).await;

    assert!(proxy.pool.backends()[0].is_alive());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
