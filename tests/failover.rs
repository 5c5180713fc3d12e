//! End-to-end balancing, failover and probing tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn round_robin_across_live_backends() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let (addr, _pool, shutdown) = common::start_balancer(common::config_for(&[a, b])).await;

    let client = common::client();
    let mut bodies = Vec::new();
    for _ in 0..4 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        bodies.push(res.text().await.unwrap());
    }

    // Cursor starts at 0, so the first pick is index 1.
    assert_eq!(bodies, vec!["b", "a", "b", "a"]);
    shutdown.trigger();
}

#[tokio::test]
async fn failed_backend_is_demoted_and_request_served_elsewhere() {
    let y = common::start_mock_backend("Y").await;
    let x = common::closed_addr().await;
    // X sits at index 1, which the first selection lands on.
    let (addr, pool, shutdown) = common::start_balancer(common::config_for(&[y, x])).await;

    let client = common::client();
    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "Y");

    assert!(pool.backends()[0].is_live());
    assert!(!pool.backends()[1].is_live());

    for _ in 0..3 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "Y");
    }
    shutdown.trigger();
}

#[tokio::test]
async fn unresponsive_backend_times_out_and_fails_over() {
    let y = common::start_mock_backend("Y").await;
    let (h, received) = common::start_hanging_backend().await;
    // H sits at index 1, which the first selection lands on.
    let mut config = common::config_for(&[y, h]);
    config.timeouts.request_secs = 5;
    config.timeouts.upstream_ms = 200;
    let (addr, pool, shutdown) = common::start_balancer(config).await;

    let res = common::client()
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "Y");
    assert_eq!(received.load(Ordering::SeqCst), 3);
    assert!(pool.backends()[0].is_live());
    assert!(!pool.backends()[1].is_live());
    shutdown.trigger();
}

#[tokio::test]
async fn all_backends_down_yields_single_503() {
    let x = common::closed_addr().await;
    let y = common::closed_addr().await;
    let (addr, pool, shutdown) = common::start_balancer(common::config_for(&[x, y])).await;

    let client = common::client();
    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "Service unavailable");
    assert_eq!(pool.live_count(), 0);

    // Nothing live: rejected without touching any backend.
    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    shutdown.trigger();
}

#[tokio::test]
async fn http_error_status_is_not_a_transport_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let backend = common::start_programmable_backend(move |_| {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (500, "boom".to_string())
        }
    })
    .await;
    let (addr, pool, shutdown) = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client()
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "boom");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(pool.backends()[0].is_live());
    shutdown.trigger();
}

#[tokio::test]
async fn request_is_forwarded_verbatim() {
    let backend = common::start_programmable_backend(|req| async move {
        let body = format!(
            "{} {}|{}|host={}|xff={}",
            req.method,
            req.target,
            String::from_utf8_lossy(&req.body),
            req.header("host").unwrap_or("-"),
            req.header("x-forwarded-for").unwrap_or("-"),
        );
        (200, body)
    })
    .await;
    let (addr, _pool, shutdown) = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client()
        .post(format!("http://{}/orders/7?expand=items", addr))
        .header("x-request-id", "req-7")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-7");
    assert_eq!(
        res.text().await.unwrap(),
        format!(
            "POST /orders/7?expand=items|payload|host={}|xff=127.0.0.1",
            backend
        )
    );
    shutdown.trigger();
}

#[tokio::test]
async fn prober_revives_demoted_backend() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let mut config = common::config_for(&[a, b]);
    config.health_check.enabled = true;
    config.health_check.interval_secs = 1;
    let (addr, pool, shutdown) = common::start_balancer(config).await;

    // Let the immediate first tick pass before demoting.
    tokio::time::sleep(Duration::from_millis(200)).await;
    pool.backends()[1].set_live(false);
    let client = common::client();
    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "a");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(pool.backends()[1].is_live());

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        bodies.push(res.text().await.unwrap());
    }
    bodies.sort();
    assert_eq!(bodies, vec!["a", "b"]);
    shutdown.trigger();
}
