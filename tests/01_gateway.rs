mod support;

use std::sync::Arc;
use std::time::Duration;

use etcrab::errors::StoreError;
use etcrab::gateway::{GatewayTimeouts, KvGateway};
use etcrab::store::ClientPool;
use support::MemoryDialer;

fn gateway_with_dialer() -> (Arc<MemoryDialer>, KvGateway) {
    let dialer = Arc::new(MemoryDialer::default());
    let pool = Arc::new(ClientPool::new(dialer.clone()));
    (dialer, KvGateway::new(pool))
}

#[tokio::test]
async fn list_keys_filters_by_prefix() {
    let (dialer, gateway) = gateway_with_dialer();
    dialer.seed(1, &[("/app/a", "1"), ("/app/b", "2"), ("/other", "3")]);
    let conn = support::record(1, "staging");

    let keys = gateway.list_keys(&conn, "/app").await.unwrap();
    assert_eq!(keys, vec!["/app/a", "/app/b"]);

    let all = gateway.list_keys(&conn, "").await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn get_value_returns_exact_match_or_not_found() {
    let (dialer, gateway) = gateway_with_dialer();
    dialer.seed(1, &[("/x", "hello")]);
    let conn = support::record(1, "staging");

    assert_eq!(gateway.get_value(&conn, "/x").await.unwrap(), "hello");

    let err = gateway.get_value(&conn, "/missing").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(key) if key == "/missing"));
}

#[tokio::test]
async fn set_then_delete_round_trips() {
    let (dialer, gateway) = gateway_with_dialer();
    let conn = support::record(1, "staging");

    gateway.set_value(&conn, "/x", "v1").await.unwrap();
    assert_eq!(gateway.get_value(&conn, "/x").await.unwrap(), "v1");

    gateway.delete_key(&conn, "/x").await.unwrap();
    assert!(gateway.get_value(&conn, "/x").await.is_err());

    // Deleting an absent key is not an error at this layer.
    gateway.delete_key(&conn, "/x").await.unwrap();
    assert_eq!(dialer.dials(), 1);
}

#[tokio::test]
async fn get_all_returns_keys_and_values() {
    let (dialer, gateway) = gateway_with_dialer();
    dialer.seed(1, &[("/app/a", "1"), ("/app/b", "two"), ("/other", "3")]);
    let conn = support::record(1, "staging");

    let all = gateway.get_all(&conn, "/app").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["/app/a"], "1");
    assert_eq!(all["/app/b"], "two");
}

#[tokio::test]
async fn slow_operations_surface_timeout() {
    let dialer = Arc::new(MemoryDialer::default());
    let pool = Arc::new(ClientPool::new(dialer.clone()));
    let gateway = KvGateway::with_timeouts(
        pool,
        GatewayTimeouts {
            op: Duration::from_millis(20),
            range: Duration::from_millis(20),
        },
    );

    dialer.seed(1, &[("/x", "1")]);
    let conn = support::record(1, "staging");

    // Warm the pool before injecting latency; the probe is not delayed.
    gateway.get_value(&conn, "/x").await.unwrap();

    dialer.set_op_delay(Some(Duration::from_millis(200)));
    let err = gateway.get_value(&conn, "/x").await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));

    let err = gateway.get_all(&conn, "").await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));
}

#[tokio::test]
async fn connection_failures_propagate_through_operations() {
    let (dialer, gateway) = gateway_with_dialer();
    dialer.fail_dial(true);
    let conn = support::record(1, "staging");

    let err = gateway.list_keys(&conn, "").await.unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
}

#[tokio::test]
async fn test_connection_probes_again_on_a_pooled_client() {
    let (dialer, gateway) = gateway_with_dialer();
    let conn = support::record(1, "staging");

    gateway.test_connection(&conn).await.unwrap();
    // One probe from the dial, one from the explicit re-probe.
    assert_eq!(dialer.probes(), 2);

    gateway.test_connection(&conn).await.unwrap();
    assert_eq!(dialer.dials(), 1);
    assert_eq!(dialer.probes(), 3);
}
