// tests/gateway_http.rs
//! Gateway client against an in-process fake gateway.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use collectibles_notifier::backends::http::GatewayClient;
use collectibles_notifier::backends::{
    GovernanceRegistry, PoolRegistry, PoolService, RewardsLedger,
};
use collectibles_notifier::config::{AggregatorConfig, PartitionConfig};
use collectibles_notifier::types::{NeuronId, PoolId, PositionId, Principal};
use collectibles_notifier::{gateway_aggregator, RefreshOutcome, SourceCounts};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const ME: &str = "2vxsx-fae";

fn fake_gateway() -> Router {
    Router::new()
        .route(
            "/sns/{root}/neurons",
            get(|Path(root): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                if root == "broken" {
                    return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "down"})));
                }
                let me = q.get("principal").cloned().unwrap_or_default();
                let neurons = match root.as_str() {
                    "reward-root" => json!([
                        {"id": "r1", "permissions": [], "maturity_e8s_equivalent": 0},
                        {"id": "r2"}
                    ]),
                    "sns-a" => json!([
                        {"id": "m1", "maturity_e8s_equivalent": 10,
                         "permissions": [{"principal": me, "permission_type": [4, 8]}]},
                        {"id": "m2", "maturity_e8s_equivalent": 10,
                         "permissions": [{"principal": me, "permission_type": [4]}]}
                    ]),
                    _ => json!([]),
                };
                (StatusCode::OK, Json(neurons))
            }),
        )
        .route(
            "/rewards/balances",
            post(|Json(body): Json<Value>| async move {
                let ids = body["neuron_ids"].as_array().cloned().unwrap_or_default();
                let out: Vec<Value> = ids
                    .into_iter()
                    .map(|id| {
                        let balance = if id == "r1" { 5 } else { 0 };
                        json!({"neuron_id": id, "balance": balance})
                    })
                    .collect();
                Json(Value::Array(out))
            }),
        )
        .route("/pools", get(|| async { Json(json!(["pool-a"])) }))
        .route(
            "/pools/{pool}/claimed",
            get(|Path(_pool): Path<String>| async { Json(json!([1])) }),
        )
        .route(
            "/pools/{pool}/owned",
            get(|Path(_pool): Path<String>| async { Json(json!([2])) }),
        )
        .route(
            "/pools/{pool}/positions",
            get(|Query(q): Query<HashMap<String, u64>>| async move {
                let offset = q.get("offset").copied().unwrap_or(0);
                // 12 positions; ids 1 and 2 have fees on one side each
                let all: Vec<Value> = (1..=12u64)
                    .map(|id| {
                        let (f0, f1) = match id {
                            1 => (3, 0),
                            2 => (0, 9),
                            _ => (0, 0),
                        };
                        json!({"id": id, "tokens_owed0": f0, "tokens_owed1": f1})
                    })
                    .collect();
                let limit = q.get("limit").copied().unwrap_or(10);
                let page: Vec<Value> = all
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect();
                Json(Value::Array(page))
            }),
        )
}

async fn serve() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fake_gateway()).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> GatewayClient {
    GatewayClient::new(base, Duration::from_secs(2), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn client_decodes_every_route() {
    let base = serve().await;
    let gw = client(&base);
    let me = Principal::from_text(ME).unwrap();
    let pool = PoolId("pool-a".into());

    let neurons = gw.governance("sns-a").list_neurons(&me).await.unwrap();
    assert_eq!(neurons.len(), 2);

    let balances = gw
        .balances(&[NeuronId("r1".into()), NeuronId("r2".into())])
        .await
        .unwrap();
    assert_eq!(balances[0].balance, 5);
    assert_eq!(balances[1].balance, 0);

    assert_eq!(gw.list_pools().await.unwrap(), vec![pool.clone()]);
    assert_eq!(
        gw.claimed_positions(&me, &pool).await.unwrap(),
        vec![PositionId(1)]
    );
    assert_eq!(
        gw.owned_position_ids(&pool, &me).await.unwrap(),
        vec![PositionId(2)]
    );
    let page = gw.positions_page(&pool, 10, 10).await.unwrap();
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let base = serve().await;
    let gw = client(&base);
    let me = Principal::from_text(ME).unwrap();

    let err = gw
        .governance("broken")
        .list_neurons(&me)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("503"), "{err:#}");
}

#[tokio::test]
async fn gateway_aggregator_counts_end_to_end() {
    let base = serve().await;
    let cfg = AggregatorConfig {
        gateway_url: base,
        reward_partition: Some("reward-root".into()),
        partitions: vec![
            PartitionConfig {
                root: "sns-a".into(),
                name: "Alpha".into(),
            },
            PartitionConfig {
                root: "sns-empty".into(),
                name: String::new(),
            },
        ],
        ..AggregatorConfig::default()
    };
    let agg = gateway_aggregator(&cfg).unwrap();
    agg.set_identity(Some(ME.into()));

    let out = agg.refresh(false).await;
    assert_eq!(
        out,
        RefreshOutcome::Refreshed {
            count: 4,
            counts: SourceCounts {
                rewards: 1,
                fees: 2,
                maturity: 1
            }
        }
    );
}

#[tokio::test]
async fn unreachable_gateway_degrades_to_zero() {
    // nothing listens on port 1
    let cfg = AggregatorConfig {
        gateway_url: "http://127.0.0.1:1".into(),
        connect_timeout_secs: 1,
        request_timeout_secs: 1,
        reward_partition: Some("reward-root".into()),
        partitions: vec![PartitionConfig {
            root: "sns-a".into(),
            name: "Alpha".into(),
        }],
        ..AggregatorConfig::default()
    };
    let agg = gateway_aggregator(&cfg).unwrap();
    agg.set_identity(Some(ME.into()));

    let out = agg.refresh(true).await;
    assert!(matches!(out, RefreshOutcome::Refreshed { count: 0, .. }));
    assert_eq!(agg.status().error, None);
}
