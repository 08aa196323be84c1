//! Runs the aggregator against the in-memory backend with a small scenario
//! (one reward, one pool fee, one disbursable neuron) and prints the result.

use std::sync::Arc;
use std::time::Duration;

use collectibles_notifier::backends::mock::MockBackend;
use collectibles_notifier::registry::{SnsPartition, SnsRegistry};
use collectibles_notifier::types::{Neuron, NeuronId, NeuronPermission, PoolPosition, PositionId};
use collectibles_notifier::{CollectiblesAggregator, Sources};

const ME: &str = "2vxsx-fae";

fn neuron(id: &str, maturity: u64, perms: Vec<i32>) -> Neuron {
    Neuron {
        id: NeuronId(id.into()),
        permissions: vec![NeuronPermission {
            principal: Some(ME.into()),
            permission_type: perms,
        }],
        maturity_e8s_equivalent: maturity,
        cached_neuron_stake_e8s: 1_000,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let be = MockBackend::new();
    be.set_latency(Some(Duration::from_millis(50)));

    be.set_neurons(
        "reward-root",
        ME,
        vec![neuron("r1", 0, vec![]), neuron("r2", 0, vec![])],
    );
    be.set_balance("r1", 5);
    be.set_balance("r2", 0);

    be.add_pool(
        "pool-a",
        vec![
            PoolPosition {
                id: PositionId(1),
                tokens_owed0: 3,
                tokens_owed1: 0,
            },
            PoolPosition {
                id: PositionId(2),
                tokens_owed0: 0,
                tokens_owed1: 0,
            },
        ],
    );
    be.set_claimed(ME, "pool-a", &[1]);

    be.set_neurons("sns-a", ME, vec![neuron("m1", 10, vec![8])]);

    let sources = Sources {
        reward_governance: Some(be.governance("reward-root")),
        rewards_ledger: be.clone(),
        pool_registry: be.clone(),
        pool_service: be.clone(),
        partitions: SnsRegistry::new(vec![SnsPartition {
            root: "sns-a".into(),
            name: "Alpha".into(),
            governance: be.governance("sns-a"),
        }]),
        page_size: 10,
    };
    let agg = Arc::new(CollectiblesAggregator::new(sources, Duration::from_secs(30)));

    agg.set_identity(Some(ME.into()));
    let first = agg.refresh(false).await;
    let second = agg.refresh(false).await;

    println!("first:  {}", serde_json::to_string(&first)?);
    println!("second: {}", serde_json::to_string(&second)?);
    println!("status: {}", serde_json::to_string_pretty(&agg.status())?);
    println!("cache:  {}", serde_json::to_string(&agg.cache_entry())?);
    Ok(())
}
