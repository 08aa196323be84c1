// src/registry.rs
//! Static list of SNS partitions known to the dashboard.

use std::sync::Arc;

use crate::backends::http::GatewayClient;
use crate::backends::GovernanceRegistry;
use crate::config::AggregatorConfig;

#[derive(Clone)]
pub struct SnsPartition {
    pub root: String,
    pub name: String,
    pub governance: Arc<dyn GovernanceRegistry>,
}

#[derive(Clone, Default)]
pub struct SnsRegistry {
    partitions: Vec<SnsPartition>,
}

impl SnsRegistry {
    pub fn new(partitions: Vec<SnsPartition>) -> Self {
        Self { partitions }
    }

    /// One gateway-backed governance handle per configured partition.
    pub fn from_config(cfg: &AggregatorConfig, gateway: &GatewayClient) -> Self {
        let partitions = cfg
            .partitions
            .iter()
            .map(|p| SnsPartition {
                root: p.root.clone(),
                name: if p.name.is_empty() {
                    p.root.clone()
                } else {
                    p.name.clone()
                },
                governance: gateway.governance(&p.root),
            })
            .collect();
        Self { partitions }
    }

    pub fn partitions(&self) -> &[SnsPartition] {
        &self.partitions
    }

    pub fn get(&self, root: &str) -> Option<&SnsPartition> {
        self.partitions.iter().find(|p| p.root == root)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
