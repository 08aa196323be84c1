// src/backends/http.rs
//! JSON gateway in front of the governance, ledger and pool canisters.
//!
//! Routes (all relative to `gateway_url`):
//! - `GET  /sns/{root}/neurons?principal=`
//! - `POST /rewards/balances` with `{"neuron_ids": [...]}`
//! - `GET  /pools`
//! - `GET  /pools/{pool}/claimed?principal=`
//! - `GET  /pools/{pool}/owned?principal=`
//! - `GET  /pools/{pool}/positions?offset=&limit=`

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{GovernanceRegistry, PoolRegistry, PoolService, RewardsLedger};
use crate::config::AggregatorConfig;
use crate::types::{Neuron, NeuronBalance, NeuronId, PoolId, PoolPosition, PositionId, Principal};

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("collectibles-notifier/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .context("building gateway http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &AggregatorConfig) -> Result<Self> {
        Self::new(
            &cfg.gateway_url,
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    /// Governance view bound to one SNS root.
    pub fn governance(&self, root: &str) -> Arc<dyn GovernanceRegistry> {
        Arc::new(GatewayGovernance {
            client: self.clone(),
            root: root.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        decode(resp, &url).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        decode(resp, &url).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{url} returned {status}: {}", body.trim()));
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("decoding response of {url}"))
}

#[async_trait]
impl RewardsLedger for GatewayClient {
    async fn balances(&self, neuron_ids: &[NeuronId]) -> Result<Vec<NeuronBalance>> {
        #[derive(Serialize)]
        struct Req<'a> {
            neuron_ids: &'a [NeuronId],
        }
        self.post_json("/rewards/balances", &Req { neuron_ids }).await
    }
}

#[async_trait]
impl PoolRegistry for GatewayClient {
    async fn list_pools(&self) -> Result<Vec<PoolId>> {
        self.get_json("/pools", &[]).await
    }

    async fn claimed_positions(
        &self,
        principal: &Principal,
        pool: &PoolId,
    ) -> Result<Vec<PositionId>> {
        let path = format!("/pools/{pool}/claimed");
        self.get_json(&path, &[("principal", principal.to_string())])
            .await
    }
}

#[async_trait]
impl PoolService for GatewayClient {
    async fn owned_position_ids(
        &self,
        pool: &PoolId,
        principal: &Principal,
    ) -> Result<Vec<PositionId>> {
        let path = format!("/pools/{pool}/owned");
        self.get_json(&path, &[("principal", principal.to_string())])
            .await
    }

    async fn positions_page(
        &self,
        pool: &PoolId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PoolPosition>> {
        let path = format!("/pools/{pool}/positions");
        self.get_json(
            &path,
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

struct GatewayGovernance {
    client: GatewayClient,
    root: String,
}

#[async_trait]
impl GovernanceRegistry for GatewayGovernance {
    async fn list_neurons(&self, principal: &Principal) -> Result<Vec<Neuron>> {
        let path = format!("/sns/{}/neurons", self.root);
        self.client
            .get_json(&path, &[("principal", principal.to_string())])
            .await
    }

    fn name(&self) -> &str {
        &self.root
    }
}
