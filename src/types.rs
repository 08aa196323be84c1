// src/types.rs
use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual principal of the acting user, e.g. `"2vxsx-fae"`.
///
/// Only the shape is validated (lowercase base32 groups separated by dashes);
/// the checksum is the backends' business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub const MAX_TEXT_LEN: usize = 63;

    pub fn from_text(text: &str) -> Result<Self> {
        static RE: OnceCell<regex::Regex> = OnceCell::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"^[a-z2-7]{1,5}(-[a-z2-7]{1,5})*$").expect("principal regex")
        });

        let t = text.trim();
        if t.is_empty() {
            return Err(anyhow!("principal is empty"));
        }
        if t.len() > Self::MAX_TEXT_LEN {
            return Err(anyhow!("principal '{t}' exceeds {} chars", Self::MAX_TEXT_LEN));
        }
        if !re.is_match(t) {
            return Err(anyhow!("principal '{t}' is not a valid textual principal"));
        }
        Ok(Self(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded SNS neuron id (subaccount bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeuronId(pub String);

/// SNS neuron permission codes. Only the ones we look at are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum NeuronPermissionType {
    Disburse = 5,
    DisburseMaturity = 8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronPermission {
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub permission_type: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neuron {
    pub id: NeuronId,
    #[serde(default)]
    pub permissions: Vec<NeuronPermission>,
    #[serde(default)]
    pub maturity_e8s_equivalent: u64,
    #[serde(default)]
    pub cached_neuron_stake_e8s: u64,
}

impl Neuron {
    /// True when `principal` holds `perm` on this neuron.
    pub fn grants(&self, principal: &Principal, perm: NeuronPermissionType) -> bool {
        self.permissions.iter().any(|p| {
            p.principal.as_deref() == Some(principal.as_str())
                && p.permission_type.contains(&(perm as i32))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronBalance {
    pub neuron_id: NeuronId,
    pub balance: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub u64);

/// One liquidity position as listed by a pool; `tokens_owed*` are uncollected fees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPosition {
    pub id: PositionId,
    #[serde(default)]
    pub tokens_owed0: u128,
    #[serde(default)]
    pub tokens_owed1: u128,
}

impl PoolPosition {
    pub fn has_uncollected_fees(&self) -> bool {
        self.tokens_owed0 > 0 || self.tokens_owed1 > 0
    }
}
