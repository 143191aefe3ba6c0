use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tokio::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_BURN_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_BURN_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_SIGNATURE_PAGE_SIZE: usize = 1_000;
pub const DEFAULT_TRANSACTION_BATCH_SIZE: usize = 25;

/// Upper bound the RPC enforces on one signature page.
pub const MAX_SIGNATURE_PAGE_SIZE: usize = 1_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cluster {
    Localnet,
    Mainnet,
    Devnet,
    Testnet,
    Custom(String),
}

impl Cluster {
    pub fn rpc_url(&self) -> String {
        match self {
            Cluster::Localnet => "http://127.0.0.1:8899".to_string(),
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com".to_string(),
            Cluster::Devnet => "https://api.devnet.solana.com".to_string(),
            Cluster::Testnet => "https://api.testnet.solana.com".to_string(),
            Cluster::Custom(url) => url.clone(),
        }
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" | "localnet" => Ok(Cluster::Localnet),
            "m" | "mainnet" => Ok(Cluster::Mainnet),
            "d" | "devnet" => Ok(Cluster::Devnet),
            "t" | "testnet" => Ok(Cluster::Testnet),
            s if s.starts_with("http://") || s.starts_with("https://") => Ok(Cluster::Custom(s.to_string())),
            _ => Err(format!(
                "Invalid cluster value: '{}'. Use l, m, d, t, or a valid RPC URL (http:// or https://)",
                s
            )),
        }
    }
}

impl TryFrom<String> for Cluster {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cluster> for String {
    fn from(cluster: Cluster) -> Self {
        match cluster {
            Cluster::Localnet => "localnet".to_string(),
            Cluster::Mainnet => "mainnet".to_string(),
            Cluster::Devnet => "devnet".to_string(),
            Cluster::Testnet => "testnet".to_string(),
            Cluster::Custom(url) => url,
        }
    }
}

/// Runtime settings for the mirror and the burn pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorConfig {
    pub cluster: Cluster,
    pub refresh_interval_secs: u64,
    pub burn_interval_secs: u64,
    pub burn_cache_ttl_secs: u64,
    pub signature_page_size: usize,
    pub transaction_batch_size: usize,
    /// Base58 owners whose unstakes are left out of burn totals.
    pub excluded_owners: Vec<String>,
    /// Rebuild network weight from a program-wide scan when the counter looks stale.
    pub reconcile_network_weight: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Mainnet,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            burn_interval_secs: DEFAULT_BURN_INTERVAL_SECS,
            burn_cache_ttl_secs: DEFAULT_BURN_CACHE_TTL_SECS,
            signature_page_size: DEFAULT_SIGNATURE_PAGE_SIZE,
            transaction_batch_size: DEFAULT_TRANSACTION_BATCH_SIZE,
            excluded_owners: Vec::new(),
            reconcile_network_weight: true,
        }
    }
}

impl MirrorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: MirrorConfig = serde_json::from_str(raw)
            .map_err(|e| anyhow!("Invalid mirror config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signature_page_size == 0 || self.signature_page_size > MAX_SIGNATURE_PAGE_SIZE {
            return Err(anyhow!(
                "signaturePageSize must be between 1 and {}, got {}",
                MAX_SIGNATURE_PAGE_SIZE,
                self.signature_page_size
            ));
        }
        if self.transaction_batch_size == 0 {
            return Err(anyhow!("transactionBatchSize must be at least 1"));
        }
        if self.refresh_interval_secs == 0 || self.burn_interval_secs == 0 {
            return Err(anyhow!("Refresh intervals must be at least one second"));
        }
        self.excluded_owner_keys()?;
        Ok(())
    }

    pub fn excluded_owner_keys(&self) -> Result<Vec<Pubkey>> {
        self.excluded_owners
            .iter()
            .map(|s| Pubkey::from_str(s).map_err(|e| anyhow!("Invalid excluded owner {}: {}", s, e)))
            .collect()
    }

    /// Nonblocking client for the configured cluster at `confirmed` commitment.
    pub fn rpc_client(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.cluster.rpc_url(), CommitmentConfig::confirmed())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn burn_interval(&self) -> Duration {
        Duration::from_secs(self.burn_interval_secs)
    }

    pub fn burn_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.burn_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = MirrorConfig::from_json("{}").unwrap();
        assert_eq!(config, MirrorConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.burn_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.signature_page_size, 1_000);
        assert_eq!(config.transaction_batch_size, 25);
    }

    #[test]
    fn test_parse_overrides() {
        let owner = Pubkey::new_unique();
        let raw = format!(
            r#"{{"cluster":"d","transactionBatchSize":5,"excludedOwners":["{}"],"reconcileNetworkWeight":false}}"#,
            owner
        );
        let config = MirrorConfig::from_json(&raw).unwrap();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.transaction_batch_size, 5);
        assert_eq!(config.excluded_owner_keys().unwrap(), vec![owner]);
        assert!(!config.reconcile_network_weight);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(MirrorConfig::from_json(r#"{"signaturePageSize":0}"#).is_err());
        assert!(MirrorConfig::from_json(r#"{"signaturePageSize":5000}"#).is_err());
        assert!(MirrorConfig::from_json(r#"{"excludedOwners":["not-a-key"]}"#).is_err());
        assert!(MirrorConfig::from_json(r#"{"cluster":"x"}"#).is_err());
    }

    #[test]
    fn test_cluster_round_trip() {
        let custom = Cluster::from_str("https://rpc.example.org").unwrap();
        assert_eq!(custom.rpc_url(), "https://rpc.example.org");
        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(serde_json::from_str::<Cluster>(&json).unwrap(), custom);
        assert_eq!(Cluster::from_str("m").unwrap().rpc_url(), "https://api.mainnet-beta.solana.com");
    }
}
