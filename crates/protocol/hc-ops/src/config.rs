//! Configuration types for the operations layer.
//!
//! A node's configuration is a TOML document with four parts:
//!
//! ```toml
//! chain_hash = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
//! database_path = "/var/lib/hosted/channels.db"
//!
//! [wire]
//! max_features_len = 13
//!
//! [channel]
//! channel_capacity_msat = 1000000000
//! initial_client_balance_msat = 0
//!
//! [host]
//! enabled = true
//! accepted_secrets = ["0a0b"]
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::path::{Path, PathBuf};

use hc_types::{
    ChainHash, MilliSatoshi, Satoshi, DEFAULT_CHANNEL_CAPACITY_MSAT, DEFAULT_HTLC_MINIMUM_MSAT,
    DEFAULT_INITIAL_CLIENT_BALANCE_MSAT, DEFAULT_LIABILITY_DEADLINE_BLOCKDAYS,
    DEFAULT_MAX_ACCEPTED_HTLCS, DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT,
    DEFAULT_MINIMAL_ONCHAIN_REFUND_SAT,
};
use hc_wire::{DecodeLimits, InitHostedChannel};
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};

/// Terms a Host offers in `init_hosted_channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelTerms {
    pub max_htlc_value_in_flight_msat: MilliSatoshi,
    pub htlc_minimum_msat: MilliSatoshi,
    pub max_accepted_htlcs: u16,
    pub channel_capacity_msat: MilliSatoshi,
    pub liability_deadline_blockdays: u16,
    pub minimal_onchain_refund_amount_satoshis: Satoshi,
    pub initial_client_balance_msat: MilliSatoshi,
    /// Feature bits, hex encoded
    pub features: String,
}

impl Default for ChannelTerms {
    fn default() -> Self {
        Self {
            max_htlc_value_in_flight_msat: DEFAULT_MAX_HTLC_VALUE_IN_FLIGHT_MSAT,
            htlc_minimum_msat: DEFAULT_HTLC_MINIMUM_MSAT,
            max_accepted_htlcs: DEFAULT_MAX_ACCEPTED_HTLCS,
            channel_capacity_msat: DEFAULT_CHANNEL_CAPACITY_MSAT,
            liability_deadline_blockdays: DEFAULT_LIABILITY_DEADLINE_BLOCKDAYS,
            minimal_onchain_refund_amount_satoshis: DEFAULT_MINIMAL_ONCHAIN_REFUND_SAT,
            initial_client_balance_msat: DEFAULT_INITIAL_CLIENT_BALANCE_MSAT,
            features: String::new(),
        }
    }
}

impl ChannelTerms {
    /// Build the `init_hosted_channel` message these terms describe.
    pub fn to_init(&self) -> OpsResult<InitHostedChannel> {
        let features = hex::decode(&self.features)
            .map_err(|e| OpsError::config(format!("channel.features: {e}")))?;
        Ok(InitHostedChannel {
            max_htlc_value_in_flight_msat: self.max_htlc_value_in_flight_msat,
            htlc_minimum_msat: self.htlc_minimum_msat,
            max_accepted_htlcs: self.max_accepted_htlcs,
            channel_capacity_msat: self.channel_capacity_msat,
            liability_deadline_blockdays: self.liability_deadline_blockdays,
            minimal_onchain_refund_amount_satoshis: self.minimal_onchain_refund_amount_satoshis,
            initial_client_balance_msat: self.initial_client_balance_msat,
            features,
        })
    }
}

/// Host-side behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Answer `invoke_hosted_channel` from peers.
    pub enabled: bool,
    /// Invoke secrets accepted, hex encoded. Empty means no secret is needed.
    pub accepted_secrets: Vec<String>,
}

impl HostConfig {
    /// Whether an invoke carrying `secret` may open a channel.
    pub fn accepts_secret(&self, secret: &[u8]) -> bool {
        if self.accepted_secrets.is_empty() {
            return true;
        }
        self.accepted_secrets
            .iter()
            .filter_map(|s| hex::decode(s).ok())
            .any(|accepted| accepted == secret)
    }
}

/// Configuration for a hosted channel node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    /// Genesis hash of the ledger, hex encoded.
    pub chain_hash: String,
    /// Channel database location. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Decode bounds for inbound messages.
    pub wire: DecodeLimits,
    /// Terms offered when hosting.
    pub channel: ChannelTerms,
    /// Host-side behaviour.
    pub host: HostConfig,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            chain_hash: ChainHash::BITCOIN_MAINNET.to_string(),
            database_path: None,
            wire: DecodeLimits::default(),
            channel: ChannelTerms::default(),
            host: HostConfig::default(),
        }
    }
}

impl HostedConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> OpsResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| OpsError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(OpsError::config(format!("{}: {e}", path.display()))),
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> OpsResult<String> {
        toml::to_string_pretty(self).map_err(|e| OpsError::config(e.to_string()))
    }

    /// Check every field that needs parsing.
    pub fn validate(&self) -> OpsResult<()> {
        self.chain_hash()?;
        let init = self.channel.to_init()?;
        if init.initial_client_balance_msat > init.channel_capacity_msat {
            return Err(OpsError::config(format!(
                "channel.initial_client_balance_msat {} exceeds capacity {}",
                init.initial_client_balance_msat, init.channel_capacity_msat
            )));
        }
        for secret in &self.host.accepted_secrets {
            hex::decode(secret)
                .map_err(|e| OpsError::config(format!("host.accepted_secrets: {e}")))?;
        }
        Ok(())
    }

    /// The configured ledger.
    pub fn chain_hash(&self) -> OpsResult<ChainHash> {
        ChainHash::from_hex(&self.chain_hash)
            .map_err(|e| OpsError::config(format!("chain_hash: {e}")))
    }

    /// Where the channel database lives.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(hc_store::default_database_path)
    }

    /// Set the ledger.
    pub fn with_chain_hash(mut self, chain_hash: ChainHash) -> Self {
        self.chain_hash = chain_hash.to_string();
        self
    }

    /// Set the channel database location.
    pub fn with_database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the decode bounds.
    pub fn with_wire_limits(mut self, limits: DecodeLimits) -> Self {
        self.wire = limits;
        self
    }

    /// Set the offered terms.
    pub fn with_channel_terms(mut self, terms: ChannelTerms) -> Self {
        self.channel = terms;
        self
    }

    /// Set the initial client balance offered when hosting.
    pub fn with_initial_client_balance(mut self, msat: MilliSatoshi) -> Self {
        self.channel.initial_client_balance_msat = msat;
        self
    }

    /// Enable or disable hosting.
    pub fn with_host_enabled(mut self, enabled: bool) -> Self {
        self.host.enabled = enabled;
        self
    }

    /// Accept an invoke secret.
    pub fn with_accepted_secret(mut self, secret: &[u8]) -> Self {
        self.host.accepted_secrets.push(hex::encode(secret));
        self
    }
}
