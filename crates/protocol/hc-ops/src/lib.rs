//! Orchestration layer for hosted channels.
//!
//! This crate ties the foundation crates (wire, channel, store) together
//! into a node that can host or use hosted channels.
//!
//! # Module Organization
//!
//! - [`error`] - Operation error types
//! - [`config`] - TOML configuration: chain, wire limits, offered terms
//! - [`transport`] - The outbound [`Transport`] seam
//! - [`manager`] - Per-channel locking, persistence and the rounds a node starts
//! - [`dispatcher`] - Routing of inbound payloads to channel operations
//!
//! # Flow
//!
//! ```text
//! Client                              Host
//!   invoke_hosted_channel  ───────────▶
//!                          ◀─────────── init_hosted_channel
//!   state_update (0/0)     ───────────▶
//!                          ◀─────────── last_cross_signed_state
//! ```
//!
//! After opening, either side proposes updates with
//! [`ChannelManager::propose_update`]; the counterparty answers with its own
//! `state_update` and both commit. Every committed snapshot is persisted
//! before it is acknowledged.
//!
//! # Example
//!
//! ```ignore
//! use hc_ops::{ChannelManager, Dispatcher, HostedConfig};
//! use hc_store::SqliteChannelStore;
//!
//! let config = HostedConfig::load("hosted.toml")?;
//! let store = SqliteChannelStore::open(config.database_path())?;
//! let node = Dispatcher::new(ChannelManager::new(identity, config, store, transport));
//!
//! // For every payload the transport delivers:
//! let outcome = node.handle_inbound(&peer, &payload).await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod transport;

pub use config::{ChannelTerms, HostConfig, HostedConfig};
pub use dispatcher::{Dispatcher, InboundOutcome};
pub use error::{OpsError, OpsResult};
pub use manager::{ChannelManager, ChannelSlot};
pub use transport::Transport;

/// Open the SQLite channel store a configuration points at.
pub fn open_sqlite_store(config: &HostedConfig) -> OpsResult<hc_store::SqliteChannelStore> {
    let path = config.database_path();
    tracing::debug!(path = %path.display(), "opening channel store");
    Ok(hc_store::SqliteChannelStore::open(path)?)
}
