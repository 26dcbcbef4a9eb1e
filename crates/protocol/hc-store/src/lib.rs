//! Persistence for hosted channels.
//!
//! A hosted channel is stored as its negotiated terms plus the committed
//! cross-signed snapshot. Staged rounds are never written: the channel
//! aggregate only commits a snapshot after a store has accepted it.
//!
//! - [`SqliteChannelStore`]: one row per channel, replaced in a single
//!   transaction
//! - [`MemoryChannelStore`]: a map, for tests and ephemeral nodes
//!
//! # Example
//!
//! ```
//! use hc_channel::HostedChannel;
//! use hc_crypto::identity_from_seed;
//! use hc_store::{ChannelStore, SqliteChannelStore};
//! use hc_types::ChainHash;
//!
//! let (_, local) = identity_from_seed([1u8; 32]);
//! let (_, peer) = identity_from_seed([2u8; 32]);
//! let channel = HostedChannel::new(&local, peer, ChainHash::BITCOIN_MAINNET, false);
//!
//! let mut store = SqliteChannelStore::open_in_memory().unwrap();
//! store.put(&channel).unwrap();
//! assert_eq!(store.get_by_peer(&peer).unwrap(), Some(channel));
//! ```

use std::path::PathBuf;

pub mod channel;
pub mod error;
pub mod memory;
pub mod schema;
pub mod traits;

pub use channel::SqliteChannelStore;
pub use error::{Result, StoreError};
pub use memory::MemoryChannelStore;
pub use schema::{initialize_schema, SCHEMA_VERSION};
pub use traits::ChannelStore;

/// File name of the channel database inside the data directory.
pub const DATABASE_FILE: &str = "channels.db";

/// Get the default data directory for channel state.
///
/// Priority:
/// 1. `HOSTED_CHANNELS_DATA_DIR` environment variable (if set)
/// 2. Platform-specific data directory
/// 3. Fallback to `$HOME/.hosted-channels`
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOSTED_CHANNELS_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("org", "hosted-channels", "hosted-channels")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".hosted-channels")
        })
}

/// Default path of the channel database.
pub fn default_database_path() -> PathBuf {
    default_data_dir().join(DATABASE_FILE)
}
