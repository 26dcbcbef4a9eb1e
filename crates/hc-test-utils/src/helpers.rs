//! Helper functions for creating test fixtures.
//!
//! Provides deterministic identities, default channel terms, channel pairs
//! already in the OPEN phase, and pre-wired nodes backed by in-memory or
//! temporary SQLite storage.

use std::sync::Once;

use hc_channel::{ChannelKeys, HostedChannel};
use hc_crypto::{identity_from_seed, PrivateKey, PublicKey};
use hc_ops::{ChannelManager, Dispatcher, HostedConfig};
use hc_store::{MemoryChannelStore, SqliteChannelStore};
use hc_types::{Blockday, ChainHash};
use hc_wire::InitHostedChannel;
use tempfile::TempDir;

use crate::MockTransport;

/// Refund script used by every fixture channel (`OP_1`).
pub const TEST_REFUND_SCRIPT: &[u8] = &[0x51];

/// Blockday at which fixture channels are established.
pub const TEST_BLOCKDAY: Blockday = 10;

/// Initial client balance in fixture terms.
pub const TEST_CLIENT_BALANCE_MSAT: u64 = 250_000_000;

/// Install a `tracing` subscriber for tests.
///
/// Honours `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Deterministic client and host identities.
pub struct TestPeers {
    pub client_key: PrivateKey,
    pub client_pk: PublicKey,
    pub host_key: PrivateKey,
    pub host_pk: PublicKey,
}

impl Default for TestPeers {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPeers {
    pub fn new() -> Self {
        let (client_key, client_pk) = identity_from_seed([11u8; 32]);
        let (host_key, host_pk) = identity_from_seed([12u8; 32]);
        Self {
            client_key,
            client_pk,
            host_key,
            host_pk,
        }
    }

    /// Keys the client signs and verifies with.
    pub fn client_keys(&self) -> ChannelKeys<'_> {
        ChannelKeys::new(&self.client_key, &self.host_pk)
    }

    /// Keys the host signs and verifies with.
    pub fn host_keys(&self) -> ChannelKeys<'_> {
        ChannelKeys::new(&self.host_key, &self.client_pk)
    }
}

/// Channel terms used by fixtures.
pub fn test_init() -> InitHostedChannel {
    InitHostedChannel {
        initial_client_balance_msat: TEST_CLIENT_BALANCE_MSAT,
        ..Default::default()
    }
}

/// A client and a host aggregate, both OPEN on the same first snapshot.
///
/// # Panics
///
/// Panics if any opening step fails, which means the fixture itself is broken.
pub fn open_channel_pair(peers: &TestPeers) -> (HostedChannel, HostedChannel) {
    let mut client = HostedChannel::new(&peers.client_pk, peers.host_pk, ChainHash::default(), false);
    let mut host = HostedChannel::new(&peers.host_pk, peers.client_pk, ChainHash::default(), true);
    for channel in [&mut client, &mut host] {
        channel
            .invoke(TEST_REFUND_SCRIPT.to_vec())
            .expect("invoke fixture channel");
        channel.negotiate(test_init()).expect("negotiate fixture channel");
    }

    let from_client = client
        .sign_initial(TEST_BLOCKDAY, &peers.client_keys())
        .expect("client initial signature");
    let from_host = host
        .sign_initial(TEST_BLOCKDAY, &peers.host_keys())
        .expect("host initial signature");
    host.establish(&from_client, &peers.host_keys())
        .expect("host establishes");
    client
        .establish(&from_host, &peers.client_keys())
        .expect("client establishes");
    (client, host)
}

/// Host-side configuration matching the fixture terms.
pub fn test_host_config() -> HostedConfig {
    HostedConfig::default()
        .with_chain_hash(ChainHash::default())
        .with_host_enabled(true)
        .with_initial_client_balance(TEST_CLIENT_BALANCE_MSAT)
}

/// Client-side configuration on the fixture chain.
pub fn test_client_config() -> HostedConfig {
    HostedConfig::default().with_chain_hash(ChainHash::default())
}

/// A node backed by in-memory storage and a recording transport.
pub fn test_node(
    identity: PrivateKey,
    config: HostedConfig,
) -> (Dispatcher<MemoryChannelStore, MockTransport>, MockTransport) {
    let transport = MockTransport::new();
    let manager = ChannelManager::new(identity, config, MemoryChannelStore::new(), transport.clone());
    manager.set_blockday(TEST_BLOCKDAY);
    (Dispatcher::new(manager), transport)
}

/// A SQLite channel store in a fresh temporary directory.
///
/// The directory must outlive the store.
pub fn temp_sqlite_store() -> (SqliteChannelStore, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = SqliteChannelStore::open(dir.path().join("channels.db")).expect("open store");
    (store, dir)
}
