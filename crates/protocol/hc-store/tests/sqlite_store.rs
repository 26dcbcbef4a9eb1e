//! SQLite persistence of hosted channels across reopen.

use hc_channel::{state_update_for, BalanceDelta, HostedChannel};
use hc_store::{ChannelStore, SqliteChannelStore, StoreError};
use hc_test_utils::{open_channel_pair, temp_sqlite_store, TestPeers, TEST_BLOCKDAY};
use hc_types::{ChainHash, ChannelPhase};
use hc_wire::InitHostedChannel;

fn pay_once(peers: &TestPeers, client: &mut HostedChannel, host: &mut HostedChannel) {
    let delta = BalanceDelta::pay(7_000);
    let update = host
        .propose(delta, TEST_BLOCKDAY + 1, &peers.host_keys())
        .unwrap();
    client
        .stage_update(&update, delta, &peers.client_keys())
        .unwrap();
    client.confirm_persisted().unwrap();
    host.stage_countersignature(
        &state_update_for(client.committed().unwrap()),
        &peers.host_keys(),
    )
    .unwrap();
    host.confirm_persisted().unwrap();
}

#[test]
fn committed_snapshot_survives_reopen() {
    let peers = TestPeers::new();
    let (mut client, mut host) = open_channel_pair(&peers);
    pay_once(&peers, &mut client, &mut host);

    let (mut store, dir) = temp_sqlite_store();
    store.put(&client).unwrap();
    store.put(&host).unwrap();
    drop(store);

    let reopened = SqliteChannelStore::open(dir.path().join("channels.db")).unwrap();
    let loaded = reopened.get(&client.channel_id).unwrap().unwrap();
    // both aggregates share one channel id; the later put wins
    assert_eq!(loaded, host);
    assert!(loaded.committed().unwrap().is_host);
    assert!(loaded
        .committed()
        .unwrap()
        .verify_remote_sig(&peers.client_pk));
}

#[test]
fn staged_round_is_not_persisted() {
    let peers = TestPeers::new();
    let (mut client, mut host) = open_channel_pair(&peers);
    let (mut store, _dir) = temp_sqlite_store();

    let update = host
        .propose(BalanceDelta::pay(1_000), TEST_BLOCKDAY, &peers.host_keys())
        .unwrap();
    client
        .stage_update(&update, BalanceDelta::pay(1_000), &peers.client_keys())
        .unwrap();
    assert_eq!(client.phase(), ChannelPhase::Updating);

    store.put(&client).unwrap();
    let loaded = store.get(&client.channel_id).unwrap().unwrap();
    assert_eq!(loaded.phase(), ChannelPhase::Open);
    assert!(loaded.pending().is_none());
    assert_eq!(loaded.committed(), client.committed());

    store.put(&client.committed_view().unwrap()).unwrap();
    let loaded = store.get(&client.channel_id).unwrap().unwrap();
    assert_eq!(loaded.committed().unwrap().remote_updates, 1);
}

#[test]
fn failed_put_leaves_previous_record() {
    let peers = TestPeers::new();
    let (mut store, _dir) = temp_sqlite_store();

    let mut channel = HostedChannel::new(&peers.client_pk, peers.host_pk, ChainHash::default(), false);
    channel.invoke(vec![0x51]).unwrap();
    store.put(&channel).unwrap();

    channel
        .negotiate(InitHostedChannel {
            features: vec![0u8; 70_000],
            ..Default::default()
        })
        .unwrap();
    assert!(matches!(store.put(&channel), Err(StoreError::Encode(_))));

    let loaded = store.get(&channel.channel_id).unwrap().unwrap();
    assert_eq!(loaded.phase(), ChannelPhase::Invoked);
    assert!(loaded.init().is_none());
}

#[test]
fn lookup_by_peer_and_list() {
    let peers = TestPeers::new();
    let (client, _) = open_channel_pair(&peers);
    let (mut store, _dir) = temp_sqlite_store();
    store.put(&client).unwrap();

    let by_peer = store.get_by_peer(&peers.host_pk).unwrap().unwrap();
    assert_eq!(by_peer.channel_id, client.channel_id);
    assert!(store.get_by_peer(&peers.client_pk).unwrap().is_none());
    assert_eq!(store.list().unwrap(), vec![client]);
}
