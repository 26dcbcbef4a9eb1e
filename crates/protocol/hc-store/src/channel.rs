//! Hosted channel storage.
//!
//! Negotiated terms and the committed snapshot are stored in their wire
//! encoding, so what is read back is exactly what both peers signed.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use hc_channel::HostedChannel;
use hc_crypto::PublicKey;
use hc_types::{ChainHash, ChannelId, ChannelPhase, NodeId};
use hc_wire::{DecodeLimits, InitHostedChannel, LastCrossSignedState, WireMessage, WireReader};

use crate::error::{Result, StoreError};
use crate::schema::initialize_schema;
use crate::traits::ChannelStore;

const SELECT_COLUMNS: &str = "SELECT channel_id, peer_id, chain_hash, is_host, phase, \
     refund_script_pub_key, init_hosted_channel, last_cross_signed_state FROM hosted_channels";

/// SQLite-based channel store.
pub struct SqliteChannelStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChannelStore {
    /// Create a new channel store with the given database connection.
    ///
    /// The schema must already be initialized.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Open (or create) a database file and initialize its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(db_path = %path.display(), "Opening channel database");
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::lock_poisoned("database connection lock poisoned"))
    }

    fn query_one(&self, clause: &str, key: &[u8]) -> Result<Option<HostedChannel>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(&format!("{SELECT_COLUMNS} {clause}"), [key], ChannelRow::from_row)
            .optional()?;
        row.map(ChannelRow::into_channel).transpose()
    }
}

/// Raw column values of one `hosted_channels` row.
struct ChannelRow {
    channel_id: Vec<u8>,
    peer_id: Vec<u8>,
    chain_hash: Vec<u8>,
    is_host: bool,
    phase: u8,
    refund_script_pub_key: Vec<u8>,
    init: Option<Vec<u8>>,
    state: Option<Vec<u8>>,
}

impl ChannelRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            channel_id: row.get(0)?,
            peer_id: row.get(1)?,
            chain_hash: row.get(2)?,
            is_host: row.get(3)?,
            phase: row.get(4)?,
            refund_script_pub_key: row.get(5)?,
            init: row.get(6)?,
            state: row.get(7)?,
        })
    }

    fn into_channel(self) -> Result<HostedChannel> {
        let phase = ChannelPhase::from_u8(self.phase)
            .map_err(|e| StoreError::invalid_data(e.to_string()))?;
        let init = self
            .init
            .as_deref()
            .map(decode_stored::<InitHostedChannel>)
            .transpose()?;
        let state = self
            .state
            .as_deref()
            .map(decode_stored::<LastCrossSignedState>)
            .transpose()?;

        Ok(HostedChannel::restore(
            ChannelId(bytes_to_array(&self.channel_id, "channel_id")?),
            PublicKey::from_bytes(bytes_to_array(&self.peer_id, "peer_id")?),
            ChainHash(bytes_to_array(&self.chain_hash, "chain_hash")?),
            self.is_host,
            self.refund_script_pub_key,
            phase,
            init,
            state,
        ))
    }
}

/// Decode a stored record, which must use every byte.
///
/// Records were encoded by this node, so the features bound is lifted to
/// whatever the length prefix can describe.
fn decode_stored<M: WireMessage>(bytes: &[u8]) -> Result<M> {
    let limits = DecodeLimits::default().with_max_features_len(u16::MAX);
    let mut reader = WireReader::with_limits(bytes, limits);
    let record = M::decode(&mut reader)?;
    if !reader.is_empty() {
        return Err(StoreError::invalid_data(format!(
            "{} trailing bytes after stored {}",
            reader.remaining(),
            M::TYPE
        )));
    }
    Ok(record)
}

fn encode_stored<M: WireMessage>(record: &M) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    record.encode(&mut buf)?;
    Ok(buf)
}

fn bytes_to_array(bytes: &[u8], field: &str) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| {
        StoreError::invalid_data(format!("{field} has {} bytes, expected 32", bytes.len()))
    })
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl ChannelStore for SqliteChannelStore {
    fn get(&self, channel_id: &ChannelId) -> Result<Option<HostedChannel>> {
        self.query_one("WHERE channel_id = ?1", channel_id.as_bytes())
    }

    fn get_by_peer(&self, peer: &NodeId) -> Result<Option<HostedChannel>> {
        self.query_one("WHERE peer_id = ?1", peer.as_bytes())
    }

    fn put(&mut self, channel: &HostedChannel) -> Result<()> {
        // Encode before touching the database so a bad record writes nothing
        let init = channel.init().map(encode_stored).transpose()?;
        let state = channel.committed().map(encode_stored).transpose()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO hosted_channels (channel_id, peer_id, chain_hash, is_host, phase,
                refund_script_pub_key, init_hosted_channel, last_cross_signed_state, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(channel_id) DO UPDATE SET
                peer_id = excluded.peer_id,
                chain_hash = excluded.chain_hash,
                is_host = excluded.is_host,
                phase = excluded.phase,
                refund_script_pub_key = excluded.refund_script_pub_key,
                init_hosted_channel = excluded.init_hosted_channel,
                last_cross_signed_state = excluded.last_cross_signed_state,
                updated_at = excluded.updated_at",
            params![
                channel.channel_id.as_bytes().as_slice(),
                channel.peer.as_bytes().as_slice(),
                channel.chain_hash.0.as_slice(),
                channel.is_host,
                channel.phase() as u8,
                channel.refund_script_pub_key,
                init,
                state,
                unix_now(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            channel_id = %channel.channel_id,
            phase = %channel.phase(),
            "channel stored"
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<HostedChannel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY channel_id"))?;
        let rows = stmt
            .query_map([], ChannelRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ChannelRow::into_channel).collect()
    }

    fn delete(&mut self, channel_id: &ChannelId) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM hosted_channels WHERE channel_id = ?1",
            [channel_id.as_bytes().as_slice()],
        )?;
        if deleted == 0 {
            return Err(StoreError::ChannelNotFound(*channel_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_crypto::identity_from_seed;

    fn setup_store() -> SqliteChannelStore {
        SqliteChannelStore::open_in_memory().unwrap()
    }

    fn negotiated_channel(seed: u8) -> HostedChannel {
        let (_, local) = identity_from_seed([1u8; 32]);
        let (_, peer) = identity_from_seed([seed; 32]);
        let mut channel = HostedChannel::new(&local, peer, ChainHash::BITCOIN_MAINNET, true);
        channel.invoke(vec![0x00, 0x14]).unwrap();
        channel
            .negotiate(InitHostedChannel {
                features: vec![0x01; 20],
                ..Default::default()
            })
            .unwrap();
        channel
    }

    #[test]
    fn test_put_and_get() {
        let mut store = setup_store();
        let channel = negotiated_channel(2);
        store.put(&channel).unwrap();

        let loaded = store.get(&channel.channel_id).unwrap().unwrap();
        assert_eq!(loaded, channel);
        assert_eq!(loaded.phase(), ChannelPhase::Negotiating);
        // features longer than the default decode bound survive storage
        assert_eq!(loaded.init().unwrap().features.len(), 20);
    }

    #[test]
    fn test_get_missing() {
        let store = setup_store();
        assert!(store.get(&ChannelId([9u8; 32])).unwrap().is_none());
    }

    #[test]
    fn test_get_by_peer() {
        let mut store = setup_store();
        let channel = negotiated_channel(3);
        store.put(&channel).unwrap();

        let loaded = store.get_by_peer(&channel.peer).unwrap().unwrap();
        assert_eq!(loaded.channel_id, channel.channel_id);
    }

    #[test]
    fn test_put_replaces() {
        let mut store = setup_store();
        let mut channel = negotiated_channel(4);
        store.put(&channel).unwrap();
        channel.close();
        store.put(&channel).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phase(), ChannelPhase::Closed);
    }

    #[test]
    fn test_list_and_delete() {
        let mut store = setup_store();
        let a = negotiated_channel(5);
        let b = negotiated_channel(6);
        store.put(&a).unwrap();
        store.put(&b).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        store.delete(&a.channel_id).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(
            store.delete(&a.channel_id),
            Err(StoreError::ChannelNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_phase_rejected() {
        let mut store = setup_store();
        let channel = negotiated_channel(7);
        store.put(&channel).unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE hosted_channels SET phase = 42", [])
            .unwrap();
        assert!(matches!(
            store.get(&channel.channel_id),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut store = setup_store();
        let channel = negotiated_channel(8);
        store.put(&channel).unwrap();
        {
            let conn = store.lock().unwrap();
            let mut init: Vec<u8> = conn
                .query_row("SELECT init_hosted_channel FROM hosted_channels", [], |row| {
                    row.get(0)
                })
                .unwrap();
            init.push(0x00);
            conn.execute("UPDATE hosted_channels SET init_hosted_channel = ?1", [init])
                .unwrap();
        }
        assert!(matches!(
            store.get(&channel.channel_id),
            Err(StoreError::InvalidData(_))
        ));
    }
}
