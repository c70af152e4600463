use std::{fs, io, path::Path, sync::Arc};

use futures::future::{self, BoxFuture};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{dao::storage::StorageResult, state::game::Packet};

/// Source of question packets, consumed when the owner selects one.
pub trait PacketSource: Send + Sync {
    /// Fetch a packet, `None` when the id is unknown.
    fn get_packet_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Packet>>>;
}

/// Failure while loading packets from disk.
#[derive(Debug, Error)]
pub enum PacketLoadError {
    /// File could not be read.
    #[error("failed to read packets file")]
    Read(#[from] io::Error),
    /// File is not a JSON array of packets.
    #[error("failed to parse packets file")]
    Parse(#[from] serde_json::Error),
}

/// Immutable in-process catalog, keyed by packet id in load order.
#[derive(Clone, Default)]
pub struct PacketCatalog {
    packets: Arc<IndexMap<Uuid, Packet>>,
}

impl PacketCatalog {
    /// Build a catalog from already loaded packets.
    pub fn from_packets(packets: impl IntoIterator<Item = Packet>) -> Self {
        let packets = packets
            .into_iter()
            .map(|packet| (packet.id, packet))
            .collect::<IndexMap<_, _>>();
        Self {
            packets: Arc::new(packets),
        }
    }

    /// Read a JSON array of packets.
    pub fn load(path: &Path) -> Result<Self, PacketLoadError> {
        let contents = fs::read_to_string(path)?;
        let packets: Vec<Packet> = serde_json::from_str(&contents)?;
        let catalog = Self::from_packets(packets);
        info!(path = %path.display(), count = catalog.len(), "loaded packet catalog");
        Ok(catalog)
    }

    /// Number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the catalog holds no packet.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.values()
    }
}

impl PacketSource for PacketCatalog {
    fn get_packet_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<Packet>>> {
        Box::pin(future::ready(Ok(self.packets.get(&id).cloned())))
    }
}
