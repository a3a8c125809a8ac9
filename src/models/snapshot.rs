use crate::core::error::SnapshotError;
use crate::models::torrent::{TorrentId, TorrentRecord};
use std::collections::HashMap;

/// Complete set of torrents observed at one poll, keyed by id
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    torrents: HashMap<TorrentId, TorrentRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a gateway response.
    /// Fails if the same id appears twice.
    pub fn from_records(records: Vec<TorrentRecord>) -> Result<Self, SnapshotError> {
        let mut torrents = HashMap::with_capacity(records.len());

        for record in records {
            if torrents.contains_key(&record.id) {
                return Err(SnapshotError::DuplicateId(record.id.to_string()));
            }
            torrents.insert(record.id.clone(), record);
        }

        Ok(Self { torrents })
    }

    pub fn get(&self, id: &TorrentId) -> Option<&TorrentRecord> {
        self.torrents.get(id)
    }

    pub fn contains(&self, id: &TorrentId) -> bool {
        self.torrents.contains_key(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &TorrentRecord> {
        self.torrents.values()
    }

    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }
}
