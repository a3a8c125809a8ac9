use crate::models::snapshot::Snapshot;

/// Holds the previously observed snapshot between cycles.
///
/// Owned by the scheduler, which is the only writer, so there is no locking.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    previous: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The previous snapshot, or `None` before the first successful fetch
    pub fn get(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Replace the stored snapshot, returning the one it displaced
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.previous.replace(snapshot)
    }

    pub fn is_baseline(&self) -> bool {
        self.previous.is_none()
    }
}
