use crate::models::snapshot::Snapshot;
use crate::models::torrent::{Activity, Direction, TorrentRecord};

/// Difference between two consecutive snapshots.
/// Computed once per cycle, formatted and dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    /// No previous snapshot existed, so added/removed are suppressed
    pub baseline: bool,
    /// Present now, absent from the previous snapshot
    pub added: Vec<TorrentRecord>,
    /// Present previously, absent now
    pub removed: Vec<TorrentRecord>,
    pub total_count: usize,
    pub active_count: usize,
    pub stalled_count: usize,
    pub seeding_count: usize,
    pub downloading_count: usize,
    pub paused_count: usize,
    pub download_delta_bytes: u64,
    pub upload_delta_bytes: u64,
    /// Records whose counters went backwards and were clamped to zero
    pub counter_resets: usize,
    pub downloaded_total: u64,
    pub uploaded_total: u64,
    pub current_download_speed_total: u64,
    pub current_upload_speed_total: u64,
}

/// Compare the previous snapshot (if any) against the current one.
///
/// Runs in O(n) over both snapshots using id lookups. Torrents that appear for
/// the first time contribute their full counters to the transfer deltas; on
/// the baseline cycle nothing is reported as added and no deltas are counted.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Delta {
    let mut delta = Delta {
        baseline: previous.is_none(),
        total_count: current.len(),
        ..Delta::default()
    };

    for record in current.records() {
        match record.state.activity() {
            Activity::Active => delta.active_count += 1,
            Activity::Stalled => delta.stalled_count += 1,
            Activity::Idle => {}
        }
        match record.state.direction() {
            Direction::Upload => delta.seeding_count += 1,
            Direction::Download => delta.downloading_count += 1,
            Direction::None => {}
        }
        if record.state.is_paused() {
            delta.paused_count += 1;
        }

        delta.downloaded_total = delta.downloaded_total.saturating_add(record.downloaded_total);
        delta.uploaded_total = delta.uploaded_total.saturating_add(record.uploaded_total);
        delta.current_download_speed_total = delta
            .current_download_speed_total
            .saturating_add(record.download_speed);
        delta.current_upload_speed_total = delta
            .current_upload_speed_total
            .saturating_add(record.upload_speed);

        let Some(previous) = previous else {
            continue;
        };

        let (downloaded, uploaded) = match previous.get(&record.id) {
            Some(before) => {
                if record.downloaded_total < before.downloaded_total
                    || record.uploaded_total < before.uploaded_total
                {
                    delta.counter_resets += 1;
                }
                (
                    record.downloaded_total.saturating_sub(before.downloaded_total),
                    record.uploaded_total.saturating_sub(before.uploaded_total),
                )
            }
            None => {
                delta.added.push(record.clone());
                (record.downloaded_total, record.uploaded_total)
            }
        };

        delta.download_delta_bytes = delta.download_delta_bytes.saturating_add(downloaded);
        delta.upload_delta_bytes = delta.upload_delta_bytes.saturating_add(uploaded);
    }

    if let Some(previous) = previous {
        delta.removed = previous
            .records()
            .filter(|record| !current.contains(&record.id))
            .cloned()
            .collect();
    }

    sort_records(&mut delta.added);
    sort_records(&mut delta.removed);

    delta
}

fn sort_records(records: &mut [TorrentRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}
