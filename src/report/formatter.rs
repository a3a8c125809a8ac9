use crate::engine::diff::Delta;
use crate::models::torrent::TorrentRecord;
use crate::utils::format::{average_rate, format_bytes, format_duration};
use serde::Serialize;
use std::time::Duration;

pub const REPORT_TITLE: &str = "Torrent Stats";

/// Notification payload built from one delta, in display order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub header: ReportHeader,
    pub stats: StatsBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<Vec<TorrentLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<Vec<TorrentLine>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportHeader {
    pub title: String,
    pub torrent_count: usize,
    /// First report after startup, no previous snapshot to compare with
    pub baseline: bool,
    /// Time since the previous successful poll, e.g. `5m`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsBlock {
    pub active: usize,
    pub stalled: usize,
    pub seeding: usize,
    pub downloading: usize,
    pub paused: usize,
    pub downloaded_total: u64,
    pub uploaded_total: u64,
    pub downloaded_since_last: u64,
    pub uploaded_since_last: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    /// Average rates over the elapsed interval, when one is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_download_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_upload_rate: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TorrentLine {
    pub name: String,
    pub size: String,
}

impl From<&TorrentRecord> for TorrentLine {
    fn from(record: &TorrentRecord) -> Self {
        Self {
            name: record.name.clone(),
            size: format_bytes(record.size),
        }
    }
}

/// Render a delta into a report. `elapsed` is the time since the previous
/// successful poll and is `None` on the baseline cycle.
pub fn format_report(delta: &Delta, elapsed: Option<Duration>) -> Report {
    // Rates over the interval only make sense once there is a previous poll
    let elapsed = elapsed.filter(|_| !delta.baseline);

    let header = ReportHeader {
        title: REPORT_TITLE.to_string(),
        torrent_count: delta.total_count,
        baseline: delta.baseline,
        interval: elapsed.map(format_duration),
    };

    let stats = StatsBlock {
        active: delta.active_count,
        stalled: delta.stalled_count,
        seeding: delta.seeding_count,
        downloading: delta.downloading_count,
        paused: delta.paused_count,
        downloaded_total: delta.downloaded_total,
        uploaded_total: delta.uploaded_total,
        downloaded_since_last: delta.download_delta_bytes,
        uploaded_since_last: delta.upload_delta_bytes,
        download_speed: delta.current_download_speed_total,
        upload_speed: delta.current_upload_speed_total,
        average_download_rate: elapsed.map(|e| average_rate(delta.download_delta_bytes, e)),
        average_upload_rate: elapsed.map(|e| average_rate(delta.upload_delta_bytes, e)),
    };

    Report {
        header,
        stats,
        added: lines(&delta.added),
        removed: lines(&delta.removed),
    }
}

fn lines(records: &[TorrentRecord]) -> Option<Vec<TorrentLine>> {
    if records.is_empty() {
        None
    } else {
        Some(records.iter().map(TorrentLine::from).collect())
    }
}
