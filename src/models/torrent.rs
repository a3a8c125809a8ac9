use std::fmt;

/// Opaque torrent identifier, stable across polls (the client's info hash)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TorrentId(String);

impl TorrentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TorrentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a state counts towards the active/stalled totals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Active,
    Stalled,
    /// Queued, allocating, moving or unknown: counted in neither bucket
    Idle,
}

/// Transfer direction a state belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
    None,
}

/// Torrent status as reported by the client at sample time.
///
/// Parsed from the qBittorrent state vocabulary. Strings the client may add in
/// later versions fall back to `Unknown` rather than failing the whole poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TorrentState {
    Error,
    MissingFiles,
    Uploading,
    PausedUp,
    StoppedUp,
    QueuedUp,
    StalledUp,
    CheckingUp,
    ForcedUp,
    Allocating,
    Downloading,
    MetaDl,
    ForcedMetaDl,
    PausedDl,
    StoppedDl,
    QueuedDl,
    StalledDl,
    CheckingDl,
    ForcedDl,
    CheckingResumeData,
    Moving,
    Unknown,
}

impl TorrentState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "error" => Self::Error,
            "missingFiles" => Self::MissingFiles,
            "uploading" => Self::Uploading,
            "pausedUP" => Self::PausedUp,
            "stoppedUP" => Self::StoppedUp,
            "queuedUP" => Self::QueuedUp,
            "stalledUP" => Self::StalledUp,
            "checkingUP" => Self::CheckingUp,
            "forcedUP" => Self::ForcedUp,
            "allocating" => Self::Allocating,
            "downloading" => Self::Downloading,
            "metaDL" => Self::MetaDl,
            "forcedMetaDL" => Self::ForcedMetaDl,
            "pausedDL" => Self::PausedDl,
            "stoppedDL" => Self::StoppedDl,
            "queuedDL" => Self::QueuedDl,
            "stalledDL" => Self::StalledDl,
            "checkingDL" => Self::CheckingDl,
            "forcedDL" => Self::ForcedDl,
            "checkingResumeData" => Self::CheckingResumeData,
            "moving" => Self::Moving,
            _ => Self::Unknown,
        }
    }

    /// Fixed mapping from client state to activity bucket:
    /// downloading/seeding/checking are active, stalled/error/paused/missing
    /// files are stalled, everything else is idle.
    pub fn activity(&self) -> Activity {
        match self {
            Self::Downloading
            | Self::Uploading
            | Self::ForcedDl
            | Self::ForcedUp
            | Self::MetaDl
            | Self::ForcedMetaDl
            | Self::CheckingDl
            | Self::CheckingUp
            | Self::CheckingResumeData => Activity::Active,
            Self::StalledDl
            | Self::StalledUp
            | Self::Error
            | Self::MissingFiles
            | Self::PausedDl
            | Self::PausedUp
            | Self::StoppedDl
            | Self::StoppedUp => Activity::Stalled,
            Self::QueuedDl
            | Self::QueuedUp
            | Self::Allocating
            | Self::Moving
            | Self::Unknown => Activity::Idle,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Uploading
            | Self::StalledUp
            | Self::ForcedUp
            | Self::QueuedUp
            | Self::CheckingUp => Direction::Upload,
            Self::Downloading
            | Self::StalledDl
            | Self::ForcedDl
            | Self::QueuedDl
            | Self::CheckingDl
            | Self::MetaDl
            | Self::ForcedMetaDl => Direction::Download,
            _ => Direction::None,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            Self::PausedDl | Self::PausedUp | Self::StoppedDl | Self::StoppedUp
        )
    }
}

/// One torrent as observed at a single poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TorrentRecord {
    pub id: TorrentId,
    /// Display name, irrelevant to diffing
    pub name: String,
    pub state: TorrentState,
    /// Total payload size in bytes
    pub size: u64,
    /// Lifetime bytes downloaded
    pub downloaded_total: u64,
    /// Lifetime bytes uploaded
    pub uploaded_total: u64,
    /// Bytes per second at sample time
    pub download_speed: u64,
    pub upload_speed: u64,
}

impl TorrentRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: TorrentState) -> Self {
        Self {
            id: TorrentId::new(id),
            name: name.into(),
            state,
            size: 0,
            downloaded_total: 0,
            uploaded_total: 0,
            download_speed: 0,
            upload_speed: 0,
        }
    }

    pub fn with_totals(mut self, downloaded: u64, uploaded: u64) -> Self {
        self.downloaded_total = downloaded;
        self.uploaded_total = uploaded;
        self
    }

    pub fn with_speeds(mut self, download: u64, upload: u64) -> Self {
        self.download_speed = download;
        self.upload_speed = upload;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}
