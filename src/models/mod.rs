pub mod snapshot;
pub mod torrent;
