pub mod gateway;
pub mod qbittorrent;
