use crate::report::formatter::{Report, TorrentLine};
use crate::utils::format::{format_bytes, format_speed};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Discord blurple
pub const EMBED_COLOR: u32 = 0x5865F2;
/// Discord rejects embed field values longer than this
pub const MAX_FIELD_VALUE: usize = 1024;
/// Torrent names listed per added/removed field before summarising
pub const MAX_LISTED: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: String, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: truncate(value, MAX_FIELD_VALUE),
            inline,
        }
    }
}

/// Turn a report into a webhook body with a single embed
pub fn render(report: &Report, username: Option<&str>, timestamp: DateTime<Utc>) -> WebhookPayload {
    let stats = &report.stats;

    let mut fields = vec![
        EmbedField::new(
            "Torrents",
            format!(
                "Total: **{}**\nActive: **{}** | Stalled: **{}**\nSeeding: **{}** | Downloading: **{}** | Paused: **{}**",
                report.header.torrent_count,
                stats.active,
                stats.stalled,
                stats.seeding,
                stats.downloading,
                stats.paused
            ),
            true,
        ),
        EmbedField::new(
            "Transfer",
            format!(
                "Downloaded: **{}**\nUploaded: **{}**",
                format_bytes(stats.downloaded_total),
                format_bytes(stats.uploaded_total)
            ),
            true,
        ),
    ];

    if !report.header.baseline {
        let mut value = format!(
            "⬇ **{}**\n⬆ **{}**",
            format_bytes(stats.downloaded_since_last),
            format_bytes(stats.uploaded_since_last)
        );
        if let (Some(down), Some(up)) = (stats.average_download_rate, stats.average_upload_rate) {
            value.push_str(&format!(
                "\nAvg: ⬇ {} | ⬆ {}",
                format_speed(down),
                format_speed(up)
            ));
        }
        let name = match &report.header.interval {
            Some(interval) => format!("Since Last Poll ({})", interval),
            None => "Since Last Poll".to_string(),
        };
        fields.push(EmbedField::new(&name, value, true));
    }

    fields.push(EmbedField::new(
        "Speed",
        format!(
            "⬇ **{}**\n⬆ **{}**",
            format_speed(stats.download_speed),
            format_speed(stats.upload_speed)
        ),
        true,
    ));

    if let Some(added) = &report.added {
        fields.push(EmbedField::new(
            &format!("Added ({})", added.len()),
            list(added),
            false,
        ));
    }
    if let Some(removed) = &report.removed {
        fields.push(EmbedField::new(
            &format!("Removed ({})", removed.len()),
            list(removed),
            false,
        ));
    }

    let description = report
        .header
        .baseline
        .then(|| "Baseline snapshot taken, changes are reported from the next poll.".to_string());

    WebhookPayload {
        username: username.map(str::to_string),
        embeds: vec![Embed {
            title: report.header.title.clone(),
            description,
            color: EMBED_COLOR,
            fields,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        }],
    }
}

fn list(lines: &[TorrentLine]) -> String {
    let mut out: Vec<String> = lines
        .iter()
        .take(MAX_LISTED)
        .map(|line| format!("• {} ({})", line.name, line.size))
        .collect();

    if lines.len() > MAX_LISTED {
        out.push(format!("...and {} more", lines.len() - MAX_LISTED));
    }

    out.join("\n")
}

fn truncate(value: String, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value;
    }
    let mut truncated: String = value.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}
