//! Fixed catalog of selectable output formats

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a format carries audio only or video
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio-only output
    Audio,
    /// Video output
    Video,
}

/// One selectable output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct DownloadOption {
    /// Catalog id, e.g. `mp3-320`
    pub id: &'static str,
    /// Display label
    pub label: &'static str,
    /// Audio or video
    pub kind: MediaKind,
    /// Quality label, e.g. `320kbps` or `1080p`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<&'static str>,
    /// Rough output size shown next to the option
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_size: Option<&'static str>,
}

impl DownloadOption {
    /// File extension of the simulated output (the id's container prefix)
    pub fn extension(&self) -> &'static str {
        self.id.split('-').next().unwrap_or(self.id)
    }
}

/// The five formats offered to the user
pub const FORMAT_CATALOG: [DownloadOption; 5] = [
    DownloadOption {
        id: "mp3-320",
        label: "MP3 320kbps",
        kind: MediaKind::Audio,
        quality: Some("320kbps"),
        estimated_size: Some("~8 MB"),
    },
    DownloadOption {
        id: "mp3-128",
        label: "MP3 128kbps",
        kind: MediaKind::Audio,
        quality: Some("128kbps"),
        estimated_size: Some("~3 MB"),
    },
    DownloadOption {
        id: "mp4-1080",
        label: "MP4 1080p",
        kind: MediaKind::Video,
        quality: Some("1080p"),
        estimated_size: Some("~250 MB"),
    },
    DownloadOption {
        id: "mp4-720",
        label: "MP4 720p",
        kind: MediaKind::Video,
        quality: Some("720p"),
        estimated_size: Some("~120 MB"),
    },
    DownloadOption {
        id: "mp4-480",
        label: "MP4 480p",
        kind: MediaKind::Video,
        quality: Some("480p"),
        estimated_size: Some("~60 MB"),
    },
];

/// Look up a catalog entry by id
pub fn find_option(id: &str) -> Option<&'static DownloadOption> {
    FORMAT_CATALOG.iter().find(|option| option.id == id)
}

/// All entries of the given kind
pub fn options_of_kind(kind: MediaKind) -> impl Iterator<Item = &'static DownloadOption> {
    FORMAT_CATALOG
        .iter()
        .filter(move |option| option.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in FORMAT_CATALOG.iter().enumerate() {
            for b in &FORMAT_CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn lookup_finds_known_ids_only() {
        assert_eq!(find_option("mp3-320").map(|o| o.kind), Some(MediaKind::Audio));
        assert_eq!(find_option("mp4-1080").map(|o| o.label), Some("MP4 1080p"));
        assert!(find_option("flac").is_none());
        assert!(find_option("MP3-320").is_none());
    }

    #[test]
    fn extension_is_the_container_prefix() {
        assert_eq!(find_option("mp3-128").map(|o| o.extension()), Some("mp3"));
        assert_eq!(find_option("mp4-720").map(|o| o.extension()), Some("mp4"));
    }

    #[test]
    fn catalog_has_two_audio_and_three_video_entries() {
        assert_eq!(options_of_kind(MediaKind::Audio).count(), 2);
        assert_eq!(options_of_kind(MediaKind::Video).count(), 3);
    }
}
