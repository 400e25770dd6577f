use serde::{Deserialize, Serialize};

/// A station as reported by `GET /stations`.
///
/// Identity is the (name, stream) pair; `img` is cosmetic and ignored when
/// comparing stations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Station {
    pub name: String,
    pub stream: String,
    #[serde(default)]
    pub img: Option<String>,
}

impl Station {
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            img: None,
        }
    }

    /// Same station? Compares identity (name + stream), not the image.
    pub fn is_same(&self, other: &Station) -> bool {
        self.name == other.name && self.stream == other.stream
    }
}

/// One now-playing snapshot from `GET /nowplaying?stream=`.
///
/// The backend may omit any field while it is still identifying the track,
/// so everything is defaulted. A snapshot is only valid until the next poll.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NowPlaying {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub station_name: String,
}

impl NowPlaying {
    /// Composite key used to detect song changes between polls.
    /// `None` while the backend has not identified a track.
    pub fn track_key(&self) -> Option<String> {
        if self.found {
            Some(format!("{} - {}", self.artist, self.title))
        } else {
            None
        }
    }
}

/// One entry of the server-side play history for a stream (`GET /history`).
/// Most recent first; length is bounded by the server, not the client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryEntry {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: Option<String>,
}

/// One row of an artist's top tracks (`GET /artist/top?artist=`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TopTrack {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub playcount: Option<u64>,
}

// ── request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMonitorRequest {
    pub stream: String,
    pub station_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopMonitorRequest {
    pub stream: String,
}

// ── extras response envelopes ─────────────────────────────────────────────────
//
// Each extras endpoint answers either with its datum or with an application
// `{error}` payload; both shapes decode into one envelope struct.

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LyricsResponse {
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BioResponse {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TopTracksResponse {
    #[serde(default, alias = "toptracks")]
    pub top: Vec<TopTrack>,
    #[serde(default)]
    pub error: Option<String>,
}
