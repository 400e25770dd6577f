//! Backend API client.
//!
//! One method per endpoint of the station/metadata backend. Failures come in
//! two flavours: the request itself failed ([`ApiError::Transport`]), or the
//! backend answered with an application `{error}` payload
//! ([`ApiError::Backend`]). Callers render both as panel-local text; nothing
//! here is fatal.

use ondas_proto::config::BackendConfig;
use ondas_proto::protocol::{
    BioResponse, HistoryEntry, LyricsResponse, NowPlaying, Station, StartMonitorRequest,
    StopMonitorRequest, TopTrack, TopTracksResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("ondas/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response (connect failure,
    /// timeout, bad status, undecodable body).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered, but with an application-level error.
    #[error("{0}")]
    Backend(String),
}

/// Cleaned-up artist biography from `GET /artist/bio`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistBio {
    pub summary: String,
    pub url: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── stations ──────────────────────────────────────────────────────────────

    pub async fn stations(&self) -> Result<Vec<Station>, ApiError> {
        let resp = self
            .http
            .get(self.url("/stations"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    // ── monitoring control ────────────────────────────────────────────────────

    pub async fn monitor_start(&self, stream: &str, station_name: &str) -> Result<(), ApiError> {
        let body = StartMonitorRequest {
            stream: stream.to_string(),
            station_name: station_name.to_string(),
        };
        self.http
            .post(self.url("/monitor/start"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn monitor_stop(&self, stream: &str) -> Result<(), ApiError> {
        let body = StopMonitorRequest {
            stream: stream.to_string(),
        };
        self.http
            .post(self.url("/monitor/stop"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    // ── now playing ───────────────────────────────────────────────────────────

    pub async fn now_playing(&self, stream: &str) -> Result<NowPlaying, ApiError> {
        let resp = self
            .http
            .get(self.url("/nowplaying"))
            .query(&[("stream", stream)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Server-side play history for a stream, most recent first.
    pub async fn history(&self, stream: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        let resp = self
            .http
            .get(self.url("/history"))
            .query(&[("stream", stream)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    // ── per-track extras ──────────────────────────────────────────────────────

    pub async fn lyrics(&self, artist: &str, title: &str) -> Result<String, ApiError> {
        let resp = self
            .http
            .get(self.url("/lyrics"))
            .query(&[("artist", artist), ("title", title)])
            .send()
            .await?;
        let body: LyricsResponse = read_envelope(resp).await?;
        if let Some(error) = body.error {
            return Err(ApiError::Backend(error));
        }
        match body.lyrics {
            Some(lyrics) if !lyrics.trim().is_empty() => Ok(lyrics),
            _ => Err(ApiError::Backend("no lyrics found".to_string())),
        }
    }

    pub async fn artist_bio(&self, artist: &str) -> Result<ArtistBio, ApiError> {
        let resp = self
            .http
            .get(self.url("/artist/bio"))
            .query(&[("artist", artist)])
            .send()
            .await?;
        let body: BioResponse = read_envelope(resp).await?;
        if let Some(error) = body.error {
            return Err(ApiError::Backend(error));
        }
        match body.bio {
            Some(summary) if !summary.trim().is_empty() => Ok(ArtistBio {
                summary,
                url: body.url,
            }),
            _ => Err(ApiError::Backend("no biography found".to_string())),
        }
    }

    pub async fn top_tracks(&self, artist: &str) -> Result<Vec<TopTrack>, ApiError> {
        let resp = self
            .http
            .get(self.url("/artist/top"))
            .query(&[("artist", artist)])
            .send()
            .await?;
        let body: TopTracksResponse = read_envelope(resp).await?;
        if let Some(error) = body.error {
            return Err(ApiError::Backend(error));
        }
        Ok(body.top)
    }
}

/// Decode an extras envelope. Error envelopes ride on non-2xx responses too,
/// so a failed status still attempts the decode before giving up.
async fn read_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp.json().await?)
    } else {
        match resp.json().await {
            Ok(body) => Ok(body),
            Err(_) => Err(ApiError::Backend(format!("HTTP {}", status))),
        }
    }
}
