//! PlayerView: the renderable state the monitor maintains.
//!
//! The monitor event loop is the only writer; consumers take `snapshot()`
//! after a `ViewUpdated` notification. `rev` increases on every mutation so
//! consumers can detect missed updates.

use crate::api::ArtistBio;
use ondas_proto::protocol::{HistoryEntry, Station, TopTrack};
use std::sync::Arc;
use tokio::sync::RwLock;

/// State of one extras panel. Each panel fails on its own; one endpoint
/// erroring never touches the other panels.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Empty,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Panel::Empty
    }
}

impl<T> Panel<T> {
    pub fn is_settled(&self) -> bool {
        matches!(self, Panel::Ready(_) | Panel::Failed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    /// Monotonic revision counter, bumped on every mutation.
    pub rev: u64,
    pub station: Option<Station>,
    /// (artist, title) once the backend has identified the track.
    pub track: Option<(String, String)>,
    pub cover: Option<String>,
    pub lyrics: Panel<String>,
    pub bio: Panel<ArtistBio>,
    pub top_tracks: Panel<Vec<TopTrack>>,
    /// Server-side play history for the active stream, most recent first.
    pub recent: Vec<HistoryEntry>,
}

impl PlayerView {
    /// One-line song display: "artist – title", or the generic placeholder
    /// while the backend has not identified a track.
    pub fn song_line(&self) -> String {
        match &self.track {
            Some((artist, title)) => format!("{} \u{2013} {}", artist, title),
            None => "Playing...".to_string(),
        }
    }
}

/// Single-writer wrapper around the shared view.
#[derive(Default)]
pub struct ViewManager {
    view: Arc<RwLock<PlayerView>>,
}

impl ViewManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> PlayerView {
        self.view.read().await.clone()
    }

    /// Placeholder state shown immediately when monitoring of a station
    /// starts: station set, no identified track, station artwork as cover,
    /// extras and history cleared.
    pub async fn begin_station(&self, station: &Station) {
        let mut view = self.view.write().await;
        view.station = Some(station.clone());
        view.track = None;
        view.cover = station.img.clone();
        view.lyrics = Panel::Empty;
        view.bio = Panel::Empty;
        view.top_tracks = Panel::Empty;
        view.recent.clear();
        view.rev += 1;
    }

    pub async fn set_track(&self, artist: &str, title: &str, cover: Option<String>) {
        let mut view = self.view.write().await;
        view.track = Some((artist.to_string(), title.to_string()));
        view.cover = cover;
        view.rev += 1;
    }

    /// Back to the generic placeholder (track not identified this poll).
    pub async fn clear_track(&self, cover: Option<String>) {
        let mut view = self.view.write().await;
        view.track = None;
        view.cover = cover;
        view.rev += 1;
    }

    /// All three extras panels go to `Loading` together when a new track is
    /// detected; they settle independently as results arrive.
    pub async fn extras_loading(&self) {
        let mut view = self.view.write().await;
        view.lyrics = Panel::Loading;
        view.bio = Panel::Loading;
        view.top_tracks = Panel::Loading;
        view.rev += 1;
    }

    pub async fn set_lyrics(&self, panel: Panel<String>) {
        let mut view = self.view.write().await;
        view.lyrics = panel;
        view.rev += 1;
    }

    pub async fn set_bio(&self, panel: Panel<ArtistBio>) {
        let mut view = self.view.write().await;
        view.bio = panel;
        view.rev += 1;
    }

    pub async fn set_top_tracks(&self, panel: Panel<Vec<TopTrack>>) {
        let mut view = self.view.write().await;
        view.top_tracks = panel;
        view.rev += 1;
    }

    pub async fn set_recent(&self, entries: Vec<HistoryEntry>) {
        let mut view = self.view.write().await;
        view.recent = entries;
        view.rev += 1;
    }

    /// Everything back to the idle state. The revision counter survives.
    pub async fn reset(&self) {
        let mut view = self.view.write().await;
        *view = PlayerView {
            rev: view.rev + 1,
            ..Default::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station_with_img() -> Station {
        Station {
            name: "Radio Mar".into(),
            stream: "http://mar.example/live".into(),
            img: Some("http://mar.example/logo.png".into()),
        }
    }

    #[test]
    fn test_song_line_placeholder_and_track() {
        let mut view = PlayerView::default();
        assert_eq!(view.song_line(), "Playing...");

        view.track = Some(("Queen".into(), "Bohemian Rhapsody".into()));
        assert_eq!(view.song_line(), "Queen \u{2013} Bohemian Rhapsody");
    }

    #[tokio::test]
    async fn test_begin_station_sets_placeholder() {
        let views = ViewManager::new();
        views.set_lyrics(Panel::Ready("old lyrics".into())).await;

        views.begin_station(&station_with_img()).await;
        let view = views.snapshot().await;

        assert_eq!(view.station.as_ref().unwrap().name, "Radio Mar");
        assert!(view.track.is_none());
        assert_eq!(view.cover.as_deref(), Some("http://mar.example/logo.png"));
        assert_eq!(view.lyrics, Panel::Empty);
        assert!(view.recent.is_empty());
    }

    #[tokio::test]
    async fn test_rev_bumps_on_every_mutation() {
        let views = ViewManager::new();
        let r0 = views.snapshot().await.rev;

        views.begin_station(&station_with_img()).await;
        views.set_track("Queen", "Bohemian Rhapsody", None).await;
        views.extras_loading().await;
        let r1 = views.snapshot().await.rev;
        assert_eq!(r1, r0 + 3);

        views.reset().await;
        let view = views.snapshot().await;
        assert_eq!(view.rev, r1 + 1);
        assert!(view.station.is_none());
        assert_eq!(view.top_tracks, Panel::Empty);
    }

    #[tokio::test]
    async fn test_extras_settle_independently() {
        let views = ViewManager::new();
        views.extras_loading().await;
        views.set_lyrics(Panel::Failed("no lyrics found".into())).await;

        let view = views.snapshot().await;
        assert!(view.lyrics.is_settled());
        assert_eq!(view.bio, Panel::Loading);
        assert_eq!(view.top_tracks, Panel::Loading);
    }
}
