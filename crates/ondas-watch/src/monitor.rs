//! MonitorCore: single-owner event loop for now-playing monitoring.
//!
//! All mutable monitor state (active station, poll session, track gate)
//! lives in MonitorCore and is touched only inside `run()`. Every input is a
//! `MonitorEvent` on one mpsc channel: commands from the handle, ticks from
//! the poll ticker task, and results posted back by spawned fetch tasks.
//! After each mutation the loop notifies listeners on a broadcast channel;
//! the view itself is read through the shared `ViewManager`.
//!
//! Each start/stop bumps a session counter. Every spawned tick and fetch
//! carries the session it was issued under, and the loop drops anything
//! stale, so a response from a previous stream can never land after a
//! switch or a stop.

use crate::api::{ApiClient, ApiError, ArtistBio};
use crate::view::{Panel, ViewManager};
use ondas_proto::protocol::{HistoryEntry, NowPlaying, Station, TopTrack};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

// ── messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum MonitorCommand {
    /// Watch a station. Implicitly stops the previous one first.
    Start(Station),
    /// End monitoring and return to idle.
    Stop,
}

/// All inputs into the MonitorCore loop.
#[derive(Debug)]
pub enum MonitorEvent {
    Command(MonitorCommand),
    /// Ticker fired; poll the now-playing endpoint.
    PollTick { session: u64 },
    /// Result of a now-playing poll.
    Snapshot {
        session: u64,
        result: Result<NowPlaying, ApiError>,
    },
    /// Result of a server-side history fetch.
    Recent {
        session: u64,
        result: Result<Vec<HistoryEntry>, ApiError>,
    },
    Lyrics {
        session: u64,
        key: String,
        result: Result<String, ApiError>,
    },
    Bio {
        session: u64,
        key: String,
        result: Result<ArtistBio, ApiError>,
    },
    TopTracks {
        session: u64,
        key: String,
        result: Result<Vec<TopTrack>, ApiError>,
    },
    /// Exit the event loop.
    Shutdown,
}

/// Notifications broadcast to consumers after the view mutates.
#[derive(Debug, Clone)]
pub enum MonitorUpdate {
    /// The PlayerView changed; fetch it from the ViewManager.
    ViewUpdated,
    /// The displayed track changed (None = no identified track).
    TrackChanged(Option<String>),
    /// Monitoring ended; the view is back to idle.
    Stopped,
}

/// Cheap clonable way to drive the loop from elsewhere.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorEvent>,
}

impl MonitorHandle {
    pub async fn start(&self, station: Station) {
        let _ = self
            .tx
            .send(MonitorEvent::Command(MonitorCommand::Start(station)))
            .await;
    }

    pub async fn stop(&self) {
        let _ = self
            .tx
            .send(MonitorEvent::Command(MonitorCommand::Stop))
            .await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(MonitorEvent::Shutdown).await;
    }
}

// ── MonitorCore ───────────────────────────────────────────────────────────────

pub struct MonitorCore {
    api: Arc<ApiClient>,
    views: Arc<ViewManager>,
    update_tx: broadcast::Sender<MonitorUpdate>,
    /// Clone handed to every spawned task so results come back as events.
    event_tx: mpsc::Sender<MonitorEvent>,
    poll_interval: Duration,
    /// Bumped on every start/stop; events from older sessions are dropped.
    session: u64,
    active: Option<Station>,
    /// Track-key gate: extras are only re-fetched when this changes.
    last_track_key: Option<String>,
    /// Live poll ticker. At most one at any time.
    ticker: Option<AbortHandle>,
}

impl MonitorCore {
    pub fn new(
        api: Arc<ApiClient>,
        views: Arc<ViewManager>,
        update_tx: broadcast::Sender<MonitorUpdate>,
        event_tx: mpsc::Sender<MonitorEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            views,
            update_tx,
            event_tx,
            poll_interval,
            session: 0,
            active: None,
            last_track_key: None,
            ticker: None,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            tx: self.event_tx.clone(),
        }
    }

    /// Run the event loop. Returns when `Shutdown` arrives or every sender
    /// is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<MonitorEvent>) {
        info!("MonitorCore: starting event loop");

        loop {
            let event = event_rx.recv().await;
            match event {
                None => {
                    info!("MonitorCore: event channel closed");
                    break;
                }
                Some(MonitorEvent::Shutdown) => {
                    info!("MonitorCore: shutdown requested");
                    break;
                }
                Some(MonitorEvent::Command(cmd)) => self.handle_command(cmd).await,
                Some(MonitorEvent::PollTick { session }) => self.handle_tick(session),
                Some(MonitorEvent::Snapshot { session, result }) => {
                    self.handle_snapshot(session, result).await
                }
                Some(MonitorEvent::Recent { session, result }) => {
                    self.handle_recent(session, result).await
                }
                Some(MonitorEvent::Lyrics {
                    session,
                    key,
                    result,
                }) => {
                    if self.extras_current(session, &key) {
                        let panel = match result {
                            Ok(text) => Panel::Ready(text),
                            Err(e) => Panel::Failed(e.to_string()),
                        };
                        self.views.set_lyrics(panel).await;
                        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
                    }
                }
                Some(MonitorEvent::Bio {
                    session,
                    key,
                    result,
                }) => {
                    if self.extras_current(session, &key) {
                        let panel = match result {
                            Ok(bio) => Panel::Ready(bio),
                            Err(e) => Panel::Failed(e.to_string()),
                        };
                        self.views.set_bio(panel).await;
                        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
                    }
                }
                Some(MonitorEvent::TopTracks {
                    session,
                    key,
                    result,
                }) => {
                    if self.extras_current(session, &key) {
                        let panel = match result {
                            Ok(tracks) if tracks.is_empty() => {
                                Panel::Failed("no top tracks available".to_string())
                            }
                            Ok(tracks) => Panel::Ready(tracks),
                            Err(e) => Panel::Failed(e.to_string()),
                        };
                        self.views.set_top_tracks(panel).await;
                        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
                    }
                }
            }
        }

        self.end_active_monitoring();
    }

    // ── commands ──────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: MonitorCommand) {
        match cmd {
            MonitorCommand::Start(station) => self.start(station).await,
            MonitorCommand::Stop => self.stop().await,
        }
    }

    async fn start(&mut self, station: Station) {
        info!("MonitorCore: start '{}'", station.name);
        self.end_active_monitoring();
        self.active = Some(station.clone());

        // Placeholder state right away; the first poll fills it in.
        self.views.begin_station(&station).await;
        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
        let _ = self.update_tx.send(MonitorUpdate::TrackChanged(None));

        // Server-side monitoring begins; failure is logged and polling
        // proceeds regardless.
        let api = self.api.clone();
        let stream = station.stream.clone();
        let name = station.name.clone();
        tokio::spawn(async move {
            if let Err(e) = api.monitor_start(&stream, &name).await {
                warn!("monitor start request failed for '{}': {}", name, e);
            }
        });

        self.spawn_ticker();
    }

    async fn stop(&mut self) {
        info!("MonitorCore: stop");
        self.end_active_monitoring();
        self.views.reset().await;
        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
        let _ = self.update_tx.send(MonitorUpdate::Stopped);
    }

    /// Shared teardown for stop, station switch and loop exit: one stop
    /// request for the active stream (fire-and-forget), ticker cancelled,
    /// session bumped, gate cleared. Local state is cleared whether or not
    /// the stop request succeeds.
    fn end_active_monitoring(&mut self) {
        if let Some(prev) = self.active.take() {
            let api = self.api.clone();
            tokio::spawn(async move {
                if let Err(e) = api.monitor_stop(&prev.stream).await {
                    warn!("monitor stop request failed for '{}': {}", prev.name, e);
                }
            });
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.session = self.session.wrapping_add(1);
        self.last_track_key = None;
    }

    // ── polling ───────────────────────────────────────────────────────────────

    fn spawn_ticker(&mut self) {
        let session = self.session;
        let tx = self.event_tx.clone();
        let period = self.poll_interval;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                // First tick completes immediately: one poll right away,
                // then one per period.
                interval.tick().await;
                if tx.send(MonitorEvent::PollTick { session }).await.is_err() {
                    break;
                }
            }
        });
        self.ticker = Some(task.abort_handle());
    }

    fn handle_tick(&mut self, session: u64) {
        if session != self.session {
            debug!("MonitorCore: dropping stale tick");
            return;
        }
        let Some(station) = self.active.as_ref() else {
            return;
        };

        let api = self.api.clone();
        let tx = self.event_tx.clone();
        let stream = station.stream.clone();
        tokio::spawn(async move {
            let result = api.now_playing(&stream).await;
            let _ = tx.send(MonitorEvent::Snapshot { session, result }).await;
        });
    }

    async fn handle_snapshot(&mut self, session: u64, result: Result<NowPlaying, ApiError>) {
        if session != self.session {
            debug!("MonitorCore: dropping stale snapshot");
            return;
        }
        let Some(station) = self.active.clone() else {
            return;
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Degrade silently: the view keeps its last state.
                warn!("now-playing poll failed for '{}': {}", station.name, e);
                return;
            }
        };

        // History refreshes on every successful poll, track change or not.
        self.spawn_recent_fetch(session, &station.stream);

        match snapshot.track_key() {
            Some(key) => {
                let cover = snapshot.cover.clone().or_else(|| station.img.clone());
                self.views
                    .set_track(&snapshot.artist, &snapshot.title, cover)
                    .await;

                if self.last_track_key.as_deref() != Some(key.as_str()) {
                    info!("MonitorCore: track change '{}'", key);
                    self.last_track_key = Some(key.clone());
                    let _ = self
                        .update_tx
                        .send(MonitorUpdate::TrackChanged(Some(key.clone())));
                    self.spawn_extras_fetch(session, key, snapshot.artist, snapshot.title)
                        .await;
                }
            }
            None => {
                // Unidentified this poll; generic placeholder, station
                // artwork, gate untouched.
                self.views.clear_track(station.img.clone()).await;
            }
        }

        let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
    }

    async fn handle_recent(&mut self, session: u64, result: Result<Vec<HistoryEntry>, ApiError>) {
        if session != self.session {
            return;
        }
        match result {
            Ok(entries) => {
                self.views.set_recent(entries).await;
                let _ = self.update_tx.send(MonitorUpdate::ViewUpdated);
            }
            // Keep the previous list on failure.
            Err(e) => warn!("history fetch failed: {}", e),
        }
    }

    // ── extras fan-out ────────────────────────────────────────────────────────

    /// Three independent fetches, one per panel. Each task posts its own
    /// result event; a failing endpoint never blocks or cancels the others.
    async fn spawn_extras_fetch(&self, session: u64, key: String, artist: String, title: String) {
        self.views.extras_loading().await;

        let api = self.api.clone();
        let tx = self.event_tx.clone();
        let (a, t, k) = (artist.clone(), title, key.clone());
        tokio::spawn(async move {
            let result = api.lyrics(&a, &t).await;
            let _ = tx
                .send(MonitorEvent::Lyrics {
                    session,
                    key: k,
                    result,
                })
                .await;
        });

        let api = self.api.clone();
        let tx = self.event_tx.clone();
        let (a, k) = (artist.clone(), key.clone());
        tokio::spawn(async move {
            let result = api.artist_bio(&a).await;
            let _ = tx
                .send(MonitorEvent::Bio {
                    session,
                    key: k,
                    result,
                })
                .await;
        });

        let api = self.api.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = api.top_tracks(&artist).await;
            let _ = tx
                .send(MonitorEvent::TopTracks {
                    session,
                    key,
                    result,
                })
                .await;
        });
    }

    fn spawn_recent_fetch(&self, session: u64, stream: &str) {
        let api = self.api.clone();
        let tx = self.event_tx.clone();
        let stream = stream.to_string();
        tokio::spawn(async move {
            let result = api.history(&stream).await;
            let _ = tx.send(MonitorEvent::Recent { session, result }).await;
        });
    }

    /// An extras result only applies when the session is current and the
    /// gate still points at the track it was fetched for.
    fn extras_current(&self, session: u64, key: &str) -> bool {
        session == self.session && self.last_track_key.as_deref() == Some(key)
    }
}
