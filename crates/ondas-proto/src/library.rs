//! Local listening library: favorite stations and the recently-played list.
//!
//! Two JSON files in the data dir, loaded tolerantly (a missing or corrupt
//! file yields an empty list) and saved explicitly by the caller. Stations
//! are matched by identity (name + stream) in both lists.

use crate::protocol::Station;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Upper bound on the recents list. Oldest entries fall off the tail.
pub const RECENTS_LIMIT: usize = 30;

// ── favorites ─────────────────────────────────────────────────────────────────

/// Favorite stations. Unbounded, deduplicated by station identity.
#[derive(Debug, Default)]
pub struct Favorites {
    path: PathBuf,
    stations: Vec<Station>,
}

impl Favorites {
    /// Load from `path`; missing or unreadable files start empty.
    pub fn load(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            stations: load_json(path),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        save_json(&self.path, &self.stations)
    }

    /// Add when absent, remove when present. Returns true when the station
    /// was added. Toggling twice restores the prior list.
    pub fn toggle(&mut self, station: &Station) -> bool {
        if self.contains(station) {
            self.stations.retain(|s| !s.is_same(station));
            false
        } else {
            self.stations.push(station.clone());
            true
        }
    }

    pub fn contains(&self, station: &Station) -> bool {
        self.stations.iter().any(|s| s.is_same(station))
    }

    pub fn all(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

// ── recents ───────────────────────────────────────────────────────────────────

/// One locally-recorded listen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    pub station: Station,
    #[serde(default)]
    pub listened_at: Option<DateTime<Local>>,
}

/// Recently-played stations, most recent first, capped at [`RECENTS_LIMIT`].
/// A replay of an already-listed station collapses into a fresh head entry.
#[derive(Debug, Default)]
pub struct Recents {
    path: PathBuf,
    entries: Vec<RecentEntry>,
}

impl Recents {
    pub fn load(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: load_json(path),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        save_json(&self.path, &self.entries)
    }

    /// Record a listen now. Moves an existing entry for the same station to
    /// the head and drops the oldest entry once the cap is reached.
    pub fn record(&mut self, station: &Station) {
        self.record_at(station, Some(Local::now()));
    }

    pub fn record_at(&mut self, station: &Station, listened_at: Option<DateTime<Local>>) {
        self.entries.retain(|e| !e.station.is_same(station));
        self.entries.insert(
            0,
            RecentEntry {
                station: station.clone(),
                listened_at,
            },
        );
        self.entries.truncate(RECENTS_LIMIT);
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── persistence helpers ───────────────────────────────────────────────────────

fn load_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("ignoring corrupt library file {}: {}", path.display(), e);
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
