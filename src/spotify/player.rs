//! Candidate ranking and playback dispatch.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::PlaybackError;

use super::client::{AppLauncher, Device, SpotifyApi, Track};
use super::query::{parse_query, ParsedQuery, SearchType};
use super::similarity::similarity;

/// Candidates whose primary artist scores at or below this against the
/// requested artist are discarded.
const ARTIST_THRESHOLD: f64 = 0.6;

/// How long a freshly launched desktop client gets to register itself as a
/// playback device before the retry.
const REGISTER_DELAY: Duration = Duration::from_secs(5);

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playing {
    pub track: String,
    pub artist: String,
    pub device: String,
    pub device_was_active: bool,
}

/// Pick the best candidate for the parsed query.
///
/// When an artist was requested, only candidates whose primary artist is
/// similar enough qualify; a filter that eliminates everything yields no
/// match rather than falling back to the unfiltered list. Among the
/// qualifiers the highest song-name similarity wins, first seen on a tie.
pub fn rank<'a>(parsed: &ParsedQuery, candidates: &'a [Track]) -> Option<&'a Track> {
    let mut best: Option<&Track> = None;
    let mut best_score = 0.0;

    for track in candidates {
        if let Some(artist) = &parsed.artist {
            if similarity(artist, track.primary_artist()) <= ARTIST_THRESHOLD {
                continue;
            }
        }
        let score = similarity(&parsed.song, &track.name);
        if score > best_score {
            best_score = score;
            best = Some(track);
        }
    }

    best
}

/// The first active device wins; with none active, the first listed.
fn pick_device(devices: &[Device]) -> Option<(&Device, bool)> {
    if let Some(active) = devices.iter().find(|d| d.is_active) {
        return Some((active, true));
    }
    devices.first().map(|d| (d, false))
}

/// Search-and-play dispatcher over injected collaborators.
pub struct Player<A, L> {
    api: A,
    launcher: L,
    search_limit: u32,
}

impl<A: SpotifyApi, L: AppLauncher> Player<A, L> {
    pub fn new(api: A, launcher: L, search_limit: u32) -> Self {
        Self {
            api,
            launcher,
            search_limit,
        }
    }

    /// Resolve `query` to a track and start playback on the best available
    /// device.
    ///
    /// When no device is reachable, the desktop client is launched and the
    /// whole procedure (search included) reruns exactly once after a short
    /// registration delay; a second device absence is terminal. A failed
    /// launch is terminal without a retry.
    pub async fn search_and_play(
        &self,
        query: &str,
        search_type: Option<SearchType>,
    ) -> Result<Playing, PlaybackError> {
        let mut parsed = parse_query(query);
        if let Some(kind) = search_type {
            parsed.search_type = kind;
        }

        let mut retried = false;
        loop {
            match self.attempt(query, &parsed).await? {
                Some(playing) => return Ok(playing),
                None if retried => return Err(PlaybackError::NoDevice { retried: true }),
                None => {
                    warn!("No available devices for playback, launching the desktop client");
                    self.launcher.launch().await?;
                    tokio::time::sleep(REGISTER_DELAY).await;
                    retried = true;
                }
            }
        }
    }

    /// One full search/rank/dispatch pass. `Ok(None)` means no device was
    /// available; every other failure is an error.
    async fn attempt(
        &self,
        query: &str,
        parsed: &ParsedQuery,
    ) -> Result<Option<Playing>, PlaybackError> {
        let candidates = self
            .api
            .search(&parsed.song, parsed.search_type, self.search_limit)
            .await?;

        let track = rank(parsed, &candidates)
            .ok_or_else(|| PlaybackError::NoMatch(query.to_string()))?
            .clone();

        let devices = self.api.devices().await?;
        let Some((device, was_active)) = pick_device(&devices) else {
            return Ok(None);
        };

        self.api.play(&device.id, &track.uri).await?;
        info!(track = %track.name, device = %device.name, "Playback started");

        Ok(Some(Playing {
            track: track.name.clone(),
            artist: track.primary_artist().to_string(),
            device: device.name.clone(),
            device_was_active: was_active,
        }))
    }
}
