//! Spotify Web API collaborators.
//!
//! The dispatch logic only sees the `SpotifyApi` and `AppLauncher` traits;
//! these are the production implementations over the Web API and the local
//! desktop client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tracing::debug;

use crate::error::PlaybackError;
use crate::util::http;

use super::query::SearchType;

const API_BASE: &str = "https://api.spotify.com/v1";

/// A track returned by the search collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl Track {
    /// Name of the primary (first-listed) artist.
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// A playback endpoint known to the device-listing collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// Search, device listing, and playback against the music service.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        kind: SearchType,
        limit: u32,
    ) -> Result<Vec<Track>, PlaybackError>;

    async fn devices(&self) -> Result<Vec<Device>, PlaybackError>;

    async fn play(&self, device_id: &str, track_uri: &str) -> Result<(), PlaybackError>;
}

/// Starts the desktop client so it can register as a playback device.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn launch(&self) -> Result<(), PlaybackError>;
}

/// `SpotifyApi` over the Spotify Web API with an injected bearer token.
pub struct WebApiClient {
    access_token: String,
}

impl WebApiClient {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PlaybackError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(PlaybackError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SpotifyApi for WebApiClient {
    async fn search(
        &self,
        query: &str,
        kind: SearchType,
        limit: u32,
    ) -> Result<Vec<Track>, PlaybackError> {
        debug!(query, limit, "Spotify search");
        let response = http::client()
            .get(format!("{API_BASE}/search"))
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query),
                ("type", kind.as_str()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;
        let data: SearchResponse = Self::check(response).await?.json().await?;
        Ok(data.tracks.items)
    }

    async fn devices(&self) -> Result<Vec<Device>, PlaybackError> {
        debug!("Spotify device listing");
        let response = http::client()
            .get(format!("{API_BASE}/me/player/devices"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let data: DevicesResponse = Self::check(response).await?.json().await?;
        Ok(data.devices)
    }

    async fn play(&self, device_id: &str, track_uri: &str) -> Result<(), PlaybackError> {
        debug!(device_id, track_uri, "Spotify start playback");
        let response = http::client()
            .put(format!("{API_BASE}/me/player/play"))
            .bearer_auth(&self.access_token)
            .query(&[("device_id", device_id)])
            .json(&json!({ "uris": [track_uri] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Launches the platform's Spotify desktop client.
pub struct DesktopLauncher;

#[async_trait]
impl AppLauncher for DesktopLauncher {
    async fn launch(&self) -> Result<(), PlaybackError> {
        debug!("Launching Spotify desktop client");
        launch_command().spawn().map_err(PlaybackError::Launch)?;
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn launch_command() -> Command {
    let mut cmd = Command::new("open");
    cmd.args(["-a", "Spotify"]);
    cmd
}

#[cfg(target_os = "windows")]
fn launch_command() -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "spotify:"]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn launch_command() -> Command {
    Command::new("spotify")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_deserialization() {
        let json = r#"{
            "uri": "spotify:track:7pKfPomDEeI4TPT6EOYjn9",
            "name": "Imagine",
            "artists": [{"name": "John Lennon"}, {"name": "The Plastic Ono Band"}]
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.name, "Imagine");
        assert_eq!(track.primary_artist(), "John Lennon");
    }

    #[test]
    fn test_track_without_artists() {
        let json = r#"{"uri": "spotify:track:x", "name": "Untitled"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.primary_artist(), "");
    }

    #[test]
    fn test_devices_response_deserialization() {
        let json = r#"{
            "devices": [
                {"id": "d1", "name": "Kitchen speaker", "is_active": false},
                {"id": "d2", "name": "Laptop", "is_active": true}
            ]
        }"#;
        let parsed: DevicesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.devices.len(), 2);
        assert!(parsed.devices[1].is_active);
    }
}
