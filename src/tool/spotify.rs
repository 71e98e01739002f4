//! The `spotify_play` tool: the string-facing wrapper around the
//! search-and-play core. All presentation (success lines and error text)
//! happens here; the core only ever reports tagged results.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

use crate::spotify::{DesktopLauncher, Player, Playing, SearchType, WebApiClient};

use super::Tool;

/// Search Spotify and start playback on the best available device.
pub struct SearchAndPlayTool {
    player: Player<WebApiClient, DesktopLauncher>,
}

impl SearchAndPlayTool {
    pub fn new(player: Player<WebApiClient, DesktopLauncher>) -> Self {
        Self { player }
    }
}

fn format_playing(playing: &Playing) -> String {
    let device_kind = if playing.device_was_active {
        "active device"
    } else {
        "device"
    };
    format!(
        "Playing \"{}\" by {} on {}: {}",
        playing.track, playing.artist, device_kind, playing.device
    )
}

#[async_trait]
impl Tool for SearchAndPlayTool {
    fn name(&self) -> &str {
        "spotify_play"
    }

    fn description(&self) -> &str {
        "Search Spotify for a track and play it on the best available device. \
         Queries may name an artist as 'song by artist' or 'song - artist'."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search text, e.g. 'Imagine by John Lennon'"},
                "search_type": {"type": "string", "enum": ["track"], "description": "Override the search type"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let query = match params.get("query").and_then(|v| v.as_str()) {
            Some(q) => q,
            None => return "Error: 'query' parameter is required".to_string(),
        };

        let search_type = match params.get("search_type").and_then(|v| v.as_str()) {
            Some(raw) => match SearchType::from_override(raw) {
                Some(kind) => Some(kind),
                None => return format!("Error: unsupported search type '{raw}'"),
            },
            None => None,
        };

        match self.player.search_and_play(query, search_type).await {
            Ok(playing) => format_playing(&playing),
            Err(e) => format!("Error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_playing() {
        let playing = Playing {
            track: "Imagine".to_string(),
            artist: "John Lennon".to_string(),
            device: "Laptop".to_string(),
            device_was_active: true,
        };
        assert_eq!(
            format_playing(&playing),
            "Playing \"Imagine\" by John Lennon on active device: Laptop"
        );

        let playing = Playing {
            device_was_active: false,
            ..playing
        };
        assert_eq!(
            format_playing(&playing),
            "Playing \"Imagine\" by John Lennon on device: Laptop"
        );
    }

    #[tokio::test]
    async fn test_tool_requires_query() {
        let player = Player::new(WebApiClient::new(String::new()), DesktopLauncher, 20);
        let tool = SearchAndPlayTool::new(player);
        let out = tool.execute(HashMap::new()).await;
        assert_eq!(out, "Error: 'query' parameter is required");
    }

    #[tokio::test]
    async fn test_tool_rejects_unknown_search_type() {
        let player = Player::new(WebApiClient::new(String::new()), DesktopLauncher, 20);
        let tool = SearchAndPlayTool::new(player);
        let mut params = HashMap::new();
        params.insert("query".to_string(), json!("Imagine"));
        params.insert("search_type".to_string(), json!("album"));
        let out = tool.execute(params).await;
        assert_eq!(out, "Error: unsupported search type 'album'");
    }
}
