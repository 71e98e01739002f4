//! Spotify search-and-play.
//!
//! A free-text query is parsed into song and optional artist, search results
//! are ranked by fuzzy title similarity (with an artist filter when one was
//! named), and playback starts on the best available device. When no device
//! is reachable the desktop client is launched and the whole procedure
//! reruns exactly once.

pub mod client;
pub mod player;
pub mod query;
pub mod similarity;

pub use client::{AppLauncher, Artist, DesktopLauncher, Device, SpotifyApi, Track, WebApiClient};
pub use player::{rank, Player, Playing};
pub use query::{parse_query, ParsedQuery, SearchType};
pub use similarity::similarity;
