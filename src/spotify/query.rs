use once_cell::sync::Lazy;
use regex::Regex;

/// What kind of catalog entity a query searches for.
///
/// Only track search is supported today; the enum keeps call sites honest
/// about where a caller override lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    Track,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Track => "track",
        }
    }

    /// Parse a caller-supplied override. Unknown values are rejected rather
    /// than silently falling back to track search.
    pub fn from_override(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "track" => Some(SearchType::Track),
            _ => None,
        }
    }
}

/// A free-text query split into song and optional artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub song: String,
    pub artist: Option<String>,
    pub search_type: SearchType,
}

// Tried in order; first match wins. Both groups are greedy, so the LAST
// separator splits: "Stand by Me by Ben E. King" keeps "Stand by Me" whole.
static SONG_BY_ARTIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+)\s+(?:by|from|of)\s+(.+)$").unwrap());
static SONG_DASH_ARTIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(.+)\s*-\s*(.+)$").unwrap());

/// Split a query like "Imagine by John Lennon" or "Imagine - John Lennon"
/// into song and artist. Queries matching neither pattern search for the
/// whole trimmed text as a song title. Never fails.
pub fn parse_query(query: &str) -> ParsedQuery {
    for pattern in [&*SONG_BY_ARTIST, &*SONG_DASH_ARTIST] {
        if let Some(caps) = pattern.captures(query) {
            return ParsedQuery {
                song: caps[1].trim().to_string(),
                artist: Some(caps[2].trim().to_string()),
                search_type: SearchType::Track,
            };
        }
    }

    ParsedQuery {
        song: query.trim().to_string(),
        artist: None,
        search_type: SearchType::Track,
    }
}
