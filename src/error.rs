/// Configuration load/save failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure modes of the Spotify search-and-play core.
///
/// These carry the outcome across the core/collaborator boundary as a tagged
/// value; only the tool wrapper turns them into presentation strings.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The query produced no qualifying candidate.
    #[error("no track found matching {0:?}")]
    NoMatch(String),

    /// No playback device was reachable. `retried` is set once the one
    /// launch-and-retry recovery has already been spent.
    #[error("{}", no_device_message(.retried))]
    NoDevice { retried: bool },

    /// The desktop client could not be started.
    #[error("failed to launch the Spotify desktop app: {0}")]
    Launch(#[source] std::io::Error),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Spotify API error ({status}): {message}")]
    Api { status: u16, message: String },
}

fn no_device_message(retried: &bool) -> &'static str {
    if *retried {
        "no available devices for playback after retrying"
    } else {
        "no available devices for playback"
    }
}
