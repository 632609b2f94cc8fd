//! Error types shared across the player core.
//!
//! Queue navigation never fails (it answers `None`), so only transport,
//! catalog telemetry and configuration I/O have error types here.

use thiserror::Error;

/// Failure reported by an audio engine when it refuses a command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine cannot open or decode the given media.
    #[error("unplayable media '{url}': {reason}")]
    Unplayable { url: String, reason: String },

    /// The engine thread (or device) is gone.
    #[error("audio engine unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported effects chain '{0}'")]
    InvalidEffects(String),
}

/// Outcome of a failed playback request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The engine rejected the transport command.
    #[error("playback failed: {0}")]
    Transport(#[from] EngineError),

    /// There is nothing to play.
    #[error("nothing to play")]
    NothingToPlay,
}

/// Catalog service reporting failure. Always swallowed by the core.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("catalog unavailable")]
    Unavailable,

    /// The server answered with `status: failed`.
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
}

/// Configuration load/save failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
