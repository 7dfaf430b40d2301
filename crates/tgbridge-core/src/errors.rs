use std::num::ParseIntError;

/// Core error type for the bridge.
///
/// Adapter crates map their transport errors into this type so callers of the
/// outbound sender see one error surface regardless of the platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Platform auth or connectivity failure while constructing the adapter.
    #[error("telegram failed to initialize: {0}")]
    Initialization(String),

    #[error("invalid channel identifier {channel:?}: {source}")]
    ChannelIdentifierInvalid {
        channel: String,
        #[source]
        source: ParseIntError,
    },

    #[error("transport error: {0}")]
    Transport(String),

    /// Raised by callback handlers; logged by the dispatch loop, never propagated.
    #[error("callback failed: {0}")]
    Callback(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
