use thiserror::Error;

/// Failures on the inbound market-data path.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Payload could not be decoded into a known event shape.
    #[error("malformed event: {0}")]
    Malformed(String),

    /// The connection dropped or was closed by the server.
    #[error("stream disconnected: {0}")]
    Disconnected(String),

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Malformed(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("unexpected symbol {0}")]
    UnknownSymbol(String),
}
