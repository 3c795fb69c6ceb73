use tokio_tungstenite::tungstenite;

/// Errors surfaced by the session link.
///
/// The manager catches every kind at its origin and logs it; none is fatal
/// to the host, and none changes the loading/ready state except through the
/// busy counter.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The connect handshake was refused, rejected, or timed out.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Transport-level error during a live session.
    #[error("connection error: {0}")]
    Connection(String),

    /// The remote side closed the session.
    #[error("connection closed")]
    Closed,

    /// The post-connect initialization call was rejected.
    #[error("initialization call failed: {0}")]
    PostConnectCall(String),

    /// The server replied to an RPC with a fault.
    #[error("rpc fault: {0}")]
    Fault(String),

    /// The link actor has stopped.
    #[error("link is gone")]
    LinkGone,
}

impl LinkError {
    /// Classify a tungstenite error from the connect path. Connection-class
    /// IO errors read as a failed handshake; anything else is a transport
    /// error.
    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        };
        if is_connect {
            Self::Handshake(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Human-readable message for an error/close payload: the payload's `error`
/// field when present, then `message`, else the fallback.
pub fn payload_message(payload: Option<&serde_json::Value>, fallback: &str) -> String {
    payload
        .and_then(|p| p.get("error").or_else(|| p.get("message")))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
