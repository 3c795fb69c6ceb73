use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a remote visualization context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a remote visualization context. Identifies, never owns: the
/// connection that produced it is free to go away underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

/// The protocol capability set announced in the connect handshake. The
/// server only routes calls for capabilities the client declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolSet(Vec<String>);

impl ProtocolSet {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl Default for ProtocolSet {
    /// The viewport protocol families every render session needs: mouse
    /// interaction, camera/viewport control, and image delivery.
    fn default() -> Self {
        Self(vec![
            "viewport.mouse".to_string(),
            "viewport.camera".to_string(),
            "viewport.image.push".to_string(),
        ])
    }
}

/// A negotiated link to the remote rendering service.
#[derive(Debug, Clone)]
pub struct Connection {
    endpoint: String,
    application: String,
    protocols: ProtocolSet,
    session: Session,
}

impl Connection {
    pub(crate) fn new(
        endpoint: String,
        application: String,
        protocols: ProtocolSet,
        session: Session,
    ) -> Self {
        Self {
            endpoint,
            application,
            protocols,
            session,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn protocols(&self) -> &ProtocolSet {
        &self.protocols
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
