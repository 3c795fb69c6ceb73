use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::busy::BusyTracker;
use crate::config::LinkConfig;
use crate::error::{LinkError, payload_message};
use crate::session::{Connection, ProtocolSet, Session, SessionId};
use crate::transport::{self, Inbound, LinkTransport};
use crate::wire::{
    METHOD_IMAGE_PUSH_OBSERVER_ADD, METHOD_INITIALIZE, RenderFrame, WireMessage,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events broadcast by the link actor.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A complete image-stream frame.
    Frame(RenderFrame),
    /// Transport-level error during the live session.
    ConnectionError { payload: Option<serde_json::Value> },
    /// The remote side closed the session.
    ConnectionClose { payload: Option<serde_json::Value> },
}

/// Commands the handle sends to the link actor.
#[derive(Debug)]
enum LinkCommand {
    Call {
        method: String,
        args: Vec<serde_json::Value>,
        respond_to: oneshot::Sender<Result<serde_json::Value, LinkError>>,
    },
    /// Fire-and-forget RPC: no caller waits for the reply.
    Notify {
        method: String,
        args: Vec<serde_json::Value>,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
}

/// An unconnected client: carries the protocol capability set, the busy
/// tracker, and the event channel so observers can register before the
/// handshake. `connect` consumes it and returns the live [`LinkHandle`].
pub struct LinkClient {
    protocols: ProtocolSet,
    busy: BusyTracker,
    events: broadcast::Sender<LinkEvent>,
}

impl LinkClient {
    pub fn new(protocols: ProtocolSet) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            protocols,
            // a single in-flight operation is enough to mark busy
            busy: BusyTracker::new(1),
            events,
        }
    }

    pub fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    /// Register an observer before (or after) connect. Error and close
    /// events arrive here alongside image-stream frames.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// Connect handshake against the configured endpoint.
    pub async fn connect(self, config: &LinkConfig) -> Result<LinkHandle, LinkError> {
        let transport = transport::connect_websocket(&config.session_url()).await?;
        self.connect_over(transport, config).await
    }

    /// Handshake over an already-established transport. Tests drive this
    /// with [`LinkTransport::pair`].
    pub async fn connect_over(
        self,
        transport: LinkTransport,
        config: &LinkConfig,
    ) -> Result<LinkHandle, LinkError> {
        let LinkTransport {
            outbound,
            mut inbound,
        } = transport;

        outbound
            .send(WireMessage::Hello {
                application: config.application.clone(),
                protocols: self.protocols.names().to_vec(),
            })
            .await
            .map_err(|_| LinkError::Handshake("transport closed before hello".to_string()))?;

        let reply = tokio::time::timeout(config.connect_timeout, inbound.recv())
            .await
            .map_err(|_| LinkError::Handshake("timed out waiting for welcome".to_string()))?;

        let session_id = match reply {
            Some(Inbound::Message(WireMessage::Welcome { session_id })) => session_id,
            Some(Inbound::Message(WireMessage::Notice { error })) => {
                return Err(LinkError::Handshake(
                    error.unwrap_or_else(|| "rejected by server".to_string()),
                ));
            }
            Some(Inbound::Closed { payload }) => {
                return Err(LinkError::Handshake(payload_message(
                    payload.as_ref(),
                    "connection closed during handshake",
                )));
            }
            Some(Inbound::Failed { payload }) => {
                return Err(LinkError::Handshake(payload_message(
                    payload.as_ref(),
                    "transport failed during handshake",
                )));
            }
            Some(other) => {
                return Err(LinkError::Handshake(format!(
                    "unexpected message before welcome: {:?}",
                    other
                )));
            }
            None => {
                return Err(LinkError::Handshake(
                    "transport closed before welcome".to_string(),
                ));
            }
        };

        let connection = Connection::new(
            config.session_url(),
            config.application.clone(),
            self.protocols.clone(),
            Session::new(SessionId::new(session_id)),
        );

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = LinkActor {
            outbound,
            inbound,
            commands: cmd_rx,
            events: self.events.clone(),
            pending: HashMap::new(),
            next_call_id: 0,
            pending_frame: None,
        };
        tokio::spawn(actor.run());

        Ok(LinkHandle {
            sender: cmd_tx,
            connection,
            events: self.events,
        })
    }
}

/// Cloneable handle to a live link actor.
#[derive(Clone, Debug)]
pub struct LinkHandle {
    sender: mpsc::Sender<LinkCommand>,
    connection: Connection,
    events: broadcast::Sender<LinkEvent>,
}

impl LinkHandle {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// Issue an RPC and wait for its reply.
    pub async fn call(
        &self,
        method: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, LinkError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LinkCommand::Call {
                method: method.to_string(),
                args,
                respond_to: tx,
            })
            .await
            .map_err(|_| LinkError::LinkGone)?;
        rx.await.map_err(|_| LinkError::LinkGone)?
    }

    /// Issue an RPC without waiting for its reply. Interaction events
    /// (render, resize, wheel) route through here so the UI path never
    /// blocks on the server; the reply is discarded when it arrives.
    /// Synchronous, so issue order is preserved.
    pub fn notify(&self, method: &str, args: Vec<serde_json::Value>) -> Result<(), LinkError> {
        self.sender
            .try_send(LinkCommand::Notify {
                method: method.to_string(),
                args,
            })
            .map_err(|_| LinkError::LinkGone)
    }

    /// Start the remote image stream for a session. Issued exactly once per
    /// successful connect, before the client is published.
    pub async fn start_image_stream(&self, session: &Session) -> Result<(), LinkError> {
        self.call(
            METHOD_IMAGE_PUSH_OBSERVER_ADD,
            vec![serde_json::json!(session.id())],
        )
        .await
        .map(|_| ())
    }

    /// The named remote application's call surface.
    pub fn remote(&self, application: &str) -> Remote<'_> {
        Remote {
            link: self,
            application: application.to_string(),
        }
    }

    /// Tear the link down: stops the actor and closes the transport.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LinkCommand::Disconnect { respond_to: tx })
            .await
            .map_err(|_| LinkError::LinkGone)?;
        rx.await.map_err(|_| LinkError::LinkGone)
    }
}

/// Calls scoped to one remote application.
pub struct Remote<'a> {
    link: &'a LinkHandle,
    application: String,
}

impl Remote<'_> {
    /// Post-connect initialization: sets up the server-side visualization
    /// pipeline for this application.
    pub async fn create_visualization(&self) -> Result<(), LinkError> {
        self.link
            .call(METHOD_INITIALIZE, vec![serde_json::json!(self.application)])
            .await
            .map(|_| ())
            .map_err(|e| LinkError::PostConnectCall(e.to_string()))
    }
}

/// The actor owning the transport: correlates RPC replies by id, pairs
/// frame headers with their binary payloads, and broadcasts events.
struct LinkActor {
    outbound: mpsc::Sender<WireMessage>,
    inbound: mpsc::Receiver<Inbound>,
    commands: mpsc::Receiver<LinkCommand>,
    events: broadcast::Sender<LinkEvent>,
    /// In-flight calls by id; `None` marks a notify whose reply is discarded.
    pending: HashMap<u64, Option<oneshot::Sender<Result<serde_json::Value, LinkError>>>>,
    next_call_id: u64,
    pending_frame: Option<(i64, u32, u32, String)>,
}

impl LinkActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(LinkCommand::Call { method, args, respond_to }) => {
                        let id = self.next_call_id;
                        self.next_call_id += 1;
                        if self
                            .outbound
                            .send(WireMessage::Call { id, method, args })
                            .await
                            .is_err()
                        {
                            let _ = respond_to
                                .send(Err(LinkError::Connection("transport closed".to_string())));
                            continue;
                        }
                        self.pending.insert(id, Some(respond_to));
                    }
                    Some(LinkCommand::Notify { method, args }) => {
                        let id = self.next_call_id;
                        self.next_call_id += 1;
                        if self
                            .outbound
                            .send(WireMessage::Call { id, method, args })
                            .await
                            .is_err()
                        {
                            continue;
                        }
                        self.pending.insert(id, None);
                    }
                    Some(LinkCommand::Disconnect { respond_to }) => {
                        debug!("link disconnecting");
                        let _ = respond_to.send(());
                        break;
                    }
                    None => break, // all handles dropped
                },
                msg = self.inbound.recv() => match msg {
                    Some(Inbound::Message(m)) => self.handle_message(m),
                    Some(Inbound::Binary(data)) => self.handle_binary(data),
                    Some(Inbound::Closed { payload }) => {
                        let _ = self.events.send(LinkEvent::ConnectionClose { payload });
                        break;
                    }
                    Some(Inbound::Failed { payload }) => {
                        let _ = self.events.send(LinkEvent::ConnectionError { payload });
                        break;
                    }
                    None => {
                        let _ = self.events.send(LinkEvent::ConnectionClose { payload: None });
                        break;
                    }
                },
            }
        }

        // Callers still waiting learn the link is gone.
        for (_, tx) in self.pending.drain() {
            if let Some(tx) = tx {
                let _ = tx.send(Err(LinkError::LinkGone));
            }
        }
        debug!("link actor stopped");
    }

    fn handle_message(&mut self, msg: WireMessage) {
        match msg {
            WireMessage::Reply { id, result } => {
                match self.pending.remove(&id) {
                    Some(Some(tx)) => {
                        let _ = tx.send(Ok(result));
                    }
                    Some(None) => {} // notify reply, discarded
                    None => debug!("Reply for unknown call {}", id),
                }
            }
            WireMessage::Fault { id, error } => {
                match self.pending.remove(&id) {
                    Some(Some(tx)) => {
                        let _ = tx.send(Err(LinkError::Fault(error)));
                    }
                    Some(None) => {
                        debug!("Fault for notify call {}: {}", id, error);
                    }
                    None => debug!("Fault for unknown call {}", id),
                }
            }
            WireMessage::Frame {
                view_id,
                width,
                height,
                format,
            } => {
                if self
                    .pending_frame
                    .replace((view_id, width, height, format))
                    .is_some()
                {
                    debug!("Frame header without payload dropped");
                }
            }
            WireMessage::Notice { error } => {
                let payload = error.map(|e| serde_json::json!({ "error": e }));
                let _ = self.events.send(LinkEvent::ConnectionError { payload });
            }
            other => {
                debug!("Unexpected message from server: {:?}", other);
            }
        }
    }

    fn handle_binary(&mut self, data: Vec<u8>) {
        match self.pending_frame.take() {
            Some((view_id, width, height, format)) => {
                let _ = self.events.send(LinkEvent::Frame(RenderFrame {
                    view_id,
                    width,
                    height,
                    format,
                    data,
                }));
            }
            None => {
                debug!("Binary payload without frame header dropped");
            }
        }
    }
}
