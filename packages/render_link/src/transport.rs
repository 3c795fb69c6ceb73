use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tracing::{debug, error};

use crate::error::LinkError;
use crate::wire::WireMessage;

/// What the link actor receives from the transport.
#[derive(Debug)]
pub enum Inbound {
    /// A decoded control message.
    Message(WireMessage),
    /// An opaque binary payload (image-stream frame body).
    Binary(Vec<u8>),
    /// The remote closed the connection; payload parsed from the close reason.
    Closed { payload: Option<serde_json::Value> },
    /// The transport failed mid-session.
    Failed { payload: Option<serde_json::Value> },
}

/// Duplex channel pair the link actor drives. Produced by
/// [`connect_websocket`] or, in tests, by [`LinkTransport::pair`]. Dropping
/// the outbound sender closes the connection.
#[derive(Debug)]
pub struct LinkTransport {
    pub outbound: mpsc::Sender<WireMessage>,
    pub inbound: mpsc::Receiver<Inbound>,
}

/// Peer side of an in-memory transport: a stand-in for the render server.
pub struct TransportPeer {
    /// Messages the client sent.
    pub sent: mpsc::Receiver<WireMessage>,
    /// Inject server-side traffic.
    pub feed: mpsc::Sender<Inbound>,
}

impl LinkTransport {
    /// In-memory transport plus the peer handle driving the other end.
    pub fn pair(capacity: usize) -> (Self, TransportPeer) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        (
            Self {
                outbound: out_tx,
                inbound: in_rx,
            },
            TransportPeer {
                sent: out_rx,
                feed: in_tx,
            },
        )
    }
}

/// Establish a WebSocket connection and pump it through channel pairs.
///
/// The write pump serializes control messages to text frames and sends a
/// close frame when the outbound sender is dropped. The read pump decodes
/// text frames to [`Inbound::Message`], forwards binary frames untouched,
/// and translates close/error into terminal `Inbound` events.
pub async fn connect_websocket(url: &str) -> Result<LinkTransport, LinkError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(LinkError::from_tungstenite)?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::channel::<WireMessage>(64);
    let (in_tx, in_rx) = mpsc::channel::<Inbound>(64);

    // Write pump
    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize control message: {}", e);
                    continue;
                }
            };
            if ws_write
                .send(tungstenite::Message::Text(json.into()))
                .await
                .is_err()
            {
                break;
            }
        }
        // Outbound side dropped: tell the server we are done.
        let _ = ws_write.send(tungstenite::Message::Close(None)).await;
        debug!("write pump ended");
    });

    // Read pump
    tokio::spawn(async move {
        while let Some(msg) = ws_read.next().await {
            match msg {
                Ok(tungstenite::Message::Text(text)) => {
                    match serde_json::from_str::<WireMessage>(&text) {
                        Ok(m) => {
                            if in_tx.send(Inbound::Message(m)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Undecodable control message dropped: {}", e);
                        }
                    }
                }
                Ok(tungstenite::Message::Binary(data)) => {
                    if in_tx.send(Inbound::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Ok(tungstenite::Message::Close(frame)) => {
                    let payload =
                        frame.and_then(|f| serde_json::from_str(f.reason.as_str()).ok());
                    let _ = in_tx.send(Inbound::Closed { payload }).await;
                    break;
                }
                Err(e) => {
                    let payload = serde_json::json!({ "error": e.to_string() });
                    let _ = in_tx
                        .send(Inbound::Failed {
                            payload: Some(payload),
                        })
                        .await;
                    break;
                }
                _ => {}
            }
        }
        debug!("read pump ended");
    });

    Ok(LinkTransport {
        outbound: out_tx,
        inbound: in_rx,
    })
}
