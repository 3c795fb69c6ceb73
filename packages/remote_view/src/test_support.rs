use std::sync::{Arc, Mutex};

use render_link::transport::{Inbound, LinkTransport, TransportPeer};
use render_link::{LinkClient, LinkConfig, LinkHandle, ProtocolSet, RenderFrame, WireMessage};

use crate::surface::Surface;

/// Recording surface: frames land in a shared log, size is fixed.
pub(crate) struct TestSurface {
    frames: Arc<Mutex<Vec<RenderFrame>>>,
    size: (u32, u32),
}

impl TestSurface {
    pub(crate) fn new(width: u32, height: u32) -> (Self, Arc<Mutex<Vec<RenderFrame>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                frames: frames.clone(),
                size: (width, height),
            },
            frames,
        )
    }
}

impl Surface for TestSurface {
    fn present(&mut self, frame: &RenderFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// A live link over an in-memory transport, plus the peer playing the
/// render server. The handshake's `Hello` is already consumed.
pub(crate) async fn connected_link() -> (LinkHandle, TransportPeer) {
    let (transport, mut peer) = LinkTransport::pair(32);
    peer.feed
        .send(Inbound::Message(WireMessage::Welcome {
            session_id: "sess-test".to_string(),
        }))
        .await
        .unwrap();
    let client = LinkClient::new(ProtocolSet::default());
    let handle = client
        .connect_over(transport, &LinkConfig::default())
        .await
        .unwrap();
    match peer.sent.recv().await.unwrap() {
        WireMessage::Hello { .. } => {}
        other => panic!("expected Hello first, got {:?}", other),
    }
    (handle, peer)
}
