use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::busy::BusyTracker;
use crate::client::{LinkClient, LinkEvent, LinkHandle};
use crate::config::LinkConfig;
use crate::error::payload_message;
use crate::session::ProtocolSet;

/// Owns the lifecycle of the single remote session link.
///
/// One manager, one connection: the client is an owned field created once,
/// never module-global state. `acquire` hands out watch receivers for the
/// published client and the busy flag; the first call also starts the
/// connect handshake. `shutdown` cancels an in-flight connect and
/// disconnects a published client for real.
pub struct ConnectionManager {
    config: LinkConfig,
    /// Consumed by the first `acquire`; create-once semantics.
    client: Option<LinkClient>,
    busy: BusyTracker,
    client_tx: watch::Sender<Option<LinkHandle>>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    pub fn new(config: LinkConfig, protocols: ProtocolSet) -> Self {
        let client = LinkClient::new(protocols);
        let busy = client.busy().clone();
        let (client_tx, _) = watch::channel(None);
        Self {
            config,
            client: Some(client),
            busy,
            client_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Current client plus busy flag. The host treats "no client yet, or
    /// busy" as its loading state. Re-acquiring never reconnects; the
    /// handshake runs once per manager.
    pub fn acquire(&mut self) -> (watch::Receiver<Option<LinkHandle>>, watch::Receiver<bool>) {
        // Subscribe before the connect task can run so callers observe the
        // busy transition rather than racing it.
        let client_rx = self.client_tx.subscribe();
        let busy_rx = self.busy.subscribe();
        if let Some(client) = self.client.take() {
            self.spawn_connect(client);
        }
        (client_rx, busy_rx)
    }

    fn spawn_connect(&self, client: LinkClient) {
        let config = self.config.clone();
        let cancel = self.cancel.clone();
        let client_tx = self.client_tx.clone();
        let busy = self.busy.clone();

        // Error/close observers: log-only, never fatal to the host.
        let events = client.subscribe();
        tokio::spawn(observe_events(events, self.cancel.clone()));

        tokio::spawn(async move {
            // Signals "connecting"; the guard drop releases it on every exit
            // path, so a failed handshake cannot leave the host loading
            // forever.
            let _guard = busy.begin();

            let result = client.connect(&config).await;

            if cancel.is_cancelled() {
                // The host went away mid-connect: apply nothing.
                debug!("connect resolved after shutdown, discarding");
                if let Ok(handle) = result {
                    let _ = handle.disconnect().await;
                }
                return;
            }

            let handle = match result {
                Ok(handle) => handle,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };

            // The stream starts before the client is published, so a
            // consumer reacting to "client present" finds it initialized.
            let session = handle.connection().session().clone();
            if let Err(e) = handle.start_image_stream(&session).await {
                error!("image stream start failed: {}", e);
            }

            info!("session {} ready", session.id());
            client_tx.send_replace(Some(handle.clone()));
            drop(_guard);

            // Now that the client is ready, set up the server side for us.
            // Exactly one initialization call per successful handshake; its
            // failure does not roll back the published client.
            if let Err(e) = handle
                .remote(config.application.as_str())
                .create_visualization()
                .await
            {
                error!("{}", e);
            }
        });
    }

    /// Tear down: cancel any in-flight connect, then disconnect a published
    /// client. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let previous = self.client_tx.send_replace(None);
        if let Some(handle) = previous {
            let _ = handle.disconnect().await;
        }
    }
}

/// Log transport errors and closes with the payload's message when it has
/// one, the generic wording otherwise.
async fn observe_events(mut events: broadcast::Receiver<LinkEvent>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(LinkEvent::ConnectionError { payload }) => {
                    error!("{}", payload_message(payload.as_ref(), "Connection error"));
                }
                Ok(LinkEvent::ConnectionClose { payload }) => {
                    error!("{}", payload_message(payload.as_ref(), "Connection close"));
                }
                Ok(LinkEvent::Frame(_)) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
