use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use render_link::{LinkEvent, LinkHandle};

use crate::surface::Surface;
use crate::view::{DEFAULT_VIEW_ID, RemoteView, RemoteViewOptions, ViewError};

/// Owns a [`RemoteView`] and its listener tasks.
///
/// Mount once, bind every time the published client changes, unmount when
/// the host goes away. Unmount cancels and awaits the listeners, so no
/// resize or frame event can reach the view after it returns.
pub struct ViewBinder {
    view: Arc<Mutex<RemoteView>>,
    cancel: CancellationToken,
    resize_task: JoinHandle<()>,
    frame_task: Option<JoinHandle<()>>,
}

impl ViewBinder {
    /// Construct the view, attach the container, start the resize listener.
    /// `resize_rx` is the host's resize feed (the window-resize analog).
    pub fn mount(
        container: Box<dyn Surface>,
        options: RemoteViewOptions,
        resize_rx: watch::Receiver<(u32, u32)>,
    ) -> Self {
        let mut view = RemoteView::new(options);
        view.set_container(container);
        let view = Arc::new(Mutex::new(view));
        let cancel = CancellationToken::new();
        let resize_task = tokio::spawn(resize_loop(view.clone(), resize_rx, cancel.clone()));
        Self {
            view,
            cancel,
            resize_task,
            frame_task: None,
        }
    }

    /// The view, for hosts forwarding interaction events (wheel zoom).
    pub fn view(&self) -> Arc<Mutex<RemoteView>> {
        self.view.clone()
    }

    /// Bind (or re-bind) to a ready client: attach the session, reset the
    /// view id to the default sentinel, render once, and point the frame
    /// pump at the new client's stream. A bound view is re-bound in place;
    /// it never goes back to unbound before disposal.
    pub async fn bind(&mut self, link: &LinkHandle) -> Result<(), ViewError> {
        if let Some(task) = self.frame_task.take() {
            task.abort();
            let _ = task.await;
        }

        {
            let mut view = self.view.lock().await;
            view.attach_session(link);
            view.set_view_id(DEFAULT_VIEW_ID);
            view.render()?;
        }

        let events = link.subscribe();
        self.frame_task = Some(tokio::spawn(frame_loop(
            self.view.clone(),
            events,
            self.cancel.clone(),
        )));
        Ok(())
    }

    /// Stop the listeners and dispose the view. Listener removal is
    /// complete before this returns; it is safe to call exactly once and
    /// cancellation itself is idempotent.
    pub async fn unmount(self) {
        self.cancel.cancel();
        let _ = self.resize_task.await;
        if let Some(task) = self.frame_task {
            let _ = task.await;
        }
        // The view (and its container) drop here.
    }
}

/// Forward host resize events to the view. `NotBound` before the first bind
/// is normal and stays quiet.
async fn resize_loop(
    view: Arc<Mutex<RemoteView>>,
    mut resize_rx: watch::Receiver<(u32, u32)>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = resize_rx.changed() => {
                if changed.is_err() {
                    break; // feed dropped
                }
                let mut view = view.lock().await;
                if let Err(e) = view.resize() {
                    debug!("resize not forwarded: {}", e);
                }
            }
        }
    }
}

/// Forward image-stream frames to the view.
async fn frame_loop(
    view: Arc<Mutex<RemoteView>>,
    mut events: broadcast::Receiver<LinkEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(LinkEvent::Frame(frame)) => {
                    view.lock().await.present(&frame);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("frame stream lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestSurface, connected_link};
    use render_link::WireMessage;
    use render_link::transport::Inbound;
    use std::time::Duration;

    async fn recv_call(
        peer: &mut render_link::transport::TransportPeer,
    ) -> (String, Vec<serde_json::Value>) {
        match tokio::time::timeout(Duration::from_secs(1), peer.sent.recv())
            .await
            .expect("timed out waiting for a call")
            .expect("transport closed")
        {
            WireMessage::Call { method, args, .. } => (method, args),
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn bind_attaches_session_and_renders_once() {
        let (link, mut peer) = connected_link().await;
        let (surface, _frames) = TestSurface::new(80, 24);
        let (_resize_tx, resize_rx) = watch::channel((80u32, 24u32));

        let mut binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );
        binder.bind(&link).await.unwrap();

        let (method, args) = recv_call(&mut peer).await;
        assert_eq!(method, "viewport.image.push");
        assert_eq!(args[0]["view"], DEFAULT_VIEW_ID);

        {
            let view = binder.view();
            let view = view.lock().await;
            assert!(view.is_bound());
            assert_eq!(view.view_id(), DEFAULT_VIEW_ID);
            assert_eq!(view.session().unwrap().id().as_str(), "sess-test");
        }

        // Exactly one render per bind.
        assert!(
            tokio::time::timeout(Duration::from_millis(100), peer.sent.recv())
                .await
                .is_err(),
            "no second render expected"
        );

        binder.unmount().await;
    }

    #[tokio::test]
    async fn frames_flow_to_the_surface() {
        let (link, mut peer) = connected_link().await;
        let (surface, frames) = TestSurface::new(80, 24);
        let (_resize_tx, resize_rx) = watch::channel((80u32, 24u32));

        let mut binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );
        binder.bind(&link).await.unwrap();
        let _ = recv_call(&mut peer).await; // the bind render

        peer.feed
            .send(Inbound::Message(WireMessage::Frame {
                view_id: 1,
                width: 320,
                height: 240,
                format: "jpeg".to_string(),
            }))
            .await
            .unwrap();
        peer.feed.send(Inbound::Binary(vec![7, 7, 7])).await.unwrap();

        // The pump is asynchronous; poll until the frame lands.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            if frames.lock().unwrap().len() == 1 {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "frame never reached the surface"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(frames.lock().unwrap()[0].data, vec![7, 7, 7]);

        binder.unmount().await;
    }

    #[tokio::test]
    async fn rebind_moves_the_view_to_the_new_client() {
        let (link1, mut peer1) = connected_link().await;
        let (link2, mut peer2) = connected_link().await;
        let (surface, _frames) = TestSurface::new(80, 24);
        let (_resize_tx, resize_rx) = watch::channel((80u32, 24u32));

        let mut binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );

        binder.bind(&link1).await.unwrap();
        let (method, _) = recv_call(&mut peer1).await;
        assert_eq!(method, "viewport.image.push");

        binder.bind(&link2).await.unwrap();
        let (method, _) = recv_call(&mut peer2).await;
        assert_eq!(method, "viewport.image.push");
        // The old client saw no new traffic from the rebind.
        assert!(
            tokio::time::timeout(Duration::from_millis(100), peer1.sent.recv())
                .await
                .is_err()
        );

        binder.unmount().await;
    }

    #[tokio::test]
    async fn resize_events_forward_while_mounted() {
        let (link, mut peer) = connected_link().await;
        let (surface, _frames) = TestSurface::new(100, 50);
        let (resize_tx, resize_rx) = watch::channel((100u32, 50u32));

        let mut binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );
        binder.bind(&link).await.unwrap();
        let _ = recv_call(&mut peer).await; // the bind render

        resize_tx.send((120, 60)).unwrap();

        let (method, args) = recv_call(&mut peer).await;
        assert_eq!(method, "viewport.size.update");
        // The view reports the container's size, not the event payload.
        assert_eq!(args[0]["width"], 100);
        assert_eq!(args[0]["height"], 50);

        binder.unmount().await;
    }

    #[tokio::test]
    async fn resize_events_after_unmount_reach_nothing() {
        let (link, mut peer) = connected_link().await;
        let (surface, _frames) = TestSurface::new(80, 24);
        let (resize_tx, resize_rx) = watch::channel((80u32, 24u32));

        let mut binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );
        binder.bind(&link).await.unwrap();
        let _ = recv_call(&mut peer).await;

        binder.unmount().await;
        assert_eq!(
            resize_tx.receiver_count(),
            0,
            "listener removal completes before unmount returns"
        );

        let _ = resize_tx.send((200, 100));
        assert!(
            tokio::time::timeout(Duration::from_millis(100), peer.sent.recv())
                .await
                .is_err(),
            "no call may follow unmount"
        );
    }

    #[tokio::test]
    async fn resize_before_first_bind_is_quietly_skipped() {
        let (surface, _frames) = TestSurface::new(80, 24);
        let (resize_tx, resize_rx) = watch::channel((80u32, 24u32));

        let binder = ViewBinder::mount(
            Box::new(surface),
            RemoteViewOptions::default(),
            resize_rx,
        );

        // Unbound view: the listener logs and moves on instead of panicking.
        resize_tx.send((90, 30)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        binder.unmount().await;
    }
}
