use render_link::wire::{METHOD_IMAGE_PUSH, METHOD_MOUSE_ZOOM_WHEEL, METHOD_SIZE_UPDATE};
use render_link::{LinkError, LinkHandle, RenderFrame, Session};
use tracing::debug;

use crate::surface::Surface;

/// Ask for the server's default/latest view instead of a specific one.
pub const DEFAULT_VIEW_ID: i64 = -1;

/// Construction-time options for a [`RemoteView`].
#[derive(Debug, Clone)]
pub struct RemoteViewOptions {
    /// RPC method mouse-wheel events are routed to.
    pub wheel_rpc_method: String,
    /// Interactive-quality ratio: 0.5 halves resolution during interaction
    /// to save bandwidth, 1.0 renders full quality.
    pub interactive_ratio: f64,
}

impl Default for RemoteViewOptions {
    fn default() -> Self {
        Self {
            wheel_rpc_method: METHOD_MOUSE_ZOOM_WHEEL.to_string(),
            interactive_ratio: 0.5,
        }
    }
}

/// Errors from view operations.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// Render/interaction attempted before both a container and a session
    /// are present.
    #[error("view is not bound to a container and session")]
    NotBound,

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// The local rendering surface for one remote view.
///
/// Holds the container and the session link; `render`, `resize` and `wheel`
/// are fire-and-forget RPCs that never run unless the view is bound.
pub struct RemoteView {
    options: RemoteViewOptions,
    container: Option<Box<dyn Surface>>,
    link: Option<LinkHandle>,
    session: Option<Session>,
    view_id: i64,
}

impl RemoteView {
    pub fn new(options: RemoteViewOptions) -> Self {
        Self {
            options,
            container: None,
            link: None,
            session: None,
            view_id: DEFAULT_VIEW_ID,
        }
    }

    pub fn set_container(&mut self, container: Box<dyn Surface>) {
        self.container = Some(container);
    }

    /// Look the session up from the client and keep the link for calls.
    /// Re-attaching on a client change rebinds in place; the view never
    /// transitions back to unbound before disposal.
    pub fn attach_session(&mut self, link: &LinkHandle) {
        self.session = Some(link.connection().session().clone());
        self.link = Some(link.clone());
    }

    pub fn set_view_id(&mut self, view_id: i64) {
        self.view_id = view_id;
    }

    pub fn view_id(&self) -> i64 {
        self.view_id
    }

    pub fn set_interactive_ratio(&mut self, ratio: f64) {
        self.options.interactive_ratio = ratio;
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Both a container and a session are present.
    pub fn is_bound(&self) -> bool {
        self.container.is_some() && self.session.is_some()
    }

    fn bound_link(&self) -> Result<&LinkHandle, ViewError> {
        if self.container.is_none() || self.session.is_none() {
            return Err(ViewError::NotBound);
        }
        self.link.as_ref().ok_or(ViewError::NotBound)
    }

    /// Request a fresh image of this view from the remote renderer.
    pub fn render(&mut self) -> Result<(), ViewError> {
        let ratio = self.options.interactive_ratio;
        let view_id = self.view_id;
        let link = self.bound_link()?;
        link.notify(
            METHOD_IMAGE_PUSH,
            vec![serde_json::json!({ "view": view_id, "ratio": ratio })],
        )?;
        Ok(())
    }

    /// Propagate the container's current size to the remote renderer.
    pub fn resize(&mut self) -> Result<(), ViewError> {
        let view_id = self.view_id;
        let (width, height) = self
            .container
            .as_ref()
            .map(|c| c.size())
            .ok_or(ViewError::NotBound)?;
        let link = self.bound_link()?;
        link.notify(
            METHOD_SIZE_UPDATE,
            vec![serde_json::json!({ "view": view_id, "width": width, "height": height })],
        )?;
        Ok(())
    }

    /// Route a mouse-wheel event to the remote zoom RPC.
    pub fn wheel(&mut self, spin_y: f64) -> Result<(), ViewError> {
        let method = self.options.wheel_rpc_method.clone();
        let view_id = self.view_id;
        let link = self.bound_link()?;
        link.notify(
            &method,
            vec![serde_json::json!({ "view": view_id, "spin_y": spin_y })],
        )?;
        Ok(())
    }

    /// Hand an image-stream frame to the container. With the default view id
    /// every frame is accepted; a concrete id only takes its own frames.
    pub fn present(&mut self, frame: &RenderFrame) {
        if self.view_id != DEFAULT_VIEW_ID && frame.view_id != self.view_id {
            debug!("frame for view {} dropped", frame.view_id);
            return;
        }
        if let Some(container) = self.container.as_mut() {
            container.present(frame);
        }
    }
}
