//! Remote View - the local surface mirroring a remotely rendered scene
//!
//! A [`RemoteView`] widget forwards interaction (wheel zoom, resize) to the
//! remote renderer as RPC calls and hands incoming image-stream frames to a
//! [`Surface`] without looking inside them. The [`ViewBinder`] wires a view
//! to the client published by `render_link` and owns the listener tasks so
//! unmounting removes them completely before it returns.

mod binder;
mod surface;
#[cfg(test)]
mod test_support;
mod view;

pub use binder::ViewBinder;
pub use surface::Surface;
pub use view::{DEFAULT_VIEW_ID, RemoteView, RemoteViewOptions, ViewError};
