//! Render Link - remote render session connection lifecycle
//!
//! This crate owns the client side of a WebSocket link to a remote rendering
//! service: connect handshake, busy tracking, error/close observation, the
//! post-connect initialization call, and real teardown. It knows nothing
//! about pixels; image-stream frames are opaque payloads handed to whoever
//! subscribes (see the `remote_view` crate for the view widget).
//!
//! # Example
//!
//! ```no_run
//! use render_link::{ConnectionManager, LinkConfig, ProtocolSet};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LinkConfig::default();
//!     let mut manager = ConnectionManager::new(config, ProtocolSet::default());
//!     let (mut client_rx, busy_rx) = manager.acquire();
//!
//!     // The host shows a loading state while `busy` and no client yet.
//!     client_rx.changed().await.unwrap();
//!     if let Some(link) = client_rx.borrow().clone() {
//!         println!("session {}", link.connection().session().id());
//!     }
//!
//!     manager.shutdown().await;
//! }
//! ```

mod busy;
mod client;
pub mod config;
mod error;
mod manager;
mod session;
pub mod transport;
pub mod wire;

pub use busy::{BusyGuard, BusyTracker};
pub use client::{LinkClient, LinkEvent, LinkHandle, Remote};
pub use config::{FileConfig, LinkConfig, Profile, ViewConfig, load_config};
pub use error::{LinkError, payload_message};
pub use manager::ConnectionManager;
pub use session::{Connection, ProtocolSet, Session, SessionId};
pub use wire::{RenderFrame, WireMessage};
