use serde::{Deserialize, Serialize};

/// RPC method for the post-connect initialization call. Sets up the
/// server-side visualization pipeline for the named application.
pub const METHOD_INITIALIZE: &str = "vtk.initialize";

/// RPC method that starts the image stream for a session.
pub const METHOD_IMAGE_PUSH_OBSERVER_ADD: &str = "viewport.image.push.observer.add";

/// RPC method requesting a fresh image of a view.
pub const METHOD_IMAGE_PUSH: &str = "viewport.image.push";

/// Default RPC routing for mouse-wheel zoom events.
pub const METHOD_MOUSE_ZOOM_WHEEL: &str = "viewport.mouse.zoom.wheel";

/// RPC method propagating a view resize to the remote renderer.
pub const METHOD_SIZE_UPDATE: &str = "viewport.size.update";

/// Control messages exchanged with the render server as WebSocket text
/// frames. Image payloads travel as separate binary frames, each announced
/// by a `Frame` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// First message from the client: application id + protocol capability set.
    Hello {
        application: String,
        protocols: Vec<String>,
    },
    /// Handshake reply carrying the negotiated session.
    Welcome { session_id: String },
    /// RPC request.
    Call {
        id: u64,
        method: String,
        args: Vec<serde_json::Value>,
    },
    /// RPC success reply.
    Reply { id: u64, result: serde_json::Value },
    /// RPC failure reply.
    Fault { id: u64, error: String },
    /// Image-frame header; the next binary frame carries the encoded payload.
    Frame {
        view_id: i64,
        width: u32,
        height: u32,
        format: String,
    },
    /// Server-side notice (error detail for a live session).
    Notice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// A complete image-stream frame: header plus the opaque encoded payload.
/// Decoding is the consumer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    pub view_id: i64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_serde() {
        let msg = WireMessage::Hello {
            application: "Cone".to_string(),
            protocols: vec!["viewport.mouse".to_string()],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Hello");
        assert_eq!(json["application"], "Cone");
        assert_eq!(json["protocols"][0], "viewport.mouse");
        let rt: WireMessage = serde_json::from_value(json).unwrap();
        match rt {
            WireMessage::Hello { application, .. } => assert_eq!(application, "Cone"),
            _ => panic!("Expected Hello"),
        }
    }

    #[test]
    fn welcome_serde() {
        let msg = WireMessage::Welcome {
            session_id: "sess-1".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Welcome");
        assert_eq!(json["session_id"], "sess-1");
    }

    #[test]
    fn call_serde() {
        let msg = WireMessage::Call {
            id: 7,
            method: METHOD_INITIALIZE.to_string(),
            args: vec![serde_json::json!("Cone")],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Call");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "vtk.initialize");
        let rt: WireMessage = serde_json::from_value(json).unwrap();
        match rt {
            WireMessage::Call { id, method, args } => {
                assert_eq!(id, 7);
                assert_eq!(method, METHOD_INITIALIZE);
                assert_eq!(args.len(), 1);
            }
            _ => panic!("Expected Call"),
        }
    }

    #[test]
    fn fault_serde() {
        let msg = WireMessage::Fault {
            id: 3,
            error: "no such method".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Fault");
        assert_eq!(json["error"], "no such method");
    }

    #[test]
    fn frame_header_serde() {
        let msg = WireMessage::Frame {
            view_id: -1,
            width: 800,
            height: 600,
            format: "jpeg".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Frame");
        assert_eq!(json["view_id"], -1);
        assert_eq!(json["width"], 800);
        let rt: WireMessage = serde_json::from_value(json).unwrap();
        match rt {
            WireMessage::Frame { view_id, .. } => assert_eq!(view_id, -1),
            _ => panic!("Expected Frame"),
        }
    }

    #[test]
    fn notice_without_error_skips_field() {
        let msg = WireMessage::Notice { error: None };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Notice");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn notice_with_error_serde() {
        let msg = WireMessage::Notice {
            error: Some("render process died".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["error"], "render process died");
    }

    #[test]
    fn roundtrip_all_variants() {
        let variants: Vec<WireMessage> = vec![
            WireMessage::Hello {
                application: "x".into(),
                protocols: vec![],
            },
            WireMessage::Welcome {
                session_id: "s".into(),
            },
            WireMessage::Call {
                id: 0,
                method: "m".into(),
                args: vec![],
            },
            WireMessage::Reply {
                id: 0,
                result: serde_json::Value::Null,
            },
            WireMessage::Fault {
                id: 0,
                error: "e".into(),
            },
            WireMessage::Frame {
                view_id: 1,
                width: 2,
                height: 3,
                format: "jpeg".into(),
            },
            WireMessage::Notice { error: None },
        ];
        for msg in variants {
            let json_str = serde_json::to_string(&msg).unwrap();
            let _: WireMessage = serde_json::from_str(&json_str).unwrap();
        }
    }
}
