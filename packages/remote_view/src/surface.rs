use render_link::RenderFrame;

/// The container a view attaches to.
///
/// The DOM-element analog: it receives encoded image-stream frames (decoding
/// and display are the implementor's business) and reports the size the view
/// propagates to the remote renderer on resize.
pub trait Surface: Send {
    /// Show a frame. The payload is still encoded; implementors that only
    /// track throughput can ignore the bytes.
    fn present(&mut self, frame: &RenderFrame);

    /// Current size in surface units (width, height).
    fn size(&self) -> (u32, u32);
}
