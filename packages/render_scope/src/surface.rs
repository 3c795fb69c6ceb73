use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::info;

use remote_view::Surface;
use render_link::RenderFrame;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Headless container: tracks the terminal size and reports stream
/// throughput. Frame payloads stay encoded; decoding and display belong to
/// a real renderer host.
pub struct StatsSurface {
    size_rx: watch::Receiver<(u32, u32)>,
    frames: u64,
    bytes: u64,
    last_report: Instant,
}

impl StatsSurface {
    pub fn new(size_rx: watch::Receiver<(u32, u32)>) -> Self {
        Self {
            size_rx,
            frames: 0,
            bytes: 0,
            last_report: Instant::now(),
        }
    }
}

impl Surface for StatsSurface {
    fn present(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        self.bytes += frame.data.len() as u64;
        if self.last_report.elapsed() >= REPORT_INTERVAL {
            info!(
                "stream: {} frames, {} KiB total, latest {}x{} {}",
                self.frames,
                self.bytes / 1024,
                frame.width,
                frame.height,
                frame.format,
            );
            self.last_report = Instant::now();
        }
    }

    fn size(&self) -> (u32, u32) {
        *self.size_rx.borrow()
    }
}
