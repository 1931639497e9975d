use super::CaptureDevice;
use crate::frame::{Frame, Resolution};
use image::{Rgb, RgbImage};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::debug;

// Roughly a 30 fps device.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Synthetic camera producing a diagonal gradient that scrolls one step per
/// frame. With a frame limit it behaves like a device that goes dark.
pub(crate) struct TestPattern {
    resolution: Resolution,
    produced: u64,
    limit: Option<u64>,
}

impl TestPattern {
    pub(crate) fn new(resolution: Resolution) -> Self {
        debug!(%resolution, "test pattern opened");
        Self {
            resolution,
            produced: 0,
            limit: None,
        }
    }

    pub(crate) fn with_frame_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn render(&self) -> Frame {
        let Resolution { width, height } = self.resolution;
        let (w, h) = (u64::from(width.max(1)), u64::from(height.max(1)));
        let shift = self.produced % w;
        Frame::from_image(RgbImage::from_fn(width, height, |x, y| {
            let (x, y) = (u64::from(x), u64::from(y));
            let r = (x + shift) % w * 255 / w;
            let g = y * 255 / h;
            let b = (x + y + shift) % 256;
            Rgb([r as u8, g as u8, b as u8])
        }))
    }
}

impl CaptureDevice for TestPattern {
    fn read(&mut self) -> io::Result<Option<Frame>> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        thread::sleep(FRAME_INTERVAL);
        let frame = self.render();
        self.produced += 1;
        Ok(Some(frame))
    }
}

impl Drop for TestPattern {
    fn drop(&mut self) {
        debug!(frames = self.produced, "test pattern released");
    }
}
