use super::CaptureDevice;
use crate::error::SourceError;
use crate::frame::{Frame, Resolution};
use ::v4l::buffer::Type;
use ::v4l::io::mmap::Stream;
use ::v4l::io::traits::CaptureStream;
use ::v4l::video::Capture;
use ::v4l::{Device, FourCC};
use std::io;
use tracing::{debug, warn};

const BUFFER_COUNT: u32 = 4;
const YUYV: &[u8; 4] = b"YUYV";

pub(crate) struct V4lDevice {
    // Declared before `_device` so the stream is torn down first.
    stream: Stream<'static>,
    width: u32,
    height: u32,
    _device: Device,
}

impl V4lDevice {
    pub(crate) fn open(index: usize, resolution: Resolution) -> Result<Self, SourceError> {
        let name = format!("/dev/video{index}");
        let device = Device::new(index).map_err(|e| SourceError::init_failed(&name, e))?;

        let mut format = device
            .format()
            .map_err(|e| SourceError::init_failed(&name, e))?;
        format.width = resolution.width;
        format.height = resolution.height;
        format.fourcc = FourCC::new(YUYV);
        let format = device
            .set_format(&format)
            .map_err(|e| SourceError::init_failed(&name, e))?;
        if format.fourcc != FourCC::new(YUYV) {
            return Err(SourceError::init_failed(
                &name,
                format!("device does not offer YUYV, got {}", format.fourcc),
            ));
        }
        if format.width != resolution.width || format.height != resolution.height {
            warn!(
                device = %name,
                requested = %resolution,
                granted = %Resolution::new(format.width, format.height),
                "device picked a different resolution"
            );
        }

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| SourceError::init_failed(&name, e))?;
        debug!(device = %name, "capture stream started");

        Ok(Self {
            stream,
            width: format.width,
            height: format.height,
            _device: device,
        })
    }
}

impl CaptureDevice for V4lDevice {
    fn read(&mut self) -> io::Result<Option<Frame>> {
        let (buf, meta) = self.stream.next()?;
        if meta.bytesused == 0 {
            return Ok(None);
        }
        let used = (meta.bytesused as usize).min(buf.len());
        Ok(Some(yuyv_to_rgb(&buf[..used], self.width, self.height)))
    }
}

/// Convert packed YUYV 4:2:2 to RGB8 (BT.601). Short buffers produce a
/// malformed frame rather than a panic.
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Frame {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for chunk in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        pixels.extend_from_slice(&ycbcr(y0, u, v));
        pixels.extend_from_slice(&ycbcr(y1, u, v));
    }
    Frame::new(width, height, pixels)
}

fn ycbcr(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e),
        clamp(298 * c - 100 * d - 208 * e),
        clamp(298 * c + 516 * d),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_black_and_white() {
        let frame = yuyv_to_rgb(&[16, 128, 235, 128], 2, 1);
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.pixel(1, 0), Some([255, 255, 255]));
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let frame = yuyv_to_rgb(&[16, 128, 235, 128], 4, 4);
        assert!(!frame.is_well_formed());
    }
}
