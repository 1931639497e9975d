mod test_pattern;
#[cfg(feature = "v4l")]
mod video4linux;

pub(crate) use test_pattern::TestPattern;
#[cfg(feature = "v4l")]
pub(crate) use video4linux::V4lDevice;

use super::sensor::PollSource;
use crate::error::{ConfigError, SourceError};
use crate::frame::{Frame, Resolution};
use std::fmt;
use std::io;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeviceId {
    TestPattern,
    Index(usize),
}

impl FromStr for DeviceId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "test" => Ok(DeviceId::TestPattern),
            other => other
                .parse()
                .map(DeviceId::Index)
                .map_err(|_| ConfigError::FrameSource(s.to_owned())),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::TestPattern => f.write_str("test"),
            DeviceId::Index(index) => write!(f, "/dev/video{index}"),
        }
    }
}

/// A blocking frame grabber. The handle is acquired when the device is
/// constructed and released when it is dropped.
pub(crate) trait CaptureDevice: Send + 'static {
    /// `Ok(None)` means the device is open but has no frame to give.
    fn read(&mut self) -> io::Result<Option<Frame>>;
}

impl CaptureDevice for Box<dyn CaptureDevice> {
    fn read(&mut self) -> io::Result<Option<Frame>> {
        (**self).read()
    }
}

pub(crate) struct Camera<D> {
    name: String,
    // Lent to the blocking pool for the duration of a read.
    device: Option<D>,
    resolution: Resolution,
}

impl<D: CaptureDevice> Camera<D> {
    pub(crate) fn new(name: impl Into<String>, device: D, resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            device: Some(device),
            resolution,
        }
    }
}

impl<D: CaptureDevice> PollSource for Camera<D> {
    type Reading = Frame;

    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&mut self) -> Result<Frame, SourceError> {
        let Some(mut device) = self.device.take() else {
            return Err(SourceError::unavailable(&self.name, "device lost during an interrupted read"));
        };
        let (device, read) = smol::unblock(move || {
            let read = device.read();
            (device, read)
        })
        .await;
        self.device = Some(device);

        match read {
            Ok(Some(frame)) => Ok(frame.resize(self.resolution)),
            Ok(None) => Err(SourceError::unavailable(&self.name, "device returned no frame")),
            Err(e) => Err(SourceError::unavailable(&self.name, e)),
        }
    }
}

/// Open the device named by `id`. A frame limit is only honoured by the
/// test pattern; asking for one on a real device is refused.
pub(crate) fn open(
    id: DeviceId,
    resolution: Resolution,
    max_frames: Option<u64>,
) -> Result<Camera<Box<dyn CaptureDevice>>, SourceError> {
    let name = id.to_string();
    if matches!(id, DeviceId::Index(_)) && max_frames.is_some() {
        return Err(SourceError::init_failed(name, "--max-frames only applies to --camera test"));
    }
    let device: Box<dyn CaptureDevice> = match id {
        DeviceId::TestPattern => {
            let pattern = TestPattern::new(resolution);
            Box::new(match max_frames {
                Some(limit) => pattern.with_frame_limit(limit),
                None => pattern,
            })
        }
        #[cfg(feature = "v4l")]
        DeviceId::Index(index) => Box::new(V4lDevice::open(index, resolution)?),
        #[cfg(not(feature = "v4l"))]
        DeviceId::Index(_) => {
            return Err(SourceError::init_failed(
                name,
                "built without the `v4l` feature; use --camera test",
            ))
        }
    };
    Ok(Camera::new(name, device, resolution))
}
