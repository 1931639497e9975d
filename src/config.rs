use crate::error::ConfigError;
use crate::frame::Resolution;
use crate::sens::DeviceId;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Live video with the latest sensor readings drawn on top.
#[derive(Debug, Parser)]
#[command(name = "sens-overlay", version, about)]
pub(crate) struct Config {
    /// Frame source: a V4L2 device index, or `test` for a synthetic pattern.
    #[arg(long, value_name = "ID", default_value = "0")]
    pub(crate) camera: DeviceId,

    /// Resolution frames are normalized to.
    #[arg(long, value_name = "WxH", default_value = "1280x720")]
    pub(crate) resolution: Resolution,

    /// Render rate in ticks per second.
    #[arg(long, value_name = "HZ", default_value = "100", value_parser = parse_rate)]
    pub(crate) frequency: f64,

    /// Simulated acquisition latency of each counter sensor, in seconds.
    /// One sensor is started per value.
    #[arg(
        long = "sensor-delay",
        value_name = "SECS",
        value_delimiter = ',',
        default_values = ["0.01", "0.1", "1"],
        value_parser = parse_seconds
    )]
    pub(crate) sensor_delays: Vec<Duration>,

    /// Extra pause between two polls of the same sensor, in seconds.
    #[arg(long, value_name = "SECS", default_value = "0", value_parser = parse_seconds)]
    pub(crate) sensor_pace: Duration,

    /// Capacity of each sensor queue; the oldest reading is dropped when full.
    #[arg(long, value_name = "N", default_value = "2", value_parser = parse_capacity)]
    pub(crate) queue_capacity: usize,

    /// Stop the test pattern after this many frames.
    #[arg(long, value_name = "N")]
    pub(crate) max_frames: Option<u64>,

    /// Do not draw to the terminal; frames only reach the log.
    #[arg(long)]
    pub(crate) headless: bool,

    /// Directory holding `errors.log`.
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub(crate) log_dir: PathBuf,
}

impl Config {
    pub(crate) fn render_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency)
    }

    pub(crate) fn sensor_delays(&self) -> Vec<Duration> {
        self.sensor_delays.clone()
    }

    pub(crate) fn sensor_pace(&self) -> Duration {
        self.sensor_pace
    }
}

fn parse_rate(s: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::RenderRate(s.to_owned());
    let rate: f64 = s.trim().parse().map_err(|_| invalid())?;
    if rate.is_finite() && rate > 0.0 && Duration::try_from_secs_f64(1.0 / rate).is_ok() {
        Ok(rate)
    } else {
        Err(invalid())
    }
}

fn parse_seconds(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Delay(s.to_owned());
    let secs: f64 = s.trim().parse().map_err(|_| invalid())?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

fn parse_capacity(s: &str) -> Result<usize, ConfigError> {
    match s.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::Capacity),
        Ok(n) => Ok(n),
    }
}
