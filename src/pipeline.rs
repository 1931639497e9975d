mod aggregate;
mod producer;
mod queue;

pub(crate) use aggregate::{Aggregator, Feed};
pub(crate) use producer::{Producer, ProducerExit, ProducerReport};
pub(crate) use queue::latest;

use crate::config::Config;
use crate::display::Display;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::quit::QuitSignal;
use crate::sens::{camera, Counter, PollSource};
use async_broadcast::{InactiveReceiver, Sender};
use smol_macros::Executor;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub(crate) const WINDOW: &str = "sens-overlay";

#[derive(Debug)]
pub(crate) struct Shutdown {
    pub(crate) outcome: Result<(), PipelineError>,
    pub(crate) ticks: u64,
    pub(crate) render_faults: u64,
    pub(crate) producers: Vec<ProducerReport>,
}

pub(crate) struct Supervisor<'a, 'ex> {
    ex: &'a Executor<'ex>,
    shutdown: Sender<()>,
    subscriber: InactiveReceiver<()>,
    producers: Vec<smol::Task<ProducerReport>>,
}

impl<'a, 'ex> Supervisor<'a, 'ex> {
    pub(crate) fn new(ex: &'a Executor<'ex>) -> Self {
        let (shutdown, receiver) = async_broadcast::broadcast(1);
        Self {
            ex,
            shutdown,
            subscriber: receiver.deactivate(),
            producers: Vec::new(),
        }
    }

    pub(crate) fn add_sensor<S>(&mut self, source: S, capacity: usize, pace: Duration) -> Feed<S::Reading>
    where
        S: PollSource + Send + 'static,
        S::Reading: Default,
    {
        let label = source.name().to_owned();
        let (sender, receiver) = latest(capacity);
        let producer = Producer::new(source, sender, pace, self.subscriber.activate_cloned());
        self.producers.push(producer.spawn(self.ex));
        Feed::new(label, receiver)
    }

    /// Run `aggregator` to completion on the calling task, then cancel every
    /// producer and wait for all of them to stop.
    pub(crate) async fn run<F, D, Q, T>(self, mut aggregator: Aggregator<F, D, Q, T>) -> Shutdown
    where
        F: PollSource<Reading = Frame>,
        D: Display,
        Q: QuitSignal,
        T: fmt::Display,
    {
        let outcome = aggregator.run().await;
        debug!(state = ?aggregator.state(), "aggregation returned");
        let ticks = aggregator.ticks();
        let render_faults = aggregator.render_faults();
        // Releases the frame device and the display.
        drop(aggregator);

        info!(producers = self.producers.len(), "stopping producers");
        self.shutdown.close();
        let mut producers = Vec::with_capacity(self.producers.len());
        for task in self.producers {
            let report = task.await;
            debug!(source = %report.name, exit = ?report.exit, "producer joined");
            producers.push(report);
        }

        Shutdown {
            outcome,
            ticks,
            render_faults,
            producers,
        }
    }
}

/// Open every source named by `config` and run the pipeline until quit or
/// frame loss. Only source initialisation errors are returned as `Err`.
pub(crate) async fn run<D, Q>(
    ex: &Executor<'_>,
    config: &Config,
    display: D,
    quit: Q,
) -> Result<Shutdown, PipelineError>
where
    D: Display,
    Q: QuitSignal,
{
    // Everything that can fail at startup happens before any task exists.
    let camera = camera::open(config.camera, config.resolution, config.max_frames)?;
    info!(camera = %config.camera, resolution = %config.resolution, "frame source opened");

    let mut supervisor = Supervisor::new(ex);
    let feeds = config
        .sensor_delays()
        .into_iter()
        .enumerate()
        .map(|(i, delay)| {
            let counter = Counter::new(format!("Sensor{i}"), delay);
            supervisor.add_sensor(counter, config.queue_capacity, config.sensor_pace())
        })
        .collect();

    let aggregator = Aggregator::new(WINDOW, camera, display, quit, feeds, config.render_period());
    Ok(supervisor.run(aggregator).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{ComposedFrame, Headless};
    use crate::error::{RenderFault, SourceError};
    use crate::frame::Resolution;
    use async_io::Timer;
    use clap::Parser;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Frame source that fails on tick `fail_on` and counts its release.
    struct FailingCamera {
        polls: u64,
        fail_on: u64,
        released: Arc<AtomicUsize>,
    }

    impl PollSource for FailingCamera {
        type Reading = Frame;

        fn name(&self) -> &str {
            "camera"
        }

        async fn poll(&mut self) -> Result<Frame, SourceError> {
            self.polls += 1;
            if self.polls >= self.fail_on {
                return Err(SourceError::unavailable("camera", "device returned no frame"));
            }
            Ok(Frame::filled(Resolution::new(64, 48), [0, 0, 0]))
        }
    }

    impl Drop for FailingCamera {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SteadyCamera;

    impl PollSource for SteadyCamera {
        type Reading = Frame;

        fn name(&self) -> &str {
            "steady"
        }

        async fn poll(&mut self) -> Result<Frame, SourceError> {
            Timer::after(Duration::from_millis(5)).await;
            Ok(Frame::filled(Resolution::new(64, 48), [0, 0, 0]))
        }
    }

    struct Broken;

    impl PollSource for Broken {
        type Reading = u64;

        fn name(&self) -> &str {
            "broken"
        }

        async fn poll(&mut self) -> Result<u64, SourceError> {
            Timer::after(Duration::from_millis(2)).await;
            Err(SourceError::unavailable("broken", "no ack"))
        }
    }

    #[derive(Clone, Default)]
    struct LastOverlay(Arc<Mutex<Vec<String>>>);

    impl Display for LastOverlay {
        fn present(&mut self, _window: &str, frame: &ComposedFrame) -> Result<(), RenderFault> {
            let texts = frame.annotations.iter().map(|a| a.text.clone()).collect();
            if let Ok(mut last) = self.0.lock() {
                *last = texts;
            }
            Ok(())
        }
    }

    struct Never;

    impl QuitSignal for Never {
        fn requested(&mut self) -> bool {
            false
        }
    }

    struct QuitAfter(Duration, std::time::Instant);

    impl QuitSignal for QuitAfter {
        fn requested(&mut self) -> bool {
            self.1.elapsed() >= self.0
        }
    }

    fn value_of(text: &str) -> u64 {
        text.rsplit(": ").next().and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    #[test]
    fn test_frame_loss_cancels_every_producer() {
        let ex = Executor::new();
        let released = Arc::new(AtomicUsize::new(0));

        let shutdown = smol::block_on(ex.run(async {
            let mut supervisor = Supervisor::new(&ex);
            let feeds = vec![
                supervisor.add_sensor(Counter::new("Sensor0", Duration::from_millis(1)), 10, Duration::ZERO),
                supervisor.add_sensor(Counter::new("Sensor1", Duration::from_secs(60)), 10, Duration::ZERO),
            ];
            let camera = FailingCamera {
                polls: 0,
                fail_on: 5,
                released: released.clone(),
            };
            let aggregator = Aggregator::new(WINDOW, camera, Headless::default(), Never, feeds, Duration::from_millis(2));
            supervisor.run(aggregator).await
        }));

        assert!(matches!(shutdown.outcome, Err(PipelineError::FrameExhausted { .. })));
        assert_eq!(shutdown.ticks, 5);
        assert_eq!(shutdown.producers.len(), 2);
        assert!(shutdown
            .producers
            .iter()
            .all(|p| p.exit == ProducerExit::Cancelled));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_sensor_is_isolated() {
        let ex = Executor::new();
        let overlay = LastOverlay::default();

        let shutdown = smol::block_on(ex.run(async {
            let mut supervisor = Supervisor::new(&ex);
            let feeds = vec![
                supervisor.add_sensor(Counter::new("Sensor0", Duration::from_millis(2)), 2, Duration::ZERO),
                supervisor.add_sensor(Broken, 2, Duration::ZERO),
            ];
            let quit = QuitAfter(Duration::from_millis(150), std::time::Instant::now());
            let aggregator = Aggregator::new(WINDOW, SteadyCamera, overlay.clone(), quit, feeds, Duration::from_millis(5));
            supervisor.run(aggregator).await
        }));

        assert!(shutdown.outcome.is_ok());
        let broken = &shutdown.producers[1];
        assert_eq!(broken.polls, 0);
        assert!(broken.failures > 0);
        assert_eq!(broken.exit, ProducerExit::Cancelled);

        let counter = &shutdown.producers[0];
        assert!(counter.polls > 0);
        assert_eq!(counter.failures, 0);

        let last = overlay.0.lock().unwrap().clone();
        assert!(value_of(&last[0]) > 0);
        assert_eq!(last[1], "broken: 0");
    }

    #[test]
    fn test_fast_sensor_outpaces_slow_sensor() {
        let ex = Executor::new();
        let overlay = LastOverlay::default();

        let shutdown = smol::block_on(ex.run(async {
            let mut supervisor = Supervisor::new(&ex);
            let feeds = vec![
                supervisor.add_sensor(Counter::new("Sensor0", Duration::from_millis(10)), 10, Duration::ZERO),
                supervisor.add_sensor(Counter::new("Sensor2", Duration::from_secs(1)), 10, Duration::ZERO),
            ];
            let quit = QuitAfter(Duration::from_secs(2), std::time::Instant::now());
            let aggregator = Aggregator::new(WINDOW, SteadyCamera, overlay.clone(), quit, feeds, Duration::from_millis(5));
            supervisor.run(aggregator).await
        }));

        assert!(shutdown.outcome.is_ok());
        assert!(shutdown.producers.iter().all(|p| p.exit == ProducerExit::Cancelled));
        let last = overlay.0.lock().unwrap().clone();
        let (fast, slow) = (value_of(&last[0]), value_of(&last[1]));
        assert!(slow >= 1);
        assert!(fast > slow, "fast = {fast}, slow = {slow}");
    }

    fn config(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("sens-overlay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_unopenable_camera_aborts_before_any_task() {
        let ex = Executor::new();
        let config = config(&["--camera", "0", "--max-frames", "3", "--headless"]);

        let result = smol::block_on(ex.run(run(&ex, &config, Headless::default(), Never)));

        assert!(matches!(result, Err(PipelineError::Init(SourceError::InitFailed { .. }))));
        assert!(ex.is_empty());
    }

    #[test]
    fn test_test_pattern_runs_dry_after_frame_limit() {
        let ex = Executor::new();
        let config = config(&[
            "--camera",
            "test",
            "--max-frames",
            "3",
            "--resolution",
            "32x24",
            "--sensor-delay",
            "0.01,1",
            "--headless",
        ]);

        let shutdown = smol::block_on(ex.run(run(&ex, &config, Headless::default(), Never))).unwrap();

        assert!(matches!(
            shutdown.outcome,
            Err(PipelineError::FrameExhausted { ref name, .. }) if name == "test"
        ));
        assert_eq!(shutdown.ticks, 4);
        assert_eq!(shutdown.render_faults, 0);
        let names: Vec<&str> = shutdown.producers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sensor0", "Sensor1"]);
        assert!(shutdown.producers.iter().all(|p| p.exit == ProducerExit::Cancelled));
    }
}
