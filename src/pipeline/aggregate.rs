use super::queue::LatestReceiver;
use crate::display::{compose, Display};
use crate::error::{PipelineError, RenderFault};
use crate::frame::Frame;
use crate::quit::QuitSignal;
use crate::sens::{PollSource, Reading};
use async_io::Timer;
use chrono::{DateTime, Utc};
use smol::stream::StreamExt;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, trace};

pub(crate) struct Feed<T> {
    label: String,
    queue: LatestReceiver<Reading<T>>,
    latest: T,
    updated_at: Option<DateTime<Utc>>,
}

impl<T: Default> Feed<T> {
    pub(crate) fn new(label: impl Into<String>, queue: LatestReceiver<Reading<T>>) -> Self {
        Self {
            label: label.into(),
            queue,
            latest: T::default(),
            updated_at: None,
        }
    }
}

impl<T> Feed<T> {
    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn latest(&self) -> &T {
        &self.latest
    }

    #[cfg(test)]
    pub(crate) fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Take at most one reading off the queue. An empty queue keeps the
    /// previous value.
    fn refresh(&mut self) -> bool {
        match self.queue.try_pop() {
            Some(reading) => {
                trace!(feed = %self.label, at = %reading.timestamp, backlog = self.queue.len(), "snapshot updated");
                self.latest = reading.value;
                self.updated_at = Some(reading.timestamp);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Running,
    Stopped,
}

pub(crate) struct Aggregator<F, D, Q, T> {
    window: String,
    frame_source: F,
    display: D,
    quit: Q,
    feeds: Vec<Feed<T>>,
    period: Duration,
    state: State,
    ticks: u64,
    render_faults: u64,
}

impl<F, D, Q, T> Aggregator<F, D, Q, T>
where
    F: PollSource<Reading = Frame>,
    D: Display,
    Q: QuitSignal,
    T: fmt::Display,
{
    pub(crate) fn new(
        window: impl Into<String>,
        frame_source: F,
        display: D,
        quit: Q,
        feeds: Vec<Feed<T>>,
        period: Duration,
    ) -> Self {
        Self {
            window: window.into(),
            frame_source,
            display,
            quit,
            feeds,
            period,
            state: State::Stopped,
            ticks: 0,
            render_faults: 0,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn render_faults(&self) -> u64 {
        self.render_faults
    }

    #[cfg(test)]
    pub(crate) fn feeds(&self) -> &[Feed<T>] {
        &self.feeds
    }

    #[cfg(test)]
    pub(crate) fn display(&self) -> &D {
        &self.display
    }

    /// Tick until quit is requested (`Ok`) or the frame source runs dry
    /// ([`PipelineError::FrameExhausted`]). Render faults are logged and
    /// skipped.
    pub(crate) async fn run(&mut self) -> Result<(), PipelineError> {
        let mut ticker = Timer::interval(self.period);
        self.state = State::Running;
        info!(window = %self.window, feeds = self.feeds.len(), period = ?self.period, "aggregation started");

        let result = loop {
            ticker.next().await;
            if let Err(e) = self.tick().await {
                break Err(e);
            }
            if self.quit.requested() {
                info!(ticks = self.ticks, "quit requested");
                break Ok(());
            }
        };

        self.state = State::Stopped;
        result
    }

    async fn tick(&mut self) -> Result<(), PipelineError> {
        self.ticks += 1;
        let frame = match self.frame_source.poll().await {
            Ok(frame) => frame,
            Err(cause) => {
                error!(tick = self.ticks, error = %cause, "unable to read the input");
                return Err(PipelineError::FrameExhausted {
                    name: self.frame_source.name().to_owned(),
                    cause,
                });
            }
        };

        for feed in &mut self.feeds {
            feed.refresh();
        }

        if let Err(fault) = self.render(frame) {
            self.render_faults += 1;
            error!(tick = self.ticks, error = %fault, "render failed");
        }
        Ok(())
    }

    fn render(&mut self, frame: Frame) -> Result<(), RenderFault> {
        let composed = compose(frame, self.feeds.iter().map(|f| (f.label(), f.latest())))?;
        self.display.present(&self.window, &composed)
    }
}
