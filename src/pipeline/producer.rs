use super::queue::LatestSender;
use crate::sens::{PollSource, Reading};
use async_broadcast::{Receiver, TryRecvError};
use async_io::Timer;
use futures_lite::{future, FutureExt};
use smol_macros::Executor;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProducerExit {
    Cancelled,
    /// The source panicked; only this producer went down.
    Crashed,
}

#[derive(Debug, Clone)]
pub(crate) struct ProducerReport {
    pub(crate) name: String,
    pub(crate) polls: u64,
    pub(crate) failures: u64,
    pub(crate) dropped: u64,
    pub(crate) exit: ProducerExit,
}

pub(crate) struct Producer<S: PollSource> {
    source: S,
    queue: LatestSender<Reading<S::Reading>>,
    pace: Duration,
    shutdown: Receiver<()>,
}

impl<S> Producer<S>
where
    S: PollSource + Send + 'static,
{
    /// `pace` is an extra sleep between polls; zero leaves pacing to the
    /// source. Any message on, or closing of, `shutdown` stops the loop.
    pub(crate) fn new(
        source: S,
        queue: LatestSender<Reading<S::Reading>>,
        pace: Duration,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            source,
            queue,
            pace,
            shutdown,
        }
    }

    pub(crate) fn spawn(self, ex: &Executor<'_>) -> smol::Task<ProducerReport> {
        ex.spawn(self.run())
    }

    pub(crate) async fn run(self) -> ProducerReport {
        let Producer {
            mut source,
            queue,
            pace,
            mut shutdown,
        } = self;
        let name = source.name().to_owned();
        let mut polls = 0;
        let mut failures = 0;
        debug!(source = %name, capacity = queue.capacity(), ?pace, "producer started");

        let exit = loop {
            if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
                break ProducerExit::Cancelled;
            }

            let polled = future::or(
                async { Some(AssertUnwindSafe(source.poll()).catch_unwind().await) },
                async {
                    let _ = shutdown.recv().await;
                    None
                },
            )
            .await;

            match polled {
                None => break ProducerExit::Cancelled,
                Some(Ok(Ok(value))) => {
                    polls += 1;
                    queue.push(Reading::now(value));
                }
                Some(Ok(Err(e))) => {
                    failures += 1;
                    warn!(source = %name, error = %e, "poll failed");
                }
                Some(Err(_)) => {
                    error!(source = %name, "source panicked, producer stopped");
                    break ProducerExit::Crashed;
                }
            }

            if !pace.is_zero() {
                let cancelled = future::or(
                    async {
                        Timer::after(pace).await;
                        false
                    },
                    async {
                        let _ = shutdown.recv().await;
                        true
                    },
                )
                .await;
                if cancelled {
                    break ProducerExit::Cancelled;
                }
            }
        };

        debug!(source = %name, polls, failures, ?exit, "producer stopped");
        ProducerReport {
            name,
            polls,
            failures,
            dropped: queue.dropped(),
            exit,
        }
    }
}
