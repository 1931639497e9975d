use super::sensor::PollSource;
use crate::error::SourceError;
use async_io::Timer;
use std::time::Duration;

pub(crate) struct Counter {
    name: String,
    delay: Duration,
    count: u64,
}

impl Counter {
    pub(crate) fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            count: 0,
        }
    }
}

impl PollSource for Counter {
    type Reading = u64;

    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&mut self) -> Result<u64, SourceError> {
        Timer::after(self.delay).await;
        self.count += 1;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_counter_increments_from_one() {
        let mut counter = Counter::new("sensor0", Duration::ZERO);
        smol::block_on(async {
            assert_eq!(counter.poll().await.unwrap(), 1);
            assert_eq!(counter.poll().await.unwrap(), 2);
            assert_eq!(counter.poll().await.unwrap(), 3);
        });
        assert_eq!(counter.name(), "sensor0");
    }

    #[test]
    fn test_counter_waits_for_its_delay() {
        let mut counter = Counter::new("slow", Duration::from_millis(30));
        let start = Instant::now();
        smol::block_on(counter.poll()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
