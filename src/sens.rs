pub(crate) mod camera;
mod counter;
mod sensor;

pub(crate) use camera::DeviceId;
pub(crate) use counter::Counter;
pub(crate) use sensor::PollSource;

use chrono::Utc;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reading<T> {
    pub(crate) timestamp: chrono::DateTime<Utc>,
    pub(crate) value: T,
}

impl<T> Reading<T> {
    pub(crate) fn now(value: T) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
        }
    }
}
