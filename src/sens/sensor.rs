use std::future::Future;

use crate::error::SourceError;

/// Something a producer can poll for readings.
///
/// Implementations own whatever device sits behind them; acquiring it is the
/// constructor's job and a failure there is [`SourceError::InitFailed`].
/// `poll` only ever reports [`SourceError::Unavailable`].
pub(crate) trait PollSource {
    type Reading: Send + 'static;

    fn name(&self) -> &str;

    fn poll(&mut self) -> impl Future<Output = Result<Self::Reading, SourceError>> + Send;
}
