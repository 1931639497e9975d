use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("failed to open source `{name}`: {reason}")]
    InitFailed { name: String, reason: String },

    #[error("source `{name}` unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

impl SourceError {
    pub(crate) fn init_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InitFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unavailable(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error(transparent)]
    Init(#[from] SourceError),

    #[error("frame source `{name}` stopped producing frames")]
    FrameExhausted {
        name: String,
        #[source]
        cause: SourceError,
    },
}

#[derive(Debug, Error)]
pub(crate) enum RenderFault {
    #[error("malformed frame {width}x{height} with {len} bytes")]
    MalformedFrame { width: u32, height: u32, len: usize },

    #[error("display failed")]
    Display(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ConfigError {
    #[error("resolution `{0}` is not of the form WIDTHxHEIGHT with non-zero sides")]
    Resolution(String),

    #[error("render rate must be a positive number of ticks per second, got `{0}`")]
    RenderRate(String),

    #[error("delay must be a non-negative number of seconds, got `{0}`")]
    Delay(String),

    #[error("queue capacity must be at least 1")]
    Capacity,

    #[error("camera `{0}` is neither `test` nor a device index")]
    FrameSource(String),
}
