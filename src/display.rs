mod overlay;
mod terminal;

pub(crate) use overlay::{compose, ComposedFrame};
pub(crate) use terminal::TerminalDisplay;

use crate::error::RenderFault;
use tracing::trace;

pub(crate) trait Display {
    fn present(&mut self, window: &str, frame: &ComposedFrame) -> Result<(), RenderFault>;
}

#[derive(Debug, Default)]
pub(crate) struct Headless {
    presented: u64,
}

impl Display for Headless {
    fn present(&mut self, window: &str, frame: &ComposedFrame) -> Result<(), RenderFault> {
        self.presented += 1;
        let overlay: Vec<&str> = frame.annotations.iter().map(|a| a.text.as_str()).collect();
        trace!(
            window,
            frame = self.presented,
            resolution = %frame.frame.resolution(),
            ?overlay,
            "frame presented"
        );
        Ok(())
    }
}
