use crate::error::RenderFault;
use crate::frame::Frame;

// Annotation rows start this far left of the right edge.
const RIGHT_MARGIN: u32 = 250;
const BOTTOM_MARGIN: u32 = 10;
const LINE_HEIGHT: u32 = 30;

const PALETTE: [[u8; 3]; 3] = [[255, 255, 255], [0, 0, 255], [255, 0, 0]];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Annotation {
    pub(crate) text: String,
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) color: [u8; 3],
}

#[derive(Debug, Clone)]
pub(crate) struct ComposedFrame {
    pub(crate) frame: Frame,
    pub(crate) annotations: Vec<Annotation>,
}

/// Pin one `label: value` annotation per entry near the bottom-right corner,
/// first entry on top, each entry in its own row and colour.
pub(crate) fn compose<I, L, V>(frame: Frame, entries: I) -> Result<ComposedFrame, RenderFault>
where
    I: IntoIterator<Item = (L, V)>,
    I::IntoIter: ExactSizeIterator,
    L: AsRef<str>,
    V: std::fmt::Display,
{
    if !frame.is_well_formed() {
        return Err(RenderFault::MalformedFrame {
            width: frame.width(),
            height: frame.height(),
            len: frame.len(),
        });
    }

    let entries = entries.into_iter();
    let rows = entries.len() as u32;
    let x = frame.width().saturating_sub(RIGHT_MARGIN);
    let annotations = entries
        .enumerate()
        .map(|(i, (label, value))| {
            let from_bottom = rows - 1 - i as u32;
            Annotation {
                text: format!("{}: {}", label.as_ref(), value),
                x,
                y: frame
                    .height()
                    .saturating_sub(BOTTOM_MARGIN + LINE_HEIGHT * from_bottom),
                color: PALETTE[i % PALETTE.len()],
            }
        })
        .collect();

    Ok(ComposedFrame { frame, annotations })
}
