use super::{ComposedFrame, Display};
use crate::error::RenderFault;
use crate::frame::Resolution;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{self, BufWriter, Stdout, Write};

// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: char = '\u{2580}';

/// Renders frames into the terminal in true colour, two pixel rows per
/// text row, with the last row kept for a status line.
///
/// Opening puts the terminal in raw mode on the alternate screen; dropping
/// restores it.
pub(crate) struct TerminalDisplay {
    out: BufWriter<Stdout>,
}

impl TerminalDisplay {
    pub(crate) fn open() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, terminal::EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self {
            out: BufWriter::new(out),
        })
    }

    fn draw(&mut self, window: &str, composed: &ComposedFrame) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        if cols == 0 || rows < 2 {
            return Ok(());
        }
        let image_rows = rows - 1;
        let source = &composed.frame;
        let cells = composed
            .frame
            .clone()
            .resize(Resolution::new(cols as u32, image_rows as u32 * 2));

        for row in 0..image_rows {
            queue!(self.out, cursor::MoveTo(0, row))?;
            for col in 0..cols {
                let top = cells.pixel(col as u32, row as u32 * 2);
                let bottom = cells.pixel(col as u32, row as u32 * 2 + 1);
                queue!(
                    self.out,
                    SetForegroundColor(rgb(top)),
                    SetBackgroundColor(rgb(bottom)),
                    Print(HALF_BLOCK)
                )?;
            }
        }

        for annotation in &composed.annotations {
            let col = (annotation.x as u64 * cols as u64 / source.width() as u64) as u16;
            let row = (annotation.y as u64 * image_rows as u64 / source.height() as u64) as u16;
            let row = row.min(image_rows - 1);
            let room = cols.saturating_sub(col) as usize;
            let text: String = annotation.text.chars().take(room).collect();
            queue!(
                self.out,
                cursor::MoveTo(col, row),
                SetForegroundColor(rgb(Some(annotation.color))),
                SetBackgroundColor(Color::Black),
                Print(text)
            )?;
        }

        let status: String = format!(" {window} | q to quit").chars().take(cols as usize).collect();
        queue!(
            self.out,
            cursor::MoveTo(0, rows - 1),
            ResetColor,
            terminal::Clear(ClearType::CurrentLine),
            Print(status)
        )?;
        self.out.flush()
    }
}

impl Display for TerminalDisplay {
    fn present(&mut self, window: &str, frame: &ComposedFrame) -> Result<(), RenderFault> {
        self.draw(window, frame).map_err(RenderFault::from)
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

fn rgb(pixel: Option<[u8; 3]>) -> Color {
    let [r, g, b] = pixel.unwrap_or_default();
    Color::Rgb { r, g, b }
}
