use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;
use tracing::warn;

pub(crate) trait QuitSignal {
    fn requested(&mut self) -> bool;

    fn or<B: QuitSignal>(self, other: B) -> Either<Self, B>
    where
        Self: Sized,
    {
        Either(self, other)
    }
}

pub(crate) struct Either<A, B>(A, B);

impl<A: QuitSignal, B: QuitSignal> QuitSignal for Either<A, B> {
    fn requested(&mut self) -> bool {
        let a = self.0.requested();
        let b = self.1.requested();
        a || b
    }
}

pub(crate) struct CtrlC {
    receiver: async_broadcast::Receiver<()>,
    seen: bool,
}

impl CtrlC {
    pub(crate) fn new(receiver: async_broadcast::Receiver<()>) -> Self {
        Self {
            receiver,
            seen: false,
        }
    }
}

impl QuitSignal for CtrlC {
    fn requested(&mut self) -> bool {
        if !self.seen && self.receiver.try_recv().is_ok() {
            self.seen = true;
        }
        self.seen
    }
}

/// Key presses on the controlling terminal: `q`, `Esc`, or `Ctrl+C` (which
/// arrives as a key, not a signal, while the terminal is in raw mode).
#[derive(Debug, Default)]
pub(crate) struct Keyboard {
    seen: bool,
}

impl QuitSignal for Keyboard {
    fn requested(&mut self) -> bool {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(error = %e, "cannot read keyboard events");
                    break;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) if is_quit_key(&key) => self.seen = true,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "cannot read keyboard events");
                    break;
                }
            }
        }
        self.seen
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown(u32);

    impl QuitSignal for Countdown {
        fn requested(&mut self) -> bool {
            self.0 = self.0.saturating_sub(1);
            self.0 == 0
        }
    }

    #[test]
    fn test_quit_keys() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&key(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn test_ctrl_c_latches() {
        let (sender, receiver) = async_broadcast::broadcast(1);
        let mut quit = CtrlC::new(receiver);
        assert!(!quit.requested());
        sender.try_broadcast(()).unwrap();
        assert!(quit.requested());
        assert!(quit.requested());
    }

    #[test]
    fn test_either_polls_both_sides() {
        let mut quit = Countdown(3).or(Countdown(10));
        assert!(!quit.requested());
        assert!(!quit.requested());
        assert!(quit.requested());
        assert_eq!(quit.1 .0, 7);
    }
}
