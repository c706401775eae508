//! Suppression of change notifications during IME composition.

use tracing::trace;

/// What to do with an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputDisposition {
    /// Read the surface and notify.
    Commit,
    /// Composition in progress; the surface has changed but nobody is told.
    Suppress,
}

/// Tracks whether a multi-keystroke input sequence is in progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompositionGuard {
    composing: bool,
}

impl CompositionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn start(&mut self) {
        trace!(target: "atelier::composition", "composition start");
        self.composing = true;
    }

    pub fn on_input(&self) -> InputDisposition {
        if self.composing {
            InputDisposition::Suppress
        } else {
            InputDisposition::Commit
        }
    }

    /// End the sequence. The caller always notifies once afterwards.
    pub fn end(&mut self) -> InputDisposition {
        trace!(target: "atelier::composition", "composition end");
        self.composing = false;
        InputDisposition::Commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_states() {
        let mut guard = CompositionGuard::new();
        assert_eq!(guard.on_input(), InputDisposition::Commit);
        guard.start();
        assert!(guard.is_composing());
        assert_eq!(guard.on_input(), InputDisposition::Suppress);
        assert_eq!(guard.end(), InputDisposition::Commit);
        assert_eq!(guard.on_input(), InputDisposition::Commit);
    }
}
