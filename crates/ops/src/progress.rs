//! Progress reporting for long-running bulk operations.

use serde::Serialize;

/// One progress step: `current` of `total` items handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl Progress {
    pub fn new(current: usize, total: usize, message: impl Into<String>) -> Self {
        Self { current, total, message: message.into() }
    }
}

/// Receives progress steps. Implemented for any `FnMut(Progress)`.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: Progress) {}
}

/// Emits each step as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, progress: Progress) {
        tracing::info!(current = progress.current, total = progress.total, "{}", progress.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: Progress| seen.push(p.current);
            sink.report(Progress::new(1, 2, "a"));
            sink.report(Progress::new(2, 2, "b"));
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
