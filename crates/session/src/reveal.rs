//! Word-by-word exposure of a completed reply.
//!
//! The scheduler is stepped: the host calls [`RevealScheduler::tick`] on its
//! own timer, which keeps tests deterministic.

use std::time::Duration;

/// Default time between two reveal ticks.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(50);

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing { target: usize },
}

/// Content produced by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTick {
    /// Timeline index the content belongs to.
    pub target: usize,
    /// Words revealed so far, single-space joined.
    pub content: String,
    /// `true` when this tick exposed the last word.
    pub finished: bool,
}

#[derive(Debug)]
struct ActiveReveal {
    target: usize,
    words: Vec<String>,
    shown: usize,
    content: String,
}

/// Drives at most one reveal at a time.
#[derive(Debug)]
pub struct RevealScheduler {
    active: Option<ActiveReveal>,
    interval: Duration,
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_INTERVAL)
    }
}

impl RevealScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            active: None,
            interval,
        }
    }

    /// Tick period the host should use.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begins revealing `full_text` into `target`.
    ///
    /// Any reveal already running is cancelled first and its partial content
    /// left as is; the cancelled target is returned. Text without words
    /// leaves the scheduler idle.
    pub fn start(&mut self, full_text: &str, target: usize) -> Option<usize> {
        let superseded = self.stop();
        let words: Vec<String> = full_text.split_whitespace().map(str::to_string).collect();
        if !words.is_empty() {
            self.active = Some(ActiveReveal {
                target,
                words,
                shown: 0,
                content: String::with_capacity(full_text.len()),
            });
        }
        superseded
    }

    /// Exposes the next word. Returns `None` when idle.
    pub fn tick(&mut self) -> Option<RevealTick> {
        let active = self.active.as_mut()?;
        if active.shown > 0 {
            active.content.push(' ');
        }
        active.content.push_str(&active.words[active.shown]);
        active.shown += 1;

        let finished = active.shown == active.words.len();
        let tick = RevealTick {
            target: active.target,
            content: active.content.clone(),
            finished,
        };
        if finished {
            self.active = None;
        }
        Some(tick)
    }

    /// Cancels the active reveal, returning its target.
    pub fn stop(&mut self) -> Option<usize> {
        self.active.take().map(|active| active.target)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> RevealState {
        match &self.active {
            Some(active) => RevealState::Revealing {
                target: active.target,
            },
            None => RevealState::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut RevealScheduler) -> Vec<RevealTick> {
        std::iter::from_fn(|| scheduler.tick()).collect()
    }

    #[test]
    fn reveals_three_words_in_three_ticks() {
        let mut scheduler = RevealScheduler::default();
        scheduler.start("Hello brave world", 4);
        assert_eq!(scheduler.state(), RevealState::Revealing { target: 4 });

        let ticks = drain(&mut scheduler);
        let contents: Vec<&str> = ticks.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello", "Hello brave", "Hello brave world"]);
        assert!(ticks.iter().all(|t| t.target == 4));
        assert_eq!(
            ticks.iter().map(|t| t.finished).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(scheduler.state(), RevealState::Idle);
        assert!(scheduler.tick().is_none());
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let mut scheduler = RevealScheduler::default();
        scheduler.start("  line one\n\nline\ttwo  ", 0);
        let last = drain(&mut scheduler).pop().expect("ticks");
        assert_eq!(last.content, "line one line two");
    }

    #[test]
    fn text_without_words_produces_no_ticks() {
        let mut scheduler = RevealScheduler::default();
        scheduler.start("   \n\t ", 2);
        assert!(!scheduler.is_active());
        assert!(scheduler.tick().is_none());
    }

    #[test]
    fn starting_again_cancels_previous_reveal() {
        let mut scheduler = RevealScheduler::default();
        scheduler.start("one two three four", 1);
        scheduler.tick();
        scheduler.tick();

        let superseded = scheduler.start("alpha beta", 3);
        assert_eq!(superseded, Some(1));

        let ticks = drain(&mut scheduler);
        assert!(ticks.iter().all(|t| t.target == 3));
        assert_eq!(ticks.last().map(|t| t.content.as_str()), Some("alpha beta"));
    }

    #[test]
    fn stop_cancels_and_reports_target() {
        let mut scheduler = RevealScheduler::default();
        scheduler.start("a b c", 7);
        scheduler.tick();
        assert_eq!(scheduler.stop(), Some(7));
        assert!(scheduler.tick().is_none());
        assert_eq!(scheduler.stop(), None);
    }
}
