//! Feed-follow: auto-scroll only when the reader was already at the bottom.
//!
//! The follower samples `is_at_bottom` before each timeline mutation and
//! resolves the sample once the surface reports the settled content height.
//! Units are whatever the surface measures in (rows for the TUI).

use proto::ScrollDecision;

/// Default distance from the bottom still treated as "at bottom".
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// Viewport geometry of the message feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    pub offset: f64,
    pub visible_height: f64,
    pub content_height: f64,
    pub tolerance: f64,
}

impl ScrollState {
    pub fn new(tolerance: f64) -> Self {
        Self {
            offset: 0.0,
            visible_height: 0.0,
            content_height: 0.0,
            tolerance,
        }
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset + self.visible_height >= self.content_height - self.tolerance
    }

    /// Offset that shows the last line of content.
    pub fn bottom_offset(&self) -> f64 {
        (self.content_height - self.visible_height).max(0.0)
    }
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

/// Applies the feed-follow rule to a [`ScrollState`].
#[derive(Debug, Clone, Default)]
pub struct FeedFollower {
    state: ScrollState,
    pending: Option<bool>,
}

impl FeedFollower {
    pub fn new(tolerance: f64) -> Self {
        Self {
            state: ScrollState::new(tolerance),
            pending: None,
        }
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn offset(&self) -> f64 {
        self.state.offset
    }

    pub fn is_at_bottom(&self) -> bool {
        self.state.is_at_bottom()
    }

    /// Visibility of the "new content below" affordance.
    pub fn new_content_affordance_visible(&self) -> bool {
        !self.state.is_at_bottom()
    }

    /// Whether a mutation is waiting for its layout pass.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Samples `is_at_bottom` ahead of a timeline mutation.
    ///
    /// Several mutations before one layout pass share the first sample.
    pub fn begin_mutation(&mut self) -> ScrollDecision {
        let sample = *self.pending.get_or_insert(self.state.is_at_bottom());
        decision(sample)
    }

    /// Resolves the pending sample against the settled content height.
    ///
    /// Without a pending sample the offset is only clamped.
    pub fn layout_settled(&mut self, content_height: f64) -> ScrollDecision {
        self.state.content_height = content_height.max(0.0);
        let follow = self.pending.take().unwrap_or(false);
        if follow {
            self.state.offset = self.state.bottom_offset();
        } else {
            self.clamp_offset();
        }
        decision(follow)
    }

    /// Synchronous variant: sample, mutate, then settle with the height the
    /// mutation reports.
    pub fn apply<F>(&mut self, mutate: F) -> ScrollDecision
    where
        F: FnOnce() -> f64,
    {
        self.begin_mutation();
        let content_height = mutate();
        self.layout_settled(content_height)
    }

    /// Visible-area change, treated like any other mutation.
    pub fn resize_viewport(&mut self, visible_height: f64) -> ScrollDecision {
        self.relayout(self.state.content_height, visible_height)
    }

    /// Reports the full geometry after a layout pass.
    ///
    /// Resolves a pending sample if there is one. Otherwise a geometry change
    /// (e.g. re-wrapping after a width change) is sampled like a mutation, and
    /// unchanged geometry leaves the offset alone.
    pub fn relayout(&mut self, content_height: f64, visible_height: f64) -> ScrollDecision {
        let content_height = content_height.max(0.0);
        let visible_height = visible_height.max(0.0);
        let unchanged = self.state.content_height == content_height
            && self.state.visible_height == visible_height;
        if unchanged && self.pending.is_none() {
            return ScrollDecision::Hold;
        }

        let follow = self.pending.take().unwrap_or(self.state.is_at_bottom());
        self.state.content_height = content_height;
        self.state.visible_height = visible_height;
        if follow {
            self.state.offset = self.state.bottom_offset();
        } else {
            self.clamp_offset();
        }
        decision(follow)
    }

    /// User scrolled to `offset`. Replaces any pending sample.
    pub fn on_scroll(&mut self, offset: f64) {
        self.state.offset = offset.clamp(0.0, self.state.bottom_offset());
        if self.pending.is_some() {
            self.pending = Some(self.state.is_at_bottom());
        }
    }

    /// Scrolls by `delta` relative to the current offset.
    pub fn scroll_by(&mut self, delta: f64) {
        self.on_scroll(self.state.offset + delta);
    }

    /// Jumps to the bottom, as when the affordance is tapped.
    pub fn scroll_to_bottom(&mut self) {
        self.state.offset = self.state.bottom_offset();
        if self.pending.is_some() {
            self.pending = Some(true);
        }
    }

    fn clamp_offset(&mut self) {
        let bottom = self.state.bottom_offset();
        if self.state.offset > bottom {
            self.state.offset = bottom;
        }
    }
}

fn decision(follow: bool) -> ScrollDecision {
    if follow {
        ScrollDecision::FollowToBottom
    } else {
        ScrollDecision::Hold
    }
}
