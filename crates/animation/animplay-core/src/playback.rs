#![allow(dead_code)]
//! Play range and cursor of an animation.
//!
//! Positions are absolute frame positions in `[min, max]`, where `min` is the
//! animation's start position (0 for cels, 1 for animatics) and `max` its last
//! frame. The state is persisted as a single `<playback>` element written
//! right after the `<animation>` root.

use serde::{Deserialize, Serialize};

/// Attributes of a stored `<playback>` element, before validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoredPlayback {
    pub position: Option<i64>,
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playback {
    pub position: usize,
    pub start: usize,
    pub stop: usize,
    /// The stop marker follows the end when the animation grows.
    pub stop_at_end: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Playback {
    /// Full range with the cursor at the first frame.
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            position: min,
            start: min,
            stop: max.max(min),
            stop_at_end: true,
        }
    }

    #[inline]
    fn in_range(v: Option<i64>, min: usize, max: usize) -> Option<usize> {
        v.and_then(|v| usize::try_from(v).ok())
            .filter(|v| (min..=max).contains(v))
    }

    /// Apply stored values, ignoring any that fall outside `[min, max]`.
    pub fn restore(&mut self, stored: StoredPlayback, min: usize, max: usize) {
        *self = Self::new(min, max);
        if let Some(start) = Self::in_range(stored.start, min, max) {
            self.start = start;
        }
        if let Some(stop) = Self::in_range(stored.stop, min, max) {
            self.stop = stop;
            self.stop_at_end = stop == max;
        }
        if self.stop < self.start {
            self.stop = max;
            self.stop_at_end = true;
        }
        if let Some(position) = Self::in_range(stored.position, min, max) {
            self.position = position;
        }
        self.position = self.position.clamp(self.start, self.stop);
    }

    /// Follow a change of the animation's length.
    /// Returns true when the range or the cursor moved.
    pub fn fit(&mut self, min: usize, max: usize) -> bool {
        let before = *self;
        if self.stop > max || self.stop_at_end {
            self.stop = max;
            self.stop_at_end = true;
        }
        if self.start > max || self.start > self.stop {
            self.start = min;
        }
        if self.position < self.start || self.position > self.stop {
            self.position = self.start;
        }
        before != *self
    }

    /// Move the start marker. Returns a position to jump to when the cursor
    /// left the range.
    pub fn set_start(&mut self, index: usize, min: usize, max: usize) -> Option<usize> {
        self.start = if (min..=max).contains(&index) { index } else { min };
        if self.stop < self.start {
            self.stop = max;
            self.stop_at_end = true;
        }
        self.cursor_escape()
    }

    /// Move the stop marker. Returns a position to jump to when the cursor
    /// left the range.
    pub fn set_stop(&mut self, index: usize, min: usize, max: usize) -> Option<usize> {
        if (min..=max).contains(&index) {
            self.stop = index;
            self.stop_at_end = index == max;
        } else {
            self.stop = max;
            self.stop_at_end = true;
        }
        if self.stop < self.start {
            self.start = min;
        }
        self.cursor_escape()
    }

    /// Step one frame forward, wrapping from `stop` back to `start`.
    pub fn next(&mut self) -> usize {
        let span = self.stop.saturating_sub(self.start) + 1;
        self.position = self.start + (self.position.saturating_sub(self.start) + 1) % span;
        self.position
    }

    /// Step one frame back, wrapping from `start` to `stop`.
    pub fn prev(&mut self) -> usize {
        self.position = if self.position <= self.start || self.position > self.stop {
            self.stop
        } else {
            self.position - 1
        };
        self.position
    }

    fn cursor_escape(&mut self) -> Option<usize> {
        if self.position < self.start || self.position > self.stop {
            self.position = self.start;
            Some(self.start)
        } else {
            None
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            "<playback position=\"{}\" start=\"{}\" stop=\"{}\"/>",
            self.position, self.start, self.stop
        )
    }
}
