#![allow(dead_code)]
//! Camera sub-model of a cel animation.
//!
//! Model:
//! - A sparse list of keyframes indexed by frame position, each an integer
//!   pan offset applied to every layer of that frame.
//! - Between two keyframes the offset is interpolated linearly in integer
//!   arithmetic (truncating toward zero).
//! - Before the first keyframe or after the last one, the nearest keyframe holds.
//! - Without any keyframe the camera stays at (0, 0).
//! - One preview keyframe may shadow the stored value at a single position
//!   while the user drags the camera; it is applied or discarded later.
//!
//! Edits return the range of frames whose offset changed instead of emitting
//! anything; the owning animation turns that into notifications.

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};

/// Pan offset in image pixels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Frames `[position, position + length)` have a new camera offset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OffsetsChanged {
    pub position: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Camera {
    keyframes: Vec<Option<Offset>>,
    preview: Option<(usize, Offset)>,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn keyframe(&self, position: usize) -> Option<Offset> {
        self.keyframes.get(position).copied().flatten()
    }

    #[inline]
    pub fn has_keyframe(&self, position: usize) -> bool {
        self.keyframe(position).is_some()
    }

    /// Stored keyframes in position order.
    pub fn keyframes(&self) -> impl Iterator<Item = (usize, Offset)> + '_ {
        self.keyframes
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.map(|o| (i, o)))
    }

    pub fn set_keyframe(
        &mut self,
        duration: usize,
        position: usize,
        offset: Offset,
    ) -> Result<OffsetsChanged> {
        if position >= duration {
            return Err(AnimError::out_of_range("keyframe position", position, duration));
        }
        if self.keyframes.len() <= position {
            self.keyframes.resize(position + 1, None);
        }
        self.keyframes[position] = Some(offset);
        Ok(self.changed_range(duration, position))
    }

    /// Returns `None` when there was no keyframe at `position`.
    pub fn delete_keyframe(&mut self, duration: usize, position: usize) -> Option<OffsetsChanged> {
        if position >= duration || !self.has_keyframe(position) {
            return None;
        }
        self.keyframes[position] = None;
        Some(self.changed_range(duration, position))
    }

    /// Temporarily display `offset` at `position` without storing it.
    pub fn preview_keyframe(
        &mut self,
        duration: usize,
        position: usize,
        offset: Offset,
    ) -> Result<OffsetsChanged> {
        if position >= duration {
            return Err(AnimError::out_of_range("preview position", position, duration));
        }
        self.preview = Some((position, offset));
        Ok(OffsetsChanged {
            position,
            length: 1,
        })
    }

    /// Store the preview as a real keyframe if it differs from the stored value.
    /// Returns the keyframe position and the changed range.
    pub fn apply_preview(&mut self, duration: usize) -> Option<(usize, OffsetsChanged)> {
        let (position, offset) = self.preview.take()?;
        if offset == self.real_offset(position) {
            return None;
        }
        self.set_keyframe(duration, position, offset)
            .ok()
            .map(|range| (position, range))
    }

    pub fn reset_preview(&mut self) -> Option<OffsetsChanged> {
        let (position, offset) = self.preview.take()?;
        (offset != self.real_offset(position)).then_some(OffsetsChanged {
            position,
            length: 1,
        })
    }

    /// Offset shown at `position`, preview included.
    pub fn offset(&self, position: usize) -> Offset {
        match self.preview {
            Some((p, offset)) if p == position => offset,
            _ => self.real_offset(position),
        }
    }

    /// Drop keyframes (and a pending preview) at or beyond `duration`.
    pub fn truncate(&mut self, duration: usize) {
        self.keyframes.truncate(duration);
        if matches!(self.preview, Some((p, _)) if p >= duration) {
            self.preview = None;
        }
    }

    fn real_offset(&self, position: usize) -> Offset {
        if let Some(offset) = self.keyframe(position) {
            return offset;
        }
        let prev = (0..position.min(self.keyframes.len()))
            .rev()
            .find_map(|i| self.keyframe(i).map(|o| (i, o)));
        let next = (position + 1..self.keyframes.len()).find_map(|i| self.keyframe(i).map(|o| (i, o)));

        match (prev, next) {
            (None, None) => Offset::default(),
            (Some((_, o)), None) | (None, Some((_, o))) => o,
            (Some((p0, o0)), Some((p1, o1))) => Offset {
                x: lerp_i32(o0.x, o1.x, position - p0, p1 - p0),
                y: lerp_i32(o0.y, o1.y, position - p0, p1 - p0),
            },
        }
    }

    /// Frames whose interpolated offset depends on the keyframe at `position`:
    /// from just after the previous keyframe to just before the next one.
    fn changed_range(&self, duration: usize, position: usize) -> OffsetsChanged {
        let start = (0..position)
            .rev()
            .find(|&i| self.has_keyframe(i))
            .map_or(0, |i| i + 1);
        let end = (position + 1..duration)
            .find(|&i| self.has_keyframe(i))
            .map_or(duration.saturating_sub(1), |i| i - 1);
        OffsetsChanged {
            position: start,
            length: end + 1 - start,
        }
    }
}

/// Integer linear interpolation of `a -> b` at `step / span`.
#[inline]
fn lerp_i32(a: i32, b: i32, step: usize, span: usize) -> i32 {
    let (a, b) = (i64::from(a), i64::from(b));
    (a + step as i64 * (b - a) / span.max(1) as i64) as i32
}
