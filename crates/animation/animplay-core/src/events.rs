//! Change notifications emitted by the animation models.
//!
//! Every notification is delivered synchronously from inside the mutating
//! call, in registration order. Listeners receive a shared reference and may
//! not call back into the model that is emitting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{IdAllocator, ListenerId};

/// Discrete semantic signals emitted while the model changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationEvent {
    /// Progress of an animatic load, in 0..=1.
    Loading {
        fraction: f64,
    },
    Loaded,
    /// `length` frames starting at `position` need to be recomposited.
    FramesChanged {
        position: usize,
        length: usize,
    },
    DurationChanged {
        duration: usize,
    },
    FramerateChanged {
        framerate: f64,
    },
    PanelDurationChanged {
        panel: usize,
        duration: usize,
    },
    /// The play range was adjusted to fit a new length.
    PlaybackRange {
        start: usize,
        stop: usize,
        min: usize,
        max: usize,
    },
    JumpRequested {
        position: usize,
    },
    /// The frame on screen changed without the position moving.
    Render {
        position: usize,
    },
    CameraOffsetsChanged {
        position: usize,
        length: usize,
    },
    KeyframeSet {
        position: usize,
    },
    KeyframeDeleted {
        position: usize,
    },
}

type Listener = Box<dyn FnMut(&AnimationEvent)>;

/// Listener registry owned by each animation.
#[derive(Default)]
pub struct Notifier {
    ids: IdAllocator,
    listeners: Vec<(ListenerId, Listener)>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AnimationEvent) + 'static) -> ListenerId {
        let id = self.ids.alloc_listener();
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the id was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: AnimationEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    #[inline]
    pub fn frames_changed(&mut self, position: usize, length: usize) {
        self.emit(AnimationEvent::FramesChanged { position, length });
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
