#![allow(dead_code)]
//! Identifiers and simple allocators for core entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable per-layer identifier assigned by the host image.
///
/// A tattoo survives layer reordering and renaming but not deletion, which
/// makes it the weak reference stored in tracks and panels. Tattoo `0` is
/// never assigned by a host and is treated as "no layer".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Tattoo(pub u32);

/// Host-side handle for a layer, valid only while the layer exists.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u32);

/// Handle returned when registering a notification listener.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

impl Tattoo {
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Tattoo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator for LayerId, Tattoo and ListenerId.
/// Tattoos start at 1 so that the zero value stays reserved.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_layer: u32,
    next_tattoo: u32,
    next_listener: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_layer(&mut self) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer = self.next_layer.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_tattoo(&mut self) -> Tattoo {
        self.next_tattoo = self.next_tattoo.wrapping_add(1).max(1);
        Tattoo(self.next_tattoo)
    }

    #[inline]
    pub fn alloc_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
