#![allow(dead_code)]
//! Animation core for a layered-image editor (host-agnostic)
//!
//! Two animation models live over the layers of an image:
//! - [`CelAnimation`]: tracks of cels laid out on a fixed-length timeline,
//!   with a camera that pans the composited frame.
//! - [`Animatic`]: one panel per layer, each held for a duration, optionally
//!   drawn over the previous panel.
//!
//! The host image is reached through [`ImageHost`]; models emit
//! [`AnimationEvent`]s to registered listeners and persist themselves as XML
//! documents stored in image parasites.

pub mod animatic;
pub mod animation;
pub mod camera;
pub mod cel;
pub mod compose;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod ids;
pub mod playback;
pub mod tags;
pub mod xml;

// Re-exports for hosts
pub use animatic::{Animatic, Panel};
pub use animation::{Animation, AnimationBase, AnimationKind, AnimationModel, SELECTED_PARASITE};
pub use camera::{Camera, Offset, OffsetsChanged};
pub use cel::{Cel, CelAnimation, Track};
pub use compose::{normal_blend, FrameBuffer};
pub use config::{
    Settings, BACKGROUND_TRACK_TITLE, DEFAULT_CEL_DURATION, DEFAULT_FRAMERATE,
    DEFAULT_PANEL_DURATION, DEFAULT_TRACK_TITLE, MAX_FRAMERATE,
};
pub use error::{AnimError, Result};
pub use events::{AnimationEvent, Notifier};
pub use host::{ColorTag, ImageHost};
pub use ids::{IdAllocator, LayerId, ListenerId, Tattoo};
pub use playback::{Playback, StoredPlayback};
pub use tags::{parse_combine_tag, parse_ms_tag};
