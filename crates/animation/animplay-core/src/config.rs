#![allow(dead_code)]
//! Core configuration for animplay-core.

use serde::{Deserialize, Serialize};

/// Upper bound accepted for a framerate.
pub const MAX_FRAMERATE: f64 = 300.0;
/// Framerate used when none is stored or a stored value is unusable.
pub const DEFAULT_FRAMERATE: f64 = 24.0;
/// Number of frames of a freshly created cel animation.
pub const DEFAULT_CEL_DURATION: usize = 240;
/// Panel length in frames when a layer name carries no duration tag.
pub const DEFAULT_PANEL_DURATION: usize = 6;
/// Title given to tracks created by `level_add` and by the defaults.
pub const DEFAULT_TRACK_TITLE: &str = "Name me";
/// Title of the first default track, also the layer name looked up to fill it.
pub const BACKGROUND_TRACK_TITLE: &str = "Background";

/// Bring any framerate into (0, MAX_FRAMERATE].
/// Non-positive or non-finite values fall back to the default instead of failing.
#[inline]
pub fn clamp_framerate(framerate: f64) -> f64 {
    if !framerate.is_finite() || framerate <= 0.0 {
        DEFAULT_FRAMERATE
    } else if framerate >= MAX_FRAMERATE {
        MAX_FRAMERATE
    } else {
        framerate
    }
}

/// Per-session settings a host caches between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_framerate")]
    pub framerate: f64,
    /// Output scale for previews, in (0, 1].
    #[serde(default = "default_proxy_ratio")]
    pub proxy_ratio: f64,
}

fn default_framerate() -> f64 {
    DEFAULT_FRAMERATE
}

fn default_proxy_ratio() -> f64 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            framerate: DEFAULT_FRAMERATE,
            proxy_ratio: 1.0,
        }
    }
}

impl Settings {
    /// Parse cached settings; out-of-range values are clamped rather than rejected.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(s)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn to_json(&self) -> String {
        // A struct of two floats cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    fn sanitize(&mut self) {
        self.framerate = clamp_framerate(self.framerate);
        if !(self.proxy_ratio > 0.0 && self.proxy_ratio <= 1.0) {
            self.proxy_ratio = 1.0;
        }
    }
}
