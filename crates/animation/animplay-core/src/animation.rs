//! Behaviour shared by both animation variants.
//!
//! [`AnimationBase`] holds the state every variant carries (framerate, output
//! size, proxy ratio, play range, listeners). [`Animation`] is the capability
//! set consumers program against, and [`AnimationModel`] is the tagged value a
//! host keeps for the lifetime of a session.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::animatic::Animatic;
use crate::cel::CelAnimation;
use crate::compose::FrameBuffer;
use crate::config::{clamp_framerate, Settings, MAX_FRAMERATE};
use crate::error::{AnimError, Result};
use crate::events::{AnimationEvent, Notifier};
use crate::host::ImageHost;
use crate::ids::ListenerId;
use crate::playback::Playback;

/// Image parasite holding the kind of the last used animation.
pub const SELECTED_PARASITE: &str = "plug-in-animationplay/selected";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AnimationKind {
    Cel,
    Animatic,
}

impl AnimationKind {
    /// Image parasite the serialized animation is stored under.
    pub fn parasite_name(self) -> &'static str {
        match self {
            AnimationKind::Cel => "plug-in-animationplay/cel-animation",
            AnimationKind::Animatic => "plug-in-animationplay/animatic",
        }
    }

    /// Value stored in the selection parasite.
    pub fn selection_name(self) -> &'static str {
        match self {
            AnimationKind::Cel => "cel-animation",
            AnimationKind::Animatic => "animatic",
        }
    }
}

/// State common to every animation.
#[derive(Debug)]
pub struct AnimationBase {
    framerate: f64,
    width: u32,
    height: u32,
    proxy_ratio: f64,
    playback: Playback,
    notifier: Notifier,
    loaded: bool,
}

impl AnimationBase {
    pub fn new(host: &dyn ImageHost, settings: &Settings) -> Self {
        let (width, height) = host.size();
        let proxy_ratio = if settings.proxy_ratio > 0.0 && settings.proxy_ratio <= 1.0 {
            settings.proxy_ratio
        } else {
            1.0
        };
        Self {
            framerate: clamp_framerate(settings.framerate),
            width,
            height,
            proxy_ratio,
            playback: Playback::default(),
            notifier: Notifier::new(),
            loaded: false,
        }
    }

    #[inline]
    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    /// Rates above the maximum are capped; non-positive ones are rejected.
    pub fn set_framerate(&mut self, framerate: f64) -> Result<()> {
        if !framerate.is_finite() || framerate <= 0.0 {
            return Err(AnimError::InvalidFramerate { framerate });
        }
        self.framerate = framerate.min(MAX_FRAMERATE);
        self.notifier.emit(AnimationEvent::FramerateChanged {
            framerate: self.framerate,
        });
        Ok(())
    }

    /// Framerate read from storage: clamped, never rejected.
    pub(crate) fn restore_framerate(&mut self, framerate: f64) {
        let framerate = clamp_framerate(framerate);
        if framerate != self.framerate {
            self.framerate = framerate;
            self.notifier
                .emit(AnimationEvent::FramerateChanged { framerate });
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    #[inline]
    pub fn proxy_ratio(&self) -> f64 {
        self.proxy_ratio
    }

    pub(crate) fn set_proxy_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(AnimError::InvalidProxyRatio { ratio });
        }
        self.proxy_ratio = ratio;
        Ok(())
    }

    #[inline]
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    #[inline]
    pub(crate) fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    /// Refit the play range after a length change and report it if it moved.
    pub(crate) fn fit_playback(&mut self, min: usize, max: usize) {
        if self.playback.fit(min, max) {
            self.emit_playback_range(min, max);
        }
    }

    pub(crate) fn emit_playback_range(&mut self, min: usize, max: usize) {
        let Playback { start, stop, .. } = self.playback;
        self.notifier.emit(AnimationEvent::PlaybackRange {
            start,
            stop,
            min,
            max,
        });
    }

    #[inline]
    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn set_loaded(&mut self) {
        self.loaded = true;
    }
}

/// Capability set of an animation variant.
pub trait Animation {
    fn base(&self) -> &AnimationBase;
    fn base_mut(&mut self) -> &mut AnimationBase;

    fn kind(&self) -> AnimationKind;

    /// Number of frames on the timeline.
    fn duration(&self) -> usize;

    /// Position of the first frame.
    fn start_position(&self) -> usize;

    /// Fingerprint of a frame's content; `None` when the frame is empty.
    fn frame_hash(&self, position: usize) -> Option<String>;

    /// Whether two positions render the same picture.
    fn same(&self, a: usize, b: usize) -> bool {
        match (self.frame_hash(a), self.frame_hash(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn get_frame(&mut self, host: &dyn ImageHost, position: usize) -> Option<FrameBuffer>;

    /// Document for persistence, with `playback_xml` inserted verbatim
    /// after the root element.
    fn serialize(&self, playback_xml: &str) -> String;

    fn deserialize(&mut self, host: &dyn ImageHost, xml: &str) -> Result<()>;

    /// Rebuild the default animation for the live image.
    fn reset_defaults(&mut self, host: &dyn ImageHost) -> Result<()>;

    fn framerate(&self) -> f64 {
        self.base().framerate()
    }

    fn set_framerate(&mut self, framerate: f64) -> Result<()> {
        self.base_mut().set_framerate(framerate)
    }

    fn size(&self) -> (u32, u32) {
        self.base().size()
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.base_mut().set_size(width, height)
    }

    fn is_loaded(&self) -> bool {
        self.base().is_loaded()
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&AnimationEvent)>) -> ListenerId {
        self.base_mut().notifier_mut().subscribe(listener)
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.base_mut().notifier_mut().unsubscribe(id)
    }

    /// Last valid position; equals the start position for an empty timeline.
    fn last_position(&self) -> usize {
        let start = self.start_position();
        (start + self.duration()).saturating_sub(1).max(start)
    }

    fn playback(&self) -> &Playback {
        self.base().playback()
    }

    /// Move the cursor. Returns false for a position outside the timeline.
    fn jump(&mut self, position: usize) -> bool {
        if position < self.start_position() || position > self.last_position() {
            return false;
        }
        let base = self.base_mut();
        base.playback_mut().position = position;
        base.notifier_mut()
            .emit(AnimationEvent::JumpRequested { position });
        true
    }

    /// Advance the cursor one frame, wrapping inside the play range.
    fn next_frame(&mut self) -> usize {
        let base = self.base_mut();
        let position = base.playback_mut().next();
        base.notifier_mut()
            .emit(AnimationEvent::JumpRequested { position });
        position
    }

    fn prev_frame(&mut self) -> usize {
        let base = self.base_mut();
        let position = base.playback_mut().prev();
        base.notifier_mut()
            .emit(AnimationEvent::JumpRequested { position });
        position
    }

    fn set_playback_start(&mut self, index: usize) {
        let (min, max) = (self.start_position(), self.last_position());
        let base = self.base_mut();
        let jump = base.playback_mut().set_start(index, min, max);
        base.emit_playback_range(min, max);
        if let Some(position) = jump {
            base.notifier_mut()
                .emit(AnimationEvent::JumpRequested { position });
        }
    }

    fn set_playback_stop(&mut self, index: usize) {
        let (min, max) = (self.start_position(), self.last_position());
        let base = self.base_mut();
        let jump = base.playback_mut().set_stop(index, min, max);
        base.emit_playback_range(min, max);
        if let Some(position) = jump {
            base.notifier_mut()
                .emit(AnimationEvent::JumpRequested { position });
        }
    }
}

/// One animation of either kind.
#[derive(Debug)]
pub enum AnimationModel {
    Cel(CelAnimation),
    Animatic(Animatic),
}

impl AnimationModel {
    /// Build an animation of `kind`, restoring `xml` when given. A document
    /// that cannot be read is logged and replaced by the defaults.
    pub fn new(
        host: &dyn ImageHost,
        kind: AnimationKind,
        settings: &Settings,
        xml: Option<&str>,
    ) -> Result<Self> {
        let mut model = match (kind, xml) {
            (AnimationKind::Cel, _) => Self::Cel(CelAnimation::new(host, settings)),
            // The document pass builds the previews.
            (AnimationKind::Animatic, Some(_)) => {
                Self::Animatic(Animatic::unloaded(host, settings))
            }
            (AnimationKind::Animatic, None) => Self::Animatic(Animatic::new(host, settings)?),
        };
        if let Some(xml) = xml {
            match model.as_animation_mut().deserialize(host, xml) {
                Ok(()) => {}
                Err(err) if !err.is_recoverable() => return Err(err),
                Err(err) => {
                    warn!("stored {} could not be restored: {err}", kind.selection_name());
                    if !model.as_animation().is_loaded() {
                        model.as_animation_mut().reset_defaults(host)?;
                    }
                }
            }
        }
        Ok(model)
    }

    /// Rebuild the animation last saved into the image. Images without a
    /// stored selection open as an animatic.
    pub fn restore(host: &dyn ImageHost, settings: &Settings) -> Result<Self> {
        let kind = match host.parasite(SELECTED_PARASITE).as_deref() {
            Some("cel-animation") => AnimationKind::Cel,
            _ => AnimationKind::Animatic,
        };
        let xml = host.parasite(kind.parasite_name());
        Self::new(host, kind, settings, xml.as_deref())
    }

    /// Store the animation and the selection into the image. Parasites whose
    /// content did not change are left alone so the image stays clean.
    /// Returns true when anything was written.
    pub fn save(&self, host: &mut dyn ImageHost) -> bool {
        let anim = self.as_animation();
        let kind = anim.kind();
        let xml = anim.serialize(&anim.playback().to_xml());

        let mut written = false;
        if host.parasite(kind.parasite_name()).as_deref() != Some(xml.as_str()) {
            host.attach_parasite(kind.parasite_name(), &xml);
            written = true;
        }
        if host.parasite(SELECTED_PARASITE).as_deref() != Some(kind.selection_name()) {
            host.attach_parasite(SELECTED_PARASITE, kind.selection_name());
            written = true;
        }
        written
    }

    /// Settings to cache for the next session.
    pub fn settings(&self) -> Settings {
        let base = self.as_animation().base();
        Settings {
            framerate: base.framerate(),
            proxy_ratio: base.proxy_ratio(),
        }
    }

    pub fn kind(&self) -> AnimationKind {
        self.as_animation().kind()
    }

    pub fn as_animation(&self) -> &dyn Animation {
        match self {
            AnimationModel::Cel(a) => a,
            AnimationModel::Animatic(a) => a,
        }
    }

    pub fn as_animation_mut(&mut self) -> &mut dyn Animation {
        match self {
            AnimationModel::Cel(a) => a,
            AnimationModel::Animatic(a) => a,
        }
    }

    pub fn as_cel(&self) -> Option<&CelAnimation> {
        match self {
            AnimationModel::Cel(a) => Some(a),
            AnimationModel::Animatic(_) => None,
        }
    }

    pub fn as_cel_mut(&mut self) -> Option<&mut CelAnimation> {
        match self {
            AnimationModel::Cel(a) => Some(a),
            AnimationModel::Animatic(_) => None,
        }
    }

    pub fn as_animatic(&self) -> Option<&Animatic> {
        match self {
            AnimationModel::Animatic(a) => Some(a),
            AnimationModel::Cel(_) => None,
        }
    }

    pub fn as_animatic_mut(&mut self) -> Option<&mut Animatic> {
        match self {
            AnimationModel::Animatic(a) => Some(a),
            AnimationModel::Cel(_) => None,
        }
    }
}
