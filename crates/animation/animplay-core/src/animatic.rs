//! Animatic: a storyboard with one panel per layer of the image.
//!
//! Panels and positions are 1-based. Panel 1 is the bottom layer of the stack.
//! Each panel keeps a rendered preview; a panel in combine mode is drawn over
//! the preview of the panel before it, so recomputing one preview walks
//! forward through the combine chain that follows it.

use std::sync::Arc;

use log::{debug, warn};

use crate::animation::{Animation, AnimationBase, AnimationKind};
use crate::compose::{normal_blend, scaled_size, FrameBuffer};
use crate::config::Settings;
use crate::error::{AnimError, Result};
use crate::events::AnimationEvent;
use crate::host::ImageHost;
use crate::ids::Tattoo;
use crate::playback::{Playback, StoredPlayback};
use crate::tags::{parse_combine_tag, parse_ms_tag};
use crate::xml;

#[derive(Clone, Debug)]
pub struct Panel {
    tattoo: Tattoo,
    duration: usize,
    combine: bool,
    comment: Option<String>,
    cache: Option<FrameBuffer>,
}

impl Panel {
    #[inline]
    pub fn tattoo(&self) -> Tattoo {
        self.tattoo
    }

    #[inline]
    pub fn duration(&self) -> usize {
        self.duration
    }

    #[inline]
    pub fn combine(&self) -> bool {
        self.combine
    }

    #[inline]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[inline]
    pub fn cache(&self) -> Option<&FrameBuffer> {
        self.cache.as_ref()
    }
}

#[derive(Debug)]
pub struct Animatic {
    base: AnimationBase,
    panels: Vec<Panel>,
}

impl Animatic {
    /// Animatic with one panel per layer currently in `host`.
    pub fn new(host: &dyn ImageHost, settings: &Settings) -> Result<Self> {
        let mut animatic = Self::unloaded(host, settings);
        let ratio = animatic.base.proxy_ratio();
        animatic.load(host, ratio)?;
        Ok(animatic)
    }

    /// No panels yet; `deserialize` or `load` fills it.
    pub(crate) fn unloaded(host: &dyn ImageHost, settings: &Settings) -> Self {
        Self {
            base: AnimationBase::new(host, settings),
            panels: Vec::new(),
        }
    }

    /// Rebuild every panel from the layers of `host`. Durations and blend
    /// modes come from tags in the layer names, comments from the names.
    pub fn load(&mut self, host: &dyn ImageHost, proxy_ratio: f64) -> Result<()> {
        self.load_panels(host, proxy_ratio)?;
        self.cache_all(host);

        let max = self.last_position();
        self.base
            .playback_mut()
            .restore(StoredPlayback::default(), 1, max);
        self.base.set_loaded();

        let length = self.length();
        let notifier = self.base.notifier_mut();
        notifier.emit(AnimationEvent::Loaded);
        notifier.emit(AnimationEvent::DurationChanged { duration: length });
        Ok(())
    }

    /// Panels derived from the layer names, without previews.
    fn load_panels(&mut self, host: &dyn ImageHost, proxy_ratio: f64) -> Result<()> {
        self.base.set_proxy_ratio(proxy_ratio)?;

        let layers = host.layers();
        let mut panels = Vec::new();
        panels.try_reserve_exact(layers.len())?;

        let framerate = self.base.framerate();
        for &layer in layers.iter().rev() {
            let name = host.layer_name(layer).unwrap_or_default();
            panels.push(Panel {
                tattoo: host.layer_tattoo(layer).unwrap_or(Tattoo(0)),
                duration: parse_ms_tag(&name, framerate),
                combine: parse_combine_tag(&name),
                comment: Some(name),
                cache: None,
            });
        }
        self.panels = panels;
        Ok(())
    }

    fn cache_all(&mut self, host: &dyn ImageHost) {
        let n = self.panels.len();
        for panel in 1..=n {
            self.cache(host, panel);
            self.base.notifier_mut().emit(AnimationEvent::Loading {
                fraction: panel as f64 / n as f64,
            });
        }
    }

    fn check_panel(&self, panel: usize) -> Result<usize> {
        if panel >= 1 && panel <= self.panels.len() {
            Ok(panel - 1)
        } else {
            debug!("panel {panel} out of range ({} panels)", self.panels.len());
            Err(AnimError::out_of_range("panel", panel, self.panels.len()))
        }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Sum of all panel durations.
    pub fn length(&self) -> usize {
        self.panels.iter().map(|p| p.duration).sum()
    }

    pub fn get_duration(&self, panel: usize) -> Result<usize> {
        let idx = self.check_panel(panel)?;
        Ok(self.panels[idx].duration)
    }

    /// Change a panel's length, refitting the play range and the cursor to
    /// the new total.
    pub fn set_duration(&mut self, panel: usize, duration: usize) -> Result<()> {
        let idx = self.check_panel(panel)?;

        let prev_length = self.length();
        let Playback {
            position,
            start,
            stop,
            ..
        } = *self.base.playback();
        let shown = self.get_panel(position);

        self.panels[idx].duration = duration;
        let length = self.length();

        let start = if start > length { 1 } else { start };
        let stop = if stop > length || stop == prev_length {
            length
        } else {
            stop
        };
        {
            let playback = self.base.playback_mut();
            playback.start = start;
            playback.stop = stop;
            playback.stop_at_end = stop == length;
        }

        let notifier = self.base.notifier_mut();
        notifier.emit(AnimationEvent::PanelDurationChanged { panel, duration });
        if length != prev_length {
            notifier.emit(AnimationEvent::DurationChanged { duration: length });
        }
        self.base.emit_playback_range(1, length);

        if position > length {
            if !self.jump(length) {
                self.base.playback_mut().position = 1;
            }
        } else if self.get_panel(position) != shown {
            self.base
                .notifier_mut()
                .emit(AnimationEvent::Render { position });
        }
        Ok(())
    }

    /// An empty text clears the comment.
    pub fn set_comment(&mut self, panel: usize, comment: &str) -> Result<()> {
        let idx = self.check_panel(panel)?;
        self.panels[idx].comment = (!comment.is_empty()).then(|| comment.to_string());
        Ok(())
    }

    pub fn get_comment(&self, panel: usize) -> Result<Option<&str>> {
        let idx = self.check_panel(panel)?;
        Ok(self.panels[idx].comment())
    }

    pub fn set_combine(&mut self, host: &dyn ImageHost, panel: usize, combine: bool) -> Result<()> {
        let idx = self.check_panel(panel)?;
        if self.panels[idx].combine != combine {
            self.panels[idx].combine = combine;
            self.recache(host, panel);
        }
        Ok(())
    }

    pub fn get_combine(&self, panel: usize) -> Result<bool> {
        let idx = self.check_panel(panel)?;
        Ok(self.panels[idx].combine)
    }

    /// Change the preview scale and rebuild every panel preview.
    pub fn set_proxy(&mut self, host: &dyn ImageHost, ratio: f64) -> Result<()> {
        self.base.set_proxy_ratio(ratio)?;
        for panel in 1..=self.panels.len() {
            self.cache(host, panel);
        }
        Ok(())
    }

    /// Panel shown at `position`, or `None` outside `1..=length`.
    pub fn get_panel(&self, position: usize) -> Option<usize> {
        if position < 1 || position > self.length() {
            return None;
        }
        let mut covered = 0;
        self.panels.iter().position(|p| {
            covered += p.duration;
            covered >= position
        })
        .map(|idx| idx + 1)
    }

    /// First timeline position of `panel`.
    pub fn position_of(&self, panel: usize) -> Result<usize> {
        let idx = self.check_panel(panel)?;
        Ok(1 + self.panels[..idx].iter().map(|p| p.duration).sum::<usize>())
    }

    /// Jump to the first position of `panel`. Returns false when the panel
    /// is not shown at all and no jump happened.
    pub fn jump_panel(&mut self, panel: usize) -> Result<bool> {
        let position = self.position_of(panel)?;
        Ok(self.jump(position))
    }

    /// Move `panel` to `new_panel` with its duration, blend mode and
    /// comment. The panels in between shift by one.
    pub fn move_panel(
        &mut self,
        host: &dyn ImageHost,
        panel: usize,
        new_panel: usize,
    ) -> Result<()> {
        let from = self.check_panel(panel)?;
        let to = self.check_panel(new_panel)?;
        if from == to {
            return Ok(());
        }
        let moved = self.panels.remove(from);
        self.panels.insert(to, moved);

        let (low, high) = (from.min(to) + 1, from.max(to) + 1);
        for panel in low..high {
            self.cache(host, panel);
        }
        self.recache(host, high);

        let first = self.position_of(low)?;
        let end = self.position_of(high)? + self.panels[high - 1].duration;
        self.base.notifier_mut().frames_changed(first, end - first);
        Ok(())
    }

    /// Cached preview of the panel shown at `position`.
    pub fn frame(&self, position: usize) -> Option<FrameBuffer> {
        self.get_panel(position)
            .and_then(|panel| self.panels[panel - 1].cache.clone())
    }

    /// Recompute one panel and the combine chain that follows it.
    fn recache(&mut self, host: &dyn ImageHost, first: usize) {
        let mut panel = first;
        loop {
            self.cache(host, panel);
            match self.panels.get(panel) {
                Some(next) if next.combine => panel += 1,
                _ => break,
            }
        }
    }

    fn cache(&mut self, host: &dyn ImageHost, panel: usize) {
        let idx = panel - 1;
        let ratio = self.base.proxy_ratio();
        let (width, height) = self.base.size();
        let (width, height) = scaled_size(width, height, ratio);

        let backdrop = if idx > 0 && self.panels[idx].combine {
            self.panels[idx - 1].cache.clone()
        } else {
            None
        };

        let source = host
            .layer_by_tattoo(self.panels[idx].tattoo)
            .and_then(|layer| host.layer_pixels(layer).map(|px| (layer, px)));
        self.panels[idx].cache = match source {
            Some((layer, pixels)) => Some(Arc::new(normal_blend(
                width,
                height,
                backdrop.as_deref(),
                &pixels,
                ratio,
                host.layer_offsets(layer),
            ))),
            None => {
                warn!("the layer of panel {panel} has been deleted");
                backdrop
            }
        };

        let position = self.base.playback().position;
        if self.get_panel(position) == Some(panel) {
            self.base
                .notifier_mut()
                .emit(AnimationEvent::Render { position });
        }
    }

    fn apply_document(&mut self, host: &dyn ImageHost, doc: xml::animatic::AnimaticDocument) {
        let n = self.panels.len();
        for (idx, stored) in doc.panels.into_iter().enumerate() {
            let Some(panel) = self.panels.get_mut(idx) else {
                warn!("stored panel {} has no matching layer", idx + 1);
                continue;
            };
            if let Some(tattoo) = stored.tattoo {
                if tattoo != panel.tattoo {
                    warn!(
                        "panel {} was stored for layer {tattoo}, now shows layer {}",
                        idx + 1,
                        panel.tattoo
                    );
                }
            }
            if let Some(duration) = stored.duration {
                panel.duration = duration;
            }
            panel.combine = stored.combine;
        }
        for (idx, text) in doc.comments {
            match self.panels.get_mut(idx) {
                Some(p) => p.comment = Some(text),
                None => warn!("comment for panel {} ignored ({n} panels)", idx + 1),
            }
        }
        self.cache_all(host);

        let max = self.last_position();
        self.base.playback_mut().restore(doc.playback, 1, max);
        self.base.set_loaded();

        let length = self.length();
        let notifier = self.base.notifier_mut();
        notifier.emit(AnimationEvent::Loaded);
        notifier.emit(AnimationEvent::DurationChanged { duration: length });
        notifier.frames_changed(1, length);
    }
}

impl Animation for Animatic {
    fn base(&self) -> &AnimationBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimationBase {
        &mut self.base
    }

    fn kind(&self) -> AnimationKind {
        AnimationKind::Animatic
    }

    fn duration(&self) -> usize {
        self.length()
    }

    fn start_position(&self) -> usize {
        1
    }

    /// The panel's tattoo followed by those of the panels it is combined over.
    fn frame_hash(&self, position: usize) -> Option<String> {
        let panel = self.get_panel(position)?;
        let mut idx = panel - 1;
        let mut hash = format!("{};", self.panels[idx].tattoo);
        while idx > 0 && self.panels[idx].combine {
            idx -= 1;
            hash.push_str(&format!("{};", self.panels[idx].tattoo));
        }
        Some(hash)
    }

    fn same(&self, a: usize, b: usize) -> bool {
        match (self.get_panel(a), self.get_panel(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn get_frame(&mut self, _host: &dyn ImageHost, position: usize) -> Option<FrameBuffer> {
        self.frame(position)
    }

    fn serialize(&self, playback_xml: &str) -> String {
        xml::animatic::write(self, playback_xml)
    }

    /// Rebuild from the live image, then apply the document on top. A
    /// document that cannot be parsed leaves the freshly loaded defaults.
    fn deserialize(&mut self, host: &dyn ImageHost, document: &str) -> Result<()> {
        let ratio = self.base.proxy_ratio();
        match xml::animatic::parse(document) {
            Ok(doc) => {
                if let Some(framerate) = doc.framerate {
                    self.base.restore_framerate(framerate);
                }
                self.load_panels(host, ratio)?;
                self.apply_document(host, doc);
                Ok(())
            }
            Err(err) => {
                warn!("animatic could not be restored, using defaults: {err}");
                self.load(host, ratio)?;
                Err(err)
            }
        }
    }

    fn reset_defaults(&mut self, host: &dyn ImageHost) -> Result<()> {
        let ratio = self.base.proxy_ratio();
        self.load(host, ratio)
    }
}
