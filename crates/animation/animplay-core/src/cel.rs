//! Cel animation: a stack of tracks, each holding one set of layers per frame.
//!
//! Frame positions are 0-based. Tracks, the comment list and the camera grow
//! independently of each other; a slot past the end of any of them reads as
//! empty. Tracks are painted in list order and the layers of one slot in
//! insertion order, so later entries end up on top.

use std::fmt::Write as _;
use std::sync::Arc;

use image::RgbaImage;
use log::{debug, warn};

use crate::animation::{Animation, AnimationBase, AnimationKind};
use crate::camera::{Camera, Offset, OffsetsChanged};
use crate::compose::{normal_blend, scaled_size, FrameBuffer};
use crate::config::{
    Settings, BACKGROUND_TRACK_TITLE, DEFAULT_CEL_DURATION, DEFAULT_TRACK_TITLE,
};
use crate::error::{AnimError, Result};
use crate::events::AnimationEvent;
use crate::host::{ColorTag, ImageHost};
use crate::ids::Tattoo;
use crate::xml;

/// Layers shown by one track at one frame; empty means nothing.
pub type Cel = Vec<Tattoo>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    title: String,
    frames: Vec<Cel>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            frames: Vec::new(),
        }
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Stored slots; may be shorter than the animation.
    #[inline]
    pub fn frames(&self) -> &[Cel] {
        &self.frames
    }

    /// Layers at `position`, empty past the stored slots.
    #[inline]
    pub fn cel(&self, position: usize) -> &[Tattoo] {
        self.frames.get(position).map_or(&[], Vec::as_slice)
    }

    /// Append `tattoo` to every slot in `range`, padding with empty slots.
    /// Fails instead of aborting when the padding cannot be allocated.
    pub(crate) fn push_layer(
        &mut self,
        range: std::ops::Range<usize>,
        tattoo: Tattoo,
    ) -> Result<()> {
        if self.frames.len() < range.end {
            self.frames.try_reserve_exact(range.end - self.frames.len())?;
            self.frames.resize(range.end, Cel::new());
        }
        for cel in &mut self.frames[range] {
            cel.try_reserve(1)?;
            cel.push(tattoo);
        }
        Ok(())
    }

    fn busy_positions(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, cel)| !cel.is_empty())
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug)]
pub struct CelAnimation {
    base: AnimationBase,
    duration: usize,
    onion_skins: usize,
    tracks: Vec<Track>,
    comments: Vec<Option<String>>,
    camera: Camera,
}

impl CelAnimation {
    /// Fresh animation built from the default layout of `host`.
    pub fn new(host: &dyn ImageHost, settings: &Settings) -> Self {
        let mut anim = Self {
            base: AnimationBase::new(host, settings),
            duration: 0,
            onion_skins: 0,
            tracks: Vec::new(),
            comments: Vec::new(),
            camera: Camera::new(),
        };
        if let Err(err) = anim.apply_defaults(host) {
            warn!("default background track could not be filled: {err}");
        }
        anim
    }

    fn apply_defaults(&mut self, host: &dyn ImageHost) -> Result<()> {
        self.tracks.clear();
        self.comments.clear();
        self.camera = Camera::new();
        self.set_duration(DEFAULT_CEL_DURATION);

        let mut background = Track::new(BACKGROUND_TRACK_TITLE);
        if let Some(tattoo) = host
            .layer_by_name(BACKGROUND_TRACK_TITLE)
            .and_then(|layer| host.layer_tattoo(layer))
        {
            if let Err(err) = background.push_layer(0..self.duration, tattoo) {
                self.tracks.push(Track::new(BACKGROUND_TRACK_TITLE));
                self.tracks.push(Track::new(DEFAULT_TRACK_TITLE));
                return Err(err);
            }
        }
        self.tracks.push(background);
        self.tracks.push(Track::new(DEFAULT_TRACK_TITLE));

        let max = self.last_position();
        self.base.playback_mut().restore(Default::default(), 0, max);
        self.base.set_loaded();
        self.base.notifier_mut().frames_changed(0, self.duration);
        Ok(())
    }

    #[inline]
    fn last_position(&self) -> usize {
        self.duration.saturating_sub(1)
    }

    fn check_track(&self, track: usize) -> Result<()> {
        if track < self.tracks.len() {
            Ok(())
        } else {
            debug!("track {track} out of range ({} tracks)", self.tracks.len());
            Err(AnimError::out_of_range("track", track, self.tracks.len()))
        }
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position < self.duration {
            Ok(())
        } else {
            debug!("frame {position} out of range (duration {})", self.duration);
            Err(AnimError::out_of_range("frame", position, self.duration))
        }
    }

    fn emit_each(&mut self, positions: impl IntoIterator<Item = usize>) {
        for position in positions {
            self.base.notifier_mut().frames_changed(position, 1);
        }
    }

    // ---- frames ----

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn set_layers(&mut self, track: usize, position: usize, layers: Vec<Tattoo>) -> Result<()> {
        self.check_track(track)?;
        self.check_position(position)?;
        let frames = &mut self.tracks[track].frames;
        if frames.len() <= position {
            frames.try_reserve_exact(position + 1 - frames.len())?;
            frames.resize(position + 1, Cel::new());
        }
        frames[position] = layers;
        self.base.notifier_mut().frames_changed(position, 1);
        Ok(())
    }

    pub fn get_layers(&self, track: usize, position: usize) -> Result<&[Tattoo]> {
        self.check_track(track)?;
        self.check_position(position)?;
        Ok(self.tracks[track].cel(position))
    }

    /// An empty text clears the comment.
    pub fn set_comment(&mut self, position: usize, comment: &str) -> Result<()> {
        self.check_position(position)?;
        if self.comments.len() <= position {
            self.comments
                .try_reserve_exact(position + 1 - self.comments.len())?;
            self.comments.resize(position + 1, None);
        }
        self.comments[position] = (!comment.is_empty()).then(|| comment.to_string());
        self.base.notifier_mut().frames_changed(position, 1);
        Ok(())
    }

    pub fn get_comment(&self, position: usize) -> Result<Option<&str>> {
        self.check_position(position)?;
        Ok(self.comments.get(position).and_then(|c| c.as_deref()))
    }

    pub fn onion_skins(&self) -> usize {
        self.onion_skins
    }

    pub fn set_onion_skins(&mut self, skins: usize) {
        self.onion_skins = skins;
    }

    /// Shrinking drops everything at or past the new end. Growing adds
    /// implicitly empty frames.
    pub fn set_duration(&mut self, duration: usize) {
        if duration < self.duration {
            for track in &mut self.tracks {
                track.frames.truncate(duration);
            }
            self.comments.truncate(duration);
            self.camera.truncate(duration);
        }
        if duration != self.duration {
            self.duration = duration;
            self.base
                .notifier_mut()
                .emit(AnimationEvent::DurationChanged { duration });
            let max = self.last_position();
            self.base.fit_playback(0, max);
        }
    }

    // ---- tracks ----

    /// Move a track one step toward the front of the list (painted earlier).
    /// Returns its new index.
    pub fn level_up(&mut self, track: usize) -> Result<usize> {
        self.check_track(track)?;
        if track == 0 {
            return Err(AnimError::out_of_range("track", track, self.tracks.len()));
        }
        self.tracks.swap(track, track - 1);
        let busy = self.tracks[track - 1].busy_positions();
        self.emit_each(busy);
        Ok(track - 1)
    }

    /// Move a track one step toward the back of the list (painted later).
    /// Returns its new index.
    pub fn level_down(&mut self, track: usize) -> Result<usize> {
        self.check_track(track)?;
        if track + 1 == self.tracks.len() {
            return Err(AnimError::out_of_range("track", track + 1, self.tracks.len()));
        }
        self.tracks.swap(track, track + 1);
        let busy = self.tracks[track + 1].busy_positions();
        self.emit_each(busy);
        Ok(track + 1)
    }

    pub fn level_delete(&mut self, track: usize) -> Result<()> {
        self.check_track(track)?;
        if self.tracks.len() == 1 {
            return Err(AnimError::LastTrack);
        }
        let removed = self.tracks.remove(track);
        self.emit_each(removed.busy_positions());
        Ok(())
    }

    /// Insert an empty track at `position` (0..=track_count).
    pub fn level_add(&mut self, position: usize) -> Result<()> {
        if position > self.tracks.len() {
            return Err(AnimError::out_of_range("track", position, self.tracks.len() + 1));
        }
        self.tracks.insert(position, Track::new(DEFAULT_TRACK_TITLE));
        Ok(())
    }

    pub fn track_title(&self, track: usize) -> Option<&str> {
        self.tracks.get(track).map(Track::title)
    }

    pub fn set_track_title(&mut self, track: usize, title: &str) -> Result<()> {
        self.check_track(track)?;
        self.tracks[track].title = title.to_string();
        Ok(())
    }

    // ---- cels ----

    /// Remove one slot, shifting the rest of this track down by one.
    pub fn cel_delete(&mut self, track: usize, position: usize) -> Result<()> {
        self.check_track(track)?;
        let frames = &mut self.tracks[track].frames;
        if position >= frames.len() {
            return Err(AnimError::out_of_range("cel", position, frames.len()));
        }
        let old_len = frames.len();
        frames.remove(position);
        self.emit_each(position..old_len);
        Ok(())
    }

    /// Insert a slot at `position`, shifting the rest of this track up.
    /// With `dup_previous` the new slot copies the one before it. The
    /// animation grows when the track no longer fits.
    pub fn cel_add(&mut self, track: usize, position: usize, dup_previous: bool) -> Result<()> {
        self.check_track(track)?;
        if position > self.duration {
            return Err(AnimError::out_of_range("frame", position, self.duration + 1));
        }
        let frames = &mut self.tracks[track].frames;
        if frames.len() < position {
            frames.try_reserve_exact(position - frames.len())?;
            frames.resize(position, Cel::new());
        }
        let (contents, first_changed) = if dup_previous && position > 0 {
            (frames[position - 1].clone(), position + 1)
        } else {
            (Cel::new(), position)
        };
        frames.insert(position, contents);

        let len = frames.len();
        if len > self.duration {
            self.set_duration(len);
        }
        self.emit_each(first_changed..len);
        Ok(())
    }

    // ---- camera ----

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera offset at `position`; (0, 0) outside the animation.
    pub fn camera_offset(&self, position: usize) -> Offset {
        if position < self.duration {
            self.camera.offset(position)
        } else {
            Offset::default()
        }
    }

    fn offsets_changed(&mut self, range: OffsetsChanged) {
        let notifier = self.base.notifier_mut();
        notifier.emit(AnimationEvent::CameraOffsetsChanged {
            position: range.position,
            length: range.length,
        });
        notifier.frames_changed(range.position, range.length);
    }

    pub fn set_camera_keyframe(&mut self, position: usize, offset: Offset) -> Result<()> {
        let range = self.camera.set_keyframe(self.duration, position, offset)?;
        self.base
            .notifier_mut()
            .emit(AnimationEvent::KeyframeSet { position });
        self.offsets_changed(range);
        Ok(())
    }

    /// Returns false when `position` held no keyframe.
    pub fn delete_camera_keyframe(&mut self, position: usize) -> bool {
        match self.camera.delete_keyframe(self.duration, position) {
            Some(range) => {
                self.base
                    .notifier_mut()
                    .emit(AnimationEvent::KeyframeDeleted { position });
                self.offsets_changed(range);
                true
            }
            None => false,
        }
    }

    pub fn preview_camera_keyframe(&mut self, position: usize, offset: Offset) -> Result<()> {
        let range = self.camera.preview_keyframe(self.duration, position, offset)?;
        self.offsets_changed(range);
        Ok(())
    }

    pub fn apply_camera_preview(&mut self) {
        if let Some((position, range)) = self.camera.apply_preview(self.duration) {
            self.base
                .notifier_mut()
                .emit(AnimationEvent::KeyframeSet { position });
            self.offsets_changed(range);
        }
    }

    pub fn reset_camera_preview(&mut self) {
        if let Some(range) = self.camera.reset_preview() {
            self.offsets_changed(range);
        }
    }

    // ---- rendering ----

    /// Composite every layer shown at `position`, scaled by `proxy_ratio`.
    /// Returns `None` when nothing is drawn.
    pub fn create_frame(
        &self,
        host: &dyn ImageHost,
        position: usize,
        proxy_ratio: f64,
    ) -> Option<RgbaImage> {
        if position >= self.duration {
            return None;
        }
        let (width, height) = self.base.size();
        let (width, height) = scaled_size(width, height, proxy_ratio);
        let camera = self.camera.offset(position);

        let mut buffer: Option<RgbaImage> = None;
        for track in &self.tracks {
            for &tattoo in track.cel(position) {
                let Some(layer) = host.layer_by_tattoo(tattoo) else {
                    warn!("a layer used for frame {} has been deleted", position + 1);
                    continue;
                };
                let Some(pixels) = host.layer_pixels(layer) else {
                    warn!("layer {tattoo} used for frame {} has no pixels", position + 1);
                    continue;
                };
                let (x, y) = host.layer_offsets(layer);
                buffer = Some(normal_blend(
                    width,
                    height,
                    buffer.as_ref(),
                    &pixels,
                    proxy_ratio,
                    (x + camera.x, y + camera.y),
                ));
            }
        }
        buffer
    }

    /// Fingerprint of what `position` shows. With `layers_only` the camera
    /// offset is left out, which is what onion skinning compares.
    pub fn hash(&self, position: usize, layers_only: bool) -> Option<String> {
        let camera = self.camera_offset(position);
        let mut hash = String::new();
        for track in &self.tracks {
            for tattoo in track.cel(position).iter().filter(|t| t.is_valid()) {
                if layers_only {
                    let _ = write!(hash, "{tattoo};");
                } else {
                    let _ = write!(hash, "[{},{}]{tattoo};", camera.x, camera.y);
                }
            }
        }
        (!hash.is_empty()).then_some(hash)
    }

    /// Show the layers of `position` in the host image and up to
    /// `onion_skins` distinct earlier frames behind them.
    pub fn update_paint_view(&self, host: &mut dyn ImageHost, position: usize) {
        for layer in host.layers() {
            host.set_visible(layer, false);
        }

        let mut last_layer = None;
        for track in &self.tracks {
            for &tattoo in track.cel(position) {
                match host.layer_by_tattoo(tattoo) {
                    Some(layer) => {
                        host.highlight(layer, ColorTag::Red, 1.0);
                        last_layer = Some(layer);
                    }
                    None => warn!("a layer used for frame {} has been deleted", position + 1),
                }
            }
        }

        let mut prev_hash = self.hash(position, true);
        let mut skin = 0;
        for i in (0..position).rev() {
            if skin >= self.onion_skins {
                break;
            }
            let hash = self.hash(i, true);
            if hash == prev_hash {
                continue;
            }
            prev_hash = hash;

            let color = ColorTag::onion_skin(skin);
            let opacity = (0.5 - 0.1 * skin as f64).max(0.1);
            for track in &self.tracks {
                for &tattoo in track.cel(i) {
                    if let Some(layer) = host.layer_by_tattoo(tattoo) {
                        if !host.is_visible(layer) {
                            host.highlight(layer, color, opacity);
                        }
                    }
                }
            }
            skin += 1;
        }

        if let Some(layer) = last_layer {
            host.set_active_layer(layer);
        }
    }

    pub(crate) fn comments(&self) -> &[Option<String>] {
        &self.comments
    }
}

impl Animation for CelAnimation {
    fn base(&self) -> &AnimationBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimationBase {
        &mut self.base
    }

    fn kind(&self) -> AnimationKind {
        AnimationKind::Cel
    }

    fn duration(&self) -> usize {
        self.duration
    }

    fn start_position(&self) -> usize {
        0
    }

    fn frame_hash(&self, position: usize) -> Option<String> {
        self.hash(position, false)
    }

    fn get_frame(&mut self, host: &dyn ImageHost, position: usize) -> Option<FrameBuffer> {
        let ratio = self.base.proxy_ratio();
        self.create_frame(host, position, ratio).map(Arc::new)
    }

    fn serialize(&self, playback_xml: &str) -> String {
        xml::cel::write(self, playback_xml)
    }

    /// Replace the whole state with the document. On error nothing changes.
    fn deserialize(&mut self, _host: &dyn ImageHost, document: &str) -> Result<()> {
        let doc = xml::cel::parse(document)?;

        let duration = doc.duration.unwrap_or_else(|| {
            doc.tracks
                .iter()
                .map(|t| t.frames.len())
                .chain(doc.comments.iter().map(|(p, _)| p + 1))
                .max()
                .unwrap_or(0)
        });
        let mut comments: Vec<Option<String>> = Vec::new();
        for (position, text) in doc.comments {
            if position < duration {
                if comments.len() <= position {
                    comments.try_reserve_exact(position + 1 - comments.len())?;
                    comments.resize(position + 1, None);
                }
                comments[position] = Some(text);
            }
        }

        if let Some(framerate) = doc.framerate {
            self.base.restore_framerate(framerate);
        }
        if let (Some(width), Some(height)) = (doc.width, doc.height) {
            self.base.set_size(width, height);
        }
        self.onion_skins = doc.onion_skins.unwrap_or(0);

        let duration_changed = duration != self.duration;
        self.duration = duration;
        self.comments = comments;

        self.tracks = doc.tracks;
        if self.tracks.is_empty() {
            self.tracks.push(Track::new(DEFAULT_TRACK_TITLE));
        }

        self.camera = Camera::new();
        for (position, offset) in doc.keyframes {
            if self.camera.set_keyframe(duration, position, offset).is_err() {
                warn!("camera keyframe at frame {} is past the end", position + 1);
            }
        }

        let max = self.last_position();
        self.base.playback_mut().restore(doc.playback, 0, max);
        self.base.set_loaded();

        if duration_changed {
            self.base
                .notifier_mut()
                .emit(AnimationEvent::DurationChanged { duration });
        }
        self.base.notifier_mut().frames_changed(0, duration);
        Ok(())
    }

    fn reset_defaults(&mut self, host: &dyn ImageHost) -> Result<()> {
        self.apply_defaults(host)
    }
}
