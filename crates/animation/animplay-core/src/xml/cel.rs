//! `<animation type="cels">` documents.
//!
//! ```text
//! <animation type="cels" framerate="24.000000" duration="240" onion-skins="0" width="640" height="480">
//!   <playback .../>
//!   <sequence name="Background">
//!     <frame position="0" duration="240"><layer id="3"/></frame>
//!   </sequence>
//!   <camera><keyframe position="0" x="0" y="0"/></camera>
//!   <comments title=""><comment frame-position="4">text</comment></comments>
//! </animation>
//! ```
//!
//! Identical consecutive slots of a track are written as one `<frame>` run.
//! Empty slots are not written at all.

use log::warn;

use super::{escape, format_framerate, parse_markup, Attributes, MarkupHandler};
use crate::animation::Animation;
use crate::camera::Offset;
use crate::cel::{CelAnimation, Track};
use crate::config::{clamp_framerate, DEFAULT_TRACK_TITLE};
use crate::error::{AnimError, Result};
use crate::ids::Tattoo;
use crate::playback::StoredPlayback;

/// Content of a cel document, detached from any animation.
#[derive(Clone, Debug, Default)]
pub struct CelDocument {
    pub framerate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<usize>,
    pub onion_skins: Option<usize>,
    pub playback: StoredPlayback,
    /// Tracks in document order.
    pub tracks: Vec<Track>,
    pub keyframes: Vec<(usize, Offset)>,
    pub comments: Vec<(usize, String)>,
}

pub fn write(anim: &CelAnimation, playback_xml: &str) -> String {
    let duration = anim.duration();
    let (width, height) = anim.size();
    let mut xml = format!(
        "<animation type=\"cels\" framerate=\"{}\" duration=\"{}\" onion-skins=\"{}\" width=\"{}\" height=\"{}\">",
        format_framerate(anim.framerate()),
        duration,
        anim.onion_skins(),
        width,
        height
    );
    xml.push_str(playback_xml);

    for track in anim.tracks() {
        xml.push_str(&format!("<sequence name=\"{}\">", escape(track.title())));
        let frames = track.frames();
        let mut position = 0;
        while position < frames.len().min(duration) {
            let cel = &frames[position];
            if cel.is_empty() {
                position += 1;
                continue;
            }
            let run = frames[position..frames.len().min(duration)]
                .iter()
                .take_while(|next| *next == cel)
                .count();
            xml.push_str(&format!(
                "<frame position=\"{position}\" duration=\"{run}\">"
            ));
            for tattoo in cel {
                xml.push_str(&format!("<layer id=\"{tattoo}\"/>"));
            }
            xml.push_str("</frame>");
            position += run;
        }
        xml.push_str("</sequence>");
    }

    xml.push_str("<camera>");
    for (position, offset) in anim.camera().keyframes().filter(|(p, _)| *p < duration) {
        xml.push_str(&format!(
            "<keyframe position=\"{position}\" x=\"{}\" y=\"{}\"/>",
            offset.x, offset.y
        ));
    }
    xml.push_str("</camera>");

    xml.push_str("<comments title=\"\">");
    for (position, comment) in anim.comments().iter().enumerate().take(duration) {
        if let Some(text) = comment.as_deref().filter(|t| !t.is_empty()) {
            xml.push_str(&format!(
                "<comment frame-position=\"{position}\">{}</comment>",
                escape(text)
            ));
        }
    }
    xml.push_str("</comments></animation>");
    xml
}

pub fn parse(xml: &str) -> Result<CelDocument> {
    let mut parser = CelParser::default();
    parse_markup(xml, &mut parser)?;
    if parser.state != State::End {
        return Err(AnimError::parse("document ended before </animation>"));
    }
    Ok(parser.doc)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum State {
    #[default]
    Start,
    Animation,
    Playback,
    Sequence,
    Frame,
    Layer,
    Camera,
    Keyframe,
    Comments,
    Comment,
    End,
}

#[derive(Default)]
struct CelParser {
    state: State,
    doc: CelDocument,
    /// Elements nested inside `<playback>`, skipped unread.
    playback_depth: usize,
    /// Slot range of the open `<frame>`; `None` when its attributes were unusable.
    frame: Option<std::ops::Range<usize>>,
    comment: Option<usize>,
    text: String,
}

fn non_negative(v: Option<i64>) -> Option<usize> {
    v.and_then(|v| usize::try_from(v).ok())
}

impl CelParser {
    fn start_animation(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        if name != "animation" {
            return Err(AnimError::parse("Tag <animation> expected."));
        }
        match attrs.get("type") {
            Some("cels") => {}
            other => {
                return Err(AnimError::UnknownAnimationType {
                    found: other.unwrap_or_default().to_string(),
                })
            }
        }
        let doc = &mut self.doc;
        doc.framerate = attrs.float("framerate").map(clamp_framerate);
        doc.width = attrs.int("width").and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0);
        doc.height = attrs.int("height").and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0);
        doc.duration = non_negative(attrs.int("duration"));
        doc.onion_skins = non_negative(attrs.int("onion-skins"));
        Ok(())
    }

    fn start_frame(&mut self, attrs: &Attributes) {
        let position = non_negative(attrs.int("position"));
        let length = non_negative(attrs.int("duration")).filter(|d| *d > 0);
        self.frame = match (position, length) {
            (Some(position), Some(length)) => {
                let end = position.saturating_add(length);
                let end = self.doc.duration.map_or(end, |d| end.min(d));
                if end < position.saturating_add(length) {
                    warn!("frame run at {position} is cut at the end of the animation");
                }
                Some(position..end.max(position))
            }
            _ => {
                warn!("<frame> without a usable position and duration is skipped");
                None
            }
        };
    }

    fn add_layer(&mut self, attrs: &Attributes) -> Result<()> {
        let tattoo = attrs
            .int("id")
            .and_then(|v| u32::try_from(v).ok())
            .map(Tattoo);
        match (self.frame.clone(), tattoo, self.doc.tracks.last_mut()) {
            (Some(range), Some(tattoo), Some(track)) => track.push_layer(range, tattoo)?,
            (_, None, _) => warn!("<layer> without a usable id is skipped"),
            _ => {}
        }
        Ok(())
    }

    fn add_keyframe(&mut self, attrs: &Attributes) {
        let position = non_negative(attrs.int("position"));
        let x = attrs.int("x").and_then(|v| i32::try_from(v).ok());
        let y = attrs.int("y").and_then(|v| i32::try_from(v).ok());
        match (position, x, y) {
            (Some(position), Some(x), Some(y))
                if self.doc.duration.map_or(true, |d| position < d) =>
            {
                self.doc.keyframes.push((position, Offset::new(x, y)));
            }
            _ => warn!("malformed camera <keyframe> is skipped"),
        }
    }
}

impl MarkupHandler for CelParser {
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        self.state = match (self.state, name) {
            (State::Start, _) => {
                self.start_animation(name, attrs)?;
                State::Animation
            }
            (State::Animation, "playback") => {
                self.doc.playback = StoredPlayback {
                    position: attrs.int("position"),
                    start: attrs.int("start"),
                    stop: attrs.int("stop"),
                };
                self.playback_depth = 0;
                State::Playback
            }
            (State::Animation, "sequence") => {
                let title = attrs.get("name").unwrap_or(DEFAULT_TRACK_TITLE);
                self.doc.tracks.push(Track::new(title));
                State::Sequence
            }
            (State::Animation, "camera") => State::Camera,
            (State::Animation, "comments") => State::Comments,
            (State::Animation, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <{name}> not expected inside <animation>."
                )))
            }
            (State::Playback, _) => {
                self.playback_depth += 1;
                State::Playback
            }
            (State::Sequence, "frame") => {
                self.start_frame(attrs);
                State::Frame
            }
            (State::Sequence, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <frame> expected. Got \"{name}\" instead."
                )))
            }
            (State::Frame, "layer") => {
                self.add_layer(attrs)?;
                State::Layer
            }
            (State::Frame, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <layer> expected. Got \"{name}\" instead."
                )))
            }
            (State::Camera, "keyframe") => {
                self.add_keyframe(attrs);
                State::Keyframe
            }
            (State::Camera, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <keyframe> expected. Got \"{name}\" instead."
                )))
            }
            (State::Comments, "comment") => {
                self.comment = non_negative(attrs.int("frame-position"));
                if self.comment.is_none() {
                    warn!("<comment> without a usable frame-position is skipped");
                }
                self.text.clear();
                State::Comment
            }
            (State::Comments, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <comment> expected. Got \"{name}\" instead."
                )))
            }
            (State::Layer | State::Keyframe | State::Comment, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <{name}> is not expected here."
                )))
            }
            (State::End, _) => {
                return Err(AnimError::parse("Content after </animation>."))
            }
        };
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        self.state = match self.state {
            State::Animation => State::End,
            State::Playback if self.playback_depth > 0 => {
                self.playback_depth -= 1;
                State::Playback
            }
            State::Playback | State::Sequence | State::Camera | State::Comments => {
                State::Animation
            }
            State::Frame => {
                self.frame = None;
                State::Sequence
            }
            State::Layer => State::Frame,
            State::Keyframe => State::Camera,
            State::Comment => {
                let text = std::mem::take(&mut self.text);
                if let Some(position) = self.comment.take() {
                    if !text.is_empty() {
                        self.doc.comments.push((position, text));
                    }
                }
                State::Comments
            }
            other => other,
        };
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if self.state == State::Comment {
            self.text.push_str(text);
        }
        Ok(())
    }
}
