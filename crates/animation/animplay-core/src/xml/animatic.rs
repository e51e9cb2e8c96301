//! `<animation type="animatic">` documents.
//!
//! ```text
//! <animation type="animatic" framerate="24.000000" duration="3" width="" height="">
//!   <playback .../>
//!   <sequence>
//!     <panel duration="12"><layer id="1"/></panel>
//!     <panel duration="6" blend-mode="normal"><layer id="2"/></panel>
//!   </sequence>
//!   <comments><comment panel="0">text</comment></comments>
//! </animation>
//! ```
//!
//! `duration` on the root is the panel count. Panels are listed in order and
//! matched to the live layers by index. The `panel` attribute of a comment is
//! the 0-based index into the sequence.

use log::warn;

use super::{escape, format_framerate, parse_markup, Attributes, MarkupHandler};
use crate::animatic::Animatic;
use crate::animation::Animation;
use crate::config::clamp_framerate;
use crate::error::{AnimError, Result};
use crate::ids::Tattoo;
use crate::playback::StoredPlayback;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PanelDocument {
    /// `None` keeps the length derived from the layer name.
    pub duration: Option<usize>,
    pub combine: bool,
    pub tattoo: Option<Tattoo>,
}

#[derive(Clone, Debug, Default)]
pub struct AnimaticDocument {
    pub framerate: Option<f64>,
    pub playback: StoredPlayback,
    pub panels: Vec<PanelDocument>,
    /// 0-based panel index and text.
    pub comments: Vec<(usize, String)>,
}

pub fn write(anim: &Animatic, playback_xml: &str) -> String {
    let mut xml = format!(
        "<animation type=\"animatic\" framerate=\"{}\" duration=\"{}\" width=\"\" height=\"\">",
        format_framerate(anim.framerate()),
        anim.panel_count()
    );
    xml.push_str(playback_xml);

    xml.push_str("<sequence>");
    for panel in anim.panels() {
        xml.push_str(&format!("<panel duration=\"{}\"", panel.duration()));
        if panel.combine() {
            xml.push_str(" blend-mode=\"normal\"");
        }
        xml.push_str(&format!("><layer id=\"{}\"/></panel>", panel.tattoo()));
    }
    xml.push_str("</sequence>");

    xml.push_str("<comments>");
    for (idx, panel) in anim.panels().iter().enumerate() {
        if let Some(text) = panel.comment().filter(|t| !t.is_empty()) {
            xml.push_str(&format!(
                "<comment panel=\"{}\">{}</comment>",
                idx,
                escape(text)
            ));
        }
    }
    xml.push_str("</comments></animation>");
    xml
}

pub fn parse(xml: &str) -> Result<AnimaticDocument> {
    let mut parser = AnimaticParser::default();
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
    Panel,
    Layer,
    EndSequence,
    Comments,
    Comment,
    End,
}

#[derive(Default)]
struct AnimaticParser {
    state: State,
    doc: AnimaticDocument,
    playback_depth: usize,
    comment: Option<usize>,
    text: String,
}

impl MarkupHandler for AnimaticParser {
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()> {
        self.state = match (self.state, name) {
            (State::Start, "animation") => {
                match attrs.get("type") {
                    Some("animatic") => {}
                    other => {
                        return Err(AnimError::UnknownAnimationType {
                            found: other.unwrap_or_default().to_string(),
                        })
                    }
                }
                self.doc.framerate = attrs.float("framerate").map(clamp_framerate);
                State::Animation
            }
            (State::Start, _) => return Err(AnimError::parse("Tag <animation> expected.")),
            (State::Animation, "playback") => {
                self.doc.playback = StoredPlayback {
                    position: attrs.int("position"),
                    start: attrs.int("start"),
                    stop: attrs.int("stop"),
                };
                self.playback_depth = 0;
                State::Playback
            }
            (State::Animation, "sequence") => State::Sequence,
            (State::Animation, _) => {
                return Err(AnimError::parse(format!("Unknown animation tag: {name}.")))
            }
            (State::Playback, _) => {
                self.playback_depth += 1;
                State::Playback
            }
            (State::Sequence, "panel") => {
                let duration = attrs
                    .int("duration")
                    .and_then(|d| usize::try_from(d).ok());
                if duration.is_none() {
                    warn!("panel {} has no usable duration", self.doc.panels.len() + 1);
                }
                self.doc.panels.push(PanelDocument {
                    duration,
                    combine: attrs.get("blend-mode") == Some("normal"),
                    tattoo: None,
                });
                State::Panel
            }
            (State::Sequence, _) => {
                return Err(AnimError::parse(format!("Unknown sequence tag: {name}.")))
            }
            (State::Panel, "layer") => {
                if let Some(panel) = self.doc.panels.last_mut() {
                    panel.tattoo = attrs
                        .int("id")
                        .and_then(|v| u32::try_from(v).ok())
                        .map(Tattoo);
                }
                State::Layer
            }
            (State::Panel, _) => {
                return Err(AnimError::parse(format!("Unknown panel tag: {name}.")))
            }
            (State::EndSequence, "comments") => State::Comments,
            (State::EndSequence, _) => {
                return Err(AnimError::parse(format!("Unknown animation tag: {name}.")))
            }
            (State::Comments, "comment") => {
                self.comment = attrs
                    .int("panel")
                    .and_then(|p| usize::try_from(p).ok());
                if self.comment.is_none() {
                    warn!("<comment> without a usable panel index is skipped");
                }
                self.text.clear();
                State::Comment
            }
            (State::Comments, _) => {
                return Err(AnimError::parse(format!("Unknown comment tag: {name}.")))
            }
            (State::Layer | State::Comment, _) => {
                return Err(AnimError::parse(format!(
                    "Tag <{name}> is not expected here."
                )))
            }
            (State::End, _) => return Err(AnimError::parse("Content after </animation>.")),
        };
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        self.state = match self.state {
            State::Animation | State::EndSequence => State::End,
            State::Playback if self.playback_depth > 0 => {
                self.playback_depth -= 1;
                State::Playback
            }
            State::Playback => State::Animation,
            State::Sequence => State::EndSequence,
            State::Panel => State::Sequence,
            State::Layer => State::Panel,
            State::Comments => State::EndSequence,
            State::Comment => {
                let text = std::mem::take(&mut self.text);
                if let Some(panel) = self.comment.take() {
                    self.doc.comments.push((panel, text));
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
