//! XML persistence of both animation variants.
//!
//! Parsing is push based: [`parse_markup`] walks the document with quick-xml
//! and feeds start tags, end tags and text to a [`MarkupHandler`] state
//! machine. The variant parsers build a detached document value, so a failed
//! parse never leaves a model half updated.
//!
//! Writing produces the compact, unindented dialect the plug-in has always
//! stored: no XML declaration, attribute values escaped, framerate with six
//! decimals.

pub mod animatic;
pub mod cel;

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{AnimError, Result};

/// Attributes of one element, kept in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Integer value with the leniency of C `strtol`: leading spaces, an
    /// optional sign, then digits; trailing garbage is ignored.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(parse_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.trim().parse::<f64>().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Receiver of parse events.
pub trait MarkupHandler {
    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<()>;
    fn end_element(&mut self, name: &str) -> Result<()>;
    fn text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Feed a whole document to `handler`.
/// Fails on malformed XML, on a missing or repeated root element, or as soon
/// as the handler rejects an event.
pub fn parse_markup<H: MarkupHandler + ?Sized>(xml: &str, handler: &mut H) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                open_element(&e, depth, &mut seen_root, handler)?;
                depth += 1;
            }
            Event::Empty(e) => {
                let name = open_element(&e, depth, &mut seen_root, handler)?;
                handler.end_element(&name)?;
            }
            Event::End(e) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| AnimError::parse("unmatched closing tag"))?;
                let name = utf8(e.name().as_ref())?.into_owned();
                handler.end_element(&name)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if depth > 0 {
                    handler.text(&text)?;
                } else if !text.trim().is_empty() {
                    return Err(AnimError::parse("text outside of the root element"));
                }
            }
            Event::CData(c) => {
                if depth > 0 {
                    handler.text(&String::from_utf8_lossy(&c.into_inner()))?;
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry nothing.
            _ => {}
        }
    }

    if !seen_root {
        return Err(AnimError::parse("document is empty"));
    }
    if depth != 0 {
        return Err(AnimError::parse("document ended inside an element"));
    }
    Ok(())
}

fn open_element<H: MarkupHandler + ?Sized>(
    e: &BytesStart<'_>,
    depth: usize,
    seen_root: &mut bool,
    handler: &mut H,
) -> Result<String> {
    if depth == 0 {
        if *seen_root {
            return Err(AnimError::parse("document has more than one root element"));
        }
        *seen_root = true;
    }
    let name = utf8(e.name().as_ref())?.into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| AnimError::parse(err.to_string()))?;
        let key = utf8(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    handler.start_element(&name, &Attributes(attrs))?;
    Ok(name)
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|err| AnimError::parse(err.to_string()))
}

pub(crate) fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[inline]
pub(crate) fn escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

#[inline]
pub(crate) fn format_framerate(framerate: f64) -> String {
    format!("{framerate:.6}")
}
