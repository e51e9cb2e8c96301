//! Shared test support: stored documents, an in-memory image host and an
//! event recorder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use animplay_core::{AnimationEvent, ColorTag, IdAllocator, ImageHost, LayerId, Tattoo};
use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Stored animation documents, as they would be found in an image parasite.
pub mod documents {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.animations.keys().cloned().collect()
    }

    pub fn xml(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.animations, "animation", name)?;
        read_to_string(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.animations, "animation", name)?;
        Ok(resolve_path(rel))
    }
}

/// Opaque single-colour buffer.
pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

/// One layer of a [`MockImage`].
#[derive(Clone, Debug)]
pub struct MockLayer {
    pub id: LayerId,
    pub tattoo: Tattoo,
    pub name: String,
    pub pixels: RgbaImage,
    pub offsets: (i32, i32),
    pub visible: bool,
    pub tag: ColorTag,
    pub opacity: f64,
}

/// In-memory image: a stack of layers plus parasites.
///
/// Layers are stored bottom to top; [`ImageHost::layers`] reports them top
/// to bottom like a real layer list.
#[derive(Debug, Default)]
pub struct MockImage {
    width: u32,
    height: u32,
    ids: IdAllocator,
    layers: Vec<MockLayer>,
    parasites: hashbrown::HashMap<String, String>,
    active: Option<LayerId>,
}

impl MockImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Push an image-sized layer filled with `rgba` on top of the stack.
    pub fn add_layer(&mut self, name: &str, rgba: [u8; 4]) -> Tattoo {
        let pixels = solid(self.width, self.height, rgba);
        self.add_layer_with(name, pixels, (0, 0))
    }

    pub fn add_layer_with(&mut self, name: &str, pixels: RgbaImage, offsets: (i32, i32)) -> Tattoo {
        let id = self.ids.alloc_layer();
        let tattoo = self.ids.alloc_tattoo();
        self.layers.push(MockLayer {
            id,
            tattoo,
            name: name.to_string(),
            pixels,
            offsets,
            visible: true,
            tag: ColorTag::None,
            opacity: 1.0,
        });
        tattoo
    }

    /// Returns false when no layer carries `tattoo`.
    pub fn remove_layer(&mut self, tattoo: Tattoo) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.tattoo != tattoo);
        self.layers.len() != before
    }

    pub fn rename_layer(&mut self, tattoo: Tattoo, name: &str) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.tattoo == tattoo) {
            layer.name = name.to_string();
        }
    }

    pub fn layer(&self, tattoo: Tattoo) -> Option<&MockLayer> {
        self.layers.iter().find(|l| l.tattoo == tattoo)
    }

    /// Tattoos of the visible layers, bottom to top.
    pub fn visible(&self) -> Vec<Tattoo> {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.tattoo)
            .collect()
    }

    pub fn active_layer(&self) -> Option<Tattoo> {
        let active = self.active?;
        self.layers.iter().find(|l| l.id == active).map(|l| l.tattoo)
    }

    pub fn parasite_count(&self) -> usize {
        self.parasites.len()
    }

    fn by_id(&self, id: LayerId) -> Option<&MockLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn by_id_mut(&mut self, id: LayerId) -> Option<&mut MockLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }
}

impl ImageHost for MockImage {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn layers(&self) -> Vec<LayerId> {
        self.layers.iter().rev().map(|l| l.id).collect()
    }

    fn layer_by_tattoo(&self, tattoo: Tattoo) -> Option<LayerId> {
        self.layer(tattoo).map(|l| l.id)
    }

    fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().rev().find(|l| l.name == name).map(|l| l.id)
    }

    fn layer_name(&self, layer: LayerId) -> Option<String> {
        self.by_id(layer).map(|l| l.name.clone())
    }

    fn layer_tattoo(&self, layer: LayerId) -> Option<Tattoo> {
        self.by_id(layer).map(|l| l.tattoo)
    }

    fn layer_pixels(&self, layer: LayerId) -> Option<RgbaImage> {
        self.by_id(layer).map(|l| l.pixels.clone())
    }

    fn layer_offsets(&self, layer: LayerId) -> (i32, i32) {
        self.by_id(layer).map_or((0, 0), |l| l.offsets)
    }

    fn is_visible(&self, layer: LayerId) -> bool {
        self.by_id(layer).is_some_and(|l| l.visible)
    }

    fn set_visible(&mut self, layer: LayerId, visible: bool) {
        if let Some(l) = self.by_id_mut(layer) {
            l.visible = visible;
            if !visible {
                l.tag = ColorTag::None;
                l.opacity = 1.0;
            }
        }
    }

    fn highlight(&mut self, layer: LayerId, tag: ColorTag, opacity: f64) {
        if let Some(l) = self.by_id_mut(layer) {
            l.visible = true;
            l.tag = tag;
            l.opacity = opacity;
        }
    }

    fn set_active_layer(&mut self, layer: LayerId) {
        self.active = Some(layer);
    }

    fn parasite(&self, name: &str) -> Option<String> {
        self.parasites.get(name).cloned()
    }

    fn attach_parasite(&mut self, name: &str, data: &str) {
        self.parasites.insert(name.to_string(), data.to_string());
    }
}

/// Records every event an animation emits.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Rc<RefCell<Vec<AnimationEvent>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener to pass to `Animation::subscribe`.
    pub fn listener(&self) -> Box<dyn FnMut(&AnimationEvent)> {
        let sink = Rc::clone(&self.0);
        Box::new(move |ev| sink.borrow_mut().push(ev.clone()))
    }

    pub fn events(&self) -> Vec<AnimationEvent> {
        self.0.borrow().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<AnimationEvent> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// `(position, length)` of every `FramesChanged`, in order.
    pub fn frames_changed(&self) -> Vec<(usize, usize)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|ev| match ev {
                AnimationEvent::FramesChanged { position, length } => Some((*position, *length)),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, event: &AnimationEvent) -> bool {
        self.0.borrow().contains(event)
    }
}
