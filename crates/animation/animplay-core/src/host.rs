#![allow(dead_code)]
//! Host image contract.
//!
//! The layers, their pixels and their identifiers belong to the host
//! application. Models only hold tattoos and resolve them through this trait
//! whenever they need pixels, so a layer deleted between two calls shows up as
//! a failed lookup rather than a dangling pointer.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::ids::{LayerId, Tattoo};

/// Highlight colour a host can attach to a layer in its layer list.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ColorTag {
    #[default]
    None,
    Red,
    Brown,
    Orange,
    Yellow,
    Violet,
    Gray,
}

impl ColorTag {
    /// Colour of the n-th onion skin behind the current frame.
    pub fn onion_skin(skin: usize) -> Self {
        match skin {
            0 => ColorTag::Brown,
            1 => ColorTag::Orange,
            2 => ColorTag::Yellow,
            3 => ColorTag::Violet,
            _ => ColorTag::Gray,
        }
    }
}

/// Trait for the image a model is built from.
/// Adapters implement this and pass it into operations that read pixels or
/// change visibility.
pub trait ImageHost {
    /// Native image size in pixels.
    fn size(&self) -> (u32, u32);

    /// Top-level layers ordered from top of the stack to bottom.
    fn layers(&self) -> Vec<LayerId>;

    fn layer_by_tattoo(&self, tattoo: Tattoo) -> Option<LayerId>;
    fn layer_by_name(&self, name: &str) -> Option<LayerId>;
    fn layer_name(&self, layer: LayerId) -> Option<String>;
    fn layer_tattoo(&self, layer: LayerId) -> Option<Tattoo>;

    /// Layer pixels as straight-alpha RGBA.
    fn layer_pixels(&self, layer: LayerId) -> Option<RgbaImage>;

    /// Position of the layer's top-left corner in image coordinates.
    fn layer_offsets(&self, layer: LayerId) -> (i32, i32);

    fn is_visible(&self, layer: LayerId) -> bool;
    fn set_visible(&mut self, layer: LayerId, visible: bool);

    /// Make `layer` visible with the given tag and opacity in 0..=1.
    fn highlight(&mut self, layer: LayerId, tag: ColorTag, opacity: f64);

    fn set_active_layer(&mut self, layer: LayerId);

    /// Named persistent string attached to the image.
    fn parasite(&self, name: &str) -> Option<String>;
    fn attach_parasite(&mut self, name: &str, data: &str);
}
