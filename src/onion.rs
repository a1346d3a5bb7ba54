//! Onion skin: faint overlays of the most recent frames on top of the live capture preview.

use image::{RgbaImage, imageops::FilterType};

use crate::{composite::overlay_thumbnail, frame_store::FrameStore, model::Frame};

/// How many previous frames to show. Cycles `Single -> Triple -> Quintuple -> Single`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OnionDepth {
    #[default]
    Single,
    Triple,
    Quintuple,
}

impl OnionDepth {
    pub fn frame_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Triple => 3,
            Self::Quintuple => 5,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Single => Self::Triple,
            Self::Triple => Self::Quintuple,
            Self::Quintuple => Self::Single,
        }
    }

    /// Setting index as shown in the UI (`0`, `1`, `2`).
    pub fn level(self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Triple => 1,
            Self::Quintuple => 2,
        }
    }
}

/// Overlay opacity in `[0, 1]` with a magnetic centre at `0.5`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OnionOpacity(f64);

impl OnionOpacity {
    pub const CENTER: f64 = 0.5;
    pub const SNAP_RADIUS: f64 = 0.05;

    /// Clamp into `[0, 1]`; anything within [`Self::SNAP_RADIUS`] of the centre becomes exactly
    /// the centre. The tolerance keeps `0.55` and `0.45` inside the radius despite float error.
    pub fn snapped(value: f64) -> Self {
        let value = if value.is_nan() {
            Self::CENTER
        } else {
            value.clamp(0.0, 1.0)
        };
        if (value - Self::CENTER).abs() <= Self::SNAP_RADIUS + 1e-9 {
            Self(Self::CENTER)
        } else {
            Self(value)
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for OnionOpacity {
    fn default() -> Self {
        Self(Self::CENTER)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OnionSettings {
    pub depth: OnionDepth,
    pub opacity: OnionOpacity,
}

#[derive(Clone, Copy, Debug)]
pub struct OnionLayer<'a> {
    pub index: usize,
    /// 1 for the frame right before the live one.
    pub distance: usize,
    pub opacity: f64,
    pub frame: &'a Frame,
}

impl OnionSettings {
    /// Layers for the capture position (end of the sequence), nearest first.
    ///
    /// The nearest frame gets the full configured opacity; each older one loses `1/N` of it,
    /// where `N` is the configured depth. Frames beyond the depth are not returned.
    pub fn layers<'a>(&self, frames: &'a FrameStore) -> Vec<OnionLayer<'a>> {
        let depth = self.depth.frame_count();
        let shown = depth.min(frames.len());
        (1..=shown)
            .map(|distance| {
                let index = frames.len() - distance;
                let falloff = (depth - distance + 1) as f64 / depth as f64;
                OnionLayer {
                    index,
                    distance,
                    opacity: self.opacity.get() * falloff,
                    frame: &frames.as_slice()[index],
                }
            })
            .collect()
    }
}

/// Blend onion layers over the live bitmap, oldest first so the nearest frame ends on top.
pub fn compose_preview(live: &RgbaImage, layers: &[OnionLayer<'_>]) -> RgbaImage {
    let mut out = live.clone();
    for layer in layers.iter().rev() {
        let thumb = match layer.frame.thumbnail_image.decode() {
            Ok(img) => img,
            Err(err) => {
                tracing::warn!(index = layer.index, %err, "skipping onion layer");
                continue;
            }
        };
        let thumb = if thumb.dimensions() == live.dimensions() {
            thumb
        } else {
            image::imageops::resize(&thumb, live.width(), live.height(), FilterType::Triangle)
        };
        if let Err(err) = overlay_thumbnail(&mut out, &thumb, layer.opacity as f32) {
            tracing::warn!(index = layer.index, %err, "skipping onion layer");
        }
    }
    out
}
