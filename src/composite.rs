use image::{Rgba, RgbaImage};

use crate::foundation::error::{StudioError, StudioResult};

/// Straight-alpha source-over of one pixel, with the source alpha scaled by `opacity`.
///
/// Colour channels are not premultiplied on either side, so a translucent `dst` keeps its hue
/// wherever `src` adds nothing.
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0 * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = f32::from(dst[3]) / 255.0;
    let keep = da * (1.0 - sa);
    let out_a = sa + keep;
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let c = (f32::from(src[i]) * sa + f32::from(dst[i]) * keep) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Lay a thumbnail over a bitmap of the same size in place.
pub fn overlay_thumbnail(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    opacity: f32,
) -> StudioResult<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(StudioError::codec(format!(
            "overlay size mismatch: {:?} over {:?}",
            src.dimensions(),
            dst.dimensions()
        )));
    }
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        *d = blend_pixel(*d, *s, opacity);
    }
    Ok(())
}
