use std::sync::Arc;

use image::{RgbaImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::foundation::{
    core::Dimensions,
    error::{StudioError, StudioResult},
};

/// Bound applied to imported files.
pub const IMPORT_BOUND: Dimensions = Dimensions::new(1920, 1080);

/// JPEG quality pair used for the two renditions of a frame (1..=100).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodeQuality {
    pub full: u8,
    pub thumbnail: u8,
}

impl Default for EncodeQuality {
    fn default() -> Self {
        Self {
            full: 85,
            thumbnail: 40,
        }
    }
}

impl EncodeQuality {
    pub fn validate(&self) -> StudioResult<()> {
        for (name, q) in [("full", self.full), ("thumbnail", self.thumbnail)] {
            if !(1..=100).contains(&q) {
                return Err(StudioError::validation(format!(
                    "{name} quality must be in 1..=100 (got {q})"
                )));
            }
        }
        Ok(())
    }
}

/// A JPEG payload plus the dimensions it was encoded at.
///
/// Payload bytes are shared, so duplicated frames reuse the same allocation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    #[serde(with = "base64_payload")]
    pub jpeg: Arc<[u8]>,
}

impl EncodedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn decode(&self) -> StudioResult<RgbaImage> {
        let img = image::load_from_memory_with_format(&self.jpeg, image::ImageFormat::Jpeg)
            .map_err(|e| StudioError::codec(format!("decode jpeg payload: {e}")))?;
        Ok(img.to_rgba8())
    }

    /// `data:` URL form, handy for presentation layers that embed images inline.
    pub fn data_url(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    pub full: EncodedImage,
    pub thumbnail: EncodedImage,
}

/// Scale `src` uniformly so it fits inside `bound`. Never upscales.
pub fn fit_within(src: Dimensions, bound: Dimensions) -> Dimensions {
    if src.is_empty() || bound.is_empty() {
        return src;
    }
    if src.width <= bound.width && src.height <= bound.height {
        return src;
    }

    let ratio = (f64::from(bound.width) / f64::from(src.width))
        .min(f64::from(bound.height) / f64::from(src.height));
    let scale = |v: u32, max: u32| ((f64::from(v) * ratio).round() as u32).clamp(1, max);
    Dimensions::new(
        scale(src.width, bound.width),
        scale(src.height, bound.height),
    )
}

#[derive(Clone, Debug, Default)]
pub struct ImageCodec {
    quality: EncodeQuality,
}

impl ImageCodec {
    pub fn new(quality: EncodeQuality) -> StudioResult<Self> {
        quality.validate()?;
        Ok(Self { quality })
    }

    pub fn quality(&self) -> EncodeQuality {
        self.quality
    }

    /// Downscale `bitmap` into `bound` when needed, then encode it twice.
    #[tracing::instrument(skip(self, bitmap), fields(width = bitmap.width(), height = bitmap.height()))]
    pub fn encode(&self, bitmap: &RgbaImage, bound: Dimensions) -> StudioResult<EncodedFrame> {
        let src = Dimensions::new(bitmap.width(), bitmap.height());
        if src.is_empty() {
            return Err(StudioError::codec("cannot encode an empty bitmap"));
        }

        let target = fit_within(src, bound);
        let rgb = if target == src {
            image::DynamicImage::ImageRgba8(bitmap.clone()).to_rgb8()
        } else {
            tracing::debug!(%src, %target, "downscaling before encode");
            let resized =
                image::imageops::resize(bitmap, target.width, target.height, FilterType::Triangle);
            image::DynamicImage::ImageRgba8(resized).to_rgb8()
        };

        let full = encode_jpeg(&rgb, self.quality.full)?;
        let thumbnail = encode_jpeg(&rgb, self.quality.thumbnail)?;
        Ok(EncodedFrame { full, thumbnail })
    }
}

fn encode_jpeg(rgb: &image::RgbImage, quality: u8) -> StudioResult<EncodedImage> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(rgb)
        .map_err(|e| StudioError::codec(format!("jpeg encode (q={quality}): {e}")))?;
    Ok(EncodedImage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg: Arc::from(buf),
    })
}

mod base64_payload {
    use std::sync::Arc;

    use base64::{Engine as _, engine::general_purpose::STANDARD};

    pub(super) fn serialize<S: serde::Serializer>(
        bytes: &Arc<[u8]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Arc<[u8]>, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn patterned(width: u32, height: u32, seed: u8) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7) ^ (y * 13)) as u8;
            image::Rgba([v.wrapping_add(seed), v.wrapping_mul(3), seed, 255])
        })
    }

    #[test]
    fn fit_within_scales_uniformly() {
        let out = fit_within(Dimensions::new(3000, 2000), IMPORT_BOUND);
        assert_eq!(out, Dimensions::new(1620, 1080));
        assert!((out.aspect_ratio() - 1.5).abs() < 1e-3);
    }

    #[test]
    fn fit_within_never_upscales() {
        let small = Dimensions::new(640, 480);
        assert_eq!(fit_within(small, IMPORT_BOUND), small);
        let edge = Dimensions::new(1920, 1080);
        assert_eq!(fit_within(edge, IMPORT_BOUND), edge);
    }

    #[test]
    fn fit_within_handles_tall_inputs() {
        let out = fit_within(Dimensions::new(1000, 4000), IMPORT_BOUND);
        assert_eq!(out.height, 1080);
        assert_eq!(out.width, 270);
    }

    #[test]
    fn encode_downscales_and_produces_two_renditions() {
        let codec = ImageCodec::default();
        let frame = codec
            .encode(&patterned(300, 200, 9), Dimensions::new(192, 108))
            .unwrap();
        assert_eq!(frame.full.dimensions(), Dimensions::new(162, 108));
        assert_eq!(frame.thumbnail.dimensions(), frame.full.dimensions());
        assert!(frame.thumbnail.jpeg.len() < frame.full.jpeg.len());

        let decoded = frame.full.decode().unwrap();
        assert_eq!(decoded.dimensions(), (162, 108));
    }

    #[test]
    fn encode_is_deterministic() {
        let codec = ImageCodec::default();
        let img = patterned(64, 48, 3);
        let a = codec.encode(&img, IMPORT_BOUND).unwrap();
        let b = codec.encode(&img, IMPORT_BOUND).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_rejects_empty_bitmap() {
        let codec = ImageCodec::default();
        let err = codec.encode(&RgbaImage::new(0, 0), IMPORT_BOUND).unwrap_err();
        assert!(matches!(err, StudioError::Codec(_)));
    }

    #[test]
    fn quality_outside_range_is_rejected() {
        assert!(
            ImageCodec::new(EncodeQuality {
                full: 0,
                thumbnail: 40
            })
            .is_err()
        );
        assert!(
            ImageCodec::new(EncodeQuality {
                full: 85,
                thumbnail: 101
            })
            .is_err()
        );
    }

    #[test]
    fn payload_serializes_as_base64_string() {
        let codec = ImageCodec::default();
        let frame = codec.encode(&patterned(8, 8, 1), IMPORT_BOUND).unwrap();
        let json = serde_json::to_value(&frame.thumbnail).unwrap();
        assert!(json["jpeg"].is_string());
        let back: EncodedImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame.thumbnail);
        assert!(frame.thumbnail.data_url().starts_with("data:image/jpeg;base64,"));
    }
}
