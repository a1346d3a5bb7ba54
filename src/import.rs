use std::path::Path;

use anyhow::Context as _;
use image::RgbaImage;

use crate::foundation::error::{StudioError, StudioResult};

/// Decodes user-picked files into bitmaps.
pub trait FileImportSource {
    /// Cheap type check; files failing it are skipped without an error.
    fn is_image(&self, file: &Path) -> bool;

    fn decode(&mut self, file: &Path) -> StudioResult<RgbaImage>;
}

/// Reads files from disk and decodes them with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImportSource;

impl FileImportSource for FsImportSource {
    fn is_image(&self, file: &Path) -> bool {
        image::ImageFormat::from_path(file).is_ok()
    }

    fn decode(&mut self, file: &Path) -> StudioResult<RgbaImage> {
        let bytes =
            std::fs::read(file).with_context(|| format!("read image '{}'", file.display()))?;
        let img = image::load_from_memory(&bytes).map_err(|e| {
            StudioError::codec(format!("unsupported image '{}': {e}", file.display()))
        })?;
        Ok(img.to_rgba8())
    }
}
