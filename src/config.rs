use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    capture::CaptureConstraints,
    codec::{EncodeQuality, IMPORT_BOUND},
    foundation::{
        core::{Dimensions, Fps},
        error::{StudioError, StudioResult},
    },
};

pub const MAX_FPS: u32 = 60;

/// Studio settings. Every field has a default, so a config file only lists what it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub default_fps: Fps,
    pub autosave_debounce_ms: u64,
    pub import_bound: Dimensions,
    pub quality: EncodeQuality,
    /// Used when a camera stream has not reported its native size.
    pub fallback_capture_size: Dimensions,
    pub acknowledge_ms: u64,
    pub store_path: PathBuf,
    pub camera: CaptureConstraints,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            default_fps: Fps::DEFAULT,
            autosave_debounce_ms: 1000,
            import_bound: IMPORT_BOUND,
            quality: EncodeQuality::default(),
            fallback_capture_size: Dimensions::new(1280, 720),
            acknowledge_ms: 100,
            store_path: PathBuf::from("stopmotion-projects.json"),
            camera: CaptureConstraints::default(),
        }
    }
}

impl StudioConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> StudioResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .map_err(|e| StudioError::serde(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.default_fps.get() > MAX_FPS {
            return Err(StudioError::validation(format!(
                "default_fps must be <= {MAX_FPS}"
            )));
        }
        if self.autosave_debounce_ms == 0 {
            return Err(StudioError::validation("autosave_debounce_ms must be > 0"));
        }
        if self.import_bound.is_empty() || self.fallback_capture_size.is_empty() {
            return Err(StudioError::validation(
                "import_bound and fallback_capture_size must be non-zero",
            ));
        }
        self.quality.validate()
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn acknowledge(&self) -> Duration {
        Duration::from_millis(self.acknowledge_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = StudioConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.default_fps.get(), 12);
        assert_eq!(cfg.autosave_debounce(), Duration::from_secs(1));
        assert_eq!(cfg.import_bound, Dimensions::new(1920, 1080));
    }

    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{ "default_fps": 8, "quality": { "full": 90, "thumbnail": 30 } }"#)
            .unwrap();
        let cfg = StudioConfig::load(&path).unwrap();
        assert_eq!(cfg.default_fps.get(), 8);
        assert_eq!(cfg.quality.full, 90);
        assert_eq!(cfg.autosave_debounce_ms, 1000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{ "default_fps": 0 }"#).unwrap();
        assert!(StudioConfig::load(&path).is_err());
        std::fs::write(&path, r#"{ "autosave_debounce_ms": 0 }"#).unwrap();
        assert!(matches!(
            StudioConfig::load(&path),
            Err(StudioError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = StudioConfig::load(Path::new("definitely/not/here.json")).unwrap();
        assert_eq!(cfg, StudioConfig::default());
    }
}
