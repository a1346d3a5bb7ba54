use chrono::{DateTime, Utc};

use crate::{
    codec::{EncodedFrame, EncodedImage},
    foundation::{
        core::{Fps, FrameId, ProjectId},
        error::{StudioError, StudioResult},
    },
    frame_store::FrameStore,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub id: FrameId,
    /// Wall-clock label for listings; never parsed back.
    pub captured_at_label: String,
    pub full_image: EncodedImage,
    pub thumbnail_image: EncodedImage,
    #[serde(default)]
    pub imported: bool,
}

impl Frame {
    pub fn new(encoded: EncodedFrame, imported: bool) -> Self {
        Self {
            id: FrameId::generate(),
            captured_at_label: chrono::Local::now().format("%H:%M:%S").to_string(),
            full_image: encoded.full,
            thumbnail_image: encoded.thumbnail,
            imported,
        }
    }

    /// Copy with a fresh id; image payloads are shared with the source.
    pub fn duplicate(&self) -> Self {
        Self {
            id: FrameId::generate(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub frames: FrameStore,
    pub fps: Fps,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    // Cached projections of `frames` and `fps`; see `refresh_derived`.
    #[serde(default)]
    pub thumbnail: Option<EncodedImage>,
    #[serde(default)]
    pub duration_seconds: f64,
}

impl Project {
    pub fn new(name: &str, fps: Fps) -> StudioResult<Self> {
        let name = validate_name(name)?;
        let now = Utc::now();
        Ok(Self {
            id: ProjectId::generate(),
            name,
            frames: FrameStore::default(),
            fps,
            created_at: now,
            last_modified: now,
            thumbnail: None,
            duration_seconds: 0.0,
        })
    }

    pub fn rename(&mut self, name: &str) -> StudioResult<()> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// Recompute `thumbnail` and `duration_seconds` from the frame sequence.
    pub fn refresh_derived(&mut self) {
        self.thumbnail = self.frames.first().map(|f| f.thumbnail_image.clone());
        self.duration_seconds = self.fps.frames_to_secs(self.frames.len());
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            frame_count: self.frames.len(),
            fps: self.fps,
            duration_seconds: self.fps.frames_to_secs(self.frames.len()),
            has_thumbnail: !self.frames.is_empty(),
            created_at: self.created_at,
            last_modified: self.last_modified,
        }
    }
}

/// Listing row for the projects screen.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub frame_count: usize,
    pub fps: Fps,
    pub duration_seconds: f64,
    pub has_thumbnail: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

fn validate_name(name: &str) -> StudioResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StudioError::validation("project name must be non-empty"));
    }
    Ok(trimmed.to_string())
}
