//! Frame-sequence engine for stop-motion animation.
//!
//! A [`Studio`] owns the project collection and at most one open [`SessionContext`]. Frames come
//! from a camera ([`CaptureDevice`]) or from files ([`FileImportSource`]), are encoded twice by
//! the [`ImageCodec`] and appended to the session's [`FrameStore`]. Playback, onion skin,
//! selection and debounced persistence all work on that one sequence.
#![forbid(unsafe_code)]

pub mod autosave;
pub mod capture;
pub mod codec;
pub mod composite;
pub mod config;
mod foundation;
pub mod frame_store;
pub mod import;
pub mod keys;
pub mod lifecycle;
pub mod model;
pub mod onion;
pub mod playback;
pub mod selection;
pub mod session;
pub mod store;
pub mod timer;

pub use crate::foundation::core::{Dimensions, Fps, FrameId, ProjectId};
pub use crate::foundation::error::{DeviceError, StudioError, StudioResult};

pub use crate::capture::{
    BitmapRequest, CaptureConstraints, CaptureDevice, CapturePipeline, CaptureState,
    CaptureStream, NoCamera,
};
pub use crate::codec::{EncodeQuality, EncodedFrame, EncodedImage, IMPORT_BOUND, ImageCodec};
pub use crate::config::StudioConfig;
pub use crate::frame_store::FrameStore;
pub use crate::import::{FileImportSource, FsImportSource};
pub use crate::keys::{Key, KeyCommand};
pub use crate::lifecycle::{
    CaptureOutcome, CaptureRejection, DEFAULT_PROJECT_NAME, ImportReport, Studio, UiEvent,
};
pub use crate::model::{Frame, Project, ProjectSummary};
pub use crate::onion::{OnionDepth, OnionLayer, OnionOpacity, OnionSettings, compose_preview};
pub use crate::playback::{PlaybackScheduler, PlaybackState};
pub use crate::selection::Selection;
pub use crate::session::{SessionContext, View};
pub use crate::store::{JsonFileStore, MemoryStore, ProjectStore, STORE_NAMESPACE};
