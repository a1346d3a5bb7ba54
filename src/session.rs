use std::time::Duration;

use image::RgbaImage;

use crate::{
    capture::CapturePipeline,
    codec::ImageCodec,
    foundation::{
        core::{Dimensions, Fps, ProjectId},
        error::StudioResult,
    },
    frame_store::FrameStore,
    model::{Frame, Project},
    onion::{OnionDepth, OnionLayer, OnionOpacity, OnionSettings},
    playback::PlaybackScheduler,
    selection::Selection,
    timer::{TimerId, TimerQueue},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Timeline,
    Capture,
}

/// Working state of the open project: the frame sequence every component edits or reads, plus
/// cursor, selection, onion settings, playback and capture state.
///
/// Edits that must reach the store bump `revision`; the session is dirty while `revision` is
/// ahead of the last persisted revision. Structural edits also clear the selection.
#[derive(Debug)]
pub struct SessionContext {
    project_id: ProjectId,
    frames: FrameStore,
    fps: Fps,
    cursor: usize,
    selection: Selection,
    onion: OnionSettings,
    playback: PlaybackScheduler,
    capture: CapturePipeline,
    view: View,
    revision: u64,
    persisted_revision: u64,
}

impl SessionContext {
    pub fn open(project: &Project) -> Self {
        Self {
            project_id: project.id,
            frames: project.frames.clone(),
            fps: project.fps,
            cursor: 0,
            selection: Selection::default(),
            onion: OnionSettings::default(),
            playback: PlaybackScheduler::default(),
            capture: CapturePipeline::default(),
            view: View::default(),
            revision: 0,
            persisted_revision: 0,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.cursor)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn onion(&self) -> OnionSettings {
        self.onion
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn is_capture_in_flight(&self) -> bool {
        self.capture.is_in_flight()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.persisted_revision
    }

    pub fn onion_layers(&self) -> Vec<OnionLayer<'_>> {
        self.onion.layers(&self.frames)
    }

    pub fn toggle_selection(&mut self, index: usize, additive: bool) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.selection.toggle(index, additive);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn append_frame(&mut self, frame: Frame) -> usize {
        let index = self.frames.len();
        self.frames.append(frame);
        self.structural_edit();
        index
    }

    pub fn drag_reorder(&mut self, from: usize, to: usize) -> bool {
        if !self.frames.move_to(from, to) {
            return false;
        }
        self.structural_edit();
        true
    }

    pub fn delete_frame(&mut self, index: usize) -> bool {
        if self.frames.delete_at(index).is_none() {
            return false;
        }
        self.structural_edit();
        self.clamp_cursor();
        true
    }

    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let removed = self.frames.delete_indices(self.selection.indices());
        self.structural_edit();
        self.clamp_cursor();
        removed
    }

    pub fn duplicate_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let added = self.frames.duplicate_indices(self.selection.indices());
        self.structural_edit();
        added
    }

    pub fn set_fps(&mut self, fps: Fps) -> bool {
        if self.fps == fps {
            return false;
        }
        self.fps = fps;
        self.revision += 1;
        true
    }

    /// Scrub to `index`. Out-of-range indices are ignored.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.cursor = index;
        true
    }

    pub fn cycle_onion_depth(&mut self) -> OnionDepth {
        self.onion.depth = self.onion.depth.next();
        self.onion.depth
    }

    pub fn set_onion_opacity(&mut self, value: f64) -> OnionOpacity {
        self.onion.opacity = OnionOpacity::snapped(value);
        self.onion.opacity
    }

    pub(crate) fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub(crate) fn start_playback<E>(
        &mut self,
        now: Duration,
        timers: &mut TimerQueue<E>,
        tick_event: E,
    ) -> bool {
        self.playback
            .start(self.frames.len(), self.fps, now, timers, tick_event)
    }

    pub(crate) fn stop_playback<E>(&mut self, timers: &mut TimerQueue<E>) -> bool {
        self.playback.stop(timers)
    }

    pub(crate) fn playback_tick<E>(
        &mut self,
        fired: TimerId,
        deadline: Duration,
        timers: &mut TimerQueue<E>,
        tick_event: E,
    ) -> bool {
        self.playback.on_tick(
            fired,
            deadline,
            &mut self.cursor,
            self.frames.len(),
            self.fps,
            timers,
            tick_event,
        )
    }

    pub(crate) fn begin_capture(&mut self, target: Dimensions) -> bool {
        self.capture.try_begin(target)
    }

    pub(crate) fn abort_capture(&mut self) {
        self.capture.abort();
    }

    /// Finish the in-flight capture and append the frame; the cursor moves onto it.
    pub(crate) fn complete_capture(
        &mut self,
        bitmap: StudioResult<RgbaImage>,
        codec: &ImageCodec,
    ) -> StudioResult<usize> {
        let frame = self.capture.complete(bitmap, codec)?;
        let index = self.append_frame(frame);
        self.cursor = index;
        Ok(index)
    }

    /// Copy the working state into `project` and refresh its derived fields.
    pub(crate) fn write_back(&self, project: &mut Project) {
        project.frames = self.frames.clone();
        project.fps = self.fps;
        project.last_modified = chrono::Utc::now();
        project.refresh_derived();
    }

    pub(crate) fn mark_persisted(&mut self, revision: u64) {
        self.persisted_revision = revision;
    }

    fn structural_edit(&mut self) {
        self.selection.clear();
        self.revision += 1;
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.frames.len().saturating_sub(1));
    }
}
