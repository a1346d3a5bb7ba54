use std::{path::PathBuf, time::Duration};

use image::RgbaImage;

use crate::{
    autosave::Debouncer,
    capture::{BitmapRequest, CameraSession, CaptureDevice},
    codec::ImageCodec,
    config::{MAX_FPS, StudioConfig},
    foundation::{
        core::{Fps, ProjectId},
        error::{StudioError, StudioResult},
    },
    import::FileImportSource,
    keys::{Key, KeyCommand},
    model::{Frame, Project, ProjectSummary},
    onion::{OnionDepth, OnionOpacity},
    session::{SessionContext, View},
    store::ProjectStore,
    timer::TimerQueue,
};

pub const DEFAULT_PROJECT_NAME: &str = "My First Film";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StudioTimer {
    PlaybackTick,
    Autosave,
    AcknowledgeEnd,
}

/// Notifications for the presentation layer. Ignoring them never affects project state.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    CaptureFlash { index: usize },
    CaptureFlashEnded,
    CaptureFailed { message: String },
    CursorMoved { index: usize },
    DeviceStatus { message: Option<String> },
    Persisted { project: ProjectId },
    PersistFailed { message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureRejection {
    /// Another capture has not completed yet.
    InFlight,
    /// No camera stream is open.
    NoSource,
    /// The stream has no image ready.
    NotReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Appended { index: usize },
    /// The stream will deliver the bitmap later through [`Studio::deliver_bitmap`].
    Pending,
    Rejected(CaptureRejection),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub appended: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Owns the project collection, the open session and the timeline all timers run on.
///
/// Everything runs on the caller's thread. Time only moves through [`Studio::advance_to`], which
/// fires due playback ticks, autosave flushes and capture acknowledgments in deadline order.
pub struct Studio {
    config: StudioConfig,
    codec: ImageCodec,
    store: Box<dyn ProjectStore>,
    projects: Vec<Project>,
    camera: CameraSession,
    timers: TimerQueue<StudioTimer>,
    now: Duration,
    autosave: Debouncer,
    session: Option<SessionContext>,
    /// Set while the store is behind the in-memory collection because a write failed.
    unsaved: bool,
    events: Vec<UiEvent>,
}

fn no_open_project() -> StudioError {
    StudioError::validation("no project is open")
}

fn has_pixels(bitmap: &RgbaImage) -> bool {
    bitmap.width() > 0 && bitmap.height() > 0
}

impl Studio {
    /// Load the collection from `store`. A store that is empty, unreadable or corrupt yields a
    /// single default project instead of an error.
    pub fn load(
        config: StudioConfig,
        mut store: Box<dyn ProjectStore>,
        device: Box<dyn CaptureDevice>,
    ) -> StudioResult<Self> {
        config.validate()?;
        let codec = ImageCodec::new(config.quality)?;

        let mut projects = match store.load_all() {
            Ok(projects) => projects,
            Err(err) => {
                tracing::warn!(%err, "project store unreadable, starting from a default project");
                Vec::new()
            }
        };
        if projects.is_empty() {
            projects.push(Project::new(DEFAULT_PROJECT_NAME, config.default_fps)?);
        }
        for project in &mut projects {
            project.refresh_derived();
        }
        tracing::info!(count = projects.len(), "projects loaded");

        let autosave = Debouncer::new(config.autosave_debounce());
        Ok(Self {
            config,
            codec,
            store,
            projects,
            camera: CameraSession::new(device),
            timers: TimerQueue::new(),
            now: Duration::ZERO,
            autosave,
            session: None,
            unsaved: false,
            events: Vec::new(),
        })
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> Vec<ProjectSummary> {
        self.projects.iter().map(Project::summary).collect()
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn camera_status(&self) -> Option<String> {
        self.camera.status().map(|e| e.status_message())
    }

    pub fn is_autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// `true` while some edit has not reached the store yet.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved || self.session.as_ref().is_some_and(SessionContext::is_dirty)
    }

    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn create(&mut self, name: &str) -> StudioResult<ProjectId> {
        let project = Project::new(name, self.config.default_fps)?;
        let id = project.id;
        self.projects.push(project);
        tracing::info!(%id, "project created");
        // A failed write is retried from the autosave timer.
        let _ = self.save_collection();
        Ok(id)
    }

    pub fn rename(&mut self, id: ProjectId, name: &str) -> StudioResult<()> {
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StudioError::validation(format!("unknown project {id}")))?;
        project.rename(name)?;
        project.last_modified = chrono::Utc::now();
        self.save_collection()
    }

    /// Remove a project. An open session on it is discarded without flushing.
    pub fn delete(&mut self, id: ProjectId) -> StudioResult<()> {
        let pos = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StudioError::validation(format!("unknown project {id}")))?;
        if self.session.as_ref().is_some_and(|s| s.project_id() == id) {
            self.end_session();
        }
        self.projects.remove(pos);
        tracing::info!(%id, "project deleted");
        self.save_collection()
    }

    /// Make `id` the active project. A previously open project is closed (and flushed) first.
    pub fn open(&mut self, id: ProjectId) -> StudioResult<()> {
        if !self.projects.iter().any(|p| p.id == id) {
            return Err(StudioError::validation(format!("unknown project {id}")));
        }
        if let Err(err) = self.close() {
            tracing::warn!(%err, "previous project closed with a failed flush");
        }
        let project = self
            .project(id)
            .ok_or_else(|| StudioError::validation(format!("unknown project {id}")))?;
        let frames = project.frames.len();
        let session = SessionContext::open(project);
        self.session = Some(session);
        tracing::info!(%id, frames, "project opened");
        Ok(())
    }

    /// Stop playback, release the camera and flush pending edits before dropping the session.
    ///
    /// The session is closed even if the flush fails; the edits are then still held by the
    /// in-memory project and the autosave timer keeps retrying the collection write.
    pub fn close(&mut self) -> StudioResult<()> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let id = session.project_id();
        let had_pending = self.autosave.cancel(&mut self.timers);
        let result = if had_pending || session.is_dirty() {
            self.flush_active()
        } else {
            Ok(())
        };
        self.end_session();
        tracing::info!(%id, "project closed");
        result
    }

    /// Flush the open project now, cancelling any scheduled flush.
    pub fn persist(&mut self) -> StudioResult<()> {
        if self.session.is_none() {
            return Err(no_open_project());
        }
        self.autosave.cancel(&mut self.timers);
        self.flush_active()
    }

    pub fn enter_capture(&mut self) -> StudioResult<()> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        session.set_view(View::Capture);
        let result = self.camera.open(&self.config.camera);
        self.events.push(UiEvent::DeviceStatus {
            message: self.camera.status().map(|e| e.status_message()),
        });
        result.map_err(StudioError::from)
    }

    /// Back to the timeline: playback stops and the camera is released.
    pub fn leave_capture(&mut self) -> StudioResult<()> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        session.stop_playback(&mut self.timers);
        session.abort_capture();
        session.set_view(View::Timeline);
        self.camera.release();
        Ok(())
    }

    pub fn capture_frame(&mut self) -> StudioResult<CaptureOutcome> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        let Some(stream) = self.camera.stream_mut() else {
            return Ok(CaptureOutcome::Rejected(CaptureRejection::NoSource));
        };
        let target = stream
            .native_size()
            .unwrap_or(self.config.fallback_capture_size);
        if !session.begin_capture(target) {
            tracing::debug!("capture already in flight");
            return Ok(CaptureOutcome::Rejected(CaptureRejection::InFlight));
        }

        match stream.request_bitmap() {
            BitmapRequest::Ready(bitmap) if has_pixels(&bitmap) => {
                self.finish_capture(Ok(bitmap))
            }
            BitmapRequest::Pending => Ok(CaptureOutcome::Pending),
            BitmapRequest::Ready(_) | BitmapRequest::NotReady => {
                session.abort_capture();
                Ok(CaptureOutcome::Rejected(CaptureRejection::NotReady))
            }
        }
    }

    /// Resume a capture that returned [`CaptureOutcome::Pending`]. `None` or an empty bitmap means
    /// the stream gave up.
    pub fn deliver_bitmap(&mut self, bitmap: Option<RgbaImage>) -> StudioResult<CaptureOutcome> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        if !session.is_capture_in_flight() {
            return Err(StudioError::validation("no capture in flight"));
        }
        match bitmap.filter(has_pixels) {
            Some(bitmap) => self.finish_capture(Ok(bitmap)),
            None => {
                session.abort_capture();
                Ok(CaptureOutcome::Rejected(CaptureRejection::NotReady))
            }
        }
    }

    /// Decode, encode and append every image in `files` in order. Non-image files are skipped;
    /// a file that fails to decode is logged and dropped without stopping the batch.
    pub fn import_files(
        &mut self,
        source: &mut dyn FileImportSource,
        files: &[PathBuf],
    ) -> StudioResult<ImportReport> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        let mut report = ImportReport::default();
        for file in files {
            if !source.is_image(file) {
                tracing::debug!(file = %file.display(), "not an image, skipped");
                report.skipped += 1;
                continue;
            }
            let encoded = source
                .decode(file)
                .and_then(|bitmap| self.codec.encode(&bitmap, self.config.import_bound));
            match encoded {
                Ok(encoded) => {
                    session.append_frame(Frame::new(encoded, true));
                    report.appended += 1;
                }
                Err(err) => {
                    tracing::warn!(file = %file.display(), %err, "import failed, file dropped");
                    report.failed += 1;
                }
            }
        }
        if report.appended > 0 {
            self.autosave
                .touch(&mut self.timers, self.now, StudioTimer::Autosave);
        }
        tracing::info!(
            appended = report.appended,
            skipped = report.skipped,
            failed = report.failed,
            "import finished"
        );
        Ok(report)
    }

    pub fn toggle_selection(&mut self, index: usize, additive: bool) -> StudioResult<bool> {
        self.edit(|s| s.toggle_selection(index, additive))
    }

    pub fn drag_reorder(&mut self, from: usize, to: usize) -> StudioResult<bool> {
        self.edit(|s| s.drag_reorder(from, to))
    }

    pub fn delete_frame(&mut self, index: usize) -> StudioResult<bool> {
        self.edit(|s| s.delete_frame(index))
    }

    pub fn delete_selected(&mut self) -> StudioResult<usize> {
        self.edit(SessionContext::delete_selected)
    }

    pub fn duplicate_selected(&mut self) -> StudioResult<usize> {
        self.edit(SessionContext::duplicate_selected)
    }

    pub fn set_fps(&mut self, fps: u32) -> StudioResult<bool> {
        if fps > MAX_FPS {
            return Err(StudioError::validation(format!("fps must be <= {MAX_FPS}")));
        }
        let fps = Fps::new(fps)?;
        self.edit(|s| s.set_fps(fps))
    }

    pub fn set_cursor(&mut self, index: usize) -> StudioResult<bool> {
        self.edit(|s| s.set_cursor(index))
    }

    pub fn cycle_onion_depth(&mut self) -> StudioResult<OnionDepth> {
        self.edit(SessionContext::cycle_onion_depth)
    }

    pub fn set_onion_opacity(&mut self, value: f64) -> StudioResult<OnionOpacity> {
        self.edit(|s| s.set_onion_opacity(value))
    }

    pub fn start_playback(&mut self) -> StudioResult<bool> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        Ok(session.start_playback(self.now, &mut self.timers, StudioTimer::PlaybackTick))
    }

    pub fn stop_playback(&mut self) -> StudioResult<bool> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        Ok(session.stop_playback(&mut self.timers))
    }

    pub fn toggle_playback(&mut self) -> StudioResult<bool> {
        let playing = self.session.as_ref().is_some_and(SessionContext::is_playing);
        if playing {
            self.stop_playback()
        } else {
            self.start_playback()
        }
    }

    /// Keyboard surface of the capture view. Keys are ignored in every other view.
    pub fn handle_key(&mut self, key: Key) -> StudioResult<Option<KeyCommand>> {
        let in_capture = self
            .session
            .as_ref()
            .is_some_and(|s| s.view() == View::Capture);
        if !in_capture {
            return Ok(None);
        }
        let Some(command) = KeyCommand::from_key(key) else {
            return Ok(None);
        };
        match command {
            KeyCommand::Capture => {
                self.capture_frame()?;
            }
            KeyCommand::TogglePlayback => {
                self.toggle_playback()?;
            }
            KeyCommand::CycleOnionDepth => {
                self.cycle_onion_depth()?;
            }
        }
        Ok(Some(command))
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.now + delta);
    }

    /// Move the clock forward to `now`, firing every timer that falls due on the way.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(due) = self.timers.pop_due(now) {
            self.now = self.now.max(due.deadline);
            match due.event {
                StudioTimer::PlaybackTick => {
                    let Some(session) = self.session.as_mut() else {
                        continue;
                    };
                    if session.playback_tick(
                        due.id,
                        due.deadline,
                        &mut self.timers,
                        StudioTimer::PlaybackTick,
                    ) {
                        self.events.push(UiEvent::CursorMoved {
                            index: session.cursor(),
                        });
                    }
                }
                StudioTimer::Autosave => {
                    if !self.autosave.on_fired(due.id) {
                        continue;
                    }
                    // Failures re-arm the timer themselves.
                    let _ = if self.session.is_some() {
                        self.flush_active()
                    } else if self.unsaved {
                        self.save_collection()
                    } else {
                        Ok(())
                    };
                }
                StudioTimer::AcknowledgeEnd => self.events.push(UiEvent::CaptureFlashEnded),
            }
        }
        self.now = self.now.max(now);
    }

    /// Close the open project, then write the collection once more if an earlier write failed.
    pub fn shutdown(&mut self) -> StudioResult<()> {
        let closed = self.close();
        if !self.unsaved {
            return closed;
        }
        self.autosave.cancel(&mut self.timers);
        self.save_collection()
    }

    fn edit<T>(&mut self, op: impl FnOnce(&mut SessionContext) -> T) -> StudioResult<T> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        let before = session.revision();
        let out = op(session);
        if session.revision() != before {
            self.autosave
                .touch(&mut self.timers, self.now, StudioTimer::Autosave);
        }
        Ok(out)
    }

    fn finish_capture(&mut self, bitmap: StudioResult<RgbaImage>) -> StudioResult<CaptureOutcome> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        match session.complete_capture(bitmap, &self.codec) {
            Ok(index) => {
                tracing::info!(index, "frame captured");
                self.events.push(UiEvent::CaptureFlash { index });
                self.timers.schedule_at(
                    self.now + self.config.acknowledge(),
                    StudioTimer::AcknowledgeEnd,
                );
                self.autosave
                    .touch(&mut self.timers, self.now, StudioTimer::Autosave);
                Ok(CaptureOutcome::Appended { index })
            }
            Err(err) => {
                tracing::error!(%err, "capture failed");
                self.events.push(UiEvent::CaptureFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    fn flush_active(&mut self) -> StudioResult<()> {
        let session = self.session.as_mut().ok_or_else(no_open_project)?;
        let id = session.project_id();
        let revision = session.revision();
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StudioError::persistence(format!("open project {id} is missing")))?;
        session.write_back(project);

        match self.store.save_all(&self.projects) {
            Ok(()) => {
                session.mark_persisted(revision);
                self.unsaved = false;
                tracing::debug!(%id, revision, "project persisted");
                self.events.push(UiEvent::Persisted { project: id });
                Ok(())
            }
            Err(err) => {
                tracing::error!(%id, %err, "persist failed, keeping in-memory state");
                self.mark_unsaved(&err);
                Err(err)
            }
        }
    }

    fn save_collection(&mut self) -> StudioResult<()> {
        match self.store.save_all(&self.projects) {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "saving project collection failed");
                self.mark_unsaved(&err);
                Err(err)
            }
        }
    }

    /// Record a failed write and schedule the retry one debounce window from now.
    fn mark_unsaved(&mut self, err: &StudioError) {
        self.unsaved = true;
        self.events.push(UiEvent::PersistFailed {
            message: err.to_string(),
        });
        self.autosave
            .touch(&mut self.timers, self.now, StudioTimer::Autosave);
    }

    /// Drop the session. A pending retry for an earlier failed write stays armed.
    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop_playback(&mut self.timers);
            session.abort_capture();
        }
        if !self.unsaved {
            self.autosave.cancel(&mut self.timers);
        }
        self.camera.release();
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!(%err, "flush on drop failed");
        }
    }
}
