use std::time::Duration;

use crate::{
    foundation::core::Fps,
    timer::{TimerId, TimerQueue},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing { tick: TimerId },
}

/// Advances a cursor through the frame sequence once per `1s / fps`.
///
/// Each tick re-arms from the previous deadline with the interval of the fps current at that
/// moment, so an fps change lands on the next tick and the already-pending one keeps its old
/// deadline.
#[derive(Debug)]
pub struct PlaybackScheduler {
    state: PlaybackState,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self {
            state: PlaybackState::Stopped,
        }
    }
}

impl PlaybackScheduler {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    /// No-op when the sequence is empty or playback is already running.
    pub fn start<E>(
        &mut self,
        frame_count: usize,
        fps: Fps,
        now: Duration,
        timers: &mut TimerQueue<E>,
        tick_event: E,
    ) -> bool {
        if frame_count == 0 || self.is_playing() {
            return false;
        }
        let tick = timers.schedule_at(now + fps.frame_interval(), tick_event);
        self.state = PlaybackState::Playing { tick };
        tracing::debug!(%fps, frame_count, "playback started");
        true
    }

    /// Cancel the pending tick synchronously. The cursor is left where it is.
    pub fn stop<E>(&mut self, timers: &mut TimerQueue<E>) -> bool {
        let PlaybackState::Playing { tick } = self.state else {
            return false;
        };
        timers.cancel(tick);
        self.state = PlaybackState::Stopped;
        tracing::debug!("playback stopped");
        true
    }

    /// Handle a fired tick: advance `cursor` (wrapping) and schedule the next tick.
    ///
    /// Ticks that do not belong to the current run are ignored. An empty sequence stops playback
    /// and parks the cursor at 0.
    #[allow(clippy::too_many_arguments)]
    pub fn on_tick<E>(
        &mut self,
        fired: TimerId,
        deadline: Duration,
        cursor: &mut usize,
        frame_count: usize,
        fps: Fps,
        timers: &mut TimerQueue<E>,
        tick_event: E,
    ) -> bool {
        match self.state {
            PlaybackState::Playing { tick } if tick == fired => {}
            _ => return false,
        }

        if frame_count == 0 {
            *cursor = 0;
            self.state = PlaybackState::Stopped;
            tracing::debug!("playback stopped: sequence is empty");
            return false;
        }

        *cursor = (*cursor + 1) % frame_count;
        let tick = timers.schedule_at(deadline + fps.frame_interval(), tick_event);
        self.state = PlaybackState::Playing { tick };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rig {
        timers: TimerQueue<()>,
        playback: PlaybackScheduler,
        cursor: usize,
        frames: usize,
        fps: Fps,
        ticks: usize,
    }

    impl Rig {
        fn new(frames: usize, fps: u32) -> Self {
            Self {
                timers: TimerQueue::new(),
                playback: PlaybackScheduler::default(),
                cursor: 0,
                frames,
                fps: Fps::new(fps).unwrap(),
                ticks: 0,
            }
        }

        fn start(&mut self, now_ms: u64) -> bool {
            self.playback.start(
                self.frames,
                self.fps,
                Duration::from_millis(now_ms),
                &mut self.timers,
                (),
            )
        }

        fn advance_to(&mut self, now_ms: u64) {
            let now = Duration::from_millis(now_ms);
            while let Some(due) = self.timers.pop_due(now) {
                if self.playback.on_tick(
                    due.id,
                    due.deadline,
                    &mut self.cursor,
                    self.frames,
                    self.fps,
                    &mut self.timers,
                    (),
                ) {
                    self.ticks += 1;
                }
            }
        }
    }

    #[test]
    fn four_frames_at_four_fps_wrap_after_one_second() {
        let mut rig = Rig::new(4, 4);
        assert!(rig.start(0));
        rig.advance_to(999);
        assert_eq!(rig.ticks, 3);
        assert_eq!(rig.cursor, 3);
        rig.advance_to(1000);
        assert_eq!(rig.ticks, 4);
        assert_eq!(rig.cursor, 0);
    }

    #[test]
    fn no_tick_after_stop_mid_interval() {
        let mut rig = Rig::new(4, 4);
        rig.start(0);
        rig.advance_to(260);
        assert_eq!(rig.ticks, 1);
        assert!(rig.playback.stop(&mut rig.timers));
        assert!(rig.timers.is_empty());
        rig.advance_to(10_000);
        assert_eq!(rig.ticks, 1);
        assert_eq!(rig.cursor, 1);
    }

    #[test]
    fn start_is_noop_when_empty_or_already_playing() {
        let mut empty = Rig::new(0, 12);
        assert!(!empty.start(0));
        assert!(!empty.playback.is_playing());

        let mut rig = Rig::new(3, 12);
        assert!(rig.start(0));
        assert!(!rig.start(5));
        assert_eq!(rig.timers.len(), 1);
    }

    #[test]
    fn restart_resumes_from_retained_cursor() {
        let mut rig = Rig::new(5, 10);
        rig.start(0);
        rig.advance_to(200);
        rig.playback.stop(&mut rig.timers);
        assert_eq!(rig.cursor, 2);
        rig.start(1000);
        rig.advance_to(1100);
        assert_eq!(rig.cursor, 3);
    }

    #[test]
    fn fps_change_applies_from_next_tick() {
        let mut rig = Rig::new(100, 4);
        rig.start(0);
        rig.advance_to(10);
        rig.fps = Fps::new(10).unwrap();
        // Pending tick keeps its 250ms deadline; the following ones are 100ms apart.
        rig.advance_to(249);
        assert_eq!(rig.ticks, 0);
        rig.advance_to(450);
        assert_eq!(rig.ticks, 3);
    }

    #[test]
    fn emptied_sequence_stops_on_next_tick() {
        let mut rig = Rig::new(2, 4);
        rig.start(0);
        rig.frames = 0;
        rig.cursor = 1;
        rig.advance_to(250);
        assert!(!rig.playback.is_playing());
        assert_eq!(rig.cursor, 0);
        assert!(rig.timers.is_empty());
    }
}
