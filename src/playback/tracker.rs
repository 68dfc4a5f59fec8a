//! Watch-position tracking for a single lesson session

use std::time::{Duration, Instant};

use super::timer::Timer;
use crate::config::Thresholds;
use crate::progress::LessonProgress;
use crate::progress::model::{clamp_percent, sanitize_seconds};

/// Largest media-time jump (at 1x) still counted as watching rather than seeking
const MAX_TICK_GAP_SECS: f64 = 5.0;

/// Why a progress snapshot was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    /// Debounced write during playback
    Tick,
    /// The viewer paused
    Pause,
    /// Playback was paused for a quiz question
    GatePause,
    /// The media reached its end
    End,
}

/// Progress values to persist for the active lesson
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub lesson_id: String,
    pub percent: f64,
    pub position: f64,
    pub watch_time: f64,
    pub reason: SnapshotReason,
}

impl ProgressSnapshot {
    /// Whether this snapshot signals that the lesson finished playing
    pub fn is_lesson_complete(&self) -> bool {
        self.reason == SnapshotReason::End
    }
}

/// Instructions for the video element
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Jump to a position in seconds
    Seek(f64),
    Pause,
    Play,
}

/// Coarse playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for media metadata
    #[default]
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Seam through which the question gate pauses and resumes its paired player
pub trait PlaybackControl {
    /// Pause playback on behalf of the quiz
    fn pause_for_gate(&mut self);

    /// Release a quiz pause
    fn resume_from_gate(&mut self);
}

/// Tracks one video playback session and produces progress snapshots
#[derive(Debug)]
pub struct PlaybackTracker {
    thresholds: Thresholds,
    debounce: Duration,
    lesson_id: String,
    duration: Option<f64>,
    position: f64,
    watch_time: f64,
    rate: f64,
    state: PlaybackState,
    paused_by_user: bool,
    gate_hold: bool,
    pending: Timer<ProgressSnapshot>,
    commands: Vec<PlaybackCommand>,
}

impl PlaybackTracker {
    /// Create a tracker with an empty session
    pub fn new(thresholds: Thresholds, debounce: Duration) -> Self {
        Self {
            thresholds,
            debounce,
            lesson_id: String::new(),
            duration: None,
            position: 0.0,
            watch_time: 0.0,
            rate: 1.0,
            state: PlaybackState::Loading,
            paused_by_user: false,
            gate_hold: false,
            pending: Timer::new(),
            commands: Vec::new(),
        }
    }

    /// Begin a new lesson session, discarding everything from the previous one
    pub fn start_session(&mut self, lesson_id: impl Into<String>) {
        let thresholds = self.thresholds;
        let debounce = self.debounce;
        *self = Self::new(thresholds, debounce);
        self.lesson_id = lesson_id.into();
        tracing::debug!("Playback session started for lesson {}", self.lesson_id);
    }

    /// Media metadata became available; returns the resume position if seeking
    pub fn on_metadata(&mut self, duration: f64, saved: Option<&LessonProgress>) -> Option<f64> {
        self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
        if self.duration.is_none() {
            tracing::warn!("Lesson {} reported no usable duration ({})", self.lesson_id, duration);
        }

        let saved = saved?;
        // Repeated metadata events must not rewind time already watched this session
        self.watch_time = self.watch_time.max(sanitize_seconds(saved.watch_time));

        let resume = self.resume_position(saved.last_position)?;
        self.position = resume;
        self.commands.push(PlaybackCommand::Seek(resume));
        tracing::debug!("Resuming lesson {} at {:.1}s", self.lesson_id, resume);
        Some(resume)
    }

    /// Saved positions are resumed only when strictly inside `(0, cap * duration)`
    fn resume_position(&self, last_position: f64) -> Option<f64> {
        let duration = self.duration?;
        let cap = duration * self.thresholds.resume_cap_percent / 100.0;
        (last_position > 0.0 && last_position < cap).then_some(last_position)
    }

    /// The playhead moved; returns the current percent
    pub fn on_time_update(&mut self, now: Instant, position: f64) -> f64 {
        let position = sanitize_seconds(position);
        let delta = position - self.position;
        if delta > 0.0 && delta <= MAX_TICK_GAP_SECS * self.rate.max(1.0) {
            self.watch_time += delta;
        }
        self.position = position;

        // Scrubbing back after the end leaves the ended state without a play event
        if self.state == PlaybackState::Ended && self.duration.is_some_and(|d| position < d) {
            self.state = PlaybackState::Paused;
        }

        let snapshot = self.snapshot(SnapshotReason::Tick);
        let percent = snapshot.percent;
        self.pending.coalesce(now, self.debounce, snapshot);
        percent
    }

    /// Deliver the debounced snapshot once its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        self.pending.poll(now)
    }

    /// Take the pending debounced snapshot without waiting for its window
    pub fn flush(&mut self) -> Option<ProgressSnapshot> {
        self.pending.cancel()
    }

    /// Playback started or resumed
    pub fn on_play(&mut self) {
        self.state = PlaybackState::Playing;
        self.paused_by_user = false;
    }

    /// Playback paused; the pending write is replaced by an immediate one
    pub fn on_pause(&mut self) -> ProgressSnapshot {
        self.pending.cancel();
        self.state = PlaybackState::Paused;

        let reason = if self.gate_hold {
            SnapshotReason::GatePause
        } else {
            self.paused_by_user = true;
            SnapshotReason::Pause
        };
        self.snapshot(reason)
    }

    /// The viewer paused, even while the quiz is holding playback.
    ///
    /// A later gate release will not restart playback.
    pub fn on_user_pause(&mut self) -> ProgressSnapshot {
        self.pending.cancel();
        self.state = PlaybackState::Paused;
        self.paused_by_user = true;
        self.snapshot(SnapshotReason::Pause)
    }

    /// The media played to the end
    pub fn on_ended(&mut self) -> ProgressSnapshot {
        self.pending.cancel();
        self.state = PlaybackState::Ended;
        if let Some(duration) = self.duration {
            self.position = duration;
        }

        let mut snapshot = self.snapshot(SnapshotReason::End);
        snapshot.percent = 100.0;
        tracing::debug!("Lesson {} finished playing", self.lesson_id);
        snapshot
    }

    /// Speed changed; position and percent math are unaffected
    pub fn on_rate_change(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
    }

    fn snapshot(&self, reason: SnapshotReason) -> ProgressSnapshot {
        ProgressSnapshot {
            lesson_id: self.lesson_id.clone(),
            percent: self.percent(),
            position: self.position,
            watch_time: self.watch_time,
            reason,
        }
    }

    /// Percent of the lesson watched, 0 while the duration is unknown
    pub fn percent(&self) -> f64 {
        if self.state == PlaybackState::Ended {
            return 100.0;
        }
        match self.duration {
            Some(duration) => clamp_percent(self.position / duration * 100.0),
            None => 0.0,
        }
    }

    /// Whether the current position counts as a completed lesson
    pub fn is_complete(&self) -> bool {
        self.thresholds.is_complete(self.percent())
    }

    /// Commands queued for the video element since the last drain
    pub fn drain_commands(&mut self) -> Vec<PlaybackCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn watch_time(&self) -> f64 {
        self.watch_time
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the viewer (not the quiz) paused playback
    pub fn is_paused_by_user(&self) -> bool {
        self.paused_by_user
    }

    /// Whether the quiz is holding playback
    pub fn is_gate_held(&self) -> bool {
        self.gate_hold
    }

    /// Whether a debounced write is waiting
    pub fn has_pending_write(&self) -> bool {
        self.pending.is_armed()
    }

    /// When the pending write will be delivered
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }
}

impl PlaybackControl for PlaybackTracker {
    fn pause_for_gate(&mut self) {
        if self.gate_hold {
            return;
        }
        self.gate_hold = true;
        self.commands.push(PlaybackCommand::Pause);
    }

    fn resume_from_gate(&mut self) {
        if !self.gate_hold {
            return;
        }
        self.gate_hold = false;
        if !self.paused_by_user && self.state != PlaybackState::Ended {
            self.commands.push(PlaybackCommand::Play);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WINDOW: Duration = Duration::from_secs(2);

    fn tracker() -> PlaybackTracker {
        let mut tracker = PlaybackTracker::new(Thresholds::default(), WINDOW);
        tracker.start_session("1");
        tracker
    }

    fn saved(last_position: f64) -> LessonProgress {
        LessonProgress {
            user_key: "user".to_string(),
            lesson_id: "1".to_string(),
            progress_percent: 0.0,
            last_position,
            watch_time: 42.0,
            completed: false,
            updated_at: 0,
        }
    }

    #[test]
    fn resumes_saved_position_below_cap() {
        let mut tracker = tracker();
        let resumed = tracker.on_metadata(600.0, Some(&saved(300.0)));

        assert_eq!(resumed, Some(300.0));
        assert_eq!(tracker.drain_commands(), vec![PlaybackCommand::Seek(300.0)]);
        assert_eq!(tracker.percent(), 50.0);
        assert_eq!(tracker.watch_time(), 42.0);
    }

    #[test]
    fn does_not_resume_past_cap() {
        let mut tracker = tracker();
        assert_eq!(tracker.on_metadata(600.0, Some(&saved(570.0))), None);
        assert_eq!(tracker.on_metadata(600.0, Some(&saved(540.0))), None);
        assert_eq!(tracker.on_metadata(600.0, Some(&saved(0.0))), None);
        assert!(tracker.drain_commands().is_empty());
        assert_eq!(tracker.position(), 0.0);
    }

    #[test]
    fn unknown_duration_keeps_percent_at_zero() {
        let mut tracker = tracker();
        assert_eq!(tracker.on_metadata(f64::NAN, Some(&saved(100.0))), None);
        assert_eq!(tracker.on_time_update(Instant::now(), 30.0), 0.0);
    }

    #[test]
    fn rapid_updates_coalesce_into_one_write() {
        let start = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);

        for step in 0..8 {
            let now = start + Duration::from_millis(250 * step);
            tracker.on_time_update(now, 0.25 * step as f64);
            assert_eq!(tracker.poll(now), None);
        }

        let written = tracker.poll(start + WINDOW).expect("debounced write");
        assert_eq!(written.position, 1.75);
        assert_eq!(written.reason, SnapshotReason::Tick);
        assert_eq!(tracker.poll(start + WINDOW * 3), None);
    }

    #[test]
    fn pause_flushes_immediately() {
        let start = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_play();
        tracker.on_time_update(start, 1.0);
        tracker.on_time_update(start, 2.0);

        let snapshot = tracker.on_pause();
        assert_eq!(snapshot.position, 2.0);
        assert_eq!(snapshot.reason, SnapshotReason::Pause);
        assert!(!tracker.has_pending_write());
        assert!(tracker.is_paused_by_user());
        assert_eq!(tracker.poll(start + WINDOW), None);
    }

    #[test]
    fn gate_pause_is_not_a_user_pause() {
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_play();

        tracker.pause_for_gate();
        assert_eq!(tracker.drain_commands(), vec![PlaybackCommand::Pause]);

        let snapshot = tracker.on_pause();
        assert_eq!(snapshot.reason, SnapshotReason::GatePause);
        assert!(!tracker.is_paused_by_user());

        tracker.resume_from_gate();
        assert_eq!(tracker.drain_commands(), vec![PlaybackCommand::Play]);
        assert!(!tracker.is_gate_held());
    }

    #[test]
    fn gate_resume_respects_user_pause() {
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_pause();

        tracker.pause_for_gate();
        tracker.resume_from_gate();
        assert_eq!(tracker.drain_commands(), vec![PlaybackCommand::Pause]);
    }

    #[test]
    fn end_forces_full_progress() {
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_time_update(Instant::now(), 500.0);

        let snapshot = tracker.on_ended();
        assert_eq!(snapshot.percent, 100.0);
        assert_eq!(snapshot.position, 600.0);
        assert!(snapshot.is_lesson_complete());
        assert!(tracker.is_complete());
        assert!(!tracker.has_pending_write());
    }

    #[test]
    fn scrubbing_back_after_end_reports_real_percent() {
        let now = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_ended();

        assert_eq!(tracker.on_time_update(now, 60.0), 10.0);
        assert_eq!(tracker.state(), PlaybackState::Paused);

        let snapshot = tracker.flush().expect("pending write");
        assert_eq!(snapshot.position, 60.0);
        assert_eq!(snapshot.percent, 10.0);
    }

    #[test]
    fn update_at_end_keeps_full_progress() {
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_ended();

        assert_eq!(tracker.on_time_update(Instant::now(), 600.0), 100.0);
        assert_eq!(tracker.state(), PlaybackState::Ended);
    }

    #[test]
    fn repeated_metadata_keeps_accumulated_watch_time() {
        let start = Instant::now();
        let mut tracker = tracker();
        let saved = saved(300.0);
        tracker.on_metadata(600.0, Some(&saved));
        for step in 1..=20 {
            tracker.on_time_update(start, 300.0 + step as f64);
        }
        assert_eq!(tracker.watch_time(), 62.0);

        tracker.on_metadata(600.0, Some(&saved));
        assert_eq!(tracker.watch_time(), 62.0);
    }

    #[test]
    fn user_pause_during_quiz_is_not_undone_by_release() {
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_play();

        tracker.pause_for_gate();
        tracker.on_pause();
        let snapshot = tracker.on_user_pause();
        assert_eq!(snapshot.reason, SnapshotReason::Pause);
        assert!(tracker.is_paused_by_user());

        tracker.resume_from_gate();
        assert_eq!(tracker.drain_commands(), vec![PlaybackCommand::Pause]);
    }

    #[test]
    fn rate_change_does_not_affect_percent() {
        let now = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_rate_change(2.0);

        assert_eq!(tracker.on_time_update(now, 300.0), 50.0);
        assert_eq!(tracker.rate(), 2.0);
    }

    #[test]
    fn watch_time_ignores_seeks() {
        let now = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);

        tracker.on_time_update(now, 1.0);
        tracker.on_time_update(now, 2.0);
        tracker.on_time_update(now, 400.0);
        tracker.on_time_update(now, 100.0);
        tracker.on_time_update(now, 101.0);

        assert_eq!(tracker.watch_time(), 3.0);
    }

    #[test]
    fn new_session_inherits_nothing() {
        let now = Instant::now();
        let mut tracker = tracker();
        tracker.on_metadata(600.0, None);
        tracker.on_time_update(now, 300.0);
        tracker.pause_for_gate();

        tracker.start_session("2");
        assert_eq!(tracker.lesson_id(), "2");
        assert_eq!(tracker.position(), 0.0);
        assert_eq!(tracker.duration(), None);
        assert_eq!(tracker.watch_time(), 0.0);
        assert!(!tracker.has_pending_write());
        assert!(!tracker.is_gate_held());
        assert!(tracker.drain_commands().is_empty());
        assert_eq!(tracker.poll(now + WINDOW), None);
    }
}
