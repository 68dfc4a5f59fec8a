//! One lesson's playback tracker and question gate, wired together

use std::time::Instant;

use crate::config::Config;
use crate::course::Lesson;
use crate::playback::{PlaybackTracker, ProgressSnapshot};
use crate::progress::LessonProgress;
use crate::quiz::{QuestionGate, QuestionRecord};

/// Everything tied to the lesson currently on screen
///
/// Dropping a session drops its timers, so nothing scheduled for a lesson
/// can fire after the viewer has moved on.
pub struct LessonSession {
    pub lesson: Lesson,
    pub tracker: PlaybackTracker,
    pub gate: QuestionGate,
    /// Progress saved before this session started, used to resume
    pub saved: Option<LessonProgress>,
}

impl LessonSession {
    /// Start a session with a fresh tracker; `gate` is loaded with the lesson's questions
    pub fn start(
        config: &Config,
        lesson: Lesson,
        questions: Vec<QuestionRecord>,
        mut gate: QuestionGate,
        saved: Option<LessonProgress>,
    ) -> Self {
        let mut tracker = PlaybackTracker::new(config.thresholds, config.timings.debounce());
        tracker.start_session(lesson.id.clone());
        gate.load(&lesson.id, questions, 0.0);

        Self { lesson, tracker, gate, saved }
    }

    /// Media metadata arrived; returns the resume position when seeking
    pub fn on_metadata(&mut self, duration: f64) -> Option<f64> {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            self.lesson.duration_seconds.unwrap_or(duration)
        };
        self.tracker.on_metadata(duration, self.saved.as_ref())
    }

    /// Feed a position update to the tracker and the gate.
    ///
    /// Returns the question the gate triggered, if any.
    pub fn on_time_update(&mut self, now: Instant, position: f64) -> Option<QuestionRecord> {
        let percent = self.tracker.on_time_update(now, position);
        self.gate.on_progress(percent, &mut self.tracker).cloned()
    }

    /// Open a question from the list
    pub fn select_question(&mut self, id: u32) -> bool {
        self.gate.select_question(id, &mut self.tracker)
    }

    /// Due debounced write, if any
    pub fn poll_progress(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        self.tracker.poll(now)
    }

    /// Release playback once answer feedback has been shown long enough
    pub fn poll_gate(&mut self, now: Instant) -> bool {
        self.gate.poll(now, &mut self.tracker)
    }

    /// Earliest pending timer deadline of this session
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.tracker.next_deadline(), self.gate.next_deadline()].into_iter().flatten().min()
    }

    /// Context string for the chat assistant
    pub fn chat_context(&self) -> String {
        match &self.lesson.description {
            Some(description) => format!("{}: {}", self.lesson.title, description),
            None => self.lesson.title.clone(),
        }
    }
}
