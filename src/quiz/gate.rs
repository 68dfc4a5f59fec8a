//! The video-gated question state machine
//!
//! ```text
//! Idle ──load──▶ Locked ──≥ unlock %──▶ Unlocked ──auto / select──▶ Triggered
//!                   ▲                       ▲                            │
//!                   └──── display delay ────┴──────── Answered ◀──submit─┘
//! ```
//!
//! A lesson without questions stays `Idle`. The automatic trigger fires at
//! most once per lesson session and pauses playback through the
//! [`PlaybackControl`] it is handed; the resume after answering goes through
//! the same seam.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::ledger::AnswerLedger;
use super::model::{AnswerAttempt, ChoiceKey, QuestionRecord, QuestionSessionState};
use crate::config::Thresholds;
use crate::playback::{PlaybackControl, Timer};
use crate::progress::now_millis;

/// Gate states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateState {
    /// No question set loaded, or the lesson has no questions
    #[default]
    Idle,
    /// Playback has not reached the unlock threshold
    Locked,
    /// Questions may be shown
    Unlocked,
    /// A question is on screen and playback is held
    Triggered,
    /// Feedback is on screen until the display delay elapses
    Answered,
}

/// Result of a submitted answer, for UI feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: u32,
    pub chosen: ChoiceKey,
    pub correct: bool,
    pub correct_choice: Option<ChoiceKey>,
}

/// Decides when quiz questions appear for the active lesson
pub struct QuestionGate {
    thresholds: Thresholds,
    display_delay: Duration,
    ledger: AnswerLedger,
    rng: StdRng,
    lesson_id: String,
    questions: Vec<QuestionRecord>,
    session: QuestionSessionState,
    attempts: Vec<AnswerAttempt>,
    state: GateState,
    active: Option<u32>,
    percent: f64,
    last_feedback: Option<AnswerFeedback>,
    resume: Timer<()>,
}

impl QuestionGate {
    /// Create an idle gate
    pub fn new(thresholds: Thresholds, display_delay: Duration, ledger: AnswerLedger) -> Self {
        Self::with_rng(thresholds, display_delay, ledger, StdRng::from_os_rng())
    }

    /// Create an idle gate with a given random source
    pub fn with_rng(
        thresholds: Thresholds,
        display_delay: Duration,
        ledger: AnswerLedger,
        rng: StdRng,
    ) -> Self {
        Self {
            thresholds,
            display_delay,
            ledger,
            rng,
            lesson_id: String::new(),
            questions: Vec::new(),
            session: QuestionSessionState::default(),
            attempts: Vec::new(),
            state: GateState::Idle,
            active: None,
            percent: 0.0,
            last_feedback: None,
            resume: Timer::new(),
        }
    }

    /// Drop everything tied to the current lesson session
    pub fn reset(&mut self) {
        self.lesson_id.clear();
        self.questions.clear();
        self.session = QuestionSessionState::default();
        self.attempts.clear();
        self.state = GateState::Idle;
        self.active = None;
        self.percent = 0.0;
        self.last_feedback = None;
        self.resume.cancel();
    }

    /// Load a lesson's question set along with its saved answer history
    pub fn load(&mut self, lesson_id: &str, questions: Vec<QuestionRecord>, percent: f64) {
        self.reset();
        self.lesson_id = lesson_id.to_string();
        self.session.answered_question_ids = self.ledger.answered(lesson_id);
        self.attempts = self.ledger.attempts(lesson_id);
        self.questions = questions;
        self.percent = percent;

        if self.questions.is_empty() {
            tracing::debug!("Lesson {} has no questions", lesson_id);
            return;
        }

        self.state = self.resting_state();
        tracing::debug!(
            "Loaded {} questions for lesson {} ({} answered, {:?})",
            self.questions.len(),
            lesson_id,
            self.answered_count(),
            self.state
        );
    }

    /// Where the gate settles when no question is on screen
    fn resting_state(&self) -> GateState {
        if self.thresholds.is_unlocked(self.percent) {
            GateState::Unlocked
        } else {
            GateState::Locked
        }
    }

    /// React to a playback percent; may trigger a question and pause playback.
    ///
    /// Returns the triggered question, if any.
    pub fn on_progress(
        &mut self,
        percent: f64,
        control: &mut dyn PlaybackControl,
    ) -> Option<&QuestionRecord> {
        self.percent = percent;

        match self.state {
            GateState::Locked | GateState::Unlocked => {
                self.state = self.resting_state();
            }
            GateState::Idle | GateState::Triggered | GateState::Answered => return None,
        }

        if self.state != GateState::Unlocked || self.session.triggered_this_session {
            return None;
        }

        let unanswered: Vec<u32> = self
            .questions
            .iter()
            .map(|q| q.id)
            .filter(|id| !self.session.answered_question_ids.contains(id))
            .collect();

        let id = *unanswered.choose(&mut self.rng)?;
        self.trigger(id, control);
        self.active_question()
    }

    fn trigger(&mut self, id: u32, control: &mut dyn PlaybackControl) {
        self.session.triggered_this_session = true;
        self.active = Some(id);
        self.state = GateState::Triggered;
        control.pause_for_gate();
        tracing::debug!("Question {} triggered for lesson {}", id, self.lesson_id);
    }

    /// Open a question picked from the list; only unanswered questions while unlocked
    pub fn select_question(&mut self, id: u32, control: &mut dyn PlaybackControl) -> bool {
        if !self.can_select(id) {
            tracing::debug!("Rejected selection of question {} in {:?}", id, self.state);
            return false;
        }
        self.trigger(id, control);
        true
    }

    /// Whether `select_question(id)` would be accepted
    pub fn can_select(&self, id: u32) -> bool {
        self.state == GateState::Unlocked
            && self.questions.iter().any(|q| q.id == id)
            && !self.session.answered_question_ids.contains(&id)
    }

    /// Answer the question on screen.
    ///
    /// Returns whether the answer was correct, or `None` when no question is
    /// awaiting an answer or the choice is not `a`..`d` (state is unchanged).
    pub fn submit_answer(&mut self, now: Instant, choice: &str) -> Option<bool> {
        if self.state != GateState::Triggered {
            return None;
        }
        let chosen = ChoiceKey::parse(choice)?;
        let question = self.active_question()?;

        let question_id = question.id;
        let correct = question.is_correct(chosen);
        let correct_choice = question.correct_choice();

        let attempt =
            AnswerAttempt { question_id, chosen_key: chosen, is_correct: correct, timestamp: now_millis() };
        self.attempts.push(attempt.clone());
        self.session.answered_question_ids.insert(question_id);

        if let Err(e) = self.ledger.record(&self.lesson_id, &attempt, &self.session.answered_question_ids) {
            tracing::warn!("Failed to save answer for question {}: {}", question_id, e);
        }

        self.last_feedback = Some(AnswerFeedback { question_id, chosen, correct, correct_choice });
        self.state = GateState::Answered;
        self.resume.arm(now, self.display_delay, ());
        tracing::info!("Question {} answered ({})", question_id, if correct { "correct" } else { "wrong" });

        Some(correct)
    }

    /// Finish the feedback delay; returns true when playback was released
    pub fn poll(&mut self, now: Instant, control: &mut dyn PlaybackControl) -> bool {
        if self.resume.poll(now).is_none() {
            return false;
        }
        self.active = None;
        self.state = self.resting_state();
        control.resume_from_gate();
        true
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.questions.len()
    }

    /// Number of this lesson's questions already answered
    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| self.session.answered_question_ids.contains(&q.id)).count()
    }

    /// The question currently on screen
    pub fn active_question(&self) -> Option<&QuestionRecord> {
        let id = self.active?;
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions with their answered flag, in load order
    pub fn question_list(&self) -> Vec<(&QuestionRecord, bool)> {
        self.questions
            .iter()
            .map(|q| (q, self.session.answered_question_ids.contains(&q.id)))
            .collect()
    }

    pub fn last_feedback(&self) -> Option<&AnswerFeedback> {
        self.last_feedback.as_ref()
    }

    pub fn session(&self) -> &QuestionSessionState {
        &self.session
    }

    /// Answer log for the lesson, including earlier sessions
    pub fn attempts(&self) -> &[AnswerAttempt] {
        &self.attempts
    }

    pub fn answered_ids(&self) -> &HashSet<u32> {
        &self.session.answered_question_ids
    }

    /// When playback will be released after the current feedback
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resume.deadline()
    }
}
