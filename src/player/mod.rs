//! Course player
//!
//! [`CoursePlayer`] is the single entry point a front end talks to. It feeds
//! video element events into the active [`LessonSession`], persists progress
//! snapshots, routes lesson completion to the navigator and queues
//! [`PlayerCommand`]s for the front end to carry out.
//!
//! Everything runs on one task: the caller delivers events and calls
//! [`CoursePlayer::tick`] whenever a deadline from
//! [`CoursePlayer::next_deadline`] passes.

pub mod session;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::Config;
use crate::course::{Catalog, Lesson, LessonNavigator};
use crate::playback::{PlaybackCommand, ProgressSnapshot};
use crate::progress::{LessonProgress, ProgressStore};
use crate::quiz::{AnswerLedger, QuestionGate, QuestionRecord};
pub use session::LessonSession;

/// Events reported by the video element
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Duration became known
    LoadedMetadata { duration: f64 },
    /// Playhead moved
    TimeUpdate { position: f64 },
    Play,
    /// The video element paused, for any reason
    Pause,
    /// The viewer asked to pause, even while a quiz question holds playback
    UserPause,
    Ended,
    /// Playback speed changed
    RateChange { rate: f64 },
}

/// Instructions for the front end
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// A lesson was opened
    LessonOpened(Lesson),
    /// Drive the video element
    Playback(PlaybackCommand),
    /// Display a quiz question
    ShowQuestion(QuestionRecord),
    /// Close the quiz question after feedback
    HideQuestion,
    /// The lesson finished playing
    LessonCompleted { lesson_id: String },
    /// Auto-advance countdown started
    AutoAdvanceScheduled { next_lesson_id: String, delay: Duration },
}

/// Drives lessons of a course for one user
pub struct CoursePlayer {
    config: Config,
    user_key: String,
    store: Arc<ProgressStore>,
    ledger: AnswerLedger,
    questions: Vec<QuestionRecord>,
    navigator: LessonNavigator,
    session: Option<LessonSession>,
    question_seed: Option<u64>,
    commands: Vec<PlayerCommand>,
}

impl CoursePlayer {
    /// Create a player for a catalog
    pub fn new(
        config: Config,
        catalog: Catalog,
        user_key: impl Into<String>,
        store: Arc<ProgressStore>,
        ledger: AnswerLedger,
    ) -> Self {
        let navigator = LessonNavigator::new(catalog.modules, config.timings.auto_advance());
        Self {
            config,
            user_key: user_key.into(),
            store,
            ledger,
            questions: catalog.questions,
            navigator,
            session: None,
            question_seed: None,
            commands: Vec::new(),
        }
    }

    /// Make question selection reproducible
    pub fn with_question_seed(mut self, seed: u64) -> Self {
        self.question_seed = Some(seed);
        self
    }

    fn new_gate(&self) -> QuestionGate {
        let thresholds = self.config.thresholds;
        let delay = self.config.timings.answer_display();
        match self.question_seed {
            Some(seed) => {
                QuestionGate::with_rng(thresholds, delay, self.ledger.clone(), StdRng::seed_from_u64(seed))
            }
            None => QuestionGate::new(thresholds, delay, self.ledger.clone()),
        }
    }

    /// Open a lesson by id. Returns false for unknown lessons.
    pub async fn open(&mut self, lesson_id: &str) -> bool {
        let Some(lesson) = self.navigator.select(lesson_id).cloned() else {
            tracing::warn!("Unknown lesson {}", lesson_id);
            return false;
        };
        self.begin(lesson).await;
        true
    }

    /// Move to the next lesson of the module
    pub async fn next(&mut self) -> bool {
        let Some(lesson) = self.navigator.next().cloned() else {
            return false;
        };
        self.begin(lesson).await;
        true
    }

    /// Move to the previous lesson of the module
    pub async fn previous(&mut self) -> bool {
        let Some(lesson) = self.navigator.previous().cloned() else {
            return false;
        };
        self.begin(lesson).await;
        true
    }

    /// Replace the active session with a fresh one for `lesson`
    async fn begin(&mut self, lesson: Lesson) {
        self.close();

        let saved = self.store.fetch(&self.user_key, &lesson.id).await;
        let questions: Vec<QuestionRecord> =
            self.questions.iter().filter(|q| lesson.owns_question(q)).cloned().collect();

        tracing::info!(
            "Opening lesson {} ({} questions, saved progress: {})",
            lesson.id,
            questions.len(),
            saved.as_ref().map_or(0.0, |p| p.progress_percent)
        );

        let gate = self.new_gate();
        self.commands.push(PlayerCommand::LessonOpened(lesson.clone()));
        self.session = Some(LessonSession::start(&self.config, lesson, questions, gate, saved));
    }

    /// Discard the active session, writing any progress still waiting on its debounce
    fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(snapshot) = session.tracker.flush() {
            self.persist(&snapshot);
        }
    }

    fn persist(&self, snapshot: &ProgressSnapshot) -> LessonProgress {
        let record = if snapshot.is_lesson_complete() {
            self.store.mark_completed(
                &self.user_key,
                &snapshot.lesson_id,
                snapshot.position,
                snapshot.watch_time,
            )
        } else {
            self.store.write(
                &self.user_key,
                &snapshot.lesson_id,
                snapshot.percent,
                snapshot.position,
                snapshot.watch_time,
            )
        };
        self.store.spawn_push(record.clone());
        record
    }

    /// Handle an event from the video element
    pub fn handle(&mut self, now: Instant, event: PlayerEvent) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Ignoring {:?} with no lesson open", event);
            return;
        };

        let mut snapshot = None;
        let mut shown = None;
        match event {
            PlayerEvent::LoadedMetadata { duration } => {
                session.on_metadata(duration);
            }
            PlayerEvent::TimeUpdate { position } => {
                shown = session.on_time_update(now, position);
            }
            PlayerEvent::Play => session.tracker.on_play(),
            PlayerEvent::Pause => snapshot = Some(session.tracker.on_pause()),
            PlayerEvent::UserPause => snapshot = Some(session.tracker.on_user_pause()),
            PlayerEvent::Ended => snapshot = Some(session.tracker.on_ended()),
            PlayerEvent::RateChange { rate } => session.tracker.on_rate_change(rate),
        }

        let playback = session.tracker.drain_commands();
        if let Some(question) = shown {
            self.commands.push(PlayerCommand::ShowQuestion(question));
        }
        self.commands.extend(playback.into_iter().map(PlayerCommand::Playback));

        if let Some(snapshot) = snapshot {
            self.persist(&snapshot);
            if snapshot.is_lesson_complete() {
                self.on_lesson_complete(now, snapshot.lesson_id);
            }
        }
    }

    fn on_lesson_complete(&mut self, now: Instant, lesson_id: String) {
        self.commands.push(PlayerCommand::LessonCompleted { lesson_id });
        if self.navigator.on_lesson_complete(now) {
            if let Some(next) = self.navigator.upcoming() {
                self.commands.push(PlayerCommand::AutoAdvanceScheduled {
                    next_lesson_id: next.id.clone(),
                    delay: self.config.timings.auto_advance(),
                });
            }
        }
    }

    /// Answer the question on screen; returns whether it was correct
    pub fn submit_answer(&mut self, now: Instant, choice: &str) -> Option<bool> {
        self.session.as_mut()?.gate.submit_answer(now, choice)
    }

    /// Open a question from the question list
    pub fn select_question(&mut self, id: u32) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.select_question(id) {
            return false;
        }
        let question = session.gate.active_question().cloned();
        let playback = session.tracker.drain_commands();
        self.commands.extend(question.map(PlayerCommand::ShowQuestion));
        self.commands.extend(playback.into_iter().map(PlayerCommand::Playback));
        true
    }

    /// Stop a pending auto-advance; returns whether one was pending
    pub fn cancel_auto_advance(&mut self) -> bool {
        self.navigator.cancel_auto_advance()
    }

    /// Fire every timer that is due
    pub async fn tick(&mut self, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            let snapshot = session.poll_progress(now);
            let released = session.poll_gate(now);
            let playback = session.tracker.drain_commands();

            if let Some(snapshot) = snapshot {
                self.persist(&snapshot);
            }
            if released {
                self.commands.push(PlayerCommand::HideQuestion);
            }
            self.commands.extend(playback.into_iter().map(PlayerCommand::Playback));
        }

        if let Some(lesson) = self.navigator.poll(now).cloned() {
            tracing::info!("Auto-advancing to lesson {}", lesson.id);
            self.begin(lesson).await;
        }
    }

    /// Earliest moment at which [`CoursePlayer::tick`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let session = self.session.as_ref().and_then(LessonSession::next_deadline);
        [session, self.navigator.next_deadline()].into_iter().flatten().min()
    }

    /// Commands queued since the last drain
    pub fn drain_commands(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Flush pending progress before shutting down
    pub fn shutdown(&mut self) {
        self.navigator.cancel_auto_advance();
        self.close();
    }

    pub fn session(&self) -> Option<&LessonSession> {
        self.session.as_ref()
    }

    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.session.as_ref().map(|s| &s.lesson)
    }

    pub fn navigator(&self) -> &LessonNavigator {
        &self.navigator
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
