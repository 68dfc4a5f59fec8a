//! Interactive terminal front end
//!
//! Plays lessons against a [`SimulatedVideo`], reads commands from stdin and
//! carries out the [`PlayerCommand`]s emitted by the [`CoursePlayer`].

pub mod command;
pub mod video;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::chat::ChatClient;
use crate::config::Config;
use crate::course::{Catalog, LessonNavigator};
use crate::identity::{DeviceProbe, HttpDeviceProbe, resolve_user_key};
use crate::player::{CoursePlayer, PlayerCommand, PlayerEvent};
use crate::playback::PlaybackCommand;
use crate::progress::ProgressStore;
use crate::quiz::{AnswerLedger, ChoiceKey, QuestionRecord};
use crate::storage::{FileKvStore, KeyValueStore, RestRecordStore};
use command::{Command, HELP, ParseResult, parse_command};
pub use video::SimulatedVideo;

/// How often the media clock advances
const TICK: Duration = Duration::from_millis(250);

/// Stores and identity shared by every command
pub struct Services {
    pub config: Config,
    pub local: Arc<dyn KeyValueStore>,
    pub store: Arc<ProgressStore>,
    pub user_key: String,
}

impl Services {
    /// Open local state, connect the remote store when configured and resolve the user key
    pub async fn connect(config: Config) -> Result<Self> {
        let local: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::open(Config::state_path()?));
        Self::with_local(config, local).await
    }

    pub async fn with_local(config: Config, local: Arc<dyn KeyValueStore>) -> Result<Self> {
        let probe = config.device_probe_url.clone().map(HttpDeviceProbe::new);
        let user_key =
            resolve_user_key(probe.as_ref().map(|p| p as &dyn DeviceProbe), local.as_ref()).await;

        let mut store = ProgressStore::new(config.thresholds, local.clone());
        if let Some(remote) = &config.remote {
            store = store.with_remote(Arc::new(RestRecordStore::new(remote)?));
        }

        tracing::debug!("Resolved user key {}", user_key);
        Ok(Self { config, local, store: Arc::new(store), user_key })
    }

    /// A player over `catalog` for the resolved user
    pub fn player(&self, catalog: Catalog) -> CoursePlayer {
        CoursePlayer::new(
            self.config.clone(),
            catalog,
            self.user_key.clone(),
            self.store.clone(),
            AnswerLedger::new(self.local.clone()),
        )
    }

    pub fn chat(&self) -> ChatClient {
        ChatClient::new(self.config.chat_url.clone())
    }
}

/// The watch session driver
pub struct App {
    player: CoursePlayer,
    chat: ChatClient,
    video: SimulatedVideo,
    cancel: CancellationToken,
}

impl App {
    pub fn new(player: CoursePlayer, chat: ChatClient, speed: f64) -> Self {
        Self { player, chat, video: SimulatedVideo::new(speed), cancel: CancellationToken::new() }
    }

    /// Token that stops [`App::run`] when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Open the first lesson
    pub async fn start(&mut self, now: Instant, lesson_id: &str) -> Result<()> {
        if !self.player.open(lesson_id).await {
            bail!("Lesson '{}' is not in the catalog", lesson_id);
        }
        self.apply_commands(now);
        Ok(())
    }

    /// Run the watch loop until quit, end of input or cancellation
    pub async fn run(&mut self, lesson_id: &str) -> Result<()> {
        self.start(Instant::now(), lesson_id).await?;
        println!("Type 'help' for commands.");

        let cancel = self.cancel.clone();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut ticker = tokio::time::interval(TICK);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match self.handle_line(Instant::now(), &line).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => tracing::error!("Error handling command: {}", e),
                    }
                }
                _ = ticker.tick() => self.advance(Instant::now()).await,
            }
        }

        self.player.shutdown();
        Ok(())
    }

    /// Move the media clock and fire due timers
    pub async fn advance(&mut self, now: Instant) {
        if let Some(position) = self.video.advance(now) {
            self.player.handle(now, PlayerEvent::TimeUpdate { position });
            if self.video.at_end() {
                self.video.pause();
                self.player.handle(now, PlayerEvent::Ended);
            }
        }
        self.apply_commands(now);

        self.player.tick(now).await;
        self.apply_commands(now);
    }

    /// Carry out queued player commands, including any they cause in turn
    fn apply_commands(&mut self, now: Instant) {
        loop {
            let commands = self.player.drain_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                self.apply(now, command);
            }
        }
    }

    fn apply(&mut self, now: Instant, command: PlayerCommand) {
        match command {
            PlayerCommand::LessonOpened(lesson) => {
                println!("\n▶ {} ({})", lesson.title, lesson.id);
                self.video.load(lesson.duration_seconds);
                self.player.handle(now, PlayerEvent::LoadedMetadata { duration: self.video.duration() });
                self.player.handle(now, PlayerEvent::RateChange { rate: self.video.rate() });
                self.video.play(now);
                self.player.handle(now, PlayerEvent::Play);
            }
            PlayerCommand::Playback(PlaybackCommand::Seek(position)) => {
                self.video.seek(position);
                println!("Resuming at {}", format_time(position));
            }
            PlayerCommand::Playback(PlaybackCommand::Pause) => {
                if self.video.is_playing() {
                    self.video.pause();
                    self.player.handle(now, PlayerEvent::Pause);
                }
            }
            PlayerCommand::Playback(PlaybackCommand::Play) => {
                if !self.video.is_playing() && !self.video.at_end() {
                    self.video.play(now);
                    self.player.handle(now, PlayerEvent::Play);
                }
            }
            PlayerCommand::ShowQuestion(question) => print_question(&question),
            PlayerCommand::HideQuestion => println!("Continuing..."),
            PlayerCommand::LessonCompleted { lesson_id } => println!("✓ Lesson {} completed", lesson_id),
            PlayerCommand::AutoAdvanceScheduled { next_lesson_id, delay } => {
                println!("Next lesson ({}) in {}s. Type 'stay' to cancel.", next_lesson_id, delay.as_secs())
            }
        }
    }

    /// Handle one line of input; returns true if the user quit
    pub async fn handle_line(&mut self, now: Instant, line: &str) -> Result<bool> {
        let command = match parse_command(line) {
            ParseResult::Ok(command) => command,
            ParseResult::UnknownCommand(cmd) => {
                println!("Unknown command: {} (type 'help')", cmd);
                return Ok(false);
            }
            ParseResult::MissingArgument(cmd) => {
                println!("'{}' needs an argument", cmd);
                return Ok(false);
            }
            ParseResult::InvalidArgument(arg) => {
                println!("Invalid argument: {}", arg);
                return Ok(false);
            }
        };

        // Catch the media clock up before acting on the command
        self.advance(now).await;

        match command {
            Command::Quit => return Ok(true),
            Command::Nop => {}
            Command::Help => println!("{}", HELP),
            Command::Answer(choice) => self.answer(now, &choice),
            Command::Next => {
                if !self.player.next().await {
                    println!("This is the last lesson of the module");
                }
            }
            Command::Previous => {
                if !self.player.previous().await {
                    println!("This is the first lesson of the module");
                }
            }
            Command::Open(id) => {
                if !self.player.open(&id).await {
                    println!("No lesson '{}'", id);
                }
            }
            Command::Pause => {
                self.video.pause();
                self.player.handle(now, PlayerEvent::UserPause);
            }
            Command::Play => {
                self.video.play(now);
                self.player.handle(now, PlayerEvent::Play);
            }
            Command::Speed(rate) => {
                self.video.set_rate(rate);
                self.player.handle(now, PlayerEvent::RateChange { rate });
            }
            Command::Seek(position) => {
                self.video.seek(position);
                self.player.handle(now, PlayerEvent::TimeUpdate { position: self.video.position() });
            }
            Command::Quiz(id) => {
                if !self.player.select_question(id) {
                    println!("Question {} is not available right now", id);
                }
            }
            Command::Questions => self.print_questions(),
            Command::Stay => {
                if self.player.cancel_auto_advance() {
                    println!("Auto-advance cancelled");
                }
            }
            Command::Ask(message) => {
                let context = self.player.session().map(|s| s.chat_context());
                let reply = self.chat.ask(&message, context.as_deref()).await;
                println!("\n{}\n", reply);
            }
            Command::Status => self.print_status(now),
            Command::List => self.print_lessons(),
        }

        self.apply_commands(now);
        Ok(false)
    }

    fn answer(&mut self, now: Instant, choice: &str) {
        match self.player.submit_answer(now, choice) {
            Some(correct) => {
                let feedback = self.player.session().and_then(|s| s.gate.last_feedback().cloned());
                if correct {
                    println!("Correct!");
                } else if let Some(right) = feedback.and_then(|f| f.correct_choice) {
                    println!("Not quite. The answer was ({}).", right);
                } else {
                    println!("Not quite.");
                }
            }
            None => println!("No question is waiting for an answer"),
        }
    }

    fn print_questions(&self) {
        let Some(session) = self.player.session() else {
            return;
        };
        if !session.gate.has_questions() {
            println!("This lesson has no questions");
            return;
        }
        println!(
            "Questions ({}/{} answered, {:?}):",
            session.gate.answered_count(),
            session.gate.total_count(),
            session.gate.state()
        );
        for (question, answered) in session.gate.question_list() {
            let mark = if answered { "✓" } else { " " };
            println!("  [{}] {:>4}  {}", mark, question.id, question.prompt);
        }
    }

    fn print_status(&self, now: Instant) {
        let Some(session) = self.player.session() else {
            return;
        };
        let tracker = &session.tracker;
        println!(
            "{}  {} / {}  {:.0}%  {:?} at {}x",
            session.lesson.title,
            format_time(tracker.position()),
            format_time(self.video.duration()),
            tracker.percent(),
            tracker.state(),
            tracker.rate()
        );
        if let Some(remaining) = self.player.navigator().countdown_remaining(now) {
            println!("Next lesson in {:.1}s", remaining.as_secs_f64());
        }

        let store = self.player.store();
        let user = self.player.user_key();
        if let Some(module) = self.player.navigator().current_module() {
            let rollup = LessonNavigator::module_rollup(module, store, user);
            println!("{}: {}/{} lessons ({:.0}%)", module.title, rollup.completed, rollup.total, rollup.percent());
        }
        let course = self.player.navigator().course_rollup(store, user);
        println!("Course: {}/{} lessons ({:.0}%)", course.completed, course.total, course.percent());
    }

    fn print_lessons(&self) {
        let current = self.player.current_lesson().map(|l| l.id.as_str());
        print_catalog(self.player.navigator(), self.player.store(), self.player.user_key(), current);
    }

    pub fn player(&self) -> &CoursePlayer {
        &self.player
    }

    pub fn video(&self) -> &SimulatedVideo {
        &self.video
    }
}

/// Print modules and lessons with the user's progress
pub fn print_catalog(
    navigator: &LessonNavigator,
    store: &ProgressStore,
    user_key: &str,
    current: Option<&str>,
) {
    for module in navigator.modules() {
        let rollup = LessonNavigator::module_rollup(module, store, user_key);
        println!("{} ({}/{})", module.title, rollup.completed, rollup.total);
        for lesson in &module.lessons {
            let marker = if current == Some(lesson.id.as_str()) { "▶" } else { " " };
            let done = if store.is_completed(user_key, &lesson.id) { "✓" } else { " " };
            println!(
                " {}{} {:>3}. {}  [{}]  {:.0}%",
                marker,
                done,
                lesson.ordinal,
                lesson.title,
                lesson.id,
                store.completion_rate(user_key, &lesson.id)
            );
        }
    }
}

fn print_question(question: &QuestionRecord) {
    println!("\n? {}", question.prompt);
    for choice in ChoiceKey::all() {
        let text = question.choice_text(*choice);
        if !text.is_empty() {
            println!("  ({}) {}", choice, text);
        }
    }
    println!("Answer with a, b, c or d.");
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::course::{Lesson, Module};
    use crate::quiz::GateState;
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let lesson = |id: &str, ordinal: &str| Lesson {
            id: id.to_string(),
            ordinal: ordinal.to_string(),
            title: format!("Aula {}", ordinal),
            video_url: None,
            duration_seconds: Some(100.0),
            description: None,
        };
        let mut choices = BTreeMap::new();
        choices.insert(ChoiceKey::A, "Sim".to_string());
        choices.insert(ChoiceKey::B, "Não".to_string());
        Catalog {
            modules: vec![Module {
                id: "m1".to_string(),
                title: "Módulo 1".to_string(),
                lessons: vec![lesson("l1", "1"), lesson("l2", "2")],
            }],
            questions: vec![QuestionRecord {
                id: 7,
                lesson_id: "1".to_string(),
                prompt: "Rust tem GC?".to_string(),
                correct_answer: "2".to_string(),
                choices,
            }],
        }
    }

    async fn app() -> App {
        let config = Config { device_probe_url: None, ..Config::default() };
        let services = Services::with_local(config, Arc::new(MemoryKvStore::new())).await.unwrap();
        assert!(services.user_key.starts_with("device_"));
        let player = services.player(catalog()).with_question_seed(1);
        App::new(player, services.chat(), 1.0)
    }

    #[tokio::test]
    async fn question_pauses_video_until_answered() {
        let start = Instant::now();
        let mut app = app().await;
        app.start(start, "l1").await.unwrap();
        assert!(app.video().is_playing());

        app.advance(start + Duration::from_secs(4)).await;
        app.handle_line(start + Duration::from_secs(4), "seek 80").await.unwrap();
        assert!(!app.video().is_playing());
        assert_eq!(app.player().session().unwrap().gate.state(), GateState::Triggered);

        let answered_at = start + Duration::from_secs(5);
        app.handle_line(answered_at, "b").await.unwrap();
        assert_eq!(app.player().session().unwrap().gate.state(), GateState::Answered);

        app.advance(answered_at + Duration::from_secs(2)).await;
        assert!(app.video().is_playing());
    }

    #[tokio::test]
    async fn pausing_during_question_survives_answer() {
        let start = Instant::now();
        let mut app = app().await;
        app.start(start, "l1").await.unwrap();

        app.handle_line(start, "seek 80").await.unwrap();
        assert_eq!(app.player().session().unwrap().gate.state(), GateState::Triggered);

        app.handle_line(start, "pause").await.unwrap();
        assert!(app.player().session().unwrap().tracker.is_paused_by_user());

        app.handle_line(start, "b").await.unwrap();
        app.advance(start + Duration::from_secs(2)).await;
        assert_eq!(app.player().session().unwrap().gate.state(), GateState::Unlocked);
        assert!(!app.video().is_playing());
    }

    #[tokio::test]
    async fn finishing_a_lesson_moves_on() {
        let start = Instant::now();
        let mut app = app().await;
        app.start(start, "l2").await.unwrap();
        app.handle_line(start, "prev").await.unwrap();
        assert_eq!(app.player().current_lesson().unwrap().id, "l1");

        app.handle_line(start, "seek 99").await.unwrap();
        app.handle_line(start, "a").await.unwrap();
        app.advance(start + Duration::from_secs(2)).await;
        app.advance(start + Duration::from_secs(4)).await;
        assert!(app.player().navigator().is_counting_down());

        app.advance(start + Duration::from_secs(7)).await;
        assert_eq!(app.player().current_lesson().unwrap().id, "l2");
        assert!(app.player().store().is_completed(app.player().user_key(), "l1"));
    }

    #[tokio::test]
    async fn unknown_lesson_fails_to_start() {
        let mut app = app().await;
        assert!(app.start(Instant::now(), "missing").await.is_err());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(125.7), "2:05");
    }
}
