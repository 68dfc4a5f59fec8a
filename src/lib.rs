//! Aula - lesson progress tracking and video-gated quizzes for video courses
//!
//! Aula tracks how far a viewer has watched each lesson, resumes where they
//! left off, unlocks quiz questions late in a lesson and moves on to the next
//! lesson when one finishes. Progress is kept locally and mirrored to a remote
//! record store when one is configured.

pub mod app;
pub mod chat;
pub mod config;
pub mod course;
pub mod identity;
pub mod playback;
pub mod player;
pub mod progress;
pub mod quiz;
pub mod storage;

pub use app::App;
pub use config::Config;
pub use player::CoursePlayer;
