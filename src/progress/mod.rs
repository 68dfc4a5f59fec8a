//! Lesson progress tracking
//!
//! [`ProgressStore`] owns every [`LessonProgress`] record: it clamps and
//! validates writes, keeps an offline-first local copy and mirrors writes to
//! the remote record store.

pub mod model;
pub mod store;

pub use model::{LessonProgress, now_millis};
pub use store::{PROGRESS_TABLE, ProgressStore};
