//! Video playback tracking
//!
//! The [`PlaybackTracker`] watches one lesson's video at a time, works out how
//! far the viewer got and hands back debounced [`ProgressSnapshot`]s for the
//! progress store.

pub mod timer;
pub mod tracker;

pub use timer::Timer;
pub use tracker::{
    PlaybackCommand, PlaybackControl, PlaybackState, PlaybackTracker, ProgressSnapshot,
    SnapshotReason,
};
