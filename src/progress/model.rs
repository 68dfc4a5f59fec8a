//! Per-lesson watch state

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Current time as unix milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as i64)
}

/// Watch state of one lesson for one user/device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    /// Device or network derived user identifier
    pub user_key: String,
    /// Lesson identifier
    pub lesson_id: String,
    /// Percent watched (0-100)
    pub progress_percent: f64,
    /// Playback position in seconds at the last update
    pub last_position: f64,
    /// Seconds actually spent watching
    pub watch_time: f64,
    /// Whether the completion threshold was reached at the last update
    pub completed: bool,
    /// Unix milliseconds of the last update
    pub updated_at: i64,
}

impl LessonProgress {
    /// Whether this record was written after `other`
    pub fn is_newer_than(&self, other: &LessonProgress) -> bool {
        self.updated_at > other.updated_at
    }
}

/// Coerce a percent into `[0, 100]`, mapping NaN to 0
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) }
}

/// Coerce a seconds value into a finite non-negative number
pub fn sanitize_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 { seconds } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_percent_bounds() {
        assert_eq!(clamp_percent(-5.0), 0.0);
        assert_eq!(clamp_percent(140.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(f64::INFINITY), 100.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }

    #[test]
    fn sanitize_seconds_rejects_garbage() {
        assert_eq!(sanitize_seconds(-1.0), 0.0);
        assert_eq!(sanitize_seconds(f64::NAN), 0.0);
        assert_eq!(sanitize_seconds(f64::INFINITY), 0.0);
        assert_eq!(sanitize_seconds(12.5), 12.5);
    }

    #[test]
    fn progress_deserializes_from_store_row() {
        let json = r#"{
            "user_key": "ip_10.0.0.1",
            "lesson_id": "3",
            "progress_percent": 45.5,
            "last_position": 273.0,
            "watch_time": 280.0,
            "completed": false,
            "updated_at": 1700000000000
        }"#;
        let progress: LessonProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.lesson_id, "3");
        assert!(!progress.completed);
    }
}
