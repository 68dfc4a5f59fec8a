//! A stand-in video element for the terminal front end

use std::time::Instant;

/// Fallback duration for lessons whose catalog entry has none
pub const DEFAULT_DURATION_SECS: f64 = 600.0;

/// Media clock that advances with wall time while playing
#[derive(Debug)]
pub struct SimulatedVideo {
    duration: f64,
    position: f64,
    rate: f64,
    playing: bool,
    last_tick: Option<Instant>,
}

impl SimulatedVideo {
    pub fn new(rate: f64) -> Self {
        Self { duration: DEFAULT_DURATION_SECS, position: 0.0, rate, playing: false, last_tick: None }
    }

    /// Load new media, stopped at the start
    pub fn load(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(DEFAULT_DURATION_SECS);
        self.position = 0.0;
        self.playing = false;
        self.last_tick = None;
    }

    pub fn play(&mut self, now: Instant) {
        if !self.playing {
            self.playing = true;
            self.last_tick = Some(now);
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick = None;
    }

    pub fn seek(&mut self, position: f64) {
        self.position = position.clamp(0.0, self.duration);
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Move the playhead by the wall time elapsed since the last call.
    ///
    /// Returns the new position while playing.
    pub fn advance(&mut self, now: Instant) -> Option<f64> {
        if !self.playing {
            return None;
        }
        let last = self.last_tick.replace(now)?;
        let elapsed = now.saturating_duration_since(last).as_secs_f64();
        self.position = (self.position + elapsed * self.rate).min(self.duration);
        Some(self.position)
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.duration
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
