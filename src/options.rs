use std::time::Duration;

use serde::Deserialize;

/// Unrecognized keys are ignored and a missing key has no effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    /// Milliseconds of playback before the player forces a stop.
    pub timeout: Option<u64>,
    pub track: Option<i32>,
}

impl TrackOptions {
    pub fn with_track(track: i32) -> Self {
        TrackOptions {
            track: Some(track),
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

/// Receives the forced-stop timeout. Implemented by whatever schedules
/// playback; backends never own this state.
pub trait PlaybackScheduler {
    fn set_playback_timeout(&mut self, timeout: Duration);
}

pub struct NoTimeout;

impl PlaybackScheduler for NoTimeout {
    fn set_playback_timeout(&mut self, _timeout: Duration) {}
}
