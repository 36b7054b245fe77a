//! Playback clock
//!
//! Maps host time onto clip time. With playback enabled the clip loops at
//! `speed`; otherwise `position` scrubs through it manually.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    /// Advance with host time (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time multiplier while enabled (default: 1.0)
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Manual scrub position in `0.0..=1.0` while disabled (default: 0.0)
    #[serde(default)]
    pub position: f64,
}

fn default_true() -> bool {
    true
}
fn default_speed() -> f64 {
    1.0
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            speed: default_speed(),
            position: 0.0,
        }
    }
}

impl Playback {
    /// Clip time in seconds for `elapsed` host seconds.
    ///
    /// A zero-length clip always yields 0.
    pub fn seconds(&self, elapsed: f64, clip_seconds: f64) -> f64 {
        if clip_seconds <= 0.0 {
            return 0.0;
        }
        if self.enabled {
            (elapsed * self.speed).rem_euclid(clip_seconds)
        } else {
            clip_seconds * self.position.clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_loops() {
        let playback = Playback::default();
        assert_eq!(playback.seconds(0.5, 2.0), 0.5);
        assert_eq!(playback.seconds(2.5, 2.0), 0.5);

        let fast = Playback {
            speed: 2.0,
            ..Default::default()
        };
        assert_eq!(fast.seconds(1.5, 2.0), 1.0);

        let reverse = Playback {
            speed: -1.0,
            ..Default::default()
        };
        assert_eq!(reverse.seconds(0.5, 2.0), 1.5);
    }

    #[test]
    fn test_disabled_scrubs() {
        let scrub = Playback {
            enabled: false,
            speed: 1.0,
            position: 0.25,
        };
        assert_eq!(scrub.seconds(100.0, 4.0), 1.0);

        let past_end = Playback {
            position: 3.0,
            ..scrub
        };
        assert_eq!(past_end.seconds(0.0, 4.0), 4.0);
    }

    #[test]
    fn test_zero_length_clip() {
        assert_eq!(Playback::default().seconds(12.0, 0.0), 0.0);
    }
}
