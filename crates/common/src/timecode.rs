//! Timecode parsing and frame arithmetic.
//!
//! Resolve reports the playhead as an `HH:MM:SS:FF` string (with `;` before
//! the frame field for drop-frame timelines). Placing media needs an absolute
//! frame number, so this module converts between the two.

use std::fmt;
use std::str::FromStr;

/// A parsed non-drop `HH:MM:SS:FF` timecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

/// Why a timecode string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("expected 4 timecode fields, found {0}")]
    FieldCount(usize),

    #[error("invalid timecode field '{0}'")]
    InvalidField(String),
}

impl Timecode {
    pub fn new(hours: u32, minutes: u32, seconds: u32, frames: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
        }
    }

    /// Whole seconds represented by the `HH:MM:SS` part.
    pub fn total_seconds(&self) -> u64 {
        self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }

    /// Absolute frame number at `fps`, truncated toward zero.
    pub fn to_frame(&self, fps: f64) -> i64 {
        (self.total_seconds() as f64 * fps + self.frames as f64) as i64
    }
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split([':', ';']).collect();
        if fields.len() != 4 {
            return Err(TimecodeError::FieldCount(fields.len()));
        }

        let mut values = [0u32; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field
                .parse()
                .map_err(|_| TimecodeError::InvalidField(field.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Interpret a timeline frame-rate setting, treating unreadable or zero
/// values as `default`.
pub fn frame_rate_or(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(default)
}
