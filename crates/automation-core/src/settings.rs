//! Render settings dictionary.
//!
//! `GetRenderSettings`/`SetRenderSettings` exchange a loosely typed mapping.
//! The bridge reads the current mapping, overlays its own keys, and pushes the
//! whole thing back, so unknown keys are carried through untouched.

use serde::Serialize;
use serde_json::{Map, Value};

pub const TARGET_DIR: &str = "TargetDir";
pub const CUSTOM_NAME: &str = "CustomName";
pub const MARK_IN: &str = "MarkIn";
pub const MARK_OUT: &str = "MarkOut";
pub const RESOLUTION_WIDTH: &str = "ResolutionWidth";
pub const RESOLUTION_HEIGHT: &str = "ResolutionHeight";
pub const FRAME_RATE: &str = "FrameRate";
pub const EXPORT_VIDEO: &str = "ExportVideo";
pub const EXPORT_AUDIO: &str = "ExportAudio";
pub const FORMAT: &str = "Format";
pub const CODEC: &str = "Codec";
pub const AUDIO_CODEC: &str = "AudioCodec";
pub const AUDIO_FORMAT: &str = "AudioFormat";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderSettings(Map<String, Value>);

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the application's answer; anything but a mapping becomes empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                if !other.is_null() {
                    tracing::debug!(value = %other, "Render settings were not a mapping; starting empty");
                }
                Self::default()
            }
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
