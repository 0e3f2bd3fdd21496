//! Resolve automation API contracts.
//!
//! This crate describes the slice of the Resolve scripting object model the
//! bridge drives (project manager, project, timeline, media pool, bins,
//! clips and timeline items) without coupling to a concrete backend. The
//! Python-hosted implementation lives in `resolve-bridge-automation-resolve`;
//! tests use the in-memory fake behind the `test-mocks` feature.
//!
//! Every call is fallible: the host application can be closed, busy, or an
//! older release that lacks a method, and callers decide per call whether a
//! failure is fatal or has a fallback.

use std::any::Any;
use std::path::PathBuf;

pub mod error;
pub mod session;
pub mod settings;

#[cfg(any(test, feature = "test-mocks"))]
pub mod fake;

pub use error::{ApiError, ApiResult, SessionError};
pub use session::Session;
pub use settings::RenderSettings;

/// Entry object of the scripting API (`scriptapp("Resolve")`).
pub trait ResolveApi {
    /// `GetProjectManager()`; `None` when the application returns nothing.
    fn project_manager(&self) -> ApiResult<Option<Box<dyn ProjectManager>>>;
}

pub trait ProjectManager {
    /// `GetCurrentProject()`; `None` when no project is open.
    fn current_project(&self) -> ApiResult<Option<Box<dyn Project>>>;
}

pub trait Project {
    fn name(&self) -> ApiResult<String>;

    fn current_timeline(&self) -> ApiResult<Option<Box<dyn Timeline>>>;

    fn media_pool(&self) -> ApiResult<Option<Box<dyn MediaPool>>>;

    /// Raw render settings as reported by the application. Not guaranteed to
    /// be a mapping; see [`RenderSettings::from_value`].
    fn render_settings(&self) -> ApiResult<serde_json::Value>;

    fn set_render_settings(&self, settings: &RenderSettings) -> ApiResult<bool>;

    /// Queue a job from the current render settings, returning its id.
    fn add_render_job(&self) -> ApiResult<Option<String>>;

    fn start_rendering(&self) -> ApiResult<bool>;

    fn is_rendering(&self) -> ApiResult<bool>;

    /// On-disk project file, when the release exposes one.
    fn project_path(&self) -> ApiResult<Option<String>>;
}

/// Track families addressable on a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
        }
    }
}

/// Value written through `SetItemProperty`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Text(String),
}

pub trait Timeline {
    fn name(&self) -> ApiResult<String>;

    fn start_frame(&self) -> ApiResult<i64>;

    fn end_frame(&self) -> ApiResult<i64>;

    /// Mark-in frame, `-1` when unset.
    fn mark_in(&self) -> ApiResult<i64>;

    /// Mark-out frame, `-1` when unset.
    fn mark_out(&self) -> ApiResult<i64>;

    /// Playhead position as `HH:MM:SS:FF`.
    fn current_timecode(&self) -> ApiResult<String>;

    /// `GetSetting(key)`; `None` for an empty or missing value.
    fn setting(&self, key: &str) -> ApiResult<Option<String>>;

    /// Append clips to the end of the timeline.
    fn append_clips(&self, clips: &[&dyn Clip]) -> ApiResult<bool>;

    fn track_count(&self, kind: TrackKind) -> ApiResult<u32>;

    /// Items on a track; `index` is 1-based as in the application.
    fn items_in_track(&self, kind: TrackKind, index: u32)
        -> ApiResult<Vec<Box<dyn TimelineItem>>>;

    fn set_item_property(
        &self,
        item: &dyn TimelineItem,
        key: &str,
        value: &PropertyValue,
    ) -> ApiResult<bool>;
}

/// Outcome of a media import.
pub enum ImportResult {
    /// The application returned handles for the new clips.
    Clips(Vec<Box<dyn Clip>>),
    /// The call reported success but returned no usable clip handles.
    Acknowledged,
    /// The call returned nothing (failure, or the media is already present).
    Nothing,
}

impl ImportResult {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Clips(clips) => !clips.is_empty(),
            Self::Acknowledged => true,
            Self::Nothing => false,
        }
    }

    /// Take the first returned clip, if any.
    pub fn into_first_clip(self) -> Option<Box<dyn Clip>> {
        match self {
            Self::Clips(clips) => clips.into_iter().next(),
            _ => None,
        }
    }
}

pub trait MediaPool {
    fn root_folder(&self) -> ApiResult<Option<Box<dyn Folder>>>;

    fn add_sub_folder(&self, parent: &dyn Folder, name: &str)
        -> ApiResult<Option<Box<dyn Folder>>>;

    /// The folder selected in the Media Pool panel.
    fn current_folder(&self) -> ApiResult<Option<Box<dyn Folder>>>;

    fn set_current_folder(&self, folder: &dyn Folder) -> ApiResult<bool>;

    /// Import files into the current folder.
    fn import_to_current(&self, paths: &[PathBuf]) -> ApiResult<ImportResult>;

    /// Import files into `target`, then reselect the folder that was current.
    fn import_media(&self, paths: &[PathBuf], target: &dyn Folder) -> ApiResult<ImportResult> {
        let previous = self.current_folder().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Current folder unreadable; it will not be restored");
            None
        });
        if !self.set_current_folder(target)? {
            return Err(ApiError::call("SetCurrentFolder", "target folder was rejected"));
        }

        let result = self.import_to_current(paths);

        if let Some(previous) = previous {
            match self.set_current_folder(previous.as_ref()) {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Media pool refused to reselect the previous folder"),
                Err(e) => tracing::warn!(error = %e, "Could not reselect the previous folder"),
            }
        }
        result
    }
}

/// A media pool bin.
pub trait Folder {
    fn name(&self) -> ApiResult<String>;

    fn sub_folders(&self) -> ApiResult<Vec<Box<dyn Folder>>>;

    fn clips(&self) -> ApiResult<Vec<Box<dyn Clip>>>;

    /// Backend-specific handle, used when the folder is passed back to the API.
    fn as_any(&self) -> &dyn Any;
}

/// A media pool item.
pub trait Clip {
    fn name(&self) -> ApiResult<String>;

    fn media_id(&self) -> ApiResult<String>;

    fn as_any(&self) -> &dyn Any;
}

/// A clip instance placed on a timeline track.
pub trait TimelineItem {
    fn name(&self) -> ApiResult<String>;

    fn as_any(&self) -> &dyn Any;
}
