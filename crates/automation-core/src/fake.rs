//! In-memory fake of the automation API.
//!
//! The fake keeps the whole application state in one shared cell. Handles
//! returned through the traits read and write that cell, so tests can
//! configure a scenario, run an operation, and then inspect what the
//! operation did (applied render settings, imported paths, item placements).

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::settings::{self, RenderSettings};
use crate::{
    Clip, Folder, ImportResult, MediaPool, Project, ProjectManager, PropertyValue, ResolveApi,
    Timeline, TimelineItem, TrackKind,
};

/// Shared handle to the fake application.
#[derive(Clone, Default)]
pub struct FakeResolve {
    state: Rc<RefCell<FakeState>>,
}

#[derive(Debug)]
pub struct FakeState {
    pub has_project_manager: bool,
    pub project_manager_error: Option<ApiError>,
    pub project: Option<FakeProject>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            has_project_manager: true,
            project_manager_error: None,
            project: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeProject {
    /// `None` makes `GetName` fail.
    pub name: Option<String>,
    pub project_path: Option<String>,
    pub render_settings: Value,
    /// Last settings pushed through `SetRenderSettings`.
    pub applied_settings: Option<RenderSettings>,
    pub render_jobs: u32,
    pub render_started: bool,
    pub start_error: Option<ApiError>,
    /// How many status polls report "still rendering".
    pub rendering_polls: u32,
    /// Status polls observed so far.
    pub status_polls: u32,
    /// File written into the render target when rendering starts.
    pub render_output: Option<FakeRenderOutput>,
    pub timeline: Option<FakeTimeline>,
    pub media_pool: Option<FakeMediaPool>,
}

impl FakeProject {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            project_path: None,
            render_settings: Value::Object(Default::default()),
            applied_settings: None,
            render_jobs: 0,
            render_started: false,
            start_error: None,
            rendering_polls: 0,
            status_polls: 0,
            render_output: None,
            timeline: None,
            media_pool: Some(FakeMediaPool::default()),
        }
    }
}

/// Describes the file the fake "renders".
#[derive(Debug, Clone)]
pub struct FakeRenderOutput {
    /// Appended to `CustomName` before the extension.
    pub suffix: String,
    pub size: u64,
}

impl FakeRenderOutput {
    pub fn exact(size: u64) -> Self {
        Self {
            suffix: String::new(),
            size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeTimeline {
    pub name: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub mark_in: i64,
    pub mark_out: i64,
    pub marks_error: bool,
    /// `None` makes `GetCurrentTimecode` fail.
    pub timecode: Option<String>,
    pub settings: HashMap<String, String>,
    /// Item names per video track.
    pub video_tracks: Vec<Vec<String>>,
    pub append_error: Option<ApiError>,
    pub accept_frame_start: bool,
    pub accept_timecode_start: bool,
    /// Successful `SetItemProperty("Start", ..)` calls.
    pub placements: Vec<(String, PropertyValue)>,
}

impl FakeTimeline {
    pub fn new(name: &str, start_frame: i64, end_frame: i64) -> Self {
        Self {
            name: name.to_string(),
            start_frame,
            end_frame,
            mark_in: -1,
            mark_out: -1,
            marks_error: false,
            timecode: Some("01:00:00:00".to_string()),
            settings: HashMap::new(),
            video_tracks: vec![Vec::new()],
            append_error: None,
            accept_frame_start: true,
            accept_timecode_start: true,
            placements: Vec::new(),
        }
    }

    pub fn with_setting(mut self, key: &str, value: &str) -> Self {
        self.settings.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FakeImportMode {
    #[default]
    ReturnClips,
    Acknowledge,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct FakeMediaPool {
    pub root: FakeFolder,
    pub import_mode: FakeImportMode,
    pub imported: Vec<PathBuf>,
    pub allow_new_folders: bool,
    /// `false` makes `GetRootFolder` return nothing.
    pub has_root: bool,
    /// Child indices from the root to the selected folder.
    pub current_folder: Vec<usize>,
    /// Number of `SetCurrentFolder` calls.
    pub folder_switches: usize,
}

impl Default for FakeMediaPool {
    fn default() -> Self {
        Self {
            root: FakeFolder::named("Master"),
            import_mode: FakeImportMode::ReturnClips,
            imported: Vec::new(),
            allow_new_folders: true,
            has_root: true,
            current_folder: Vec::new(),
            folder_switches: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeFolder {
    pub name: String,
    pub clips: Vec<FakeClip>,
    pub sub_folders: Vec<FakeFolder>,
}

impl FakeFolder {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeClip {
    pub name: String,
    pub media_id: String,
}

impl FakeClip {
    pub fn for_path(path: &Path) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            media_id: path.display().to_string(),
        }
    }
}

impl FakeResolve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(project: FakeProject) -> Self {
        let fake = Self::new();
        fake.state_mut().project = Some(project);
        fake
    }

    pub fn state_mut(&self) -> RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    /// Current project; panics when the scenario has none.
    pub fn project(&self) -> Ref<'_, FakeProject> {
        Ref::map(self.state.borrow(), |s| {
            s.project.as_ref().expect("fake has no project")
        })
    }

    pub fn project_mut(&self) -> RefMut<'_, FakeProject> {
        RefMut::map(self.state.borrow_mut(), |s| {
            s.project.as_mut().expect("fake has no project")
        })
    }

    pub fn timeline(&self) -> Ref<'_, FakeTimeline> {
        Ref::map(self.project(), |p| {
            p.timeline.as_ref().expect("fake has no timeline")
        })
    }

    pub fn timeline_mut(&self) -> RefMut<'_, FakeTimeline> {
        RefMut::map(self.project_mut(), |p| {
            p.timeline.as_mut().expect("fake has no timeline")
        })
    }

    pub fn media_pool(&self) -> Ref<'_, FakeMediaPool> {
        Ref::map(self.project(), |p| {
            p.media_pool.as_ref().expect("fake has no media pool")
        })
    }

    pub fn media_pool_mut(&self) -> RefMut<'_, FakeMediaPool> {
        RefMut::map(self.project_mut(), |p| {
            p.media_pool.as_mut().expect("fake has no media pool")
        })
    }
}

type Shared = Rc<RefCell<FakeState>>;

fn with_project<R>(
    state: &Shared,
    method: &str,
    f: impl FnOnce(&mut FakeProject) -> ApiResult<R>,
) -> ApiResult<R> {
    let mut state = state.borrow_mut();
    let project = state
        .project
        .as_mut()
        .ok_or_else(|| ApiError::call(method, "project was closed"))?;
    f(project)
}

fn with_timeline<R>(
    state: &Shared,
    method: &str,
    f: impl FnOnce(&mut FakeTimeline) -> ApiResult<R>,
) -> ApiResult<R> {
    with_project(state, method, |p| {
        let timeline = p
            .timeline
            .as_mut()
            .ok_or_else(|| ApiError::call(method, "timeline was closed"))?;
        f(timeline)
    })
}

fn with_pool<R>(
    state: &Shared,
    method: &str,
    f: impl FnOnce(&mut FakeMediaPool) -> ApiResult<R>,
) -> ApiResult<R> {
    with_project(state, method, |p| {
        let pool = p
            .media_pool
            .as_mut()
            .ok_or_else(|| ApiError::call(method, "media pool was closed"))?;
        f(pool)
    })
}

fn folder_at<'a>(root: &'a mut FakeFolder, path: &[usize]) -> Option<&'a mut FakeFolder> {
    let mut folder = root;
    for &idx in path {
        folder = folder.sub_folders.get_mut(idx)?;
    }
    Some(folder)
}

impl ResolveApi for FakeResolve {
    fn project_manager(&self) -> ApiResult<Option<Box<dyn ProjectManager>>> {
        let state = self.state.borrow();
        if let Some(err) = &state.project_manager_error {
            return Err(err.clone());
        }
        if !state.has_project_manager {
            return Ok(None);
        }
        Ok(Some(Box::new(ManagerHandle {
            state: self.state.clone(),
        })))
    }
}

struct ManagerHandle {
    state: Shared,
}

impl ProjectManager for ManagerHandle {
    fn current_project(&self) -> ApiResult<Option<Box<dyn Project>>> {
        if self.state.borrow().project.is_none() {
            return Ok(None);
        }
        Ok(Some(Box::new(ProjectHandle {
            state: self.state.clone(),
        })))
    }
}

struct ProjectHandle {
    state: Shared,
}

impl Project for ProjectHandle {
    fn name(&self) -> ApiResult<String> {
        with_project(&self.state, "GetName", |p| {
            p.name
                .clone()
                .ok_or_else(|| ApiError::call("GetName", "name unavailable"))
        })
    }

    fn current_timeline(&self) -> ApiResult<Option<Box<dyn Timeline>>> {
        let present = with_project(&self.state, "GetCurrentTimeline", |p| {
            Ok(p.timeline.is_some())
        })?;
        Ok(present.then(|| {
            Box::new(TimelineHandle {
                state: self.state.clone(),
            }) as Box<dyn Timeline>
        }))
    }

    fn media_pool(&self) -> ApiResult<Option<Box<dyn MediaPool>>> {
        let present = with_project(&self.state, "GetMediaPool", |p| Ok(p.media_pool.is_some()))?;
        Ok(present.then(|| {
            Box::new(MediaPoolHandle {
                state: self.state.clone(),
            }) as Box<dyn MediaPool>
        }))
    }

    fn render_settings(&self) -> ApiResult<Value> {
        with_project(&self.state, "GetRenderSettings", |p| {
            Ok(p.render_settings.clone())
        })
    }

    fn set_render_settings(&self, settings: &RenderSettings) -> ApiResult<bool> {
        with_project(&self.state, "SetRenderSettings", |p| {
            p.applied_settings = Some(settings.clone());
            Ok(true)
        })
    }

    fn add_render_job(&self) -> ApiResult<Option<String>> {
        with_project(&self.state, "AddRenderJob", |p| {
            p.render_jobs += 1;
            Ok(Some(format!("job-{}", p.render_jobs)))
        })
    }

    fn start_rendering(&self) -> ApiResult<bool> {
        with_project(&self.state, "StartRendering", |p| {
            if let Some(err) = &p.start_error {
                return Err(err.clone());
            }
            p.render_started = true;
            if let (Some(output), Some(applied)) = (&p.render_output, &p.applied_settings) {
                write_render_output(output, applied)
                    .map_err(|e| ApiError::call("StartRendering", e.to_string()))?;
            }
            Ok(true)
        })
    }

    fn is_rendering(&self) -> ApiResult<bool> {
        with_project(&self.state, "IsRenderingInProgress", |p| {
            p.status_polls += 1;
            if p.rendering_polls > 0 {
                p.rendering_polls -= 1;
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }

    fn project_path(&self) -> ApiResult<Option<String>> {
        with_project(&self.state, "GetProjectPath", |p| Ok(p.project_path.clone()))
    }
}

fn write_render_output(output: &FakeRenderOutput, applied: &RenderSettings) -> std::io::Result<()> {
    let (Some(dir), Some(name)) = (
        applied.get_str(settings::TARGET_DIR),
        applied.get_str(settings::CUSTOM_NAME),
    ) else {
        return Ok(());
    };
    let audio_only = applied.get(settings::EXPORT_VIDEO) == Some(&Value::Bool(false));
    let ext = if audio_only {
        applied.get_str(settings::AUDIO_FORMAT)
    } else {
        applied.get_str(settings::FORMAT)
    }
    .unwrap_or("mov");
    let path = Path::new(dir).join(format!("{name}{}.{ext}", output.suffix));
    let file = std::fs::File::create(path)?;
    file.set_len(output.size)
}

struct TimelineHandle {
    state: Shared,
}

impl Timeline for TimelineHandle {
    fn name(&self) -> ApiResult<String> {
        with_timeline(&self.state, "GetName", |t| Ok(t.name.clone()))
    }

    fn start_frame(&self) -> ApiResult<i64> {
        with_timeline(&self.state, "GetStartFrame", |t| Ok(t.start_frame))
    }

    fn end_frame(&self) -> ApiResult<i64> {
        with_timeline(&self.state, "GetEndFrame", |t| Ok(t.end_frame))
    }

    fn mark_in(&self) -> ApiResult<i64> {
        with_timeline(&self.state, "GetMarkIn", |t| {
            if t.marks_error {
                return Err(ApiError::missing_method("GetMarkIn"));
            }
            Ok(t.mark_in)
        })
    }

    fn mark_out(&self) -> ApiResult<i64> {
        with_timeline(&self.state, "GetMarkOut", |t| {
            if t.marks_error {
                return Err(ApiError::missing_method("GetMarkOut"));
            }
            Ok(t.mark_out)
        })
    }

    fn current_timecode(&self) -> ApiResult<String> {
        with_timeline(&self.state, "GetCurrentTimecode", |t| {
            t.timecode
                .clone()
                .ok_or_else(|| ApiError::call("GetCurrentTimecode", "playhead unavailable"))
        })
    }

    fn setting(&self, key: &str) -> ApiResult<Option<String>> {
        with_timeline(&self.state, "GetSetting", |t| {
            Ok(t.settings.get(key).filter(|v| !v.is_empty()).cloned())
        })
    }

    fn append_clips(&self, clips: &[&dyn Clip]) -> ApiResult<bool> {
        with_timeline(&self.state, "AppendToTimeline", |t| {
            if let Some(err) = &t.append_error {
                return Err(err.clone());
            }
            if t.video_tracks.is_empty() {
                t.video_tracks.push(Vec::new());
            }
            for clip in clips {
                let clip = clip
                    .as_any()
                    .downcast_ref::<FakeClip>()
                    .ok_or_else(|| ApiError::unexpected("AppendToTimeline", "foreign clip"))?;
                t.video_tracks[0].push(clip.name.clone());
            }
            Ok(true)
        })
    }

    fn track_count(&self, kind: TrackKind) -> ApiResult<u32> {
        with_timeline(&self.state, "GetTrackCount", |t| {
            Ok(match kind {
                TrackKind::Video => t.video_tracks.len() as u32,
                _ => 0,
            })
        })
    }

    fn items_in_track(
        &self,
        kind: TrackKind,
        index: u32,
    ) -> ApiResult<Vec<Box<dyn TimelineItem>>> {
        with_timeline(&self.state, "GetItemListInTrack", |t| {
            if kind != TrackKind::Video || index == 0 {
                return Ok(Vec::new());
            }
            let items = t
                .video_tracks
                .get(index as usize - 1)
                .map(|names| {
                    names
                        .iter()
                        .map(|name| {
                            Box::new(FakeItem { name: name.clone() }) as Box<dyn TimelineItem>
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(items)
        })
    }

    fn set_item_property(
        &self,
        item: &dyn TimelineItem,
        key: &str,
        value: &PropertyValue,
    ) -> ApiResult<bool> {
        let item = item
            .as_any()
            .downcast_ref::<FakeItem>()
            .ok_or_else(|| ApiError::unexpected("SetItemProperty", "foreign item"))?;
        with_timeline(&self.state, "SetItemProperty", |t| {
            let accepted = match value {
                PropertyValue::Int(_) => t.accept_frame_start,
                PropertyValue::Text(_) => t.accept_timecode_start,
            };
            if !accepted || key != "Start" {
                return Err(ApiError::call(
                    "SetItemProperty",
                    format!("cannot set {key} to {value:?}"),
                ));
            }
            t.placements.push((item.name.clone(), value.clone()));
            Ok(true)
        })
    }
}

struct FakeItem {
    name: String,
}

impl TimelineItem for FakeItem {
    fn name(&self) -> ApiResult<String> {
        Ok(self.name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Clip for FakeClip {
    fn name(&self) -> ApiResult<String> {
        Ok(self.name.clone())
    }

    fn media_id(&self) -> ApiResult<String> {
        Ok(self.media_id.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MediaPoolHandle {
    state: Shared,
}

impl MediaPool for MediaPoolHandle {
    fn root_folder(&self) -> ApiResult<Option<Box<dyn Folder>>> {
        let has_root = with_pool(&self.state, "GetRootFolder", |pool| Ok(pool.has_root))?;
        Ok(has_root.then(|| {
            Box::new(FolderHandle {
                state: self.state.clone(),
                path: Vec::new(),
            }) as Box<dyn Folder>
        }))
    }

    fn add_sub_folder(
        &self,
        parent: &dyn Folder,
        name: &str,
    ) -> ApiResult<Option<Box<dyn Folder>>> {
        let parent = downcast_folder(parent, "AddSubFolder")?;
        let created = with_pool(&self.state, "AddSubFolder", |pool| {
            if !pool.allow_new_folders {
                return Ok(None);
            }
            let folder = folder_at(&mut pool.root, &parent.path)
                .ok_or_else(|| ApiError::call("AddSubFolder", "parent folder is gone"))?;
            folder.sub_folders.push(FakeFolder::named(name));
            Ok(Some(folder.sub_folders.len() - 1))
        })?;
        Ok(created.map(|idx| {
            let mut path = parent.path.clone();
            path.push(idx);
            Box::new(FolderHandle {
                state: self.state.clone(),
                path,
            }) as Box<dyn Folder>
        }))
    }

    fn current_folder(&self) -> ApiResult<Option<Box<dyn Folder>>> {
        let path = with_pool(&self.state, "GetCurrentFolder", |pool| {
            let path = pool.current_folder.clone();
            Ok(folder_at(&mut pool.root, &path).is_some().then_some(path))
        })?;
        Ok(path.map(|path| {
            Box::new(FolderHandle {
                state: self.state.clone(),
                path,
            }) as Box<dyn Folder>
        }))
    }

    fn set_current_folder(&self, folder: &dyn Folder) -> ApiResult<bool> {
        let folder = downcast_folder(folder, "SetCurrentFolder")?;
        with_pool(&self.state, "SetCurrentFolder", |pool| {
            pool.folder_switches += 1;
            if folder_at(&mut pool.root, &folder.path).is_none() {
                return Ok(false);
            }
            pool.current_folder = folder.path.clone();
            Ok(true)
        })
    }

    fn import_to_current(&self, paths: &[PathBuf]) -> ApiResult<ImportResult> {
        with_pool(&self.state, "ImportMedia", |pool| {
            pool.imported.extend(paths.iter().cloned());
            let mode = pool.import_mode;
            if mode == FakeImportMode::Nothing {
                return Ok(ImportResult::Nothing);
            }
            let current = pool.current_folder.clone();
            let folder = folder_at(&mut pool.root, &current)
                .ok_or_else(|| ApiError::call("ImportMedia", "current folder is gone"))?;
            let clips: Vec<FakeClip> = paths.iter().map(|p| FakeClip::for_path(p)).collect();
            folder.clips.extend(clips.iter().cloned());
            Ok(match mode {
                FakeImportMode::ReturnClips => ImportResult::Clips(
                    clips
                        .into_iter()
                        .map(|c| Box::new(c) as Box<dyn Clip>)
                        .collect(),
                ),
                _ => ImportResult::Acknowledged,
            })
        })
    }
}

fn downcast_folder<'a>(folder: &'a dyn Folder, method: &str) -> ApiResult<&'a FolderHandle> {
    folder
        .as_any()
        .downcast_ref::<FolderHandle>()
        .ok_or_else(|| ApiError::unexpected(method, "foreign folder"))
}

struct FolderHandle {
    state: Shared,
    path: Vec<usize>,
}

impl FolderHandle {
    fn with_folder<R>(&self, method: &str, f: impl FnOnce(&FakeFolder) -> R) -> ApiResult<R> {
        with_pool(&self.state, method, |pool| {
            folder_at(&mut pool.root, &self.path)
                .map(|folder| f(folder))
                .ok_or_else(|| ApiError::call(method, "folder is gone"))
        })
    }
}

impl Folder for FolderHandle {
    fn name(&self) -> ApiResult<String> {
        self.with_folder("GetName", |f| f.name.clone())
    }

    fn sub_folders(&self) -> ApiResult<Vec<Box<dyn Folder>>> {
        let count = self.with_folder("GetSubFolderList", |f| f.sub_folders.len())?;
        Ok((0..count)
            .map(|idx| {
                let mut path = self.path.clone();
                path.push(idx);
                Box::new(FolderHandle {
                    state: self.state.clone(),
                    path,
                }) as Box<dyn Folder>
            })
            .collect())
    }

    fn clips(&self) -> ApiResult<Vec<Box<dyn Clip>>> {
        self.with_folder("GetClipList", |f| {
            f.clips
                .iter()
                .cloned()
                .map(|c| Box::new(c) as Box<dyn Clip>)
                .collect()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
