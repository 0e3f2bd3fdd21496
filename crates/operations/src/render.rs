//! Render queue plumbing shared by the export operations.
//!
//! An export pushes its settings, queues one job, starts the queue and then
//! blocks polling `is_rendering` at a fixed interval. A render still running
//! after the poll ceiling is reported as a timeout and left running. Once the
//! queue is idle the rendered file is located (Resolve may decorate the
//! custom name) and checked against the output size ceiling.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use resolve_bridge_automation_core::{ApiResult, Project, RenderSettings, Timeline};
use resolve_bridge_common::{BridgeError, BridgeResult, RenderDefaults};

/// Inclusive frame range handed to the render queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

/// Marked range when both marks are set, otherwise the whole timeline.
///
/// Failing to read the marks also selects the whole timeline; failing to read
/// the timeline bounds is an error.
pub fn resolve_range(timeline: &dyn Timeline) -> ApiResult<FrameRange> {
    match (timeline.mark_in(), timeline.mark_out()) {
        (Ok(start), Ok(end)) if start != -1 && end != -1 => return Ok(FrameRange { start, end }),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "Marks unreadable; using timeline bounds");
        }
        _ => tracing::debug!("Marks not set; using timeline bounds"),
    }
    Ok(FrameRange {
        start: timeline.start_frame()?,
        end: timeline.end_frame()?,
    })
}

/// Milliseconds since the Unix epoch; makes output names unique per call.
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One render submission and where its output is expected.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Prefix for API failures, e.g. "Render" or "Audio render".
    pub scope: &'static str,
    pub output_dir: PathBuf,
    /// Custom name handed to the render queue.
    pub name: String,
    pub extension: &'static str,
    /// Extensions accepted when scanning for a decorated output name.
    pub accepted_extensions: &'static [&'static str],
}

impl RenderJob {
    pub fn expected_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.name, self.extension))
    }

    /// Wrap an automation failure in this job's scope.
    pub fn failed(&self, err: impl fmt::Display) -> BridgeError {
        BridgeError::render_failed(self.scope, err.to_string())
    }

    /// Submit with `settings`, wait for the queue, and return the output file.
    pub fn run(
        &self,
        project: &dyn Project,
        settings: &RenderSettings,
        policy: &RenderDefaults,
    ) -> BridgeResult<PathBuf> {
        submit(project, settings).map_err(|e| self.failed(e))?;
        wait_for_render(project, policy).map_err(|e| match e {
            WaitError::Api(e) => self.failed(e),
            WaitError::Timeout { polls } => BridgeError::RenderTimeout {
                waited_secs: polls as u64 * policy.poll_interval_ms / 1000,
            },
        })?;

        let path = locate_output(
            &self.output_dir,
            &self.expected_path(),
            &self.name,
            self.accepted_extensions,
        )
        .ok_or_else(|| BridgeError::RenderOutputMissing {
            token: self.name.clone(),
        })?;
        enforce_size_limit(&path, policy.max_output_bytes)?;

        tracing::info!(path = %path.display(), "Render finished");
        Ok(path)
    }
}

/// Push settings, queue a job and start the queue.
pub fn submit(project: &dyn Project, settings: &RenderSettings) -> ApiResult<()> {
    if !project.set_render_settings(settings)? {
        tracing::warn!("SetRenderSettings reported failure; rendering with current settings");
    }
    match project.add_render_job()? {
        Some(job) => tracing::debug!(job, "Render job queued"),
        None => tracing::warn!("AddRenderJob returned no job id"),
    }
    if !project.start_rendering()? {
        tracing::warn!("StartRendering reported failure");
    }
    Ok(())
}

#[derive(Debug)]
pub enum WaitError {
    Api(resolve_bridge_automation_core::ApiError),
    Timeout { polls: u32 },
}

/// Poll until the queue is idle or `policy.max_polls` intervals have passed.
pub fn wait_for_render(project: &dyn Project, policy: &RenderDefaults) -> Result<u32, WaitError> {
    let interval = policy.poll_interval();
    let mut polls = 0;
    while project.is_rendering().map_err(WaitError::Api)? {
        if polls >= policy.max_polls {
            tracing::warn!(polls, "Render still in progress; giving up");
            return Err(WaitError::Timeout { polls });
        }
        std::thread::sleep(interval);
        polls += 1;
    }
    tracing::debug!(polls, "Render queue idle");
    Ok(polls)
}

/// Find the rendered file.
///
/// `expected` wins when it exists. Otherwise the directory is scanned in name
/// order for a regular file whose name contains `token` and whose extension
/// is one of `extensions`.
pub fn locate_output(
    dir: &Path,
    expected: &Path,
    token: &str,
    extensions: &[&str],
) -> Option<PathBuf> {
    if expected.is_file() {
        return Some(expected.to_path_buf());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot scan output directory");
            return None;
        }
    };
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let name_matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(token));
            let ext_matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
            name_matches && ext_matches
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Delete and reject `path` when it is larger than `limit` bytes.
///
/// A file whose size cannot be read is let through.
pub fn enforce_size_limit(path: &Path, limit: u64) -> BridgeResult<()> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping size check");
            return Ok(());
        }
    };
    if size <= limit {
        return Ok(());
    }

    tracing::warn!(path = %path.display(), size, limit, "Rendered file too large; deleting");
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete oversize render");
    }
    Err(BridgeError::OutputTooLarge {
        size,
        limit: format_limit(limit),
    })
}

/// "1GB", "512MB", or a byte count.
pub fn format_limit(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * MB;
    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{bytes} bytes")
    }
}
