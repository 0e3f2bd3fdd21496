//! Resolve the directory that receives the panel's outputs.

use std::fs;
use std::path::{Path, PathBuf};

use resolve_bridge_automation_core::Project;
use resolve_bridge_common::{BridgeError, BridgeResult};

use crate::{Context, Response};

const UNTITLED: &str = "Untitled Project";

/// `getProjectDir`
pub fn project_dir(ctx: &Context) -> BridgeResult<Response> {
    if !ctx.session.is_available() {
        return Err(BridgeError::ApiUnavailable);
    }
    let project = ctx
        .session
        .current_project()
        .ok_or(BridgeError::NoProjectOpen)?;

    let project_name = project.name().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Project name unreadable");
        UNTITLED.to_string()
    });
    let project_dir =
        project_file_dir(project.as_ref()).unwrap_or_else(|| ctx.config.documents_dir());
    let output_dir = project_dir.join(&ctx.config.output_folder);
    fs::create_dir_all(&output_dir).map_err(|e| BridgeError::OutputDirFailed {
        message: e.to_string(),
    })?;

    Ok(Response::success()
        .with("projectDir", project_dir.display().to_string())
        .with("outputDir", output_dir.display().to_string())
        .with("projectName", project_name))
}

/// Parent of the on-disk project file, when the release reports one that exists.
fn project_file_dir(project: &dyn Project) -> Option<PathBuf> {
    let raw = match project.project_path() {
        Ok(path) => path?,
        Err(e) => {
            tracing::debug!(error = %e, "Project path unavailable");
            return None;
        }
    };
    let path = Path::new(&raw);
    if !path.exists() {
        return None;
    }
    path.parent().map(Path::to_path_buf)
}
