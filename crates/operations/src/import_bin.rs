//! Import a media file into a media-pool bin.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use resolve_bridge_automation_core::session::{media_pool, root_folder};
use resolve_bridge_automation_core::{Folder, MediaPool};
use resolve_bridge_common::{BridgeError, BridgeResult};

use crate::{Context, Response};

/// `{path, binName?}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ImportToBinPayload")]
pub struct ImportToBinRequest {
    pub path: String,
    pub bin_name: String,
}

/// Null or non-string fields read as empty.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImportToBinPayload {
    path: Value,
    bin_name: Value,
}

impl From<ImportToBinPayload> for ImportToBinRequest {
    fn from(payload: ImportToBinPayload) -> Self {
        let text = |value: Value| match value {
            Value::String(s) => s,
            _ => String::new(),
        };
        Self {
            path: text(payload.path),
            bin_name: text(payload.bin_name),
        }
    }
}

/// `importFileToBin`
pub fn import_to_bin(ctx: &Context, req: &ImportToBinRequest) -> BridgeResult<Response> {
    let path = Path::new(&req.path);
    if req.path.is_empty() || !path.exists() {
        return Err(BridgeError::file_not_found(path));
    }

    let project = ctx
        .session
        .current_project()
        .ok_or(BridgeError::NoActiveProject)?;
    let pool = media_pool(project.as_ref())?;
    let root = root_folder(pool.as_ref())?;

    let target = if req.bin_name.is_empty() {
        root
    } else {
        find_or_create_bin(pool.as_ref(), root, &req.bin_name)?
    };

    let imported = pool.import_media(&[path.to_path_buf()], target.as_ref())?;
    if imported.is_success() {
        tracing::info!(path = %path.display(), bin = %req.bin_name, "Imported media");
        return Ok(Response::success());
    }

    // Resolve returns nothing when the media is already in the bin.
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let present = target
        .clips()?
        .iter()
        .any(|clip| clip.name().is_ok_and(|name| name == file_name));
    if present {
        tracing::info!(path = %path.display(), "Media already in bin");
        return Ok(Response::success().with("reused", true));
    }
    Err(BridgeError::ImportFailed)
}

/// First immediate child of `root` named `name`, created when absent.
fn find_or_create_bin(
    pool: &dyn MediaPool,
    root: Box<dyn Folder>,
    name: &str,
) -> BridgeResult<Box<dyn Folder>> {
    for folder in root.sub_folders()? {
        if folder.name()? == name {
            return Ok(folder);
        }
    }
    tracing::debug!(bin = name, "Creating bin");
    pool.add_sub_folder(root.as_ref(), name)?
        .ok_or_else(|| BridgeError::BinCreationFailed {
            name: name.to_string(),
        })
}
