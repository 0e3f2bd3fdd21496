//! Show a file in the OS file manager.

use resolve_bridge_common::{BridgeError, BridgeResult};

use crate::{Context, PathPayload, Response};

/// `revealFile`
pub fn reveal_file(ctx: &Context, req: &PathPayload) -> BridgeResult<Response> {
    if !req.path.exists() {
        return Err(BridgeError::file_not_found(&req.path));
    }
    ctx.revealer.reveal(&req.path)?;
    Ok(Response::success())
}
