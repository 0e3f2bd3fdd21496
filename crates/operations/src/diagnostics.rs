//! Report what the bridge can see of the current timeline and project.

use serde_json::Value;

use resolve_bridge_automation_core::{ApiResult, Project, Timeline};
use resolve_bridge_common::{BridgeError, BridgeResult};

use crate::{Context, Response};

/// `diagInOut`
///
/// Each field is read on its own; a failing read reports `null` for that
/// field and does not affect the others.
pub fn diagnostics(ctx: &Context) -> BridgeResult<Response> {
    if !ctx.session.is_available() {
        return Err(BridgeError::ApiUnavailable);
    }
    let timeline = ctx.session.current_timeline();
    let project = ctx.session.current_project();

    let mut response = Response::success()
        .with("hasTimeline", timeline.is_some())
        .with("hasProject", project.is_some());
    if let Some(timeline) = &timeline {
        response = timeline_fields(response, timeline.as_ref());
    }
    if let Some(project) = &project {
        response = project_fields(response, project.as_ref());
    }
    Ok(response)
}

fn guarded<T: Into<Value>>(field: &str, result: ApiResult<T>) -> Value {
    result.map(Into::into).unwrap_or_else(|e| {
        tracing::debug!(field, error = %e, "Diagnostic read failed");
        Value::Null
    })
}

/// `-1` means the mark is unset.
fn mark(frame: i64) -> Value {
    if frame == -1 {
        Value::Null
    } else {
        frame.into()
    }
}

fn timeline_fields(response: Response, timeline: &dyn Timeline) -> Response {
    let (mark_in, mark_out) = match timeline
        .mark_in()
        .and_then(|start| Ok((start, timeline.mark_out()?)))
    {
        Ok((start, end)) => (mark(start), mark(end)),
        Err(e) => {
            tracing::debug!(error = %e, "Marks unreadable");
            (Value::Null, Value::Null)
        }
    };
    response
        .with("timelineName", guarded("timelineName", timeline.name()))
        .with("startFrame", guarded("startFrame", timeline.start_frame()))
        .with("endFrame", guarded("endFrame", timeline.end_frame()))
        .with(
            "currentTimecode",
            guarded("currentTimecode", timeline.current_timecode()),
        )
        .with("markIn", mark_in)
        .with("markOut", mark_out)
}

fn project_fields(response: Response, project: &dyn Project) -> Response {
    response.with("projectName", guarded("projectName", project.name()))
}
