//! Resolve Bridge Operations
//!
//! The editing operations a host panel can invoke, each a stateless
//! request/response adapter over the automation [`Session`]:
//!
//! | Name                   | Operation                                  |
//! |------------------------|--------------------------------------------|
//! | `exportInOutVideo`     | render the marked range to mp4/mov         |
//! | `exportInOutAudio`     | render the marked range to wav/mp3         |
//! | `insertFileAtPlayhead` | import a file and place it at the playhead |
//! | `importFileToBin`      | import a file into a named bin             |
//! | `getProjectDir`        | resolve and create the output directory    |
//! | `revealFile`           | show a file in the OS file manager         |
//! | `diagInOut`            | report timeline and project state          |
//!
//! Every operation answers with a [`Response`]; failures become
//! `{"ok":false,"error":...}` instead of escaping.

use resolve_bridge_automation_core::Session;
use resolve_bridge_common::{BridgeConfig, BridgeError, BridgeResult};
use resolve_bridge_platform_shell::{Revealer, SystemRevealer};

pub mod diagnostics;
pub mod export;
pub mod import_bin;
pub mod insert;
pub mod operation;
pub mod project_dir;
pub mod render;
pub mod response;
pub mod reveal;

pub use operation::{Operation, OperationKind, PathPayload};
pub use response::{Response, FALLBACK_LINE};

/// Everything an operation may touch.
pub struct Context {
    pub session: Session,
    pub config: BridgeConfig,
    pub revealer: Box<dyn Revealer>,
}

impl Context {
    pub fn new(session: Session, config: BridgeConfig) -> Self {
        Self {
            session,
            config,
            revealer: Box::new(SystemRevealer),
        }
    }

    pub fn with_revealer(mut self, revealer: impl Revealer + 'static) -> Self {
        self.revealer = Box::new(revealer);
        self
    }
}

/// Look up `function` and run it against `payload`.
///
/// `Err` is returned only for a missing or unknown operation name; anything
/// that goes wrong inside a known operation is folded into the response.
pub fn dispatch(ctx: &Context, function: Option<&str>, payload: &str) -> BridgeResult<Response> {
    let name = function.ok_or(BridgeError::NoFunction)?;
    let kind: OperationKind = name.parse()?;
    Ok(execute(ctx, kind, payload))
}

/// Decode the payload for `kind` and run the operation.
pub fn execute(ctx: &Context, kind: OperationKind, payload: &str) -> Response {
    tracing::debug!(operation = kind.name(), payload, "Running operation");
    let result = Operation::parse(kind, payload).and_then(|op| op.run(ctx));
    if let Err(e) = &result {
        tracing::warn!(operation = kind.name(), error = %e, "Operation failed");
    }
    Response::from_result(result)
}
