//! Operation names and typed payloads.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use resolve_bridge_common::{BridgeError, BridgeResult};

use crate::export::{AudioExportRequest, VideoExportRequest};
use crate::import_bin::ImportToBinRequest;
use crate::{diagnostics, export, import_bin, insert, project_dir, reveal, Context, Response};

/// The operation names the bridge answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ExportVideo,
    ExportAudio,
    InsertAtPlayhead,
    ImportToBin,
    GetProjectDir,
    RevealFile,
    Diagnostics,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        Self::ExportVideo,
        Self::ExportAudio,
        Self::InsertAtPlayhead,
        Self::ImportToBin,
        Self::GetProjectDir,
        Self::RevealFile,
        Self::Diagnostics,
    ];

    /// Wire name used by the host panel.
    pub fn name(self) -> &'static str {
        match self {
            Self::ExportVideo => "exportInOutVideo",
            Self::ExportAudio => "exportInOutAudio",
            Self::InsertAtPlayhead => "insertFileAtPlayhead",
            Self::ImportToBin => "importFileToBin",
            Self::GetProjectDir => "getProjectDir",
            Self::RevealFile => "revealFile",
            Self::Diagnostics => "diagInOut",
        }
    }
}

impl FromStr for OperationKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BridgeError::UnknownFunction {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ExportVideo(VideoExportRequest),
    ExportAudio(AudioExportRequest),
    InsertAtPlayhead(PathPayload),
    ImportToBin(ImportToBinRequest),
    GetProjectDir,
    RevealFile(PathPayload),
    Diagnostics,
}

impl Operation {
    /// Decode `payload` for `kind`.
    ///
    /// Operations without input ignore the payload entirely.
    pub fn parse(kind: OperationKind, payload: &str) -> BridgeResult<Self> {
        Ok(match kind {
            OperationKind::ExportVideo => Self::ExportVideo(decode(payload)?),
            OperationKind::ExportAudio => Self::ExportAudio(decode(payload)?),
            OperationKind::InsertAtPlayhead => Self::InsertAtPlayhead(PathPayload::parse(payload)),
            OperationKind::ImportToBin => Self::ImportToBin(decode(payload)?),
            OperationKind::GetProjectDir => Self::GetProjectDir,
            OperationKind::RevealFile => Self::RevealFile(PathPayload::parse(payload)),
            OperationKind::Diagnostics => Self::Diagnostics,
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ExportVideo(_) => OperationKind::ExportVideo,
            Self::ExportAudio(_) => OperationKind::ExportAudio,
            Self::InsertAtPlayhead(_) => OperationKind::InsertAtPlayhead,
            Self::ImportToBin(_) => OperationKind::ImportToBin,
            Self::GetProjectDir => OperationKind::GetProjectDir,
            Self::RevealFile(_) => OperationKind::RevealFile,
            Self::Diagnostics => OperationKind::Diagnostics,
        }
    }

    pub fn run(&self, ctx: &Context) -> BridgeResult<Response> {
        match self {
            Self::ExportVideo(req) => export::export_video(ctx, req),
            Self::ExportAudio(req) => export::export_audio(ctx, req),
            Self::InsertAtPlayhead(req) => insert::insert_at_playhead(ctx, req),
            Self::ImportToBin(req) => import_bin::import_to_bin(ctx, req),
            Self::GetProjectDir => project_dir::project_dir(ctx),
            Self::RevealFile(req) => reveal::reveal_file(ctx, req),
            Self::Diagnostics => diagnostics::diagnostics(ctx),
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &str) -> BridgeResult<T> {
    let text = if payload.trim().is_empty() { "{}" } else { payload };
    serde_json::from_str(text).map_err(|e| BridgeError::invalid_payload(e.to_string()))
}

/// A file path given as `{"path": ...}`, a JSON string, or bare text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPayload {
    pub path: PathBuf,
}

impl PathPayload {
    pub fn parse(payload: &str) -> Self {
        let path = match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(map)) => match map.get("path").and_then(Value::as_str) {
                Some(path) => path.to_string(),
                None => payload.to_string(),
            },
            Ok(Value::String(path)) => path,
            _ => payload.to_string(),
        };
        Self {
            path: PathBuf::from(path),
        }
    }
}
