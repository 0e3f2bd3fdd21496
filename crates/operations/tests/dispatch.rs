//! Drives every operation by name, the way the CLI does, against the fake
//! automation backend.

use std::fs;

use serde_json::{json, Value};

use resolve_bridge_automation_core::fake::{
    FakeFolder, FakeProject, FakeRenderOutput, FakeResolve, FakeTimeline,
};
use resolve_bridge_automation_core::Session;
use resolve_bridge_common::BridgeConfig;
use resolve_bridge_operations::{dispatch, Context, OperationKind};
use resolve_bridge_platform_shell::Revealer;

struct NoopRevealer;

impl Revealer for NoopRevealer {
    fn reveal(&self, _path: &std::path::Path) -> std::io::Result<()> {
        Ok(())
    }
}

struct Studio {
    fake: FakeResolve,
    ctx: Context,
    docs: tempfile::TempDir,
}

fn studio() -> Studio {
    let docs = tempfile::tempdir().unwrap();
    let mut project = FakeProject::named("Promo");
    project.timeline = Some(
        FakeTimeline::new("Cut 3", 86400, 88800).with_setting("timelineFrameRate", "24"),
    );
    project.render_output = Some(FakeRenderOutput::exact(64));
    project
        .media_pool
        .as_mut()
        .unwrap()
        .root
        .sub_folders
        .push(FakeFolder::named("sync. outputs"));
    let fake = FakeResolve::with_project(project);

    let mut config = BridgeConfig {
        documents_dir: Some(docs.path().to_path_buf()),
        ..BridgeConfig::default()
    };
    config.render.poll_interval_ms = 0;
    let ctx = Context::new(Session::new(Box::new(fake.clone())), config)
        .with_revealer(NoopRevealer);
    Studio { fake, ctx, docs }
}

fn call(studio: &Studio, name: &str, payload: &str) -> Value {
    let response = dispatch(&studio.ctx, Some(name), payload).unwrap();
    serde_json::from_str(&response.to_line()).unwrap()
}

#[test]
fn every_operation_answers_with_ok_flag() {
    let studio = studio();
    let media = studio.docs.path().join("voice.wav");
    fs::write(&media, b"RIFF").unwrap();
    let media_str = media.display().to_string();

    for kind in OperationKind::ALL {
        let payload = match kind {
            OperationKind::ImportToBin => json!({"path": media_str, "binName": "Voice"}).to_string(),
            OperationKind::InsertAtPlayhead | OperationKind::RevealFile => media_str.clone(),
            _ => "{}".to_string(),
        };
        let response = call(&studio, kind.name(), &payload);
        assert_eq!(response["ok"], true, "{kind}: {response}");
    }
}

#[test]
fn rendered_video_lands_in_documents_output_folder() {
    let studio = studio();
    let response = call(&studio, "exportInOutVideo", r#"{"codec":"prores"}"#);
    let path = std::path::PathBuf::from(response["path"].as_str().unwrap());
    assert!(path.starts_with(studio.docs.path().join("sync. outputs")));
    assert_eq!(path.extension().unwrap(), "mov");
    assert_eq!(fs::metadata(&path).unwrap().len(), 64);
}

#[test]
fn import_into_named_bin_then_reuse() {
    let studio = studio();
    let media = studio.docs.path().join("music.mp3");
    fs::write(&media, b"ID3").unwrap();
    let payload = json!({"path": media.display().to_string(), "binName": "Music"}).to_string();

    assert_eq!(call(&studio, "importFileToBin", &payload), json!({"ok": true}));
    let pool = studio.fake.media_pool();
    let music = pool
        .root
        .sub_folders
        .iter()
        .find(|f| f.name == "Music")
        .unwrap();
    assert_eq!(music.clips.len(), 1);
}

#[test]
fn diagnostics_reflect_fake_state() {
    let studio = studio();
    studio.fake.timeline_mut().mark_in = 86500;
    let response = call(&studio, "diagInOut", "");
    assert_eq!(response["timelineName"], "Cut 3");
    assert_eq!(response["markIn"], 86500);
    assert!(response["markOut"].is_null());
    assert_eq!(response["projectName"], "Promo");
}
