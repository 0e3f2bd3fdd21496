//! In/out range exports through the Resolve render queue.

use std::fs;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use resolve_bridge_automation_core::settings as keys;
use resolve_bridge_automation_core::{RenderSettings, Timeline};
use resolve_bridge_common::{frame_rate_or, BridgeError, BridgeResult, RenderDefaults};

use crate::render::{self, FrameRange, RenderJob};
use crate::{Context, Response};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Requested video codec. Anything other than `h264` renders ProRes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    #[default]
    H264,
    ProRes422,
}

impl VideoCodec {
    pub fn from_name(name: &str) -> Self {
        if name == "h264" {
            Self::H264
        } else {
            Self::ProRes422
        }
    }

    /// Container extension, also used as the render `Format`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::H264 => "mp4",
            Self::ProRes422 => "mov",
        }
    }

    pub fn codec(self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::ProRes422 => "Apple ProRes 422",
        }
    }
}

/// Requested audio format. Anything other than `wav` renders mp3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn from_name(name: &str) -> Self {
        if name == "wav" {
            Self::Wav
        } else {
            Self::Mp3
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn codec(self) -> &'static str {
        match self {
            Self::Wav => "PCM",
            Self::Mp3 => "MP3",
        }
    }
}

/// `{codec?: string}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "VideoExportPayload")]
pub struct VideoExportRequest {
    pub codec: VideoCodec,
}

// Only an absent field keeps the default; null and non-strings pick the
// other branch.
#[derive(Deserialize)]
struct VideoExportPayload {
    #[serde(default, deserialize_with = "present")]
    codec: Option<Value>,
}

impl From<VideoExportPayload> for VideoExportRequest {
    fn from(payload: VideoExportPayload) -> Self {
        Self {
            codec: payload
                .codec
                .map(|value| VideoCodec::from_name(value.as_str().unwrap_or_default()))
                .unwrap_or_default(),
        }
    }
}

/// `{format?: string}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "AudioExportPayload")]
pub struct AudioExportRequest {
    pub format: AudioFormat,
}

#[derive(Deserialize)]
struct AudioExportPayload {
    #[serde(default, deserialize_with = "present")]
    format: Option<Value>,
}

impl From<AudioExportPayload> for AudioExportRequest {
    fn from(payload: AudioExportPayload) -> Self {
        Self {
            format: payload
                .format
                .map(|value| AudioFormat::from_name(value.as_str().unwrap_or_default()))
                .unwrap_or_default(),
        }
    }
}

/// Keeps an explicit `null` distinct from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Timeline resolution and frame rate for the render settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl TimelineFormat {
    /// Read from the timeline settings; unreadable fields use the fallbacks.
    pub fn read(timeline: &dyn Timeline, fallback: &RenderDefaults) -> Self {
        let setting = |key: &str| match timeline.setting(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key, error = %e, "Timeline setting unreadable");
                None
            }
        };
        let dimension = |key: &str, default: u32| {
            setting(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            width: dimension("timelineResolutionWidth", fallback.fallback_width),
            height: dimension("timelineResolutionHeight", fallback.fallback_height),
            fps: frame_rate_or(
                setting("timelineFrameRate").as_deref(),
                fallback.fallback_fps,
            ),
        }
    }
}

fn output_name(prefix: &str) -> String {
    format!("{prefix}_{}", render::timestamp_millis())
}

fn base_settings(job: &RenderJob, range: FrameRange, current: Value) -> RenderSettings {
    let mut settings = RenderSettings::from_value(current);
    settings
        .set(keys::TARGET_DIR, job.output_dir.display().to_string())
        .set(keys::CUSTOM_NAME, job.name.clone())
        .set(keys::MARK_IN, range.start)
        .set(keys::MARK_OUT, range.end);
    settings
}

/// `exportInOutVideo`: render the marked range (or whole timeline) to video.
pub fn export_video(ctx: &Context, req: &VideoExportRequest) -> BridgeResult<Response> {
    let timeline = ctx
        .session
        .current_timeline()
        .ok_or(BridgeError::NoActiveTimeline)?;
    let range = render::resolve_range(timeline.as_ref())?;
    let project = ctx
        .session
        .current_project()
        .ok_or(BridgeError::NoActiveProject)?;

    let output_dir = ctx.config.output_dir();
    fs::create_dir_all(&output_dir)?;

    let job = RenderJob {
        scope: "Render",
        output_dir,
        name: output_name("sync_export"),
        extension: req.codec.extension(),
        accepted_extensions: VIDEO_EXTENSIONS,
    };
    tracing::info!(name = %job.name, codec = ?req.codec, ?range, "Exporting video");

    let policy = &ctx.config.render;
    let format = TimelineFormat::read(timeline.as_ref(), policy);
    let current = project.render_settings().map_err(|e| job.failed(e))?;
    let mut settings = base_settings(&job, range, current);
    settings
        .set(keys::RESOLUTION_WIDTH, format.width)
        .set(keys::RESOLUTION_HEIGHT, format.height)
        .set(keys::FRAME_RATE, format.fps)
        .set(keys::EXPORT_VIDEO, true)
        .set(keys::EXPORT_AUDIO, true)
        .set(keys::FORMAT, req.codec.extension())
        .set(keys::CODEC, req.codec.codec());

    let path = job.run(project.as_ref(), &settings, policy)?;
    Ok(Response::success().with("path", path.display().to_string()))
}

/// `exportInOutAudio`: render the marked range (or whole timeline) to audio.
pub fn export_audio(ctx: &Context, req: &AudioExportRequest) -> BridgeResult<Response> {
    let timeline = ctx
        .session
        .current_timeline()
        .ok_or(BridgeError::NoActiveTimeline)?;
    let range = render::resolve_range(timeline.as_ref())?;
    let project = ctx
        .session
        .current_project()
        .ok_or(BridgeError::NoActiveProject)?;

    let output_dir = ctx.config.output_dir();
    fs::create_dir_all(&output_dir)?;

    let job = RenderJob {
        scope: "Audio render",
        output_dir,
        name: output_name("sync_export_audio"),
        extension: req.format.extension(),
        accepted_extensions: AUDIO_EXTENSIONS,
    };
    tracing::info!(name = %job.name, format = ?req.format, ?range, "Exporting audio");

    let current = project.render_settings().map_err(|e| job.failed(e))?;
    let mut settings = base_settings(&job, range, current);
    settings
        .set(keys::EXPORT_VIDEO, false)
        .set(keys::EXPORT_AUDIO, true)
        .set(keys::AUDIO_CODEC, req.format.codec())
        .set(keys::AUDIO_FORMAT, req.format.extension());

    let path = job.run(project.as_ref(), &settings, &ctx.config.render)?;
    Ok(Response::success().with("path", path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolve_bridge_automation_core::fake::{
        FakeProject, FakeRenderOutput, FakeResolve, FakeTimeline,
    };
    use resolve_bridge_automation_core::{ApiError, Session};
    use resolve_bridge_common::BridgeConfig;
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        fake: FakeResolve,
        ctx: Context,
        _docs: tempfile::TempDir,
    }

    impl Fixture {
        fn new(output: Option<FakeRenderOutput>) -> Self {
            let docs = tempfile::tempdir().unwrap();
            let mut project = FakeProject::named("Edit");
            project.timeline = Some(
                FakeTimeline::new("Main", 86400, 86640)
                    .with_setting("timelineResolutionWidth", "3840")
                    .with_setting("timelineResolutionHeight", "2160")
                    .with_setting("timelineFrameRate", "25"),
            );
            project.render_settings = json!({"VideoQuality": 0, "Format": "avi"});
            project.render_output = output;
            let fake = FakeResolve::with_project(project);

            let mut config = BridgeConfig {
                documents_dir: Some(docs.path().to_path_buf()),
                ..BridgeConfig::default()
            };
            config.render.poll_interval_ms = 0;
            let ctx = Context::new(Session::new(Box::new(fake.clone())), config);
            Self {
                fake,
                ctx,
                _docs: docs,
            }
        }

        fn output_dir(&self) -> PathBuf {
            self.ctx.config.output_dir()
        }

        fn applied(&self) -> RenderSettings {
            self.fake.project().applied_settings.clone().unwrap()
        }
    }

    fn response_path(response: &Response) -> PathBuf {
        PathBuf::from(response.get("path").and_then(|v| v.as_str()).unwrap())
    }

    #[test]
    fn h264_export_renders_mp4_into_output_folder() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(10)));
        let response = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap();

        assert!(response.ok);
        let path = response_path(&response);
        assert_eq!(path.parent(), Some(fx.output_dir().as_path()));
        assert_eq!(path.extension().unwrap(), "mp4");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sync_export_"));

        let applied = fx.applied();
        assert_eq!(applied.get_str(keys::FORMAT), Some("mp4"));
        assert_eq!(applied.get_str(keys::CODEC), Some("H264"));
        assert_eq!(applied.get(keys::MARK_IN), Some(&json!(86400)));
        assert_eq!(applied.get(keys::MARK_OUT), Some(&json!(86640)));
        assert_eq!(applied.get(keys::RESOLUTION_WIDTH), Some(&json!(3840)));
        assert_eq!(applied.get(keys::RESOLUTION_HEIGHT), Some(&json!(2160)));
        assert_eq!(applied.get(keys::FRAME_RATE), Some(&json!(25.0)));
        assert_eq!(applied.get(keys::EXPORT_VIDEO), Some(&json!(true)));
        assert_eq!(applied.get(keys::EXPORT_AUDIO), Some(&json!(true)));
        assert_eq!(applied.get("VideoQuality"), Some(&json!(0)));
        assert_eq!(fx.fake.project().render_jobs, 1);
        assert!(fx.fake.project().render_started);
    }

    #[test]
    fn other_codec_renders_prores_mov() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(10)));
        let req = VideoExportRequest {
            codec: VideoCodec::from_name("prores"),
        };
        let response = export_video(&fx.ctx, &req).unwrap();
        assert_eq!(response_path(&response).extension().unwrap(), "mov");
        assert_eq!(fx.applied().get_str(keys::CODEC), Some("Apple ProRes 422"));
    }

    #[test]
    fn marks_define_the_range_when_both_set() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(1)));
        {
            let mut timeline = fx.fake.timeline_mut();
            timeline.mark_in = 86450;
            timeline.mark_out = 86500;
        }
        export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap();
        assert_eq!(fx.applied().get(keys::MARK_IN), Some(&json!(86450)));
        assert_eq!(fx.applied().get(keys::MARK_OUT), Some(&json!(86500)));
    }

    #[test]
    fn unreadable_timeline_format_uses_fallbacks() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(1)));
        fx.fake.timeline_mut().settings.clear();
        export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap();
        let applied = fx.applied();
        assert_eq!(applied.get(keys::RESOLUTION_WIDTH), Some(&json!(1920)));
        assert_eq!(applied.get(keys::RESOLUTION_HEIGHT), Some(&json!(1080)));
        assert_eq!(applied.get(keys::FRAME_RATE), Some(&json!(24.0)));
    }

    #[test]
    fn decorated_output_name_is_discovered() {
        let fx = Fixture::new(Some(FakeRenderOutput {
            suffix: "_00001".to_string(),
            size: 5,
        }));
        let response = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap();
        let name = response_path(&response)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.ends_with("_00001.mp4"), "{name}");
    }

    #[test]
    fn missing_output_is_reported() {
        let fx = Fixture::new(None);
        let err = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap_err();
        assert_eq!(err.to_string(), "Render completed but file not found");
    }

    #[test]
    fn timeout_skips_discovery() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(1)));
        fx.fake.project_mut().rendering_polls = u32::MAX;
        let mut ctx_config = fx.ctx.config.clone();
        ctx_config.render.max_polls = 3;
        let ctx = Context::new(Session::new(Box::new(fx.fake.clone())), ctx_config);

        let err = export_video(&ctx, &VideoExportRequest::default_h264()).unwrap_err();
        assert_eq!(err.to_string(), "Render timeout");
        // The written file is left in place for the still-running job.
        assert_eq!(fs::read_dir(fx.output_dir()).unwrap().count(), 1);
    }

    #[test]
    fn oversize_output_is_deleted_and_rejected() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(1_073_741_825)));
        let err = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File size exceeds 1GB limit. Please use shorter in/out points or lower quality settings."
        );
        assert_eq!(fs::read_dir(fx.output_dir()).unwrap().count(), 0);
    }

    #[test]
    fn api_failures_are_scoped() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(1)));
        fx.fake.project_mut().start_error =
            Some(ApiError::call("StartRendering", "render queue locked"));
        let err = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap_err();
        assert_eq!(err.to_string(), "Render failed: render queue locked");

        let err = export_audio(&fx.ctx, &AudioExportRequest::default_wav()).unwrap_err();
        assert_eq!(err.to_string(), "Audio render failed: render queue locked");
    }

    #[test]
    fn missing_context_is_reported_in_order() {
        let fx = Fixture::new(None);
        fx.fake.project_mut().timeline = None;
        let err = export_video(&fx.ctx, &VideoExportRequest::default_h264()).unwrap_err();
        assert_eq!(err.to_string(), "No active timeline");

        let offline = Context::new(Session::unavailable(), fx.ctx.config.clone());
        let err = export_audio(&offline, &AudioExportRequest::default_wav()).unwrap_err();
        assert_eq!(err.to_string(), "No active timeline");
    }

    #[test]
    fn wav_export_forces_audio_only_pcm() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(3)));
        let response = export_audio(&fx.ctx, &AudioExportRequest::default_wav()).unwrap();
        let path = response_path(&response);
        assert_eq!(path.extension().unwrap(), "wav");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sync_export_audio_"));

        let applied = fx.applied();
        assert_eq!(applied.get(keys::EXPORT_VIDEO), Some(&json!(false)));
        assert_eq!(applied.get(keys::EXPORT_AUDIO), Some(&json!(true)));
        assert_eq!(applied.get_str(keys::AUDIO_CODEC), Some("PCM"));
        assert_eq!(applied.get_str(keys::AUDIO_FORMAT), Some("wav"));
        assert!(applied.get(keys::RESOLUTION_WIDTH).is_none());
    }

    #[test]
    fn other_audio_format_renders_mp3() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(3)));
        let req = AudioExportRequest {
            format: AudioFormat::from_name("aac"),
        };
        let response = export_audio(&fx.ctx, &req).unwrap();
        assert_eq!(response_path(&response).extension().unwrap(), "mp3");
        assert_eq!(fx.applied().get_str(keys::AUDIO_CODEC), Some("MP3"));
    }

    #[test]
    fn payload_shapes_decode() {
        let req: VideoExportRequest = serde_json::from_str(r#"{"codec":"prores"}"#).unwrap();
        assert_eq!(req.codec, VideoCodec::ProRes422);
        let req: AudioExportRequest = serde_json::from_str(r#"{"other":1}"#).unwrap();
        assert_eq!(req.format, AudioFormat::Wav);
    }

    #[test]
    fn null_or_non_string_selects_the_other_branch() {
        for payload in [r#"{"codec":null}"#, r#"{"codec":5}"#, r#"{"codec":["h264"]}"#] {
            let req: VideoExportRequest = serde_json::from_str(payload).unwrap();
            assert_eq!(req.codec, VideoCodec::ProRes422, "{payload}");
        }
        for payload in [r#"{"format":null}"#, r#"{"format":true}"#] {
            let req: AudioExportRequest = serde_json::from_str(payload).unwrap();
            assert_eq!(req.format, AudioFormat::Mp3, "{payload}");
        }
        let req: VideoExportRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.codec, VideoCodec::H264);
    }

    #[test]
    fn non_string_codec_renders_prores() {
        let fx = Fixture::new(Some(FakeRenderOutput::exact(10)));
        let response = crate::dispatch(&fx.ctx, Some("exportInOutVideo"), r#"{"codec":5}"#)
            .unwrap();
        assert!(response.ok);
        assert_eq!(response_path(&response).extension().unwrap(), "mov");
        assert_eq!(fx.applied().get_str(keys::CODEC), Some("Apple ProRes 422"));
    }

    impl VideoExportRequest {
        fn default_h264() -> Self {
            Self {
                codec: VideoCodec::H264,
            }
        }
    }

    impl AudioExportRequest {
        fn default_wav() -> Self {
            Self {
                format: AudioFormat::Wav,
            }
        }
    }
}
