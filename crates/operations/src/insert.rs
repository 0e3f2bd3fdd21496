//! Insert a media file at the timeline playhead.
//!
//! The scripting API has no "insert at frame", so the clip is appended to
//! the end of the timeline and then moved by rewriting the `Start` property
//! of the last item on video track 1.

use std::path::Path;

use resolve_bridge_automation_core::session::{media_pool, root_folder};
use resolve_bridge_automation_core::{
    Clip, Folder, ImportResult, PropertyValue, Timeline, TrackKind,
};
use resolve_bridge_common::{frame_rate_or, BridgeError, BridgeResult, Timecode};

use crate::{Context, PathPayload, Response};

/// Where the clip should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playhead {
    pub frame: i64,
    /// Raw timecode string, kept for the fallback placement.
    pub timecode: Option<String>,
}

impl Playhead {
    /// Playhead frame from the current timecode, or the timeline start.
    pub fn read(timeline: &dyn Timeline, fallback_fps: f64) -> BridgeResult<Self> {
        let timecode = match timeline.current_timecode() {
            Ok(tc) => tc,
            Err(e) => {
                tracing::debug!(error = %e, "Playhead unreadable; using timeline start");
                return Ok(Self {
                    frame: timeline.start_frame()?,
                    timecode: None,
                });
            }
        };

        match timecode.parse::<Timecode>() {
            Ok(tc) => {
                let fps = match timeline.setting("timelineFrameRate") {
                    Ok(raw) => frame_rate_or(raw.as_deref(), fallback_fps),
                    Err(_) => fallback_fps,
                };
                Ok(Self {
                    frame: tc.to_frame(fps),
                    timecode: Some(timecode),
                })
            }
            Err(e) => {
                tracing::debug!(timecode, error = %e, "Unparseable playhead; using timeline start");
                Ok(Self {
                    frame: timeline.start_frame()?,
                    timecode: Some(timecode),
                })
            }
        }
    }
}

/// `insertFileAtPlayhead`
pub fn insert_at_playhead(ctx: &Context, req: &PathPayload) -> BridgeResult<Response> {
    let path = &req.path;
    if !path.exists() {
        return Err(BridgeError::file_not_found(path));
    }

    let timeline = ctx
        .session
        .current_timeline()
        .ok_or(BridgeError::NoActiveTimeline)?;
    let playhead = Playhead::read(timeline.as_ref(), ctx.config.render.fallback_fps)?;

    let project = ctx
        .session
        .current_project()
        .ok_or(BridgeError::NoActiveProject)?;
    let pool = media_pool(project.as_ref())?;
    let root = root_folder(pool.as_ref())?;

    let imported = pool.import_media(&[path.clone()], root.as_ref())?;
    let clip = match imported {
        ImportResult::Clips(clips) if !clips.is_empty() => clips.into_iter().next(),
        ImportResult::Acknowledged => find_clip(root.as_ref(), path),
        _ => None,
    }
    .ok_or(BridgeError::ClipNotFound)?;

    tracing::info!(path = %path.display(), frame = playhead.frame, "Inserting clip at playhead");
    if !timeline
        .append_clips(&[clip.as_ref()])
        .map_err(|e| BridgeError::insert_failed(e.to_string()))?
    {
        tracing::warn!("AppendToTimeline reported failure");
    }
    move_last_item(timeline.as_ref(), &playhead)?;

    Ok(Response::success().with("message", "Inserted at playhead"))
}

/// Match a clip in `folder` by file name or media id.
fn find_clip(folder: &dyn Folder, path: &Path) -> Option<Box<dyn Clip>> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let full = path.display().to_string();
    let clips = match folder.clips() {
        Ok(clips) => clips,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot list bin clips");
            return None;
        }
    };
    clips.into_iter().find(|clip| {
        clip.name().is_ok_and(|name| name == file_name)
            || clip.media_id().is_ok_and(|id| id.contains(&full))
    })
}

/// Move the newest item on video track 1 to the playhead.
///
/// A clip that cannot be moved stays at the end of the timeline; only
/// failing to enumerate the track is an error.
fn move_last_item(timeline: &dyn Timeline, playhead: &Playhead) -> BridgeResult<()> {
    let insert_failed = |e: resolve_bridge_automation_core::ApiError| {
        BridgeError::insert_failed(e.to_string())
    };
    if timeline.track_count(TrackKind::Video).map_err(insert_failed)? == 0 {
        return Ok(());
    }
    let items = timeline
        .items_in_track(TrackKind::Video, 1)
        .map_err(insert_failed)?;
    let Some(item) = items.last() else {
        return Ok(());
    };
    let item_name = item.name().unwrap_or_default();

    let by_frame = timeline.set_item_property(
        item.as_ref(),
        "Start",
        &PropertyValue::Int(playhead.frame),
    );
    let frame_err = match by_frame {
        Ok(true) => {
            tracing::debug!(clip = %item_name, frame = playhead.frame, "Moved clip to playhead");
            return Ok(());
        }
        Ok(false) => "rejected".to_string(),
        Err(e) => e.to_string(),
    };

    if let Some(tc) = &playhead.timecode {
        let by_timecode =
            timeline.set_item_property(item.as_ref(), "Start", &PropertyValue::Text(tc.clone()));
        if matches!(by_timecode, Ok(true)) {
            tracing::debug!(clip = %item_name, timecode = %tc, "Moved clip to playhead");
            return Ok(());
        }
    }
    tracing::warn!(
        clip = %item_name,
        frame = playhead.frame,
        error = %frame_err,
        "Could not move clip to playhead; left at end of timeline"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolve_bridge_automation_core::fake::{
        FakeClip, FakeImportMode, FakeProject, FakeResolve, FakeTimeline,
    };
    use resolve_bridge_automation_core::{ApiError, Session};
    use resolve_bridge_common::BridgeConfig;
    use std::path::PathBuf;

    struct Fixture {
        fake: FakeResolve,
        ctx: Context,
        media: tempfile::NamedTempFile,
    }

    fn fixture() -> Fixture {
        let mut project = FakeProject::named("Edit");
        let mut timeline = FakeTimeline::new("Main", 86400, 90000)
            .with_setting("timelineFrameRate", "24");
        timeline.timecode = Some("01:00:10:05".to_string());
        timeline.video_tracks = vec![vec!["intro.mov".to_string()]];
        project.timeline = Some(timeline);
        let fake = FakeResolve::with_project(project);
        let ctx = Context::new(
            Session::new(Box::new(fake.clone())),
            BridgeConfig::default(),
        );
        let media = tempfile::Builder::new().suffix(".mov").tempfile().unwrap();
        Fixture { fake, ctx, media }
    }

    impl Fixture {
        fn payload(&self) -> PathPayload {
            PathPayload {
                path: self.media.path().to_path_buf(),
            }
        }

        fn media_name(&self) -> String {
            self.media
                .path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        }
    }

    #[test]
    fn clip_lands_at_playhead_frame() {
        let fx = fixture();
        let response = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert_eq!(
            response.get("message").and_then(|v| v.as_str()),
            Some("Inserted at playhead")
        );

        let timeline = fx.fake.timeline();
        assert_eq!(timeline.video_tracks[0].last(), Some(&fx.media_name()));
        assert_eq!(
            timeline.placements,
            vec![(fx.media_name(), PropertyValue::Int(86645))]
        );
        assert_eq!(fx.fake.media_pool().imported, vec![fx.media.path().to_path_buf()]);
    }

    #[test]
    fn frame_placement_falls_back_to_timecode() {
        let fx = fixture();
        fx.fake.timeline_mut().accept_frame_start = false;
        insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert_eq!(
            fx.fake.timeline().placements,
            vec![(
                fx.media_name(),
                PropertyValue::Text("01:00:10:05".to_string())
            )]
        );
    }

    #[test]
    fn unmovable_clip_is_still_a_success() {
        let fx = fixture();
        {
            let mut timeline = fx.fake.timeline_mut();
            timeline.accept_frame_start = false;
            timeline.accept_timecode_start = false;
        }
        let response = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert!(response.ok);
        assert!(fx.fake.timeline().placements.is_empty());
        assert_eq!(fx.fake.timeline().video_tracks[0].len(), 2);
    }

    #[test]
    fn unreadable_playhead_uses_timeline_start() {
        let fx = fixture();
        fx.fake.timeline_mut().timecode = None;
        insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert_eq!(
            fx.fake.timeline().placements[0].1,
            PropertyValue::Int(86400)
        );
    }

    #[test]
    fn zero_frame_rate_uses_default() {
        let fx = fixture();
        fx.fake
            .timeline_mut()
            .settings
            .insert("timelineFrameRate".to_string(), "0".to_string());
        insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert_eq!(fx.fake.timeline().placements[0].1, PropertyValue::Int(86645));
    }

    #[test]
    fn acknowledged_import_is_found_by_name() {
        let fx = fixture();
        fx.fake.media_pool_mut().import_mode = FakeImportMode::Acknowledge;
        insert_at_playhead(&fx.ctx, &fx.payload()).unwrap();
        assert_eq!(fx.fake.timeline().video_tracks[0].len(), 2);
    }

    #[test]
    fn clip_lookup_matches_media_id() {
        let fx = fixture();
        fx.fake.media_pool_mut().root.clips.push(FakeClip {
            name: "Renamed".to_string(),
            media_id: format!("file://{}", fx.media.path().display()),
        });
        let project = fx.ctx.session.project().unwrap();
        let pool = media_pool(project.as_ref()).unwrap();
        let root = root_folder(pool.as_ref()).unwrap();

        let clip = find_clip(root.as_ref(), fx.media.path()).unwrap();
        assert_eq!(clip.name().unwrap(), "Renamed");
        assert!(find_clip(root.as_ref(), Path::new("/other/file.mov")).is_none());
    }

    #[test]
    fn empty_import_is_not_searched() {
        let fx = fixture();
        {
            let mut pool = fx.fake.media_pool_mut();
            pool.import_mode = FakeImportMode::Nothing;
            pool.root.clips.push(FakeClip::for_path(fx.media.path()));
        }
        let err = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to import or find clip");
    }

    #[test]
    fn append_failure_is_reported() {
        let fx = fixture();
        fx.fake.timeline_mut().append_error =
            Some(ApiError::call("AppendToTimeline", "timeline locked"));
        let err = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to insert clip: timeline locked");
    }

    #[test]
    fn missing_file_is_checked_first() {
        let ctx = Context::new(Session::unavailable(), BridgeConfig::default());
        let req = PathPayload {
            path: PathBuf::from("/definitely/not/here.mov"),
        };
        let err = insert_at_playhead(&ctx, &req).unwrap_err();
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn missing_context_is_reported() {
        let fx = fixture();
        fx.fake.project_mut().media_pool = None;
        let err = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap_err();
        assert_eq!(err.to_string(), "Media pool not available");

        fx.fake.project_mut().timeline = None;
        let err = insert_at_playhead(&fx.ctx, &fx.payload()).unwrap_err();
        assert_eq!(err.to_string(), "No active timeline");
    }

    #[test]
    fn drop_frame_timecode_converts() {
        let fx = fixture();
        fx.fake.timeline_mut().timecode = Some("00:00:01;02".to_string());
        let timeline = fx.ctx.session.timeline().unwrap();
        let playhead = Playhead::read(timeline.as_ref(), 24.0).unwrap();
        assert_eq!(playhead.frame, 26);
    }
}
