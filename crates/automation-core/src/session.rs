//! The per-process automation session.
//!
//! A session is created once at startup. When the scripting API could not be
//! reached it is *unavailable*, and every accessor reports
//! [`SessionError::ApiUnavailable`] instead of handing out a null handle.

use std::fmt;

use crate::error::SessionError;
use crate::{Folder, MediaPool, Project, ProjectManager, ResolveApi, Timeline};

pub struct Session {
    api: Option<Box<dyn ResolveApi>>,
}

impl Session {
    pub fn new(api: Box<dyn ResolveApi>) -> Self {
        Self { api: Some(api) }
    }

    pub fn unavailable() -> Self {
        Self { api: None }
    }

    pub fn is_available(&self) -> bool {
        self.api.is_some()
    }

    pub fn project_manager(&self) -> Result<Box<dyn ProjectManager>, SessionError> {
        let api = self.api.as_ref().ok_or(SessionError::ApiUnavailable)?;
        api.project_manager()?
            .ok_or(SessionError::NoProjectManager)
    }

    pub fn project(&self) -> Result<Box<dyn Project>, SessionError> {
        self.project_manager()?
            .current_project()?
            .ok_or(SessionError::NoProject)
    }

    pub fn timeline(&self) -> Result<Box<dyn Timeline>, SessionError> {
        self.project()?
            .current_timeline()?
            .ok_or(SessionError::NoTimeline)
    }

    /// Best-effort project lookup; any failure reads as "no project".
    pub fn current_project(&self) -> Option<Box<dyn Project>> {
        self.project()
            .map_err(|e| tracing::debug!(error = %e, "No current project"))
            .ok()
    }

    /// Best-effort timeline lookup; any failure reads as "no timeline".
    pub fn current_timeline(&self) -> Option<Box<dyn Timeline>> {
        self.timeline()
            .map_err(|e| tracing::debug!(error = %e, "No current timeline"))
            .ok()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Media pool of `project`.
pub fn media_pool(project: &dyn Project) -> Result<Box<dyn MediaPool>, SessionError> {
    project.media_pool()?.ok_or(SessionError::NoMediaPool)
}

/// Root bin of `pool`.
pub fn root_folder(pool: &dyn MediaPool) -> Result<Box<dyn Folder>, SessionError> {
    pool.root_folder()?.ok_or(SessionError::NoRootFolder)
}
