//! DaVinci Resolve automation backend.
//!
//! Resolve only exposes its scripting API to Python and Lua. With the
//! `python` feature this crate embeds an interpreter, imports
//! `DaVinciResolveScript` and wraps the returned objects in the
//! `resolve-bridge-automation-core` traits. Without the feature (or when
//! Resolve is not running) [`connect`] yields an unavailable session.

use std::path::{Path, PathBuf};

use resolve_bridge_automation_core::Session;

#[cfg(feature = "python")]
mod python;

/// Environment variable pointing at Resolve's `Developer/Scripting` folder.
pub const SCRIPT_API_ENV: &str = "RESOLVE_SCRIPT_API";

/// Connect to a running Resolve instance.
pub fn connect() -> Session {
    let module_dirs = script_module_dirs();
    tracing::debug!(dirs = ?module_dirs, "Resolve scripting module search path");
    connect_with(&module_dirs)
}

#[cfg(feature = "python")]
fn connect_with(module_dirs: &[PathBuf]) -> Session {
    match python::PyResolve::connect(module_dirs) {
        Ok(api) => {
            tracing::debug!("Connected to Resolve scripting API");
            Session::new(Box::new(api))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Resolve scripting API unavailable");
            Session::unavailable()
        }
    }
}

#[cfg(not(feature = "python"))]
fn connect_with(_module_dirs: &[PathBuf]) -> Session {
    tracing::warn!("Built without the `python` feature; Resolve scripting API unavailable");
    Session::unavailable()
}

/// Directories searched for `DaVinciResolveScript.py`, most specific first.
pub fn script_module_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(api) = std::env::var(SCRIPT_API_ENV) {
        if !api.is_empty() {
            dirs.push(Path::new(&api).join("Modules"));
        }
    }
    dirs.extend(default_module_dirs());
    dirs
}

#[cfg(target_os = "macos")]
fn default_module_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from(
        "/Library/Application Support/Blackmagic Design/DaVinci Resolve/Developer/Scripting/Modules",
    )]
}

#[cfg(target_os = "windows")]
fn default_module_dirs() -> Vec<PathBuf> {
    let program_data =
        std::env::var("PROGRAMDATA").unwrap_or_else(|_| r"C:\ProgramData".to_string());
    vec![Path::new(&program_data)
        .join("Blackmagic Design")
        .join("DaVinci Resolve")
        .join("Support")
        .join("Developer")
        .join("Scripting")
        .join("Modules")]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_module_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/opt/resolve/Developer/Scripting/Modules"),
        PathBuf::from("/home/resolve/Developer/Scripting/Modules"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_dirs_end_with_modules_folder() {
        let dirs = script_module_dirs();
        assert!(!dirs.is_empty());
        assert!(dirs.iter().all(|d| d.ends_with("Modules")));
    }

    #[cfg(not(feature = "python"))]
    #[test]
    fn without_python_session_is_unavailable() {
        assert!(!connect_with(&[]).is_available());
    }
}
