//! Reveal a file in the desktop file manager.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;

/// Shows a file to the user in the platform file manager.
pub trait Revealer {
    /// Launch the file manager for `path`.
    ///
    /// Succeeds once the command has been issued; its exit status is not
    /// inspected. Fails only when the command could not be launched.
    fn reveal(&self, path: &Path) -> io::Result<()>;
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealCommand {
    pub program: &'static str,
    pub args: Vec<OsString>,
}

impl RevealCommand {
    /// Command that reveals `path` on the platform this binary targets.
    pub fn for_path(path: &Path) -> Self {
        Self::for_platform(Platform::current(), path)
    }

    pub fn for_platform(platform: Platform, path: &Path) -> Self {
        match platform {
            Platform::MacOs => Self {
                program: "open",
                args: vec!["-R".into(), path.into()],
            },
            Platform::Windows => Self {
                program: "explorer",
                args: vec!["/select,".into(), path.into()],
            },
            Platform::Other => {
                let dir = path.parent().unwrap_or(path);
                Self {
                    program: "xdg-open",
                    args: vec![dir.into()],
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Runs the platform reveal command and waits for it to exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRevealer;

impl Revealer for SystemRevealer {
    fn reveal(&self, path: &Path) -> io::Result<()> {
        let cmd = RevealCommand::for_path(path);
        tracing::debug!(program = cmd.program, args = ?cmd.args, "Revealing file");

        let status = Command::new(cmd.program).args(&cmd.args).status()?;
        if !status.success() {
            // explorer.exe exits 1 even when it selected the file.
            tracing::debug!(program = cmd.program, %status, "Reveal command exited non-zero");
        }
        Ok(())
    }
}
