//! Write access checks and explicit elevation.
//!
//! Callers ask [`Access::for_dir`] first and surface the answer to the user;
//! only then does [`Elevation::run`] spawn the elevation program.

use crate::config::PrivilegeConfig;
use crate::error::{InstallError, InstallResult};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Whether the current user can modify a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Direct,
    NeedsElevation,
}

impl Access {
    /// Check `dir`, or its nearest existing ancestor when `dir` does not
    /// exist yet (it will have to be created there).
    pub fn for_dir(dir: &Path) -> Access {
        let probe = nearest_existing(dir);
        if is_writable(&probe) {
            Access::Direct
        } else {
            Access::NeedsElevation
        }
    }
}

fn nearest_existing(dir: &Path) -> PathBuf {
    dir.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Runs commands through `sudo` (or the configured program) when allowed.
#[derive(Debug, Clone)]
pub struct Elevation {
    allowed: bool,
    program: String,
}

impl Elevation {
    pub fn from_config(config: &PrivilegeConfig) -> Self {
        Self {
            allowed: config.allow_elevation,
            program: config.program.clone(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            allowed: false,
            program: String::new(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `command args...` elevated. `target` is the path being modified,
    /// used in error messages.
    pub fn run<S: AsRef<OsStr>>(
        &self,
        target: &Path,
        command: &str,
        args: &[S],
    ) -> InstallResult<()> {
        if !self.allowed {
            return Err(InstallError::PrivilegeDenied {
                path: target.to_path_buf(),
                reason: "elevation is disabled; rerun as a user who can write there".to_string(),
            });
        }
        if which::which(&self.program).is_err() {
            return Err(InstallError::PrivilegeDenied {
                path: target.to_path_buf(),
                reason: format!("{} is not available", self.program),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg(command).args(args);
        debug!(?cmd, "running elevated");
        let status = cmd.status().map_err(|e| InstallError::PrivilegeDenied {
            path: target.to_path_buf(),
            reason: format!("failed to run {}: {e}", self.program),
        })?;
        if !status.success() {
            return Err(InstallError::PrivilegeDenied {
                path: target.to_path_buf(),
                reason: format!("`{} {command}` exited with {status}", self.program),
            });
        }
        Ok(())
    }
}
