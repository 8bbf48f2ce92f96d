//! Command symlink in the system binary directory

use crate::error::{InstallError, InstallResult};
use crate::privilege::{Access, Elevation};
use std::path::Path;
use tracing::debug;

/// What `unlink` found at the link path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlinked {
    Removed,
    Absent,
    /// A regular file or directory; left alone.
    NotASymlink,
}

/// Creates and removes the command symlink, elevating only when told to.
#[derive(Debug, Clone)]
pub struct Linker {
    elevation: Elevation,
}

impl Linker {
    pub fn new(elevation: Elevation) -> Self {
        Self { elevation }
    }

    /// Point `link` at `target`, replacing whatever is there.
    pub fn link(&self, target: &Path, link: &Path, access: Access) -> InstallResult<()> {
        let bin_dir = link.parent().unwrap_or_else(|| Path::new("/"));
        match access {
            Access::Direct => {
                std::fs::create_dir_all(bin_dir)
                    .map_err(|e| InstallError::io("creating bin directory", bin_dir, e))?;
                if let Ok(meta) = std::fs::symlink_metadata(link) {
                    debug!(link = %link.display(), "replacing existing entry");
                    let removed = if meta.is_dir() {
                        Err(std::io::Error::other("a directory is in the way"))
                    } else {
                        std::fs::remove_file(link)
                    };
                    removed.map_err(|e| symlink_failed(target, link, e))?;
                }
                create_symlink(target, link).map_err(|e| symlink_failed(target, link, e))
            }
            Access::NeedsElevation => {
                self.elevation.run(bin_dir, "mkdir", &[Path::new("-p"), bin_dir])?;
                self.elevation
                    .run(link, "ln", &[Path::new("-sfn"), target, link])
            }
        }
    }

    pub fn unlink(&self, link: &Path) -> InstallResult<Unlinked> {
        let meta = match std::fs::symlink_metadata(link) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Unlinked::Absent),
            Err(e) => return Err(InstallError::io("inspecting link", link, e)),
        };
        if !meta.file_type().is_symlink() {
            return Ok(Unlinked::NotASymlink);
        }

        let bin_dir = link.parent().unwrap_or_else(|| Path::new("/"));
        match Access::for_dir(bin_dir) {
            Access::Direct => std::fs::remove_file(link)
                .map_err(|e| InstallError::io("removing link", link, e))?,
            Access::NeedsElevation => {
                self.elevation.run(link, "rm", &[Path::new("-f"), link])?
            }
        }
        Ok(Unlinked::Removed)
    }
}

fn symlink_failed(target: &Path, link: &Path, e: std::io::Error) -> InstallError {
    InstallError::SymlinkFailed {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        reason: e.to_string(),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
