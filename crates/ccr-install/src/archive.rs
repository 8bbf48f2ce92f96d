//! Archive extraction and layout checks

use crate::error::{InstallError, InstallResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Unpacks a downloaded archive into a directory.
pub trait Extractor {
    fn extract(&self, archive: &Path, dest: &Path) -> InstallResult<()>;

    /// External program that must be on PATH.
    fn required_tool(&self) -> Option<&'static str> {
        None
    }
}

/// Spawns `tar -xzf`.
#[derive(Debug, Clone, Default)]
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn required_tool(&self) -> Option<&'static str> {
        Some("tar")
    }

    fn extract(&self, archive: &Path, dest: &Path) -> InstallResult<()> {
        let mut cmd = Command::new("tar");
        cmd.arg("-xzf").arg(archive).arg("-C").arg(dest);
        debug!(?cmd, "spawning tar");

        let output = cmd.output().map_err(|e| InstallError::ExtractionFailed {
            archive: archive.to_path_buf(),
            reason: format!("failed to run tar: {e}"),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallError::ExtractionFailed {
                archive: archive.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Reject empty downloads before handing them to `tar`.
pub fn ensure_non_empty(archive: &Path, url: &str) -> InstallResult<u64> {
    let len = std::fs::metadata(archive)
        .map_err(|e| InstallError::io("inspecting download", archive, e))?
        .len();
    if len == 0 {
        return Err(InstallError::EmptyArtifact {
            url: url.to_string(),
        });
    }
    Ok(len)
}

/// Locate the entry point inside an extracted tree.
pub fn verify_entry_point(root: &Path, entry_relative: &Path) -> InstallResult<PathBuf> {
    let entry = root.join(entry_relative);
    if !entry.is_file() {
        return Err(InstallError::ArchiveLayoutMismatch {
            entry_point: entry_relative.to_path_buf(),
        });
    }
    Ok(entry)
}

/// Add execute bits for everyone who can read the file.
pub fn make_executable(path: &Path) -> InstallResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| InstallError::io("reading permissions", path, e))?
            .permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)
            .map_err(|e| InstallError::io("marking executable", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
