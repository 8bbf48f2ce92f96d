//! Filesystem layout of an installation and helpers to inspect it

use crate::config::{expand_home, InstallerConfig};
use crate::error::{InstallError, InstallResult};
use crate::privilege::Access;
use std::path::{Component, Path, PathBuf};

/// Every path an install touches, resolved from the config.
///
/// There is no install manifest: these paths and whether they exist are the
/// whole installation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Extracted archive lives here
    pub install_dir: PathBuf,
    /// Entry point relative to `install_dir`
    pub entry_relative: PathBuf,
    /// `install_dir/entry_relative`
    pub entry_point: PathBuf,
    /// System directory searched by PATH
    pub bin_dir: PathBuf,
    /// `bin_dir/<binary name>`
    pub link: PathBuf,
    pub binary_name: String,
    /// User configuration of the installed application
    pub config_dir: PathBuf,
    /// Present while the background service runs
    pub pid_file: PathBuf,
}

impl InstallLayout {
    pub fn from_config(config: &InstallerConfig) -> InstallResult<Self> {
        let install_dir = match &config.install_dir {
            Some(dir) => expand_home(dir),
            None => dirs::data_local_dir()
                .ok_or_else(|| no_home("install_dir"))?
                .join("claude-code-router"),
        };
        let config_dir = match &config.config_dir {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .ok_or_else(|| no_home("config_dir"))?
                .join(".claude-code-router"),
        };
        let bin_dir = expand_home(&config.bin_dir);

        let entry_relative = PathBuf::from(&config.entry_point);
        if !is_contained(&entry_relative) {
            return Err(InstallError::Config {
                path: entry_relative,
                reason: "entry_point must be a relative path inside the archive".to_string(),
            });
        }
        if config.binary_name.is_empty() || config.binary_name.contains('/') {
            return Err(InstallError::Config {
                path: PathBuf::from(&config.binary_name),
                reason: "binary_name must be a plain file name".to_string(),
            });
        }

        Ok(Self {
            entry_point: install_dir.join(&entry_relative),
            link: bin_dir.join(&config.binary_name),
            pid_file: config_dir.join(&config.pid_file),
            install_dir,
            entry_relative,
            bin_dir,
            binary_name: config.binary_name.clone(),
            config_dir,
        })
    }

    /// Parent of the install directory; staging directories are created here
    /// so the final move is a same-filesystem rename.
    pub fn install_parent(&self) -> &Path {
        self.install_dir.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Snapshot of what currently exists on disk.
    pub fn status(&self) -> InstallStatus {
        let link_meta = std::fs::symlink_metadata(&self.link).ok();
        let link_target = link_meta
            .as_ref()
            .filter(|m| m.file_type().is_symlink())
            .and_then(|_| std::fs::read_link(&self.link).ok());
        let link_is_current = link_target
            .as_ref()
            .map(|t| same_file(t, &self.entry_point))
            .unwrap_or(false);

        InstallStatus {
            install_dir_exists: self.install_dir.is_dir(),
            entry_point_exists: self.entry_point.is_file(),
            link_present: link_meta.is_some(),
            link_is_symlink: link_target.is_some(),
            link_target,
            link_is_current,
            resolved_on_path: which::which(&self.binary_name).ok(),
            bin_dir_access: Access::for_dir(&self.bin_dir),
            config_dir_exists: self.config_dir.is_dir(),
            service_marker_exists: self.pid_file.exists(),
        }
    }
}

/// What an installation looks like right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStatus {
    pub install_dir_exists: bool,
    pub entry_point_exists: bool,
    /// Anything at the link path, symlink or not
    pub link_present: bool,
    pub link_is_symlink: bool,
    pub link_target: Option<PathBuf>,
    /// Link points at this layout's entry point
    pub link_is_current: bool,
    pub resolved_on_path: Option<PathBuf>,
    /// Whether linking into `bin_dir` would need elevation
    pub bin_dir_access: Access,
    pub config_dir_exists: bool,
    pub service_marker_exists: bool,
}

impl InstallStatus {
    pub fn is_installed(&self) -> bool {
        self.entry_point_exists && self.link_is_current
    }
}

fn no_home(field: &str) -> InstallError {
    InstallError::Config {
        path: PathBuf::from(field),
        reason: "cannot determine home directory; set it explicitly".to_string(),
    }
}

/// Relative, non-empty, and never climbs out with `..`.
fn is_contained(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Paths name the same file once symlinks are resolved.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
