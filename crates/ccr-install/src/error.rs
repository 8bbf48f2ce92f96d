//! Error types and exit codes for install and uninstall runs.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes reported by the installer binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every step completed (warnings allowed)
    Success = 0,
    /// An install step failed
    Failure = 1,
    /// Unknown command or bad arguments
    Usage = 2,
    /// `curl` or `tar` not on PATH
    DependencyMissing = 3,
    /// Elevation refused or unavailable
    PrivilegeDenied = 4,
    /// SIGINT / SIGTERM received mid-run
    Interrupted = 130,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Errors raised by the install engine.
///
/// Install steps treat every variant as fatal. Uninstall steps report them as
/// warnings and keep going.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Required tools are not on PATH.
    #[error(
        "missing required tools: {}. Install them with your package manager and retry",
        .tools.join(", ")
    )]
    DependencyMissing { tools: Vec<String> },

    /// Every download attempt failed.
    #[error(
        "download failed after {attempts} attempt(s) from {url}: {reason}. \
         Check your network connection and that the release exists"
    )]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The server answered but the file is empty.
    #[error("downloaded archive from {url} is empty")]
    EmptyArtifact { url: String },

    /// `tar` could not unpack the archive.
    #[error("failed to extract {}: {reason}", .archive.display())]
    ExtractionFailed { archive: PathBuf, reason: String },

    /// The archive unpacked but the entry point is not where it should be.
    #[error("archive does not contain the expected entry point {}", .entry_point.display())]
    ArchiveLayoutMismatch { entry_point: PathBuf },

    /// The target directory needs elevation and it was not granted.
    #[error("elevated privileges required for {}: {reason}", .path.display())]
    PrivilegeDenied { path: PathBuf, reason: String },

    /// Creating or replacing the command symlink failed.
    #[error("failed to link {} -> {}: {reason}", .link.display(), .target.display())]
    SymlinkFailed {
        link: PathBuf,
        target: PathBuf,
        reason: String,
    },

    /// The installed command is not usable from PATH. Reported as a warning only.
    #[error("{command} is not resolvable on PATH: {hint}")]
    PostInstallVerificationFailed { command: String, hint: String },

    /// The config file exists but cannot be used.
    #[error("invalid installer config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// A filesystem step failed.
    #[error("{step} failed for {}: {source}", .path.display())]
    Io {
        step: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("interrupted")]
    Interrupted,
}

impl InstallError {
    pub fn io(step: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            step,
            path: path.into(),
            source,
        }
    }

    /// Exit code for a run that ended with this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            InstallError::DependencyMissing { .. } => ExitCode::DependencyMissing,
            InstallError::PrivilegeDenied { .. } => ExitCode::PrivilegeDenied,
            InstallError::Interrupted => ExitCode::Interrupted,
            _ => ExitCode::Failure,
        }
    }
}

/// Result type alias for install operations.
pub type InstallResult<T> = Result<T, InstallError>;
