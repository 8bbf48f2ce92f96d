//! Install engine for claude-code-router release archives.
//!
//! Downloads a release tarball from GitHub, extracts it into a user-scoped
//! install directory, and links its entry point into a system binary
//! directory. Uninstall reverses those steps.
//!
//! ```text
//! install:   download ─> extract (staging) ─> swap into install dir ─> link ─> verify
//! uninstall: stop service ─> unlink ─> remove install dir ─> (ask) remove config dir
//! ```
//!
//! The archive itself is opaque. The only thing required of it is that the
//! configured entry point (default `dist/cli.js`) exists after extraction.
//!
//! # Privileges
//!
//! Writing to the binary directory may need elevation. [`Access::for_dir`]
//! reports that up front; the elevation program (default `sudo`) is only
//! spawned when the directory is not writable and elevation is allowed.

pub mod archive;
pub mod config;
pub mod deps;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod interrupt;
pub mod layout;
pub mod link;
pub mod privilege;
pub mod release;
pub mod report;
pub mod retry;
pub mod uninstaller;

pub use archive::{Extractor, TarExtractor};
pub use config::{
    installer_config_path, load_installer_config, Backend, InstallerConfig, Profile,
};
pub use error::{ExitCode, InstallError, InstallResult};
pub use fetch::{CurlFetcher, FetchError, Fetcher, NativeFetcher};
pub use installer::{InstallOutcome, Installer};
pub use interrupt::Interrupt;
pub use layout::{same_file, InstallLayout, InstallStatus};
pub use privilege::Access;
pub use release::{build_download_url, ReleaseVersion};
pub use report::{Level, MemoryReporter, Reporter};
pub use retry::RetryPolicy;
pub use uninstaller::{Confirm, FixedAnswer, UninstallOutcome, Uninstaller};
