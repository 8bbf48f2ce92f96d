//! Installer configuration.
//! Loaded from `<config dir>/ccr-installer/installer.toml`; every field is optional.

use crate::error::{InstallError, InstallResult};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Known release flavours. Each names a repository and an asset; the config
/// file may override either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// macOS-specific tarball
    Macos,
    /// Platform-neutral tarball built from the main branch
    #[default]
    Main,
}

impl Profile {
    pub fn repository(&self) -> &'static str {
        "musistudio/claude-code-router"
    }

    pub fn asset(&self) -> &'static str {
        match self {
            Profile::Macos => "claude-code-router-macos.tar.gz",
            Profile::Main => "ccr-main.tar.gz",
        }
    }

    pub fn all() -> &'static [Profile] {
        &[Profile::Macos, Profile::Main]
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "macos" => Ok(Profile::Macos),
            "main" => Ok(Profile::Main),
            other => Err(format!("unknown profile '{other}' (expected macos or main)")),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Macos => write!(f, "macos"),
            Profile::Main => write!(f, "main"),
        }
    }
}

/// Top-level installer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default)]
    pub profile: Profile,
    /// `owner/name` on GitHub; falls back to the profile
    #[serde(default)]
    pub repository: Option<String>,
    /// Release asset file name; falls back to the profile
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,
    /// Name of the command placed in `bin_dir`
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    /// Path of the executable inside the extracted archive
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Defaults to `<data dir>/claude-code-router`
    #[serde(default)]
    pub install_dir: Option<PathBuf>,
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    /// Defaults to `~/.claude-code-router`
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    /// Marker written by the running service, relative to `config_dir`
    #[serde(default = "default_pid_file")]
    pub pid_file: String,
    /// Interpreter the entry point needs; empty disables the check
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub privilege: PrivilegeConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            repository: None,
            asset: None,
            release_base_url: default_release_base_url(),
            binary_name: default_binary_name(),
            entry_point: default_entry_point(),
            install_dir: None,
            bin_dir: default_bin_dir(),
            config_dir: None,
            pid_file: default_pid_file(),
            runtime: default_runtime(),
            download: DownloadConfig::default(),
            privilege: PrivilegeConfig::default(),
        }
    }
}

impl InstallerConfig {
    pub fn repository(&self) -> &str {
        self.repository
            .as_deref()
            .unwrap_or_else(|| self.profile.repository())
    }

    pub fn asset(&self) -> &str {
        self.asset.as_deref().unwrap_or_else(|| self.profile.asset())
    }
}

fn default_release_base_url() -> String {
    "https://github.com".to_string()
}

fn default_binary_name() -> String {
    "ccr".to_string()
}

fn default_entry_point() -> String {
    "dist/cli.js".to_string()
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("/usr/local/bin")
}

fn default_pid_file() -> String {
    ".claude-code-router.pid".to_string()
}

fn default_runtime() -> String {
    "node".to_string()
}

/// How the archive is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Spawn `curl`
    #[default]
    Curl,
    /// In-process HTTP client
    Native,
}

/// Download behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Total attempts, including the first
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Fixed pause between attempts
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Whole-transfer timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            attempts: default_attempts(),
            backoff_secs: default_backoff_secs(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl DownloadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.backoff_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Elevation settings for writing into `bin_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeConfig {
    /// Allow running the elevation program when `bin_dir` is not writable
    #[serde(default = "default_allow_elevation")]
    pub allow_elevation: bool,
    #[serde(default = "default_elevation_program")]
    pub program: String,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            allow_elevation: default_allow_elevation(),
            program: default_elevation_program(),
        }
    }
}

fn default_allow_elevation() -> bool {
    true
}

fn default_elevation_program() -> String {
    "sudo".to_string()
}

/// Get the path to the installer configuration file
/// Location: `<config dir>/ccr-installer/installer.toml`
pub fn installer_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ccr-installer").join("installer.toml"))
}

/// Load the installer configuration.
///
/// An explicit `path` must exist. Without one, the default location is used
/// and a missing file yields the defaults.
pub fn load_installer_config(path: Option<&Path>) -> InstallResult<InstallerConfig> {
    let (config_path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match installer_config_path() {
            Some(p) => (p, false),
            None => return Ok(InstallerConfig::default()),
        },
    };

    if !config_path.exists() {
        if required {
            return Err(InstallError::Config {
                path: config_path,
                reason: "file not found".to_string(),
            });
        }
        return Ok(InstallerConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| InstallError::io("reading config", &config_path, e))?;
    parse_installer_config(&contents).map_err(|reason| InstallError::Config {
        path: config_path,
        reason,
    })
}

pub fn parse_installer_config(contents: &str) -> Result<InstallerConfig, String> {
    toml::from_str(contents).map_err(|e| e.to_string())
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InstallerConfig::default();
        assert_eq!(config.profile, Profile::Main);
        assert_eq!(config.asset(), "ccr-main.tar.gz");
        assert_eq!(config.binary_name, "ccr");
        assert_eq!(config.entry_point, "dist/cli.js");
        assert_eq!(config.bin_dir, PathBuf::from("/usr/local/bin"));
        assert_eq!(config.download.attempts, 3);
        assert_eq!(config.download.backoff_secs, 2);
        assert_eq!(config.download.timeout_secs, 300);
        assert_eq!(config.download.connect_timeout_secs, 10);
        assert!(config.privilege.allow_elevation);
        assert_eq!(config.download.backend, Backend::Curl);
    }

    #[test]
    fn test_profile_presets() {
        let mut config = InstallerConfig::default();
        config.profile = Profile::Macos;
        assert_eq!(config.asset(), "claude-code-router-macos.tar.gz");
        assert_eq!(config.repository(), "musistudio/claude-code-router");

        config.asset = Some("custom.tar.gz".into());
        config.repository = Some("someone/fork".into());
        assert_eq!(config.asset(), "custom.tar.gz");
        assert_eq!(config.repository(), "someone/fork");
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("macos".parse::<Profile>(), Ok(Profile::Macos));
        assert_eq!("main".parse::<Profile>(), Ok(Profile::Main));
        assert!("linux".parse::<Profile>().is_err());
        assert_eq!(Profile::all().len(), 2);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = parse_installer_config(
            r#"
profile = "macos"
bin_dir = "/opt/bin"

[download]
backend = "native"
attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.profile, Profile::Macos);
        assert_eq!(config.bin_dir, PathBuf::from("/opt/bin"));
        assert_eq!(config.download.backend, Backend::Native);
        assert_eq!(config.download.attempts, 5);
        assert_eq!(config.download.backoff_secs, 2);
        assert_eq!(config.pid_file, ".claude-code-router.pid");
    }

    #[test]
    fn test_parse_rejects_bad_backend() {
        let err = parse_installer_config("[download]\nbackend = \"wget\"\n").unwrap_err();
        assert!(err.contains("wget") || err.contains("variant"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_installer_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, InstallError::Config { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.toml");
        std::fs::write(&path, "binary_name = \"ccr-dev\"\n").unwrap();
        let config = load_installer_config(Some(&path)).unwrap();
        assert_eq!(config.binary_name, "ccr-dev");
    }

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("/usr/local/bin");
        assert_eq!(expand_home(&plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.ccr")), home.join(".ccr"));
        }
    }
}
