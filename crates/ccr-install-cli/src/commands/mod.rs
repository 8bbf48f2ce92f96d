pub mod completions;
pub mod install;
pub mod status;
pub mod uninstall;
pub mod version;

use ccr_install::{load_installer_config, InstallResult, InstallerConfig};
use ccr_install_cli::Cli;
use tracing::debug;

/// Load the installer config and apply the global command-line overrides.
pub fn load_config(cli: &Cli) -> InstallResult<InstallerConfig> {
    let mut config = load_installer_config(cli.config.as_deref())?;
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    if cli.no_elevate {
        config.privilege.allow_elevation = false;
    }
    debug!(
        profile = %config.profile,
        repository = config.repository(),
        asset = config.asset(),
        "loaded installer config"
    );
    Ok(config)
}
