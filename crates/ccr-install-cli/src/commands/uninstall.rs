use anyhow::Result;
use ccr_install::{FixedAnswer, InstallerConfig, Uninstaller};
use ccr_install_cli::console::{ConsoleReporter, LineConfirm};

/// Uninstall problems are reported as warnings and never fail the command.
pub fn handle(config: &InstallerConfig, purge: bool) -> Result<()> {
    let uninstaller = Uninstaller::new(config)?;
    let mut reporter = ConsoleReporter;
    if purge {
        uninstaller.uninstall(&mut FixedAnswer(true), &mut reporter);
    } else {
        uninstaller.uninstall(&mut LineConfirm::stdin(), &mut reporter);
    }
    Ok(())
}
