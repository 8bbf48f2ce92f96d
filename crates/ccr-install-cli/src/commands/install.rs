use anyhow::{Context, Result};
use ccr_install::{interrupt, Installer, InstallerConfig, ReleaseVersion, Reporter};
use ccr_install_cli::console::ConsoleReporter;

pub fn handle(config: InstallerConfig, version: &str) -> Result<()> {
    let interrupt = interrupt::install_handler().context("installing signal handler")?;
    let installer = Installer::new(config, interrupt)?;
    let version = ReleaseVersion::parse(version);

    let mut reporter = ConsoleReporter;
    let outcome = installer.install(&version, &mut reporter)?;
    if !outcome.on_path {
        reporter.warn(&format!(
            "Run it directly with {} until PATH is fixed",
            outcome.link.display()
        ));
    }
    Ok(())
}
