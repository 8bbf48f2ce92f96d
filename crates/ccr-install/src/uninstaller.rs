//! Uninstall flow.
//!
//! Every step is best-effort: failures become warnings and the next step
//! still runs, so a partially broken install is cleaned up as far as possible.

use crate::config::InstallerConfig;
use crate::error::InstallResult;
use crate::layout::InstallLayout;
use crate::link::{Linker, Unlinked};
use crate::privilege::Elevation;
use crate::report::Reporter;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Answers a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Always gives the same answer without asking.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _question: &str) -> bool {
        self.0
    }
}

/// What the uninstall did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallOutcome {
    pub stopped_service: bool,
    pub removed_link: bool,
    pub removed_install_dir: bool,
    pub removed_config_dir: bool,
    /// Steps that failed and were skipped
    pub warnings: usize,
}

pub struct Uninstaller {
    layout: InstallLayout,
    linker: Linker,
}

impl Uninstaller {
    pub fn new(config: &InstallerConfig) -> InstallResult<Self> {
        Ok(Self {
            layout: InstallLayout::from_config(config)?,
            linker: Linker::new(Elevation::from_config(&config.privilege)),
        })
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Remove the installation. Never fails; problems are counted in
    /// [`UninstallOutcome::warnings`] and reported as they happen.
    pub fn uninstall(
        &self,
        confirm: &mut dyn Confirm,
        reporter: &mut dyn Reporter,
    ) -> UninstallOutcome {
        let mut outcome = UninstallOutcome::default();
        let name = &self.layout.binary_name;
        reporter.info(&format!("Uninstalling {name}"));

        self.stop_service(&mut outcome, reporter);
        self.remove_link(&mut outcome, reporter);
        self.remove_install_dir(&mut outcome, reporter);
        self.remove_config_dir(confirm, &mut outcome, reporter);

        if outcome.warnings == 0 {
            reporter.success(&format!("{name} uninstalled"));
        } else {
            reporter.warn(&format!(
                "{name} uninstalled with {} warning(s); see above",
                outcome.warnings
            ));
        }
        outcome
    }

    fn stop_service(&self, outcome: &mut UninstallOutcome, reporter: &mut dyn Reporter) {
        if !self.layout.pid_file.exists() {
            return;
        }
        let Some(command) = self.installed_command() else {
            outcome.warnings += 1;
            reporter.warn(&format!(
                "service marker {} exists but {} is not installed; stop the service manually",
                self.layout.pid_file.display(),
                self.layout.binary_name
            ));
            return;
        };

        reporter.info("Stopping running service");
        debug!(command = %command.display(), "running stop");
        match Command::new(&command).arg("stop").status() {
            Ok(status) if status.success() => {
                outcome.stopped_service = true;
                reporter.success("Service stopped");
            }
            Ok(status) => {
                outcome.warnings += 1;
                reporter.warn(&format!("`{} stop` exited with {status}", self.layout.binary_name));
            }
            Err(e) => {
                outcome.warnings += 1;
                reporter.warn(&format!("failed to run `{} stop`: {e}", command.display()));
            }
        }
    }

    /// Prefer the link; fall back to the entry point if the link is gone.
    fn installed_command(&self) -> Option<PathBuf> {
        [&self.layout.link, &self.layout.entry_point]
            .into_iter()
            .find(|p| p.is_file())
            .cloned()
    }

    fn remove_link(&self, outcome: &mut UninstallOutcome, reporter: &mut dyn Reporter) {
        let link = &self.layout.link;
        match self.linker.unlink(link) {
            Ok(Unlinked::Removed) => {
                outcome.removed_link = true;
                reporter.success(&format!("Removed {}", link.display()));
            }
            Ok(Unlinked::Absent) => reporter.info(&format!("No link at {}", link.display())),
            Ok(Unlinked::NotASymlink) => {
                outcome.warnings += 1;
                reporter.warn(&format!(
                    "{} is not a symlink; leaving it in place",
                    link.display()
                ));
            }
            Err(e) => {
                outcome.warnings += 1;
                reporter.warn(&e.to_string());
            }
        }
    }

    fn remove_install_dir(&self, outcome: &mut UninstallOutcome, reporter: &mut dyn Reporter) {
        let dir = &self.layout.install_dir;
        if !dir.exists() {
            reporter.info(&format!("No install directory at {}", dir.display()));
            return;
        }
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                outcome.removed_install_dir = true;
                reporter.success(&format!("Removed {}", dir.display()));
            }
            Err(e) => {
                outcome.warnings += 1;
                reporter.warn(&format!("failed to remove {}: {e}", dir.display()));
            }
        }
    }

    fn remove_config_dir(
        &self,
        confirm: &mut dyn Confirm,
        outcome: &mut UninstallOutcome,
        reporter: &mut dyn Reporter,
    ) {
        let dir = &self.layout.config_dir;
        if !dir.exists() {
            return;
        }
        let question = format!("Remove configuration directory {}?", dir.display());
        if !confirm.confirm(&question) {
            reporter.info(&format!("Kept configuration at {}", dir.display()));
            return;
        }
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                outcome.removed_config_dir = true;
                reporter.success(&format!("Removed {}", dir.display()));
            }
            Err(e) => {
                outcome.warnings += 1;
                reporter.warn(&format!("failed to remove {}: {e}", dir.display()));
            }
        }
    }
}
