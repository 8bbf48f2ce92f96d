//! Install flow: download, extract, link, verify.

use crate::archive::{
    ensure_non_empty, make_executable, verify_entry_point, Extractor, TarExtractor,
};
use crate::config::InstallerConfig;
use crate::deps::check_dependencies;
use crate::error::{InstallError, InstallResult};
use crate::fetch::{system_fetcher, Fetcher};
use crate::interrupt::Interrupt;
use crate::layout::{same_file, InstallLayout};
use crate::link::Linker;
use crate::privilege::{Access, Elevation};
use crate::release::{build_download_url, ReleaseVersion};
use crate::report::Reporter;
use crate::retry::{RetryError, RetryPolicy};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Summary of a completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub url: String,
    pub link: PathBuf,
    pub entry_point: PathBuf,
    /// `bin_dir` was written through the elevation program
    pub elevated: bool,
    /// The command resolves to `link` on PATH
    pub on_path: bool,
    /// First line of `<link> --version`, when it ran
    pub reported_version: Option<String>,
}

pub struct Installer {
    config: InstallerConfig,
    layout: InstallLayout,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    linker: Linker,
    retry: RetryPolicy,
    interrupt: Interrupt,
}

impl Installer {
    /// Installer using the system `curl`/`tar` (or the native fetcher, per config).
    pub fn new(config: InstallerConfig, interrupt: Interrupt) -> InstallResult<Self> {
        let layout = InstallLayout::from_config(&config)?;
        Ok(Self {
            fetcher: system_fetcher(&config.download, interrupt.clone()),
            extractor: Box::new(TarExtractor),
            linker: Linker::new(Elevation::from_config(&config.privilege)),
            retry: config.download.retry_policy(),
            layout,
            config,
            interrupt,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn download_url(&self, version: &ReleaseVersion) -> String {
        build_download_url(
            &self.config.release_base_url,
            self.config.repository(),
            version,
            self.config.asset(),
        )
    }

    /// Install `version`, replacing any previous installation.
    ///
    /// The first failing step aborts the run. Temporary and staging
    /// directories are removed on every path out of this function.
    pub fn install(
        &self,
        version: &ReleaseVersion,
        reporter: &mut dyn Reporter,
    ) -> InstallResult<InstallOutcome> {
        let url = self.download_url(version);
        let name = &self.layout.binary_name;
        reporter.info(&format!("Installing {name} ({version})"));

        self.check_tools(reporter)?;
        self.check_interrupt()?;

        let tmp = tempfile::Builder::new()
            .prefix("ccr-install-")
            .tempdir()
            .map_err(|e| {
                InstallError::io("creating temporary directory", std::env::temp_dir(), e)
            })?;
        debug!(tmp = %tmp.path().display(), "created download directory");
        let archive = tmp.path().join(self.config.asset());

        self.download(&url, &archive, reporter)?;
        let size = ensure_non_empty(&archive, &url)?;
        reporter.success(&format!("Downloaded {} ({size} bytes)", self.config.asset()));

        self.unpack(&archive)?;
        reporter.success(&format!("Extracted to {}", self.layout.install_dir.display()));

        let elevated = self.link(reporter)?;
        reporter.success(&format!(
            "Linked {} -> {}",
            self.layout.link.display(),
            self.layout.entry_point.display()
        ));

        let on_path = match self.verify_on_path() {
            Ok(resolved) => {
                reporter.success(&format!("{name} resolves to {}", resolved.display()));
                true
            }
            Err(err) => {
                reporter.warn(&err.to_string());
                false
            }
        };

        let reported_version = self.installed_version();
        match &reported_version {
            Some(v) => reporter.success(&format!("{name} {v} installed")),
            None => reporter.warn(&format!(
                "could not run `{} --version`; the install is in place but may need its runtime",
                self.layout.link.display()
            )),
        }
        info!(url, elevated, on_path, "install complete");

        Ok(InstallOutcome {
            url,
            link: self.layout.link.clone(),
            entry_point: self.layout.entry_point.clone(),
            elevated,
            on_path,
            reported_version,
        })
    }

    fn check_tools(&self, reporter: &mut dyn Reporter) -> InstallResult<()> {
        let tools: Vec<&str> = [self.fetcher.required_tool(), self.extractor.required_tool()]
            .into_iter()
            .flatten()
            .collect();
        check_dependencies(&tools)?;

        let runtime = self.config.runtime.as_str();
        if !runtime.is_empty() && which::which(runtime).is_err() {
            reporter.warn(&format!(
                "{runtime} not found on PATH; {} needs it to run",
                self.layout.binary_name
            ));
        }
        Ok(())
    }

    fn check_interrupt(&self) -> InstallResult<()> {
        if self.interrupt.is_set() {
            Err(InstallError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn download(
        &self,
        url: &str,
        archive: &Path,
        reporter: &mut dyn Reporter,
    ) -> InstallResult<()> {
        reporter.info(&format!("Downloading {url}"));
        let attempts = self.retry.attempts();
        let result = self.retry.run(&self.interrupt, |attempt| {
            if attempt > 1 {
                reporter.info(&format!("Retrying download (attempt {attempt}/{attempts})"));
            }
            self.fetcher.fetch(url, archive)
        });
        match result {
            Ok(()) => self.check_interrupt(),
            Err(RetryError::Interrupted) => Err(InstallError::Interrupted),
            Err(RetryError::Failed { .. }) if self.interrupt.is_set() => {
                Err(InstallError::Interrupted)
            }
            Err(RetryError::Failed { attempts, last }) => Err(InstallError::DownloadFailed {
                url: url.to_string(),
                attempts,
                reason: last.reason,
            }),
        }
    }

    /// Extract into a staging directory beside the install directory, verify
    /// it, then swap it in. The previous install survives any failure here.
    fn unpack(&self, archive: &Path) -> InstallResult<()> {
        let parent = self.layout.install_parent();
        std::fs::create_dir_all(parent)
            .map_err(|e| InstallError::io("creating install parent", parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".ccr-staging-")
            .tempdir_in(parent)
            .map_err(|e| InstallError::io("creating staging directory", parent, e))?;

        let extracted = self.extractor.extract(archive, staging.path());
        self.check_interrupt()?;
        extracted?;

        let entry = verify_entry_point(staging.path(), &self.layout.entry_relative)?;
        make_executable(&entry)?;
        self.check_interrupt()?;

        // tempdir_in creates 0700; the installed tree must stay readable.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))
                .map_err(|e| InstallError::io("setting install permissions", staging.path(), e))?;
        }

        replace_dir(staging.path(), &self.layout.install_dir)
    }

    /// Returns whether elevation was used.
    fn link(&self, reporter: &mut dyn Reporter) -> InstallResult<bool> {
        let access = Access::for_dir(&self.layout.bin_dir);
        if access == Access::NeedsElevation {
            reporter.info(&format!(
                "Elevated privileges required for {}; requesting them via {}",
                self.layout.bin_dir.display(),
                self.config.privilege.program
            ));
        }
        self.linker
            .link(&self.layout.entry_point, &self.layout.link, access)?;
        Ok(access == Access::NeedsElevation)
    }

    /// The command must resolve to our link, not to some other copy earlier
    /// on PATH.
    pub fn verify_on_path(&self) -> InstallResult<PathBuf> {
        let name = &self.layout.binary_name;
        match which::which(name) {
            Ok(found) if same_file(&found, &self.layout.link) => Ok(found),
            Ok(found) => Err(InstallError::PostInstallVerificationFailed {
                command: name.clone(),
                hint: format!(
                    "{} shadows {}; remove it or move {} earlier in PATH",
                    found.display(),
                    self.layout.link.display(),
                    self.layout.bin_dir.display()
                ),
            }),
            Err(_) => Err(InstallError::PostInstallVerificationFailed {
                command: name.clone(),
                hint: format!("add {} to PATH", self.layout.bin_dir.display()),
            }),
        }
    }

    fn installed_version(&self) -> Option<String> {
        let output = Command::new(&self.layout.link)
            .arg("--version")
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(status = %output.status, "--version failed");
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }
}

/// Move `staged` to `dest`. An existing `dest` is parked beside it and only
/// deleted once the new tree is in place; it is restored if the move fails.
fn replace_dir(staged: &Path, dest: &Path) -> InstallResult<()> {
    let parked = dest.exists().then(|| {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.with_file_name(format!(".{name}.previous-{}", std::process::id()))
    });

    if let Some(parked) = &parked {
        if parked.exists() {
            std::fs::remove_dir_all(parked)
                .map_err(|e| InstallError::io("removing stale backup", parked, e))?;
        }
        std::fs::rename(dest, parked)
            .map_err(|e| InstallError::io("moving previous install aside", dest, e))?;
    }

    if let Err(e) = std::fs::rename(staged, dest) {
        if let Some(parked) = &parked {
            let _ = std::fs::rename(parked, dest);
        }
        return Err(InstallError::io("moving extracted files into place", dest, e));
    }

    if let Some(parked) = &parked {
        if let Err(e) = std::fs::remove_dir_all(parked) {
            debug!(path = %parked.display(), "failed to remove previous install: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::report::{Level, MemoryReporter};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Seen = Rc<RefCell<Option<PathBuf>>>;

    /// Serves bytes, or fails a configured number of times first.
    struct FakeFetcher {
        body: Vec<u8>,
        failures: Cell<u32>,
        permanent: bool,
        seen: Seen,
    }

    impl FakeFetcher {
        fn serving(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                failures: Cell::new(0),
                permanent: false,
                seen: Seen::default(),
            }
        }

        fn failing(times: u32, permanent: bool) -> Self {
            Self {
                failures: Cell::new(times),
                permanent,
                ..Self::serving(b"archive")
            }
        }
    }

    impl Fetcher for FakeFetcher {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn fetch(&self, _url: &str, dest: &Path) -> Result<(), FetchError> {
            *self.seen.borrow_mut() = Some(dest.to_path_buf());
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                let reason = if self.permanent { "HTTP 404" } else { "connection reset" };
                return Err(FetchError {
                    reason: reason.into(),
                    retryable: !self.permanent,
                });
            }
            std::fs::write(dest, &self.body).unwrap();
            Ok(())
        }
    }

    /// Writes a fixed tree instead of running tar.
    struct FakeExtractor {
        files: Vec<(&'static str, &'static str)>,
    }

    impl FakeExtractor {
        fn with_entry() -> Self {
            Self {
                files: vec![
                    ("dist/cli.js", "#!/bin/sh\necho 1.0.65\n"),
                    ("package.json", "{}"),
                ],
            }
        }

        fn without_entry() -> Self {
            Self {
                files: vec![("README.md", "hello")],
            }
        }
    }

    impl Extractor for FakeExtractor {
        fn extract(&self, _archive: &Path, dest: &Path) -> InstallResult<()> {
            for (rel, contents) in &self.files {
                let path = dest.join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, contents).unwrap();
            }
            Ok(())
        }
    }

    fn test_config(root: &Path) -> InstallerConfig {
        let mut config = InstallerConfig {
            install_dir: Some(root.join("share/claude-code-router")),
            bin_dir: root.join("bin"),
            config_dir: Some(root.join("config")),
            runtime: String::new(),
            ..InstallerConfig::default()
        };
        config.download.backoff_secs = 0;
        config.privilege.allow_elevation = false;
        config
    }

    fn installer(root: &Path, fetcher: FakeFetcher, extractor: FakeExtractor) -> Installer {
        Installer::new(test_config(root), Interrupt::new())
            .unwrap()
            .with_fetcher(Box::new(fetcher))
            .with_extractor(Box::new(extractor))
    }

    /// Run an install and return the error plus the download path it used.
    fn failing_install(
        root: &Path,
        fetcher: FakeFetcher,
        extractor: FakeExtractor,
    ) -> (InstallError, PathBuf) {
        let seen = Rc::clone(&fetcher.seen);
        let inst = installer(root, fetcher, extractor);
        let err = inst
            .install(&ReleaseVersion::Latest, &mut MemoryReporter::new())
            .unwrap_err();
        let archive = seen.borrow().clone().expect("fetch was called");
        (err, archive)
    }

    #[cfg(unix)]
    #[test]
    fn test_install_links_entry_point() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = installer(
            tmp.path(),
            FakeFetcher::serving(b"tarball"),
            FakeExtractor::with_entry(),
        );
        let mut reporter = MemoryReporter::new();

        let outcome = inst
            .install(&ReleaseVersion::parse("v1.0.65"), &mut reporter)
            .unwrap();

        let layout = inst.layout();
        assert!(outcome.url.ends_with("/releases/download/v1.0.65/ccr-main.tar.gz"));
        assert_eq!(std::fs::read_link(&layout.link).unwrap(), layout.entry_point);
        assert!(!outcome.elevated);
        assert_eq!(outcome.reported_version.as_deref(), Some("1.0.65"));
        // The scratch bin dir is not on PATH.
        assert!(!outcome.on_path);
        assert!(reporter.warnings().iter().any(|w| w.contains("add")));
        assert!(!reporter.at(Level::Success).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_install_twice_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = installer(
            tmp.path(),
            FakeFetcher::serving(b"tarball"),
            FakeExtractor::with_entry(),
        );
        let version = ReleaseVersion::Latest;

        inst.install(&version, &mut MemoryReporter::new()).unwrap();
        std::fs::write(inst.layout().install_dir.join("stale.txt"), "old").unwrap();
        inst.install(&version, &mut MemoryReporter::new()).unwrap();

        let layout = inst.layout();
        assert!(!layout.install_dir.join("stale.txt").exists());
        assert_eq!(std::fs::read_link(&layout.link).unwrap(), layout.entry_point);
        let siblings: Vec<_> = std::fs::read_dir(layout.install_parent())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(siblings.len(), 1, "leftovers beside install dir: {siblings:?}");
        assert_eq!(std::fs::read_dir(&layout.bin_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_download_retries_then_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = installer(
            tmp.path(),
            FakeFetcher::failing(2, false),
            FakeExtractor::with_entry(),
        );
        let mut reporter = MemoryReporter::new();
        inst.install(&ReleaseVersion::Latest, &mut reporter).unwrap();
        assert!(reporter.contains("attempt 3/3"));
    }

    #[test]
    fn test_download_failure_leaves_previous_install() {
        let tmp = tempfile::tempdir().unwrap();
        let install_dir = test_config(tmp.path()).install_dir.unwrap();
        std::fs::create_dir_all(&install_dir).unwrap();
        std::fs::write(install_dir.join("marker"), "previous").unwrap();

        let (err, archive) = failing_install(
            tmp.path(),
            FakeFetcher::failing(10, false),
            FakeExtractor::with_entry(),
        );

        match err {
            InstallError::DownloadFailed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(install_dir.join("marker")).unwrap(), "previous");
        assert!(std::fs::symlink_metadata(tmp.path().join("bin/ccr")).is_err());
        assert!(!archive.parent().unwrap().exists());
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let (err, _) = failing_install(
            tmp.path(),
            FakeFetcher::failing(10, true),
            FakeExtractor::with_entry(),
        );
        match err {
            InstallError::DownloadFailed { attempts, reason, .. } => {
                assert_eq!(attempts, 1);
                assert_eq!(reason, "HTTP 404");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_download_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (err, archive) = failing_install(
            tmp.path(),
            FakeFetcher::serving(b""),
            FakeExtractor::with_entry(),
        );
        assert!(matches!(err, InstallError::EmptyArtifact { .. }));
        assert!(!tmp.path().join("share/claude-code-router").exists());
        assert!(!archive.parent().unwrap().exists());
    }

    #[test]
    fn test_layout_mismatch_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let (err, archive) = failing_install(
            tmp.path(),
            FakeFetcher::serving(b"tarball"),
            FakeExtractor::without_entry(),
        );
        assert!(matches!(err, InstallError::ArchiveLayoutMismatch { .. }));

        let share = tmp.path().join("share");
        assert!(!share.join("claude-code-router").exists());
        assert_eq!(std::fs::read_dir(&share).unwrap().count(), 0);
        assert!(!archive.parent().unwrap().exists());
    }

    #[test]
    fn test_link_failure_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory at the link path cannot be replaced.
        std::fs::create_dir_all(tmp.path().join("bin/ccr")).unwrap();
        let (err, archive) = failing_install(
            tmp.path(),
            FakeFetcher::serving(b"tarball"),
            FakeExtractor::with_entry(),
        );
        assert!(matches!(err, InstallError::SymlinkFailed { .. }));
        assert!(!archive.parent().unwrap().exists());
    }

    #[test]
    fn test_interrupt_before_download() {
        let tmp = tempfile::tempdir().unwrap();
        let interrupt = Interrupt::new();
        interrupt.set();
        let fetcher = FakeFetcher::serving(b"tarball");
        let seen = Rc::clone(&fetcher.seen);
        let inst = Installer::new(test_config(tmp.path()), interrupt)
            .unwrap()
            .with_fetcher(Box::new(fetcher))
            .with_extractor(Box::new(FakeExtractor::with_entry()));
        let err = inst
            .install(&ReleaseVersion::Latest, &mut MemoryReporter::new())
            .unwrap_err();
        assert!(matches!(err, InstallError::Interrupted));
        assert!(seen.borrow().is_none());
        assert!(!inst.layout().install_dir.exists());
    }

    #[test]
    fn test_missing_tools_reported() {
        struct NeedsTool;
        impl Extractor for NeedsTool {
            fn extract(&self, _: &Path, _: &Path) -> InstallResult<()> {
                Ok(())
            }
            fn required_tool(&self) -> Option<&'static str> {
                Some("definitely-not-tar")
            }
        }
        let tmp = tempfile::tempdir().unwrap();
        let inst = Installer::new(test_config(tmp.path()), Interrupt::new())
            .unwrap()
            .with_fetcher(Box::new(FakeFetcher::serving(b"x")))
            .with_extractor(Box::new(NeedsTool));
        let err = inst
            .install(&ReleaseVersion::Latest, &mut MemoryReporter::new())
            .unwrap_err();
        assert!(matches!(err, InstallError::DependencyMissing { .. }));
    }

    #[test]
    fn test_replace_dir_restores_on_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("install");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("old"), "1").unwrap();

        let missing = tmp.path().join("does-not-exist");
        assert!(replace_dir(&missing, &dest).is_err());
        assert!(dest.join("old").exists());
    }
}
