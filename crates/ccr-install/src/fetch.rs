//! Download backends.
//!
//! `curl` is spawned directly (no shell) like every other external tool the
//! installer uses. The native backend uses an in-process `ureq` agent.

use crate::config::{Backend, DownloadConfig};
use crate::interrupt::Interrupt;
use crate::retry::Retryable;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;
use tracing::debug;

/// One failed download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub reason: String,
    pub retryable: bool,
}

impl FetchError {
    fn transient(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: true,
        }
    }

    fn http(status: u16) -> Self {
        Self {
            reason: format!("HTTP {status}"),
            retryable: is_retryable_status(status),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Client errors mean the release or asset does not exist; retrying will not
/// change that.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Writes the body at `url` to `dest`, following redirects.
pub trait Fetcher {
    fn name(&self) -> &'static str;

    /// External program that must be on PATH.
    fn required_tool(&self) -> Option<&'static str> {
        None
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Build the fetcher selected in the config.
pub fn system_fetcher(config: &DownloadConfig, interrupt: Interrupt) -> Box<dyn Fetcher> {
    match config.backend {
        Backend::Curl => Box::new(CurlFetcher::new(
            config.timeout(),
            config.connect_timeout(),
            interrupt,
        )),
        Backend::Native => Box::new(NativeFetcher::new(
            config.timeout(),
            config.connect_timeout(),
            interrupt,
        )),
    }
}

/// Spawns `curl`.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    timeout: Duration,
    connect_timeout: Duration,
    interrupt: Interrupt,
}

impl CurlFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration, interrupt: Interrupt) -> Self {
        Self {
            timeout,
            connect_timeout,
            interrupt,
        }
    }

    /// Wait for curl, killing it once the interrupt flag is raised. A signal
    /// sent only to this process never reaches the child otherwise.
    fn wait(&self, mut child: Child) -> Result<Output, FetchError> {
        loop {
            if self.interrupt.is_set() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::transient("download interrupted"));
            }
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => std::thread::sleep(CURL_POLL),
                Err(e) => return Err(FetchError::transient(format!("waiting for curl: {e}"))),
            }
        }
        child
            .wait_with_output()
            .map_err(|e| FetchError::transient(format!("reading curl output: {e}")))
    }
}

const CURL_POLL: Duration = Duration::from_millis(100);

impl Fetcher for CurlFetcher {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn required_tool(&self) -> Option<&'static str> {
        Some("curl")
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        // No -f: the status code comes back through --write-out so 404 can
        // be told apart from a dropped connection.
        let mut cmd = Command::new("curl");
        cmd.args(["-sSL", "--connect-timeout"])
            .arg(self.connect_timeout.as_secs().max(1).to_string())
            .arg("--max-time")
            .arg(self.timeout.as_secs().max(1).to_string())
            .args(["--write-out", "%{http_code}", "-o"])
            .arg(dest)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(?cmd, "spawning curl");

        let child = cmd
            .spawn()
            .map_err(|e| FetchError::transient(format!("failed to run curl: {e}")))?;
        let output = match self.wait(child) {
            Ok(output) => output,
            Err(e) => {
                let _ = std::fs::remove_file(dest);
                return Err(e);
            }
        };
        let status_code = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<u16>()
            .unwrap_or(0);

        if status_code >= 400 {
            let _ = std::fs::remove_file(dest);
            return Err(FetchError::http(status_code));
        }
        if !output.status.success() {
            let _ = std::fs::remove_file(dest);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match output.status.code() {
                Some(code) => format!("curl exited with {code}: {}", stderr.trim()),
                None => "curl was terminated by a signal".to_string(),
            };
            return Err(FetchError::transient(reason));
        }
        Ok(())
    }
}

/// In-process HTTP client.
pub struct NativeFetcher {
    agent: ureq::Agent,
    interrupt: Interrupt,
}

impl NativeFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration, interrupt: Interrupt) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(timeout)
            .build();
        Self { agent, interrupt }
    }

    fn stream_to(&self, reader: &mut dyn Read, dest: &Path) -> Result<(), FetchError> {
        let mut file = File::create(dest).map_err(|e| {
            FetchError::transient(format!("creating download target {}: {e}", dest.display()))
        })?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            if self.interrupt.is_set() {
                return Err(FetchError::transient("download interrupted"));
            }
            let n = reader
                .read(&mut buf)
                .map_err(|e| FetchError::transient(format!("reading response body: {e}")))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .map_err(|e| FetchError::transient(format!("writing {}: {e}", dest.display())))?;
        }
        file.flush()
            .map_err(|e| FetchError::transient(format!("writing {}: {e}", dest.display())))
    }
}

impl Fetcher for NativeFetcher {
    fn name(&self) -> &'static str {
        "native"
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        debug!(url, "requesting");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(FetchError::http(status)),
            Err(ureq::Error::Transport(t)) => {
                return Err(FetchError::transient(format!("requesting {url}: {t}")))
            }
        };
        let mut reader = response.into_reader();
        let result = self.stream_to(&mut reader, dest);
        if result.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        result
    }
}
