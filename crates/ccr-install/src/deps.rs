//! External tool checks.

use crate::error::{InstallError, InstallResult};

/// Fail with every missing tool named, not just the first.
pub fn check_dependencies(tools: &[&str]) -> InstallResult<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InstallError::DependencyMissing { tools: missing })
    }
}
