//! Release identifiers and download URLs

use std::fmt;

/// Version requested on the command line.
///
/// Never parsed beyond recognising `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReleaseVersion {
    #[default]
    Latest,
    Tag(String),
}

impl ReleaseVersion {
    pub fn parse(s: &str) -> Self {
        if s == "latest" {
            ReleaseVersion::Latest
        } else {
            ReleaseVersion::Tag(s.to_string())
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseVersion::Latest => write!(f, "latest"),
            ReleaseVersion::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

/// Build download URL for a release asset
///
/// `latest` uses GitHub's `releases/latest/download` redirect, so no API call
/// is needed to resolve the tag.
pub fn build_download_url(
    base_url: &str,
    repository: &str,
    version: &ReleaseVersion,
    asset: &str,
) -> String {
    let base = base_url.trim_end_matches('/');
    let repository = repository.trim_matches('/');
    match version {
        ReleaseVersion::Latest => {
            format!("{base}/{repository}/releases/latest/download/{asset}")
        }
        ReleaseVersion::Tag(tag) => {
            format!("{base}/{repository}/releases/download/{tag}/{asset}")
        }
    }
}
