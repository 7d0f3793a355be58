//! Source locators: local paths or URLs

use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Where a source lives, distinguished by the presence of a URL scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(Url),
    Path(PathBuf),
}

impl Locator {
    /// Classify a (substituted) locator string
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            // Single-letter schemes are Windows drive letters
            Ok(url) if url.scheme().len() > 1 => Locator::Url(url),
            _ => Locator::Path(PathBuf::from(s)),
        }
    }

    pub fn is_remote(&self) -> bool {
        match self {
            Locator::Url(url) => url.scheme() != "file",
            Locator::Path(_) => false,
        }
    }

    /// Resolve a relative path against `base_dir`; URLs are returned unchanged
    pub fn relative_to(self, base_dir: &Path) -> Self {
        match self {
            Locator::Path(path) if path.is_relative() => Locator::Path(base_dir.join(path)),
            other => other,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Url(url) => write!(f, "{}", url),
            Locator::Path(path) => write!(f, "{}", path.display()),
        }
    }
}
