use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use path_clean::PathClean;
use serde::Deserialize;

pub const DEFAULT_MIRROR_URL_PREFIX: &str =
    "https://raw.githubusercontent.com/alfin-efendy/rbx-script-dev/refs/heads/main/";

/**
    Where remote modules are allowed to come from.
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Mirror first, then the network.
    #[default]
    Hybrid,
    /// Only local files and mirrored copies, never the network.
    LocalOnly,
    /// Always the network for remote modules, even if mirrored.
    GithubOnly,
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::LocalOnly => write!(f, "local-only"),
            Self::GithubOnly => write!(f, "github-only"),
        }
    }
}

/**
    Options controlling how modules are resolved and embedded.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub mode: ResolutionMode,
    pub strip_comments: bool,
}

impl ResolutionPolicy {
    #[must_use]
    pub fn new(mode: ResolutionMode) -> Self {
        Self {
            mode,
            strip_comments: true,
        }
    }

    #[must_use]
    pub fn with_strip_comments(mut self, strip_comments: bool) -> Self {
        self.strip_comments = strip_comments;
        self
    }

    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.mode == ResolutionMode::LocalOnly
    }
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::new(ResolutionMode::default())
    }
}

/**
    A remote url prefix that has a checkout on the local filesystem.

    Urls starting with the prefix may be read from `local_root`
    instead of the network, with the rest of the url used as a
    path relative to the root.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedMirror {
    pub url_prefix: String,
    pub local_root: PathBuf,
}

impl TrustedMirror {
    pub fn new(url_prefix: impl Into<String>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            local_root: local_root.into(),
        }
    }

    /**
        Maps a url to its local mirror path, if the url is mirrored.

        The mapped path always stays inside `local_root`, urls whose
        remainder would escape it are treated as not mirrored.
    */
    #[must_use]
    pub fn local_path_for(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.url_prefix)?.trim_start_matches('/');
        if rest.is_empty() {
            return None;
        }
        let relative = Path::new(rest);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        let relative = relative.clean();
        if relative == Path::new(".") {
            return None;
        }
        Some(self.local_root.join(relative))
    }
}
