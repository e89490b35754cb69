/*!
    Optional `bundler.toml` configuration.

    The config file is looked up in this order:

    1. An explicitly given path (the `--config` flag)
    2. The path in the `RBX_BUNDLER_CONFIG` environment variable
    3. A `bundler.toml` file in the current working directory

    If none of these exist, the built-in defaults are used.
    Relative paths inside the file are relative to the file itself.
*/

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use path_clean::PathClean;
use serde::Deserialize;
use tokio::fs;

use crate::bundler::{
    BundleError, BundleResult, ResolutionMode, TrustedMirror, DEFAULT_MIRROR_URL_PREFIX,
    DEFAULT_USER_AGENT,
};

pub const CONFIG_FILE_NAME: &str = "bundler.toml";
pub const CONFIG_ENV_VAR: &str = "RBX_BUNDLER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleSection {
    pub mode: Option<ResolutionMode>,
    pub keep_comments: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorSection {
    pub url_prefix: String,
    pub local_root: Option<PathBuf>,
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_MIRROR_URL_PREFIX.to_string(),
            local_root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl FetchSection {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/**
    Settings read from a `bundler.toml` file.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
    pub bundle: BundleSection,
    pub mirror: MirrorSection,
    pub fetch: FetchSection,
    /// Directory that relative paths in the file are resolved against.
    #[serde(skip)]
    pub root_dir: PathBuf,
}

impl BundlerConfig {
    /**
        Creates the default config, with relative paths resolved against `root_dir`.
    */
    pub fn with_root_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /**
        Parses config file contents. The path is only used for error
        messages and as the base directory for relative paths.
    */
    pub fn from_toml_str(contents: &str, path: &Path) -> BundleResult<Self> {
        let mut config: Self = toml::from_str(contents).map_err(|e| BundleError::Config {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        config.root_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub async fn load(path: &Path) -> BundleResult<Self> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| BundleError::from_io(path, e))?;
        Self::from_toml_str(&contents, path)
    }

    /**
        Finds and loads the config file to use, falling back to defaults.

        An explicitly given path, or one given through the environment,
        must exist. The `bundler.toml` in `cwd` is optional.
    */
    pub async fn discover(explicit: Option<&Path>, cwd: &Path) -> BundleResult<Self> {
        if let Some(path) = explicit {
            return Self::load(&cwd.join(path)).await;
        }
        if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::load(&cwd.join(path)).await;
        }
        let default_path = cwd.join(CONFIG_FILE_NAME);
        match Self::load(&default_path).await {
            Err(BundleError::NotFound { .. }) => {
                tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                Ok(Self::with_root_dir(cwd))
            }
            other => other,
        }
    }

    /**
        The trusted mirror described by this config.

        Without an explicit `local_root`, the mirror root is the
        directory the config was loaded from.
    */
    #[must_use]
    pub fn trusted_mirror(&self) -> TrustedMirror {
        let local_root = match &self.mirror.local_root {
            Some(root) => self.root_dir.join(root).clean(),
            None => self.root_dir.clone(),
        };
        TrustedMirror::new(self.mirror.url_prefix.as_str(), local_root)
    }
}
