use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use console::style;

use rbx_bundler::{
    bundler::{DiskFileSystem, HttpFetcher},
    config::BundlerConfig,
    fmt::Label,
    Bundler, ResolutionMode, ResolutionPolicy,
};

/// Bundle a Roblox script and the modules it loads into a single file
#[derive(Parser, Debug, Default, Clone)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["local_only", "github_only", "hybrid"])))]
pub struct Cli {
    /// The path to the main script
    pub input: PathBuf,

    /// The path to write the bundled script to
    pub output: PathBuf,

    /// Only use local files and mirrored copies, never download anything
    #[clap(long)]
    pub local_only: bool,

    /// Download every remote module, even if a mirrored copy exists
    #[clap(long)]
    pub github_only: bool,

    /// Use mirrored copies when they exist and download the rest (default)
    #[clap(long)]
    pub hybrid: bool,

    /// Keep comments in the bundled script instead of stripping them
    #[clap(long)]
    pub keep_comments: bool,

    /// Path to a config file, defaults to `bundler.toml` if it exists
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Url prefix of the trusted mirror
    #[clap(long)]
    pub mirror_prefix: Option<String>,

    /// Local directory holding the trusted mirror's files
    #[clap(long)]
    pub mirror_root: Option<PathBuf>,

    /// Timeout in seconds for each download, no timeout by default
    #[clap(long)]
    pub fetch_timeout: Option<u64>,
}

impl Cli {
    pub fn new() -> Self {
        Self::parse()
    }

    /**
        The resolution mode, where flags take precedence over the config file.
    */
    fn mode(&self, config: &BundlerConfig) -> ResolutionMode {
        if self.local_only {
            ResolutionMode::LocalOnly
        } else if self.github_only {
            ResolutionMode::GithubOnly
        } else if self.hybrid {
            ResolutionMode::Hybrid
        } else {
            config.bundle.mode.unwrap_or_default()
        }
    }

    fn policy(&self, config: &BundlerConfig) -> ResolutionPolicy {
        let keep_comments = self.keep_comments || config.bundle.keep_comments.unwrap_or(false);
        ResolutionPolicy::new(self.mode(config)).with_strip_comments(!keep_comments)
    }

    /**
        Applies flags that override values from the config file.
    */
    fn apply_overrides(&self, config: &mut BundlerConfig, cwd: &Path) {
        if let Some(prefix) = &self.mirror_prefix {
            config.mirror.url_prefix = prefix.clone();
        }
        if let Some(root) = &self.mirror_root {
            config.mirror.local_root = Some(cwd.join(root));
        }
        if let Some(secs) = self.fetch_timeout {
            config.fetch.timeout_secs = Some(secs);
        }
    }

    pub async fn run(self) -> Result<ExitCode> {
        let cwd = env::current_dir().context("failed to get current working directory")?;

        let mut config = BundlerConfig::discover(self.config.as_deref(), &cwd)
            .await
            .context("failed to load config")?;
        self.apply_overrides(&mut config, &cwd);

        let policy = self.policy(&config);
        let mode_description = match policy.mode {
            ResolutionMode::LocalOnly => "will only use local files",
            ResolutionMode::GithubOnly => "will download all remote modules",
            ResolutionMode::Hybrid => "will try local copies first, then download",
        };
        let comments = if policy.strip_comments {
            "removed"
        } else {
            "preserved"
        };
        println!(
            "{}",
            Label::Info.line(format_args!(
                "{} mode, {mode_description}\ncomments will be {comments}",
                policy.mode
            ))
        );

        let fetcher = HttpFetcher::new(config.fetch.user_agent(), config.fetch.timeout())
            .context("failed to create http client")?;
        let fs = DiskFileSystem;

        let input = cwd.join(&self.input);
        let output = cwd.join(&self.output);
        let stats = Bundler::new(policy, &fs, &fetcher)
            .with_mirror(config.trusted_mirror())
            .bundle(&input, &output)
            .await
            .with_context(|| format!("failed to bundle {}", self.input.display()))?;

        println!(
            "{} {} modules bundled, {:.2} KB written",
            style("Done").green().bold(),
            stats.module_count,
            stats.output_kilobytes()
        );

        Ok(ExitCode::SUCCESS)
    }
}
