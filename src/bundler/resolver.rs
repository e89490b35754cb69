use std::{ffi::OsString, path::PathBuf};

use path_clean::PathClean;

use super::{
    comments::strip_comments,
    error::{BundleError, BundleResult},
    policy::{ResolutionMode, ResolutionPolicy, TrustedMirror},
    reference::{ModuleReference, ReferenceKind},
    source::{Fetcher, FileSystem},
};

pub const LUA_EXTENSION: &str = ".lua";

/**
    A module whose source has been loaded.

    Modules are identified by their `origin_spec`, the `identifier`
    is only a readable name derived from it for output and logging.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub identifier: String,
    pub content: String,
    pub origin_spec: String,
}

impl ResolvedModule {
    pub fn new(origin_spec: impl Into<String>, content: impl Into<String>) -> Self {
        let origin_spec = origin_spec.into();
        Self {
            identifier: module_identifier(&origin_spec),
            content: content.into(),
            origin_spec,
        }
    }
}

/**
    Derives a readable module name from a path or url,
    for example `lib/ui/button.lua` becomes `ButtonModule`.
*/
#[must_use]
pub fn module_identifier(origin_spec: &str) -> String {
    let file_name = origin_spec.rsplit('/').next().unwrap_or(origin_spec);
    let stem = file_name.strip_suffix(LUA_EXTENSION).unwrap_or(file_name);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => format!("{}{}Module", first.to_uppercase(), chars.as_str()),
        None => "Module".to_string(),
    }
}

fn with_lua_extension(path: PathBuf) -> PathBuf {
    if path.to_string_lossy().ends_with(LUA_EXTENSION) {
        path
    } else {
        let mut raw = OsString::from(path);
        raw.push(LUA_EXTENSION);
        PathBuf::from(raw)
    }
}

/**
    Loads module sources for references, following a [`ResolutionPolicy`].

    Local references are always read from disk, relative to the base path
    of the bundle. Remote references may be read from a [`TrustedMirror`]
    or downloaded, depending on the resolution mode.
*/
pub struct Resolver<'a> {
    base_path: PathBuf,
    policy: ResolutionPolicy,
    mirror: Option<TrustedMirror>,
    fs: &'a dyn FileSystem,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Resolver<'a> {
    pub fn new(
        base_path: impl Into<PathBuf>,
        policy: ResolutionPolicy,
        fs: &'a dyn FileSystem,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            policy,
            mirror: None,
            fs,
            fetcher,
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: Option<TrustedMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /**
        Resolves the given reference into a loaded module.

        # Errors

        - [`BundleError::NotFound`] if a local file does not exist
        - [`BundleError::PolicyViolation`] if a remote module has no
          mirrored copy while in local-only mode
        - [`BundleError::Transport`] if downloading a module fails
    */
    pub async fn resolve(&self, reference: &ModuleReference) -> BundleResult<ResolvedModule> {
        let content = match reference.kind {
            ReferenceKind::Local => self.read_local(&reference.origin_spec).await?,
            ReferenceKind::Remote => self.read_remote(&reference.origin_spec).await?,
        };
        let content = if self.policy.strip_comments {
            strip_comments(&content)
        } else {
            content
        };
        Ok(ResolvedModule::new(reference.origin_spec.as_str(), content))
    }

    /**
        Returns the path on disk that a local reference points to.
    */
    #[must_use]
    pub fn local_path(&self, origin_spec: &str) -> PathBuf {
        with_lua_extension(self.base_path.join(origin_spec).clean())
    }

    async fn read_local(&self, origin_spec: &str) -> BundleResult<String> {
        let path = self.local_path(origin_spec);
        tracing::debug!(path = %path.display(), "reading local module");
        self.fs.read_text(&path).await
    }

    async fn read_remote(&self, url: &str) -> BundleResult<String> {
        match self.policy.mode {
            ResolutionMode::GithubOnly => self.fetcher.fetch_text(url).await,
            ResolutionMode::LocalOnly => match self.read_mirrored(url).await {
                Some(content) => Ok(content),
                None => Err(BundleError::PolicyViolation {
                    url: url.to_string(),
                }),
            },
            ResolutionMode::Hybrid => match self.read_mirrored(url).await {
                Some(content) => Ok(content),
                None => self.fetcher.fetch_text(url).await,
            },
        }
    }

    /**
        Reads the mirrored copy of a url, if the url is
        mirrored and the copy can be read from disk.
    */
    async fn read_mirrored(&self, url: &str) -> Option<String> {
        let Some(path) = self
            .mirror
            .as_ref()
            .and_then(|mirror| mirror.local_path_for(url))
        else {
            return None;
        };
        match self.fs.read_text(&path).await {
            Ok(content) => {
                tracing::debug!(url, path = %path.display(), "using mirrored copy");
                Some(content)
            }
            Err(BundleError::NotFound { .. }) => {
                tracing::debug!(url, path = %path.display(), "no mirrored copy on disk");
                None
            }
            Err(err) => {
                tracing::warn!(url, path = %path.display(), error = %err, "unreadable mirrored copy");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bundler::testing::{MemoryFileSystem, MemoryFetcher};

    use super::*;

    const MIRROR_PREFIX: &str = "https://raw.example.com/me/repo/main/";

    fn mirror() -> TrustedMirror {
        TrustedMirror::new(MIRROR_PREFIX, "/mirror")
    }

    fn remote(url: &str) -> ModuleReference {
        ModuleReference::new(url, ReferenceKind::Remote, format!("require('{url}')"))
    }

    fn local(path: &str) -> ModuleReference {
        ModuleReference::new(path, ReferenceKind::Local, format!("require('{path}')"))
    }

    #[test]
    fn identifiers() {
        assert_eq!(module_identifier("lib/ui/button.lua"), "ButtonModule");
        assert_eq!(module_identifier("https://x/y/fluent"), "FluentModule");
        assert_eq!(module_identifier("https://x/y/"), "Module");
    }

    #[tokio::test]
    async fn local_paths_are_relative_to_base_and_get_an_extension() {
        let fs = MemoryFileSystem::new().with_file("/project/lib/util.lua", "return 1");
        let fetcher = MemoryFetcher::new();
        let resolver = Resolver::new("/project/src", ResolutionPolicy::default(), &fs, &fetcher);

        let module = resolver.resolve(&local("../lib/util")).await.unwrap();
        assert_eq!(module.content, "return 1");
        assert_eq!(module.origin_spec, "../lib/util");
        assert_eq!(module.identifier, "UtilModule");

        let module = resolver.resolve(&local("../lib/util.lua")).await.unwrap();
        assert_eq!(module.content, "return 1");
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found_in_every_mode() {
        let fs = MemoryFileSystem::new();
        let fetcher = MemoryFetcher::new();
        for mode in [
            ResolutionMode::Hybrid,
            ResolutionMode::LocalOnly,
            ResolutionMode::GithubOnly,
        ] {
            let resolver = Resolver::new("/p", ResolutionPolicy::new(mode), &fs, &fetcher);
            let err = resolver.resolve(&local("missing")).await.unwrap_err();
            assert!(matches!(err, BundleError::NotFound { .. }));
        }
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn local_only_reads_mirror_and_never_fetches() {
        let url = format!("{MIRROR_PREFIX}lib/ui.lua");
        let fs = MemoryFileSystem::new().with_file("/mirror/lib/ui.lua", "return 'mirror'");
        let fetcher = MemoryFetcher::new()
            .with_body(&url, "return 'net'")
            .with_body("https://other.example.com/x.lua", "return 'x'");
        let resolver = Resolver::new(
            "/p",
            ResolutionPolicy::new(ResolutionMode::LocalOnly),
            &fs,
            &fetcher,
        )
        .with_mirror(Some(mirror()));

        let module = resolver.resolve(&remote(&url)).await.unwrap();
        assert_eq!(module.content, "return 'mirror'");

        let err = resolver
            .resolve(&remote("https://other.example.com/x.lua"))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::PolicyViolation { .. }));

        let err = resolver
            .resolve(&remote(&format!("{MIRROR_PREFIX}lib/absent.lua")))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::PolicyViolation { .. }));

        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn hybrid_prefers_mirror_then_falls_back_to_network() {
        let mirrored = format!("{MIRROR_PREFIX}lib/ui.lua");
        let unmirrored = format!("{MIRROR_PREFIX}lib/net_only.lua");
        let fs = MemoryFileSystem::new().with_file("/mirror/lib/ui.lua", "return 'mirror'");
        let fetcher = MemoryFetcher::new()
            .with_body(&mirrored, "return 'net'")
            .with_body(&unmirrored, "return 'net only'");
        let resolver = Resolver::new("/p", ResolutionPolicy::default(), &fs, &fetcher)
            .with_mirror(Some(mirror()));

        let module = resolver.resolve(&remote(&mirrored)).await.unwrap();
        assert_eq!(module.content, "return 'mirror'");
        assert_eq!(fetcher.fetch_count(), 0);

        let module = resolver.resolve(&remote(&unmirrored)).await.unwrap();
        assert_eq!(module.content, "return 'net only'");
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unreadable_mirror_copy_counts_as_missing() {
        let url = format!("{MIRROR_PREFIX}lib");
        let fs = MemoryFileSystem::new().with_directory("/mirror/lib");
        let fetcher = MemoryFetcher::new().with_body(&url, "return 'net'");

        let resolver = Resolver::new("/p", ResolutionPolicy::default(), &fs, &fetcher)
            .with_mirror(Some(mirror()));
        let module = resolver.resolve(&remote(&url)).await.unwrap();
        assert_eq!(module.content, "return 'net'");
        assert_eq!(fetcher.fetched_urls(), vec![url.clone()]);

        let resolver = Resolver::new(
            "/p",
            ResolutionPolicy::new(ResolutionMode::LocalOnly),
            &fs,
            &fetcher,
        )
        .with_mirror(Some(mirror()));
        let err = resolver.resolve(&remote(&url)).await.unwrap_err();
        assert!(matches!(err, BundleError::PolicyViolation { .. }));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn github_only_skips_the_mirror() {
        let url = format!("{MIRROR_PREFIX}lib/ui.lua");
        let fs = MemoryFileSystem::new().with_file("/mirror/lib/ui.lua", "return 'mirror'");
        let fetcher = MemoryFetcher::new().with_body(&url, "return 'net'");
        let resolver = Resolver::new(
            "/p",
            ResolutionPolicy::new(ResolutionMode::GithubOnly),
            &fs,
            &fetcher,
        )
        .with_mirror(Some(mirror()));

        let module = resolver.resolve(&remote(&url)).await.unwrap();
        assert_eq!(module.content, "return 'net'");
        assert_eq!(fetcher.fetched_urls(), vec![url]);
    }

    #[tokio::test]
    async fn failed_fetch_is_a_transport_error() {
        let fs = MemoryFileSystem::new();
        let fetcher = MemoryFetcher::new();
        let resolver = Resolver::new("/p", ResolutionPolicy::default(), &fs, &fetcher);
        let err = resolver
            .resolve(&remote("https://down.example.com/x.lua"))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::Transport { .. }));
    }

    #[tokio::test]
    async fn comments_are_stripped_only_when_asked() {
        let fs = MemoryFileSystem::new().with_file("/p/m.lua", "-- doc\nreturn 1 -- one");
        let fetcher = MemoryFetcher::new();

        let resolver = Resolver::new("/p", ResolutionPolicy::default(), &fs, &fetcher);
        let module = resolver.resolve(&local("m")).await.unwrap();
        assert_eq!(module.content, "return 1 ");

        let policy = ResolutionPolicy::default().with_strip_comments(false);
        let resolver = Resolver::new("/p", policy, &fs, &fetcher);
        let module = resolver.resolve(&local("m")).await.unwrap();
        assert_eq!(module.content, "-- doc\nreturn 1 -- one");
    }
}
