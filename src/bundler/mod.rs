use std::path::Path;

use chrono::Utc;
use console::style;

mod closure;
mod comments;
mod composer;
mod error;
mod policy;
mod reference;
mod resolver;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use self::{
    closure::{build_closure, ModuleSet},
    comments::strip_comments,
    composer::{compose, loader_call, lua_string_literal, EMBEDDED_TABLE_NAME, LOADER_FUNCTION_NAME},
    error::{BundleError, BundleResult},
    policy::{ResolutionMode, ResolutionPolicy, TrustedMirror, DEFAULT_MIRROR_URL_PREFIX},
    reference::{extract_references, ModuleReference, ReferenceKind},
    resolver::{module_identifier, ResolvedModule, Resolver},
    source::{DiskFileSystem, Fetcher, FileSystem, HttpFetcher, DEFAULT_USER_AGENT},
};

/**
    Summary of a written bundle.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleStats {
    pub module_count: usize,
    pub output_bytes: usize,
}

impl BundleStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn output_kilobytes(&self) -> f64 {
        self.output_bytes as f64 / 1024.0
    }
}

/**
    Bundles a main script and all of its dependencies into a single script.

    A bundler performs one full resolution pass per call to [`Bundler::bundle`],
    nothing is cached between calls.
*/
pub struct Bundler<'a> {
    policy: ResolutionPolicy,
    mirror: Option<TrustedMirror>,
    fs: &'a dyn FileSystem,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Bundler<'a> {
    pub fn new(policy: ResolutionPolicy, fs: &'a dyn FileSystem, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            policy,
            mirror: None,
            fs,
            fetcher,
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: TrustedMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /**
        Bundles the script at `input` and writes the result to `output`.

        Local references are resolved relative to the directory of `input`.

        # Errors

        Fails if the main script can not be read, if the output can not
        be written, or if any module fails to resolve outside of local-only
        mode. Nothing is written to `output` when resolution fails.
    */
    pub async fn bundle(&self, input: &Path, output: &Path) -> BundleResult<BundleStats> {
        let main_text = self.fs.read_text(input).await?;
        println!(
            "{} main script {}",
            style("Read").blue().bold(),
            style(input.display()).underlined()
        );

        let main_refs = extract_references(&main_text);
        let local_count = main_refs.iter().filter(|r| r.is_local()).count();
        println!(
            "{} {} modules ({} local, {} remote)",
            style("Found").blue().bold(),
            main_refs.len(),
            local_count,
            main_refs.len() - local_count,
        );

        let base_path = input.parent().unwrap_or_else(|| Path::new(""));
        let resolver = Resolver::new(base_path, self.policy, self.fs, self.fetcher)
            .with_mirror(self.mirror.clone());
        let modules = build_closure(&main_refs, &resolver).await?;

        let bundled = compose(&main_text, &main_refs, &modules, &self.policy, Utc::now());
        self.fs.write_text(output, &bundled).await?;
        println!(
            "{} bundle to {}",
            style("Write").blue().bold(),
            style(output.display()).underlined()
        );

        Ok(BundleStats {
            module_count: modules.len(),
            output_bytes: bundled.len(),
        })
    }
}
