use std::collections::{HashMap, HashSet};

use console::style;

use crate::fmt::Label;

use super::{
    error::BundleResult,
    reference::{extract_references, ModuleReference},
    resolver::{ResolvedModule, Resolver},
};

/**
    The modules of a bundle, in the order they were first resolved.

    Modules are unique by their `origin_spec`, compared as exact strings,
    so `lib/a` and `./lib/a` are two different modules even though
    they point to the same file.
*/
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: Vec<ResolvedModule>,
    index: HashMap<String, usize>,
}

impl ModuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, origin_spec: &str) -> bool {
        self.index.contains_key(origin_spec)
    }

    #[must_use]
    pub fn get(&self, origin_spec: &str) -> Option<&ResolvedModule> {
        self.index.get(origin_spec).map(|&i| &self.modules[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.modules.iter()
    }

    /**
        Adds a module, returning `false` and leaving the
        set unchanged if its `origin_spec` is already present.
    */
    pub(crate) fn insert(&mut self, module: ResolvedModule) -> bool {
        if self.index.contains_key(&module.origin_spec) {
            return false;
        }
        self.index
            .insert(module.origin_spec.clone(), self.modules.len());
        self.modules.push(module);
        true
    }
}

impl<'a> IntoIterator for &'a ModuleSet {
    type Item = &'a ResolvedModule;
    type IntoIter = std::slice::Iter<'a, ResolvedModule>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

/**
    Resolves the given references and everything they transitively reference.

    Each reference is resolved, added to the set, and then its own references
    are followed depth-first in source order. Every `origin_spec` is resolved
    at most once, which is also what stops reference cycles.

    All local references are resolved against the resolver's base path,
    never against the directory of the module that contains them.

    # Errors

    In local-only mode resolution failures are reported and the failing
    module is left out. In any other mode the first failure is returned.
*/
pub async fn build_closure(
    main_refs: &[ModuleReference],
    resolver: &Resolver<'_>,
) -> BundleResult<ModuleSet> {
    let local_only = resolver.policy().is_local_only();

    let mut set = ModuleSet::new();
    let mut failed = HashSet::new();

    for top_level in main_refs {
        let mut pending = vec![(top_level.clone(), 0_usize)];

        while let Some((reference, depth)) = pending.pop() {
            let spec = reference.origin_spec.as_str();
            if set.contains(spec) || failed.contains(spec) {
                continue;
            }

            let indent = "  ".repeat(depth.min(8));
            println!(
                "{indent}{} {} ({})",
                style(if depth == 0 { "Load" } else { "Dependency" })
                    .green()
                    .bold(),
                style(spec).underlined(),
                reference.kind,
            );

            match resolver.resolve(&reference).await {
                Ok(module) => {
                    let children = extract_references(&module.content);
                    tracing::debug!(
                        spec,
                        identifier = %module.identifier,
                        children = children.len(),
                        "resolved module"
                    );
                    set.insert(module);
                    pending.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
                }
                Err(err) if local_only => {
                    eprintln!(
                        "{indent}{}",
                        Label::Warn.line(format_args!("skipping {spec}: {err}"))
                    );
                    tracing::warn!(spec, depth, error = %err, "dropped module");
                    failed.insert(reference.origin_spec);
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(set)
}
