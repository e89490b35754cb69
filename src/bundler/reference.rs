use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A single or double quoted string literal on one line, escapes included.
const STRING_LITERAL: &str = r#"(?:'((?:[^'\\\n]|\\.)*)'|"((?:[^"\\\n]|\\.)*)")"#;

static REMOTE_LOAD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"loadstring\s*\(\s*game\s*:\s*HttpGet\s*\(\s*{STRING_LITERAL}\s*(?:,\s*(?:true|false)\s*)?\)\s*\)\s*\(\s*\)"
    ))
    .expect("remote load pattern is valid")
});

static REQUIRE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\brequire\s*\(\s*{STRING_LITERAL}\s*\)"))
        .expect("require pattern is valid")
});

const NETWORK_SCHEMES: &[&str] = &["http://", "https://"];

/**
    Where a referenced module lives.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Local,
    Remote,
}

impl ReferenceKind {
    /**
        Picks the kind for the argument of a `require` call,
        which is remote only if it starts with a network scheme.
    */
    #[must_use]
    pub fn of_require_argument(spec: &str) -> Self {
        if NETWORK_SCHEMES.iter().any(|scheme| spec.starts_with(scheme)) {
            Self::Remote
        } else {
            Self::Local
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/**
    A module reference found in source text.

    The `origin_spec` is the literal path or url exactly as it was
    written between the quotes, and is the identity of the module.
    The `matched_text` is the whole call expression, which is what
    gets replaced with a loader call in the bundled output.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub origin_spec: String,
    pub kind: ReferenceKind,
    pub matched_text: String,
}

impl ModuleReference {
    pub fn new(
        origin_spec: impl Into<String>,
        kind: ReferenceKind,
        matched_text: impl Into<String>,
    ) -> Self {
        Self {
            origin_spec: origin_spec.into(),
            kind,
            matched_text: matched_text.into(),
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.kind == ReferenceKind::Local
    }
}

fn literal_body<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}

/**
    Extracts all module references from the given source text.

    Recognizes `loadstring(game:HttpGet(<url>))()` calls, which are always
    remote, and `require(<path>)` calls taking a string literal, which are
    remote if the literal starts with `http://` or `https://`.

    References are returned in the order they first appear in the text.
*/
#[must_use]
pub fn extract_references(text: &str) -> Vec<ModuleReference> {
    let remote_loads = REMOTE_LOAD_PATTERN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let reference = ModuleReference::new(
            literal_body(&caps),
            ReferenceKind::Remote,
            whole.as_str(),
        );
        Some((whole.start(), reference))
    });

    let requires = REQUIRE_PATTERN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let spec = literal_body(&caps);
        let reference = ModuleReference::new(
            spec,
            ReferenceKind::of_require_argument(spec),
            whole.as_str(),
        );
        Some((whole.start(), reference))
    });

    let mut found = remote_loads.chain(requires).collect::<Vec<_>>();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, reference)| reference).collect()
}
