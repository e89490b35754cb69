use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;

use super::{
    closure::ModuleSet, comments::strip_comments, policy::ResolutionPolicy,
    reference::ModuleReference,
};

pub const EMBEDDED_TABLE_NAME: &str = "EmbeddedModules";
pub const LOADER_FUNCTION_NAME: &str = "loadModule";

const INDENT: &str = "    ";

/**
    Renders a module key as a single quoted Lua string literal.

    Keys are kept exactly as written in source, escapes included,
    only bare single quotes get escaped so the literal stays closed.
*/
#[must_use]
pub fn lua_string_literal(origin_spec: &str) -> String {
    let mut literal = String::with_capacity(origin_spec.len() + 2);
    literal.push('\'');
    let mut chars = origin_spec.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                literal.push(c);
                if let Some(escaped) = chars.next() {
                    literal.push(escaped);
                }
            }
            '\'' => literal.push_str("\\'"),
            _ => literal.push(c),
        }
    }
    literal.push('\'');
    literal
}

/**
    The call expression that replaces a reference in the main script.
*/
#[must_use]
pub fn loader_call(origin_spec: &str) -> String {
    format!("{LOADER_FUNCTION_NAME}({})", lua_string_literal(origin_spec))
}

fn indent_lines(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .join("\n")
}

fn header(generated_at: DateTime<Utc>) -> String {
    format!(
        "-- BUNDLED ROBLOX SCRIPT\n\
         -- Generated by {} {}\n\
         -- Date: {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

fn embedded_table(modules: &ModuleSet) -> String {
    let mut out = format!("-- EMBEDDED MODULES\nlocal {EMBEDDED_TABLE_NAME} = {{}}\n");
    for module in modules {
        out.push_str(&format!(
            "\n-- Module: {}\n{EMBEDDED_TABLE_NAME}[{}] = function()\n{}\nend\n",
            module.identifier,
            lua_string_literal(&module.origin_spec),
            indent_lines(&module.content),
        ));
    }
    out
}

fn loader_function() -> String {
    format!(
        "-- MODULE LOADER\n\
         local function {LOADER_FUNCTION_NAME}(url)\n\
         {INDENT}if {EMBEDDED_TABLE_NAME}[url] then\n\
         {INDENT}{INDENT}return {EMBEDDED_TABLE_NAME}[url]()\n\
         {INDENT}end\n\
         \n\
         {INDENT}print(\"[bundler] Loading from:\", url)\n\
         {INDENT}return loadstring(game:HttpGet(url))()\n\
         end\n"
    )
}

/**
    Rewrites every reference of the main script into a loader call.

    Each reference replaces the first remaining occurrence of its matched
    text, so repeated identical calls are rewritten one per reference.
*/
#[must_use]
pub fn rewrite_main(main_text: &str, main_refs: &[ModuleReference]) -> String {
    main_refs.iter().fold(main_text.to_string(), |text, reference| {
        text.replacen(
            &reference.matched_text,
            &loader_call(&reference.origin_spec),
            1,
        )
    })
}

/**
    Composes the bundled script.

    The output contains, in order, a header with the generation time,
    the table of embedded modules, the loader function, and finally
    the main script with its references rewritten to loader calls.

    Comments are stripped from the main script after rewriting,
    so rewriting always sees the original matched text.
*/
#[must_use]
pub fn compose(
    main_text: &str,
    main_refs: &[ModuleReference],
    modules: &ModuleSet,
    policy: &ResolutionPolicy,
    generated_at: DateTime<Utc>,
) -> String {
    let mut main = rewrite_main(main_text, main_refs);
    if policy.strip_comments {
        main = strip_comments(&main);
    }

    let mut out = String::new();
    out.push_str(&header(generated_at));
    out.push('\n');
    out.push_str(&embedded_table(modules));
    out.push('\n');
    out.push_str(&loader_function());
    out.push_str("\n-- MAIN SCRIPT\n");
    out.push_str(&main);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
