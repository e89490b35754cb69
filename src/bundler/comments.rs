/*!
    Removal of Lua comments from source text.

    Works line by line, tracking quoted strings so that a `--` inside
    a string is never treated as the start of a comment. Lua long
    brackets are the one construct that spans lines: `--[[ ... ]]`
    block comments are dropped and `[[ ... ]]` long strings are kept
    verbatim, so the scanner carries that state from one line to the next.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LongBracket {
    Comment { level: usize },
    String { level: usize },
}

/**
    Returns the level of a long bracket opener (`[[`, `[=[`, `[==[`, ...)
    starting at the given index, if there is one.
*/
fn long_bracket_open(chars: &[char], at: usize) -> Option<usize> {
    if chars.get(at) != Some(&'[') {
        return None;
    }
    let level = chars[at + 1..].iter().take_while(|c| **c == '=').count();
    (chars.get(at + 1 + level) == Some(&'[')).then_some(level)
}

/**
    Finds the closer for a long bracket of the given level, searching
    from the given index, and returns the index just past it.
*/
fn long_bracket_close(chars: &[char], from: usize, level: usize) -> Option<usize> {
    let closer_len = level + 2;
    (from..chars.len()).find_map(|start| {
        let window = chars.get(start..start + closer_len)?;
        let is_closer = window[0] == ']'
            && window[closer_len - 1] == ']'
            && window[1..closer_len - 1].iter().all(|c| *c == '=');
        is_closer.then_some(start + closer_len)
    })
}

/**
    Strips comments from the given Lua source.

    Lines that are empty after stripping are dropped, except for
    lines that are part of a long string. Running this on its own
    output returns the output unchanged.
*/
#[must_use]
pub fn strip_comments(text: &str) -> String {
    let mut kept = Vec::new();
    let mut bracket: Option<LongBracket> = None;

    for line in text.lines() {
        let chars = line.chars().collect::<Vec<_>>();
        let inside_string_at_start = matches!(bracket, Some(LongBracket::String { .. }));

        let mut cleaned = String::with_capacity(line.len());
        let mut quote: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            match bracket {
                Some(LongBracket::Comment { level }) => {
                    match long_bracket_close(&chars, i, level) {
                        Some(end) => {
                            bracket = None;
                            i = end;
                        }
                        None => i = chars.len(),
                    }
                    continue;
                }
                Some(LongBracket::String { level }) => {
                    let end = long_bracket_close(&chars, i, level);
                    let stop = end.unwrap_or(chars.len());
                    cleaned.extend(&chars[i..stop]);
                    if end.is_some() {
                        bracket = None;
                    }
                    i = stop;
                    continue;
                }
                None => {}
            }

            let c = chars[i];
            if let Some(q) = quote {
                cleaned.push(c);
                if c == '\\' {
                    if let Some(next) = chars.get(i + 1) {
                        cleaned.push(*next);
                        i += 1;
                    }
                } else if c == q {
                    quote = None;
                }
                i += 1;
            } else if c == '"' || c == '\'' {
                quote = Some(c);
                cleaned.push(c);
                i += 1;
            } else if c == '-' && chars.get(i + 1) == Some(&'-') {
                match long_bracket_open(&chars, i + 2) {
                    Some(level) => {
                        bracket = Some(LongBracket::Comment { level });
                        i += 2 + level + 2;
                    }
                    None => break,
                }
            } else if let Some(level) = long_bracket_open(&chars, i) {
                let opener_end = i + level + 2;
                cleaned.extend(&chars[i..opener_end]);
                bracket = Some(LongBracket::String { level });
                i = opener_end;
            } else {
                cleaned.push(c);
                i += 1;
            }
        }

        let inside_string_at_end = matches!(bracket, Some(LongBracket::String { .. }));
        if inside_string_at_start || inside_string_at_end || !cleaned.trim().is_empty() {
            kept.push(cleaned);
        }
    }

    kept.join("\n")
}
