use std::fmt;

use console::{style, Color};
use itertools::Itertools;

/**
    Prefix for diagnostic lines printed next to the progress output,
    such as the active mode or a module skipped in local-only mode.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Info,
    Warn,
    Error,
}

impl Label {
    fn name(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    /**
        Prefixes every line of `message` with this label,
        so multi-line errors stay readable when interleaved.
    */
    #[must_use]
    pub fn line(self, message: impl fmt::Display) -> String {
        let message = message.to_string();
        if message.is_empty() {
            return self.to_string();
        }
        message.lines().map(|l| format!("{self} {l}")).join("\n")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = format!("[{}]", self.name());
        write!(f, "{}", style(tag).fg(self.color()).bold())
    }
}
