//! Typewriter reveal units.
//!
//! Text is split into reveal units: a single character, or a whole
//! `**bold**` span. The reveal cursor moves one raw character per tick. A
//! bold span stays hidden while the cursor crosses its opening marker and
//! inner text, then appears at once when the cursor reaches the closing
//! marker. The markers themselves are never emitted. An opening `**` with no
//! closing pair is ordinary text.

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// One reveal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit<'a> {
    Char(char),
    Bold(&'a str),
}

impl Unit<'_> {
    /// Plain text of the unit, without styling.
    #[must_use]
    pub fn plain(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Bold(s) => (*s).to_string(),
        }
    }

    /// Ticks spent before the unit becomes visible: the opening marker and
    /// inner text of a bold span, nothing for a character.
    #[must_use]
    pub fn hidden_ticks(&self) -> u32 {
        match self {
            Self::Char(_) => 0,
            Self::Bold(s) => 2 + u32::try_from(s.chars().count()).unwrap_or(u32::MAX - 2),
        }
    }

    /// Total ticks the unit occupies, including the tick after it shows.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.hidden_ticks().saturating_add(1)
    }

    /// The unit with ANSI emphasis applied to bold spans.
    #[must_use]
    pub fn ansi(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Bold(s) => format!("{BOLD}{s}{RESET}"),
        }
    }
}

/// Split `text` into reveal units.
#[must_use]
pub fn units(text: &str) -> Vec<Unit<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                if end > 0 {
                    out.push(Unit::Bold(&after[..end]));
                    rest = &after[end + 2..];
                    continue;
                }
            }
        }
        out.push(Unit::Char(c));
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Fully revealed text without markup.
#[must_use]
pub fn render_plain(text: &str) -> String {
    units(text).iter().map(Unit::plain).collect()
}

/// Fully revealed text with ANSI bold.
#[must_use]
pub fn render_ansi(text: &str) -> String {
    units(text).iter().map(Unit::ansi).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_unit_per_char() {
        let u = units("4层板");
        assert_eq!(u, vec![Unit::Char('4'), Unit::Char('层'), Unit::Char('板')]);
    }

    #[test]
    fn bold_span_is_a_single_unit() {
        let u = units("成本 **¥850.00** 起");
        assert_eq!(u.len(), 6);
        assert_eq!(u[3], Unit::Bold("¥850.00"));
        assert_eq!(u[4], Unit::Char(' '));
    }

    #[test]
    fn markers_never_appear_in_output() {
        let text = "**沉金** 映射为 **ENIG 1U\"**";
        assert!(!render_plain(text).contains("**"));
        assert_eq!(render_plain(text), "沉金 映射为 ENIG 1U\"");
        assert_eq!(render_ansi("**A**"), "\x1b[1mA\x1b[0m");
    }

    #[test]
    fn bold_span_waits_for_its_closing_marker() {
        assert_eq!(Unit::Char('板').hidden_ticks(), 0);
        assert_eq!(Unit::Char('板').ticks(), 1);
        // "**¥850.00**": the closing marker sits 9 raw characters in.
        assert_eq!(Unit::Bold("¥850.00").hidden_ticks(), 9);
        assert_eq!(Unit::Bold("¥850.00").ticks(), 10);
    }

    #[test]
    fn unclosed_marker_is_literal() {
        assert_eq!(render_plain("a **b"), "a **b");
        assert_eq!(units("**").len(), 2);
    }

    #[test]
    fn empty_bold_pair_is_literal() {
        assert_eq!(render_plain("****"), "****");
    }
}
