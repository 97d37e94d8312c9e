//! Post-processing: the one normalisation pass every result goes through.
//!
//! Converters return whatever their renderer produced. The engine applies
//! [`normalize_markdown`] exactly once to the winning converter's output, so
//! individual converters never need to (and should not) clean up spacing
//! themselves.
//!
//! ## Rule Order
//!
//! Line endings are normalised before anything else so that per-line
//! trimming sees `\n` only. Trailing-whitespace trimming runs before blank
//! line collapsing because a whitespace-only line becomes empty and may join
//! a run of blank lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise converter output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Trim trailing whitespace per line
/// 3. Collapse 3+ consecutive newlines down to 2
/// 4. Trim the whole document
///
/// The output is a fixed point: `normalize_markdown(normalize_markdown(x))`
/// equals `normalize_markdown(x)`.
pub fn normalize_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalize_markdown("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(normalize_markdown("hello   \nworld\t\n"), "hello\nworld");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(normalize_markdown("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_markdown("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_whitespace_only_lines_collapse() {
        // the middle lines only become empty after trimming
        assert_eq!(normalize_markdown("a\n  \n\t\n \nb"), "a\n\nb");
    }

    #[test]
    fn test_trims_document() {
        assert_eq!(normalize_markdown("\n\n  # Title\n\nbody\n\n\n"), "# Title\n\nbody");
        assert_eq!(normalize_markdown("   \n\t\n"), "");
    }

    #[test]
    fn test_leading_indentation_kept() {
        let md = "- item\n    - nested\n\n```\n    code\n```";
        assert_eq!(normalize_markdown(md), md);
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain",
            "  lead\r\n\r\n\r\n\r\ntrail  \r\n",
            "a \n \n \n b\n\n\n\nc\t",
            "\u{a0}non-breaking\u{a0}\n\n\n\u{3000}",
            "# H\n\n\n\n| a | b |\n|---|---|\n| 1 | 2 |   \n\n\n",
        ];
        for s in samples {
            let once = normalize_markdown(s);
            assert_eq!(normalize_markdown(&once), once, "not idempotent for {s:?}");
        }
    }
}
