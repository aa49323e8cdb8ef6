//! Whitespace normalization for tag-only lines.
//!
//! A tag that sits alone on its source line (only spaces or tabs around it)
//! would otherwise leave an empty line in the output. [`normalize`] removes the
//! indentation before such a tag and the line break after it. Output
//! directives (`{{ value }}`) are never touched.

use tracing::trace;

use crate::token::{Token, TokenKind};

/// Strips the line surrounding every keyword tag that occupies a line by itself.
///
/// A tag qualifies when it is preceded by the start of the sequence or by raw
/// text whose last line holds only spaces and tabs, and is followed by the end
/// of the sequence or by raw text that starts with optional spaces and tabs then
/// a line break.
pub fn normalize(tokens: &mut [Token]) {
    let mut open: Option<usize> = None;

    for i in 0..tokens.len() {
        match tokens[i].kind {
            TokenKind::LDelim => open = Some(i),
            TokenKind::RDelim => {
                let Some(left) = open.take() else {
                    continue;
                };
                let is_tag = tokens
                    .get(left + 1)
                    .is_some_and(|t| t.kind == TokenKind::Keyword);
                if !is_tag {
                    continue;
                }

                let right = i;
                let left_clear = left == 0
                    || (tokens[left - 1].kind == TokenKind::Raw
                        && ends_with_blank_line(tokens[left - 1].text()));
                let right_clear = right + 1 == tokens.len()
                    || (tokens[right + 1].kind == TokenKind::Raw
                        && line_break_len(tokens[right + 1].text()).is_some());

                if !(left_clear && right_clear) {
                    continue;
                }

                trace!(
                    offset = tokens[left].offset,
                    tag = tokens[left + 1].text(),
                    "stripping tag line"
                );

                if left > 0 {
                    let before = &tokens[left - 1];
                    let offset = before.offset;
                    let trimmed = before.text().trim_end_matches([' ', '\t']).to_string();
                    tokens[left - 1] = Token::new(TokenKind::Raw, trimmed, offset);
                }
                if right + 1 < tokens.len() {
                    let after = &tokens[right + 1];
                    let offset = after.offset;
                    if let Some(len) = line_break_len(after.text()) {
                        let rest = after.text()[len..].to_string();
                        tokens[right + 1] = Token::new(TokenKind::Raw, rest, offset);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Whether the text after the last line break is only spaces and tabs.
fn ends_with_blank_line(text: &str) -> bool {
    let last_line = match text.rfind('\n') {
        Some(idx) => &text[idx + 1..],
        None => text,
    };
    last_line.chars().all(|c| c == ' ' || c == '\t')
}

/// Length of a leading `[ \t]*\r?\n` run, if the text starts with one.
fn line_break_len(text: &str) -> Option<usize> {
    let indent = text.len() - text.trim_start_matches([' ', '\t']).len();
    let rest = &text[indent..];
    if rest.starts_with("\r\n") {
        Some(indent + 2)
    } else if rest.starts_with('\n') {
        Some(indent + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn raw_texts(source: &str) -> Vec<String> {
        let mut tokens = tokenize(source).unwrap();
        normalize(&mut tokens);
        tokens
            .into_iter()
            .filter(|t| t.kind == TokenKind::Raw)
            .map(|t| t.text().to_string())
            .collect()
    }

    #[test]
    fn blank_line_detection() {
        assert!(ends_with_blank_line(""));
        assert!(ends_with_blank_line("  \t"));
        assert!(ends_with_blank_line("abc\n  "));
        assert!(!ends_with_blank_line("abc"));
        assert!(!ends_with_blank_line("\n x "));
    }

    #[test]
    fn line_break_detection() {
        assert_eq!(line_break_len("\nabc"), Some(1));
        assert_eq!(line_break_len(" \t\r\nabc"), Some(4));
        assert_eq!(line_break_len("  x\n"), None);
        assert_eq!(line_break_len(""), None);
    }

    #[test]
    fn tag_on_own_line_is_removed() {
        assert_eq!(
            raw_texts("before\n{{ if x }}\nX\n{{ end }}\nafter"),
            vec!["before\n", "X\n", "after"]
        );
    }

    #[test]
    fn indented_tag_is_removed() {
        assert_eq!(
            raw_texts("a\n    {{#if 1}}\nb\n   {{#end}}  \t\nc"),
            vec!["a\n", "b\n", "c"]
        );
    }

    #[test]
    fn inline_tag_is_kept() {
        assert_eq!(raw_texts("|{{#if 1}}={{#end}}|"), vec!["|", "=", "|"]);
    }

    #[test]
    fn output_directive_is_never_stripped() {
        assert_eq!(raw_texts(" \t{{ foo }}\t \n"), vec![" \t", "\t \n"]);
    }

    #[test]
    fn tag_at_start_of_sequence() {
        assert_eq!(raw_texts("{{ if x }}\nbody"), vec!["body"]);
    }

    #[test]
    fn tag_at_end_of_sequence() {
        assert_eq!(raw_texts("#{{#if 1}}\n/\n  {{#end}}"), vec!["#", "\n/\n"]);
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(
            raw_texts("|\r\n{{#if 1}}\r\n{{#end}}\r\n|"),
            vec!["|\r\n", "", "|"]
        );
    }
}
