//! Diagnostic rendering for the command line.
//!
//! Error values carry the contract messages; this module decorates them
//! for a terminal:
//! - ANSI colors, switched off for pipes and `--no-color`
//! - "did you mean" suggestions from edit distance
//! - source snippets with a caret underline

use crate::ast::{SourceMap, Span};
use crate::eval::EvalError;
use crate::parser::SyntaxError;

/// ANSI color codes for terminal output
#[derive(Debug, Clone, Default)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn code(&self, code: &'static str) -> &'static str {
        if self.enabled {
            code
        } else {
            ""
        }
    }

    pub fn red(&self) -> &'static str {
        self.code("\x1b[31m")
    }

    pub fn cyan(&self) -> &'static str {
        self.code("\x1b[36m")
    }

    pub fn bold(&self) -> &'static str {
        self.code("\x1b[1m")
    }

    pub fn reset(&self) -> &'static str {
        self.code("\x1b[0m")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorConfig {
    pub colors: Colors,
    /// Shown in place of the source name when set
    pub filename: Option<String>,
}

impl ErrorConfig {
    pub fn new(use_color: bool) -> Self {
        Self {
            colors: Colors::new(use_color),
            filename: None,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }
}

// ============================================================================
// Suggestions
// ============================================================================

/// Levenshtein edit distance, two rows at a time
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Up to three candidates within `max_distance` of `name`, closest first.
/// `name` itself is never suggested.
pub fn find_similar<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|candidate| (levenshtein_distance(name, candidate), candidate))
        .filter(|&(distance, _)| distance > 0 && distance <= max_distance)
        .collect();
    scored.sort();
    scored.dedup();
    scored.into_iter().take(3).map(|(_, c)| c.to_string()).collect()
}

// ============================================================================
// Formatting pieces
// ============================================================================

/// The offending source line with a caret underline:
///
/// ```text
/// 3 |     return a +* b
///                    ^
/// ```
pub fn format_snippet(source_map: &SourceMap, span: &Span, colors: &Colors) -> String {
    let start = source_map.position(span.start);
    let end = source_map.position(span.end);
    let line_text = source_map.line(start.line).unwrap_or("");
    let gutter = start.line.to_string();

    let width = if end.line == start.line {
        end.column.saturating_sub(start.column).max(1)
    } else {
        1
    };
    let padding = " ".repeat(gutter.len() + 3 + start.column - 1);

    format!(
        "{}{gutter} |{} {line_text}\n{padding}{}{}{}",
        colors.cyan(),
        colors.reset(),
        colors.red(),
        "^".repeat(width),
        colors.reset()
    )
}

pub fn format_suggestions(suggestions: &[String], colors: &Colors) -> String {
    match suggestions {
        [] => String::new(),
        [only] => format!("\n\nDid you mean {}{only}{}?", colors.bold(), colors.reset()),
        many => {
            let names: Vec<String> = many
                .iter()
                .map(|s| format!("{}{s}{}", colors.bold(), colors.reset()))
                .collect();
            format!("\n\nDid you mean one of: {}?", names.join(", "))
        }
    }
}

/// `-- SYNTAX ERROR ------------------------------------------- file.sl`
pub fn format_header(error_kind: &str, location: &str, colors: &Colors) -> String {
    let dashes = "-".repeat(60usize.saturating_sub(error_kind.len() + location.len() + 5).max(3));
    format!(
        "{}-- {error_kind} {dashes} {location}{}",
        colors.cyan(),
        colors.reset()
    )
}

// ============================================================================
// Whole diagnostics
// ============================================================================

pub fn render_syntax_error(err: &SyntaxError, source_map: &SourceMap, config: &ErrorConfig) -> String {
    let colors = &config.colors;
    let file = config.filename.as_deref().unwrap_or(&*err.source_name);
    format!(
        "{}\n\n{}\n\n{err}",
        format_header("SYNTAX ERROR", file, colors),
        format_snippet(source_map, &err.span, colors)
    )
}

/// Runtime errors carry no span; the header and message are enough
pub fn render_eval_error(err: &EvalError, config: &ErrorConfig) -> String {
    let colors = &config.colors;
    let file = config.filename.as_deref().unwrap_or("<input>");
    let suggestions = match err {
        EvalError::UnboundName { suggestions, .. } => format_suggestions(suggestions, colors),
        _ => String::new(),
    };
    format!(
        "{}\n\n{}{err}{}{suggestions}",
        format_header(err.kind(), file, colors),
        colors.bold(),
        colors.reset()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein_distance("hello", "hello"), 0);
        assert_eq!(levenshtein_distance("hello", "hallo"), 1);
        assert_eq!(levenshtein_distance("print", "prnt"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn suggestions_closest_first() {
        let suggestions = find_similar("totl", ["total", "totals", "other", "total"], 2);
        assert_eq!(suggestions, ["total", "totals"]);
        assert!(find_similar("total", ["total"], 2).is_empty());
    }

    #[test]
    fn snippet_underlines_span() {
        let map = SourceMap::new("x = 1\ny = x +* 2\n");
        let snippet = format_snippet(&map, &Span::new(12, 13), &Colors::new(false));
        assert_eq!(snippet, format!("2 | y = x +* 2\n{}^", " ".repeat(10)));
    }

    #[test]
    fn syntax_error_rendering_ends_with_contract_message() {
        let source = "def f(a):\nreturn a\n";
        let err = parse(source, "demo.sl").unwrap_err();
        let rendered = render_syntax_error(&err, &SourceMap::new(source), &ErrorConfig::default());
        assert!(rendered.starts_with("-- SYNTAX ERROR"));
        assert!(rendered.ends_with(&err.to_string()));
    }

    #[test]
    fn unbound_name_lists_suggestions() {
        let err = EvalError::UnboundName {
            name: "totl".into(),
            suggestions: vec!["total".to_string()],
        };
        let rendered = render_eval_error(&err, &ErrorConfig::new(false).with_filename("a.sl"));
        assert!(rendered.contains("NAME ERROR"));
        assert!(rendered.contains("name 'totl' is not defined"));
        assert!(rendered.ends_with("Did you mean total?"));
    }
}
