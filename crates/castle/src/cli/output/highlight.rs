//! Syntax highlighting for terminal output.

use syntect::{
    easy::HighlightLines,
    highlighting::Style,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};
use two_face::{
    syntax::extra_newlines as extra_syntaxes,
    theme::{EmbeddedLazyThemeSet, EmbeddedThemeName, extra as extra_themes},
};

/// Reset sequence appended after highlighted text.
const RESET: &str = "\x1b[0m";

/// Highlights source lines and configuration for the terminal.
pub struct Highlighter {
    /// Language definitions, including TOML and Java.
    syntax_set: SyntaxSet,
    /// Embedded color themes.
    theme_set: EmbeddedLazyThemeSet,
    /// Theme in use.
    theme: EmbeddedThemeName,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    /// Creates a highlighter with the Dracula theme.
    pub fn new() -> Self {
        Self {
            syntax_set: extra_syntaxes(),
            theme_set: extra_themes(),
            theme: EmbeddedThemeName::Dracula,
        }
    }

    /// Highlights one line of code, choosing the syntax from the file extension.
    ///
    /// Each line is highlighted on its own, so constructs spanning lines (block
    /// comments, text blocks) may be colored as code.
    pub fn highlight_line(&self, line: &str, extension: &str) -> String {
        self.highlight(line.trim_end(), extension)
    }

    /// Highlights TOML.
    pub fn highlight_toml(&self, content: &str) -> String {
        self.highlight(content, "toml")
    }

    /// Highlights `content` with the syntax for `extension`, or as plain text.
    pub fn highlight(&self, content: &str, extension: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(extension)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let mut lines = HighlightLines::new(syntax, self.theme_set.get(self.theme));

        let mut output = String::new();
        for line in LinesWithEndings::from(content) {
            let ranges: Vec<(Style, &str)> = lines
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_else(|_| vec![(Style::default(), line)]);
            output.push_str(&as_24_bit_terminal_escaped(&ranges, false));
        }
        output.push_str(RESET);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_line_keeps_text() {
        let highlighted = Highlighter::new().highlight_line("int count = 5;", "java");
        assert!(highlighted.contains("count"));
        assert!(highlighted.contains("\x1b["));
        assert!(highlighted.ends_with(RESET));
    }

    #[test]
    fn unknown_extension_is_plain() {
        let highlighted = Highlighter::new().highlight("notes here", "zzz");
        assert!(highlighted.contains("notes here"));
    }

    #[test]
    fn toml_is_highlighted() {
        let highlighted =
            Highlighter::new().highlight_toml("[settings]\ndefault_hit_limit = 10\n");
        assert!(highlighted.contains("default_hit_limit"));
    }
}
