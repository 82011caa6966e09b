//! Per-line classification of Java source.
//!
//! The classifier is a state machine driven one line at a time. The state threaded between
//! calls records whether the scan is inside a block comment, and the previous code line and
//! its type for the continuation rules. Blank lines and whole-line `//` comments leave the
//! previous-line state untouched; lines inside block comments clear it.

mod comments;
mod line_type;

use castle_config::LineTypeRule;
use line_type::LinePatterns;

use crate::IndexError;

/// Type label for a whole-line `//` comment.
pub const COMMENT_TYPE: &str = "comment";

/// Type label for a blank line.
pub const EMPTY_LINE_TYPE: &str = "empty line";

/// Comment state carried from one line to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentMode {
    /// Not in a comment.
    #[default]
    None,
    /// A `//` comment filling the line.
    Single,
    /// Inside a `/*` comment.
    Block,
    /// Inside a `/**` comment.
    Javadoc,
    /// A block comment that opened and closed on the line.
    SingleBlock,
    /// Code followed by a block comment left open.
    BlockStart,
}

impl CommentMode {
    /// The name used in type labels.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Single => COMMENT_TYPE,
            Self::Block | Self::SingleBlock => "block comment",
            Self::Javadoc => "Javadoc",
            Self::BlockStart => "block start",
        }
    }

    /// True inside a multi-line comment.
    pub fn in_block(self) -> bool {
        matches!(self, Self::Block | Self::Javadoc)
    }
}

/// State threaded through the lines of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierState {
    /// Comment mode at the start of the next line.
    pub mode: CommentMode,
    /// Previous trimmed code line.
    pub previous_line: String,
    /// Type label of the previous code line.
    pub previous_type: String,
}

/// The classification of one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Code with comments removed, trimmed.
    pub content: String,
    /// Comment text including markers.
    pub comment: String,
    /// Type label.
    pub line_type: String,
    /// Declared or assigned variable.
    pub var: Option<String>,
    /// Declared type.
    pub assign: Option<String>,
    /// Declared or invoked method.
    pub method: Option<String>,
}

/// Classifies lines of Java source.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    /// Configured literal rules, in priority order.
    rules: Vec<LineTypeRule>,
    /// Structural matchers.
    patterns: LinePatterns,
}

impl LineClassifier {
    /// Creates a classifier with the given literal rules.
    pub fn new(rules: Vec<LineTypeRule>) -> Result<Self, IndexError> {
        Ok(Self {
            rules,
            patterns: LinePatterns::compile()?,
        })
    }

    /// Classifies `line` given the state left by the previous line.
    pub fn classify(
        &self,
        line: &str,
        state: ClassifierState,
    ) -> (ClassifiedLine, ClassifierState) {
        let ClassifierState {
            mut mode,
            mut previous_line,
            mut previous_type,
        } = state;

        let mut trimmed = line.trim().to_string();
        let mut result = ClassifiedLine {
            content: trimmed.clone(),
            ..ClassifiedLine::default()
        };
        // Set when this line opens a comment that continues onto the next line.
        let mut opened = false;

        if mode == CommentMode::None && !trimmed.is_empty() {
            let line_comment = trimmed.find("//");
            let block_comment = if line_comment.is_some() {
                None
            } else {
                trimmed.find("/*")
            };

            if line_comment == Some(0) {
                mode = CommentMode::Single;
                result.content.clear();
                result.comment = std::mem::take(&mut trimmed);
            } else if block_comment == Some(0) && trimmed.rfind('/') == Some(0) {
                // Opens a block comment and has no other slash, so it cannot close here.
                let javadoc = trimmed.as_bytes().get(2) == Some(&b'*');
                mode = if javadoc {
                    CommentMode::Javadoc
                } else {
                    CommentMode::Block
                };
                result.content.clear();
                result.comment = trimmed.clone();
                trimmed = trimmed[if javadoc { 3 } else { 2 }..].to_string();
                opened = true;
            } else if line_comment.is_some() || block_comment.is_some() {
                let scan = comments::scan(&trimmed);
                mode = scan.mode;
                trimmed = scan.trimmed;
                result.content = scan.content;
                result.comment = scan.comment;
                opened = mode.in_block();
            }

            if opened {
                previous_line.clear();
                previous_type.clear();
            }
        } else if mode.in_block() {
            result.content.clear();
            result.comment = trimmed.clone();
        }

        match mode {
            CommentMode::None | CommentMode::BlockStart => {
                if mode == CommentMode::BlockStart {
                    mode = CommentMode::Block;
                }
                if trimmed.is_empty() {
                    result.line_type = EMPTY_LINE_TYPE.to_string();
                } else {
                    let found = line_type::infer(
                        &trimmed,
                        &previous_line,
                        &previous_type,
                        &self.rules,
                        &self.patterns,
                    );
                    result.line_type = found.label;
                    result.var = found.var;
                    result.assign = found.assign;
                    result.method = found.method;
                    previous_type = result.line_type.clone();
                    previous_line = trimmed;
                }
            }
            CommentMode::Single => {
                result.line_type = COMMENT_TYPE.to_string();
                mode = CommentMode::None;
            }
            CommentMode::SingleBlock => {
                result.line_type = format!("In {}", mode.label());
                mode = CommentMode::None;
            }
            CommentMode::Block | CommentMode::Javadoc => {
                let label = mode.label();
                let body = trimmed.trim();
                result.line_type = if opened {
                    format!("Start {label}")
                } else if body.is_empty() || body == "*" {
                    format!("In {label} (empty line)")
                } else if body.contains("*/") {
                    mode = CommentMode::None;
                    format!("End {label}")
                } else {
                    format!("In {label}")
                };
            }
        }

        let state = ClassifierState {
            mode,
            previous_line,
            previous_type,
        };
        (result, state)
    }

    /// Classifies every line of a file in order.
    pub fn classify_all<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Vec<ClassifiedLine> {
        let mut state = ClassifierState::default();
        lines
            .into_iter()
            .map(|line| {
                let (classified, next) = self.classify(line, std::mem::take(&mut state));
                state = next;
                classified
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use castle_config::default_line_types;

    use super::*;

    fn classifier() -> LineClassifier {
        LineClassifier::new(default_line_types()).unwrap()
    }

    fn one(line: &str) -> ClassifiedLine {
        classifier().classify(line, ClassifierState::default()).0
    }

    #[test]
    fn plain_code_is_trimmed_content() {
        for line in ["  int x = 1;  ", "foo(bar);", "\treturn total;"] {
            let classified = one(line);
            assert_eq!(classified.content, line.trim());
            assert_eq!(classified.comment, "");
        }
    }

    #[test]
    fn if_line_uses_configured_rule() {
        let classified = one("if (x == 1) {");
        assert_eq!(classified.line_type, "if declaration");
        assert_eq!(classified.comment, "");
    }

    #[test]
    fn whole_line_comment() {
        let classified = one("// TODO fix this");
        assert_eq!(classified.line_type, COMMENT_TYPE);
        assert_eq!(classified.content, "");
        assert_eq!(classified.comment, "// TODO fix this");
    }

    #[test]
    fn declaration_label() {
        let classified = one("int count = 5;");
        assert!(classified.line_type.contains("declare"));
        assert!(classified.line_type.contains("int"));
        assert!(classified.line_type.contains("count"));
        assert_eq!(classified.var.as_deref(), Some("count"));
    }

    #[test]
    fn block_comment_over_two_lines() {
        let lines = classifier().classify_all(["/* start", "end */"]);
        assert_eq!(lines[0].line_type, "Start block comment");
        assert_eq!(lines[0].content, "");
        assert_eq!(lines[0].comment, "/* start");
        assert_eq!(lines[1].line_type, "End block comment");
        assert_eq!(lines[1].content, "");
        assert_eq!(lines[1].comment, "end */");
    }

    #[test]
    fn javadoc_lines() {
        let lines = classifier().classify_all(["/**", " * Saves.", " *", " */", "void save() {"]);
        let types: Vec<&str> = lines.iter().map(|l| l.line_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "Start Javadoc",
                "In Javadoc",
                "In Javadoc (empty line)",
                "End Javadoc",
                "Method save"
            ]
        );
    }

    #[test]
    fn trailing_comment_is_split() {
        let classified = one("return total; // sum");
        assert_eq!(classified.content, "return total;");
        assert_eq!(classified.comment, "// sum");
        assert_eq!(classified.line_type, "return");
    }

    #[test]
    fn same_line_block_comment() {
        let classified = one("/* disabled */");
        assert_eq!(classified.line_type, "In block comment");
        assert_eq!(classified.content, "");
    }

    #[test]
    fn code_then_open_block_continues_comment() {
        let lines = classifier().classify_all(["int x; /* note", "more */", "int y;"]);
        assert_eq!(lines[0].content, "int x;");
        assert_eq!(lines[0].line_type, "declare int x");
        assert_eq!(lines[1].line_type, "End block comment");
        assert_eq!(lines[2].line_type, "declare int y");
    }

    #[test]
    fn code_after_block_close_is_comment_text() {
        let lines = classifier().classify_all(["/* a", "b */ int x;"]);
        assert_eq!(lines[1].line_type, "End block comment");
        assert_eq!(lines[1].content, "");
        assert_eq!(lines[1].comment, "b */ int x;");
    }

    #[test]
    fn blank_and_comment_lines_are_transparent() {
        let lines = classifier().classify_all([
            "String s = call(a,",
            "",
            "// note",
            "b);",
        ]);
        assert_eq!(lines[1].line_type, EMPTY_LINE_TYPE);
        assert_eq!(lines[3].line_type, lines[0].line_type);
    }

    #[test]
    fn block_comment_clears_previous_line() {
        let lines = classifier().classify_all(["foo(a,", "/* x */ /* open", "*/", "b);"]);
        assert_eq!(lines[3].line_type, "");
    }

    #[test]
    fn slashes_in_strings_do_not_start_comments() {
        let classified = one(r#"String url = "http://host";"#);
        assert_eq!(classified.comment, "");
        assert!(classified.line_type.starts_with("declare"));
    }
}
