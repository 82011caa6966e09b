//! Compiled indexer rules: extension allow-list, filename patterns and line-type rules.

use regex::{Regex, escape};

use crate::parse::{RawFilenamePattern, RawIndexer, RawLineType};

/// How a line-type rule compares its text against a trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCondition {
    /// The line starts with the rule text.
    StartsWith,
    /// The line equals the rule text.
    IsEqual,
}

impl LineCondition {
    /// Parses a condition name, accepting both snake_case and camelCase spellings.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "starts_with" | "startsWith" => Some(Self::StartsWith),
            "is_equal" | "isEqual" => Some(Self::IsEqual),
            _ => None,
        }
    }
}

/// A literal rule mapping a line to a type label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTypeRule {
    /// Label given to matching lines.
    pub label: String,
    /// Comparison used.
    pub condition: LineCondition,
    /// Literal text compared against the line.
    pub text: String,
}

impl LineTypeRule {
    /// Rule that matches lines starting with `text`.
    pub fn starts_with(text: &str, label: &str) -> Self {
        Self {
            label: label.to_string(),
            condition: LineCondition::StartsWith,
            text: text.to_string(),
        }
    }

    /// Rule that matches lines equal to `text`.
    pub fn is_equal(text: &str, label: &str) -> Self {
        Self {
            label: label.to_string(),
            condition: LineCondition::IsEqual,
            text: text.to_string(),
        }
    }

    /// Returns true if the trimmed line satisfies this rule.
    pub fn matches(&self, trimmed: &str) -> bool {
        match self.condition {
            LineCondition::StartsWith => trimmed.starts_with(&self.text),
            LineCondition::IsEqual => trimmed == self.text,
        }
    }
}

/// A regex over file names that yields one derived `field = value` pair.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    /// Pattern searched for in the file name.
    pub regex: Regex,
    /// Field template (`$0`, `$1`, ... are capture references).
    pub field: String,
    /// Value template.
    pub value: String,
}

impl FilenamePattern {
    /// Expands the field and value templates against `file_name`, if the pattern matches.
    pub fn apply(&self, file_name: &str) -> Option<(String, String)> {
        let caps = self.regex.captures(file_name)?;
        let mut field = String::new();
        caps.expand(&self.field, &mut field);
        let mut value = String::new();
        caps.expand(&self.value, &mut value);
        if field.is_empty() {
            return None;
        }
        Some((field, value))
    }
}

/// The compiled rules for one or more file extensions.
#[derive(Debug, Clone)]
pub struct IndexerRules {
    /// Extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Filename-derived field patterns.
    pub filename_patterns: Vec<FilenamePattern>,
    /// Line-type rules, first match wins.
    pub line_types: Vec<LineTypeRule>,
}

impl IndexerRules {
    /// The built-in Java indexer used when no indexer is configured.
    pub fn default_java() -> Self {
        Self {
            extensions: vec!["java".to_string()],
            filename_patterns: Vec::new(),
            line_types: default_line_types(),
        }
    }

    /// Compiles a raw indexer, skipping invalid rules with a warning.
    ///
    /// An indexer without line-type rules gets the default rule list.
    pub fn compile(raw: &RawIndexer) -> Self {
        let filename_patterns = raw
            .filename_pattern
            .iter()
            .filter_map(compile_filename_pattern)
            .collect();
        let line_types: Vec<LineTypeRule> = if raw.line_type.is_empty() {
            default_line_types()
        } else {
            raw.line_type.iter().filter_map(compile_line_type).collect()
        };
        Self {
            extensions: raw
                .ext
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            filename_patterns,
            line_types,
        }
    }

    /// Whether this indexer handles `extension`.
    pub fn handles(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Derived fields for a file name, in pattern order.
    pub fn derived_fields(&self, file_name: &str) -> Vec<(String, String)> {
        self.filename_patterns
            .iter()
            .filter_map(|p| p.apply(file_name))
            .collect()
    }
}

/// Compiles one filename pattern, returning `None` for an invalid regex.
fn compile_filename_pattern(raw: &RawFilenamePattern) -> Option<FilenamePattern> {
    match Regex::new(&raw.pattern) {
        Ok(regex) => Some(FilenamePattern {
            regex,
            field: raw.field.clone(),
            value: raw.value.clone(),
        }),
        Err(e) => {
            log::warn!("skipping filename pattern '{}': {e}", raw.pattern);
            None
        }
    }
}

/// Compiles one line-type rule, returning `None` for an unknown condition.
fn compile_line_type(raw: &RawLineType) -> Option<LineTypeRule> {
    let Some(condition) = LineCondition::parse(&raw.condition) else {
        log::warn!(
            "skipping line type '{}': unknown condition '{}'",
            raw.label,
            raw.condition
        );
        return None;
    };
    Some(LineTypeRule {
        label: raw.label.clone(),
        condition,
        text: raw.text.clone(),
    })
}

/// Default line-type rules for Java sources.
pub fn default_line_types() -> Vec<LineTypeRule> {
    vec![
        LineTypeRule::is_equal("{", "open brace {"),
        LineTypeRule::is_equal("}", "close brace }"),
        LineTypeRule::starts_with("} else if (", "else if"),
        LineTypeRule::starts_with("else if (", "else if"),
        LineTypeRule::is_equal("} else {", "else line"),
        LineTypeRule::is_equal("else {", "else line"),
        LineTypeRule::starts_with("if (", "if declaration"),
        LineTypeRule::starts_with("for (", "for loop declaration"),
        LineTypeRule::starts_with("while (", "while loop declaration"),
        LineTypeRule::is_equal("return;", "return void"),
        LineTypeRule::is_equal("return null;", "return null"),
        LineTypeRule::starts_with("return ", "return"),
        LineTypeRule::is_equal("continue;", "continue"),
        LineTypeRule::is_equal("break;", "break"),
        LineTypeRule::starts_with("package ", "package"),
        LineTypeRule::starts_with("import static ", "import static"),
        LineTypeRule::starts_with("import ", "import"),
        LineTypeRule::is_equal("@Override", "Override"),
        LineTypeRule::starts_with("@SuppressWarnings", "SuppressWarnings"),
        LineTypeRule::starts_with("System.out.print", "System.out"),
        LineTypeRule::starts_with("System.err.print", "System.err"),
        LineTypeRule::starts_with("System.exit(", "System.exit"),
        LineTypeRule::starts_with("throws ", "throws"),
    ]
}

/// Builds the extension allow-list regex, matched against a full path string.
///
/// An empty extension list yields `None`, which callers treat as "match nothing".
pub fn extension_pattern<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Option<Regex> {
    let alternatives: Vec<String> = extensions.into_iter().map(escape).collect();
    if alternatives.is_empty() {
        return None;
    }
    Regex::new(&format!(r"\.(?:{})$", alternatives.join("|"))).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_label<'a>(rules: &'a [LineTypeRule], line: &str) -> Option<&'a str> {
        rules
            .iter()
            .find(|r| r.matches(line))
            .map(|r| r.label.as_str())
    }

    #[test]
    fn default_rules_first_match_wins() {
        let rules = default_line_types();
        assert_eq!(rule_label(&rules, "if (x == 1) {"), Some("if declaration"));
        assert_eq!(rule_label(&rules, "} else if (y) {"), Some("else if"));
        assert_eq!(rule_label(&rules, "return null;"), Some("return null"));
        assert_eq!(rule_label(&rules, "return value;"), Some("return"));
        assert_eq!(rule_label(&rules, "import static a.B.c;"), Some("import static"));
        assert_eq!(rule_label(&rules, "}"), Some("close brace }"));
        assert_eq!(rule_label(&rules, "int x = 1;"), None);
    }

    #[test]
    fn condition_accepts_both_spellings() {
        assert_eq!(LineCondition::parse("startsWith"), Some(LineCondition::StartsWith));
        assert_eq!(LineCondition::parse("is_equal"), Some(LineCondition::IsEqual));
        assert_eq!(LineCondition::parse("contains"), None);
    }

    #[test]
    fn filename_pattern_expands_captures() {
        let pattern = FilenamePattern {
            regex: Regex::new(r"^(\w+)Test\.java$").unwrap(),
            field: "tests".to_string(),
            value: "$1".to_string(),
        };
        assert_eq!(
            pattern.apply("WidgetTest.java"),
            Some(("tests".to_string(), "Widget".to_string()))
        );
        assert_eq!(pattern.apply("Widget.java"), None);
    }

    #[test]
    fn compile_skips_invalid_rules() {
        let raw = RawIndexer {
            ext: vec![".java".to_string()],
            filename_pattern: vec![RawFilenamePattern {
                pattern: "(".to_string(),
                field: "$0".to_string(),
                value: "$0".to_string(),
            }],
            line_type: vec![
                RawLineType {
                    label: "bad".to_string(),
                    condition: "contains".to_string(),
                    text: "x".to_string(),
                },
                RawLineType {
                    label: "log".to_string(),
                    condition: "starts_with".to_string(),
                    text: "LOG.".to_string(),
                },
            ],
        };
        let rules = IndexerRules::compile(&raw);
        assert_eq!(rules.extensions, vec!["java"]);
        assert!(rules.filename_patterns.is_empty());
        assert_eq!(rules.line_types.len(), 1);
        assert_eq!(rules.line_types[0].label, "log");
    }

    #[test]
    fn extension_pattern_matches_suffix_only() {
        let re = extension_pattern(["java", "c++"]).unwrap();
        assert!(re.is_match("/src/Main.java"));
        assert!(re.is_match("/src/lib.c++"));
        assert!(!re.is_match("/src/Main.javax"));
        assert!(!re.is_match("/src/libxc"));
    }

    #[test]
    fn empty_extension_list_matches_nothing() {
        assert!(extension_pattern(Vec::<&str>::new()).is_none());
    }
}
