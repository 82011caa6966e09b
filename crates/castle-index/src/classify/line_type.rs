//! Line-type inference for code lines.
//!
//! Rules run in a fixed order and the first one that matches names the line. Configured
//! literal rules come second, right after multi-line continuations, so they can override
//! every structural rule below them.

use castle_config::LineTypeRule;
use regex::Regex;

/// Java identifier.
const ID: &str = r"[A-Za-z_]\w*";

/// Leading modifiers on declarations.
const MODIFIERS: &str = r"^(?:\s*(?:public|protected|private|static|final)\s+)*";

/// Prefixes that continue the previous line's statement.
const CONTINUATIONS: &[&str] = &["? ", ": ", "&& ", "|| ", "+ ", ", ", "\"", "."];

/// Words that look like a type or return type but start a statement.
const NOT_A_TYPE: &[&str] = &[
    "return",
    "package",
    "continue",
    "throw",
    "new",
    "public",
    "protected",
    "private",
    "static",
    "final",
];

/// Keywords followed by `(` that are not method declarations.
const NOT_A_METHOD: &[&str] = &[
    "super",
    "this",
    "if",
    "while",
    "for",
    "switch",
    "catch",
    "synchronized",
];

/// Compiled matchers for the structural rules.
#[derive(Debug, Clone)]
pub(crate) struct LinePatterns {
    /// Declaration or assignment.
    declaration: Regex,
    /// `name = other;`, used to tell copies from other variable assignments.
    variable_assignment: Regex,
    /// Method signature with a return type.
    method: Regex,
    /// Signature without a return type.
    constructor: Regex,
    /// A line holding only a string literal.
    string_text: Regex,
    /// Calls to methods starting with a known action verb.
    invoke: Regex,
    /// Only symbols and spaces.
    symbols: Regex,
    /// `throw new Name(`.
    throw_new: Regex,
    /// Class, interface or enum declaration.
    type_declaration: Regex,
}

impl LinePatterns {
    /// Compiles all matchers.
    pub(crate) fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            declaration: Regex::new(&format!(
                r"{MODIFIERS}(?:\s*(?P<class>(?:{ID}\.)*{ID}(?:<[^>]+>|\[\])?)\s+)?\s*(?P<var>(?:{ID}\.)*{ID})(?:(?P<assign>\s*=\s*(?:(?P<value>null|true|false);)?)|;)"
            ))?,
            variable_assignment: Regex::new(&format!(
                r"(?:{ID}\.)*(?P<name>{ID})\s*=\s*(?:{ID}\.)*(?P<rhs>{ID});$"
            ))?,
            method: Regex::new(&format!(
                r"{MODIFIERS}\s*(?P<ret>(?:{ID}\.)*{ID}(?:<{ID}>)?)\s+(?P<name>{ID})\("
            ))?,
            constructor: Regex::new(&format!(r"{MODIFIERS}\s*(?P<name>{ID})\("))?,
            string_text: Regex::new(r#"^\s*"(?:\\"|[^"])+"[ ,){};]*$"#)?,
            invoke: Regex::new(&format!(
                r"(?:{ID}|\(\))\.(?P<method>(?:add|close|handle|log|put|save|set|start|stop|take|validate)\w*)\("
            ))?,
            symbols: Regex::new(r"^\W+$")?,
            throw_new: Regex::new(&format!(r"^throw new (?P<name>{ID})\("))?,
            type_declaration: Regex::new(&format!(
                r"{MODIFIERS}(?P<kind>class|interface|enum)\s+(?P<name>{ID})"
            ))?,
        })
    }
}

/// The inferred type of a code line, plus anything captured along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTypeMatch {
    /// Type label; empty when nothing matched.
    pub label: String,
    /// Declared or assigned variable.
    pub var: Option<String>,
    /// Declared type of a declaration.
    pub assign: Option<String>,
    /// Declared or invoked method.
    pub method: Option<String>,
}

impl LineTypeMatch {
    /// A match carrying only a label.
    fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Infers the type of a trimmed, comment-free code line.
pub(crate) fn infer(
    trimmed: &str,
    previous_line: &str,
    previous_type: &str,
    rules: &[LineTypeRule],
    patterns: &LinePatterns,
) -> LineTypeMatch {
    if !previous_type.is_empty() && CONTINUATIONS.iter().any(|p| trimmed.starts_with(p)) {
        return LineTypeMatch::label(previous_type);
    }

    if let Some(rule) = rules.iter().find(|r| r.matches(trimmed)) {
        return LineTypeMatch::label(&rule.label);
    }

    if let Some(found) = declaration(trimmed, patterns) {
        return found;
    }

    if !trimmed.ends_with(';')
        && let Some(found) = signature(trimmed, patterns)
    {
        return found;
    }

    if patterns.string_text.is_match(trimmed) {
        return LineTypeMatch::label("String text");
    }

    if let Some(caps) = patterns.invoke.captures(trimmed) {
        let method = caps["method"].to_string();
        return LineTypeMatch {
            label: method.clone(),
            method: Some(method),
            ..LineTypeMatch::default()
        };
    }

    if patterns.symbols.is_match(trimmed) {
        return LineTypeMatch::label("symbols");
    }

    if let Some(caps) = patterns.throw_new.captures(trimmed) {
        return LineTypeMatch::label(format!("throw {}", &caps["name"]));
    }

    if let Some(caps) = patterns.type_declaration.captures(trimmed) {
        return LineTypeMatch::label(format!("{} {}", &caps["kind"], &caps["name"]));
    }

    if !previous_type.is_empty()
        && (previous_line.ends_with(',')
            || previous_line.ends_with('(')
            || previous_line.ends_with('='))
    {
        return LineTypeMatch::label(previous_type);
    }

    LineTypeMatch::default()
}

/// Matches declarations and assignments.
///
/// Labels read `<kind> [type] <var>`, where kind is `declare` for a bare declaration,
/// `assign` (or `assign null|true|false` for a literal) for an assignment, prefixed with
/// `copy` when the right-hand side has the same name, `variable` for any other variable,
/// and `declare` when the assignment also declares a type.
fn declaration(trimmed: &str, patterns: &LinePatterns) -> Option<LineTypeMatch> {
    let caps = patterns.declaration.captures(trimmed)?;
    let class = caps.name("class").map(|m| m.as_str());
    let var = caps.name("var")?.as_str();
    if class.is_some_and(|c| NOT_A_TYPE.contains(&c)) || var == "continue" {
        return None;
    }

    let assign = caps.name("assign");
    if let Some(assign) = assign {
        // `==` is a comparison.
        let eq = assign.start() + assign.as_str().find('=')?;
        if trimmed.as_bytes().get(eq + 1) == Some(&b'=') {
            return None;
        }
    }

    let mut kind = match (assign, caps.name("value")) {
        (None, _) => "declare".to_string(),
        (Some(_), Some(value)) => format!("assign {}", value.as_str()),
        (Some(_), None) => "assign".to_string(),
    };

    if assign.is_some() {
        if let Some(other) = patterns.variable_assignment.captures(trimmed) {
            let rhs = &other["rhs"];
            if rhs == &other["name"] {
                kind = format!("copy {kind}");
            } else if !matches!(rhs, "true" | "false" | "null") {
                kind = format!("variable {kind}");
            }
        }
        if class.is_some() {
            kind = format!("declare {kind}");
        }
    }

    let label = match class {
        Some(class) => format!("{kind} {class} {var}"),
        None => format!("{kind} {var}"),
    };
    Some(LineTypeMatch {
        label,
        var: Some(var.to_string()),
        assign: class.map(str::to_string),
        method: None,
    })
}

/// Matches method and constructor signatures.
fn signature(trimmed: &str, patterns: &LinePatterns) -> Option<LineTypeMatch> {
    if let Some(caps) = patterns.method.captures(trimmed) {
        let name = &caps["name"];
        if !NOT_A_TYPE.contains(&&caps["ret"]) && !NOT_A_METHOD.contains(&name) {
            return Some(LineTypeMatch {
                label: format!("Method {name}"),
                method: Some(name.to_string()),
                ..LineTypeMatch::default()
            });
        }
    }

    let caps = patterns.constructor.captures(trimmed)?;
    let name = &caps["name"];
    if NOT_A_TYPE.contains(&name) || NOT_A_METHOD.contains(&name) {
        return None;
    }
    Some(LineTypeMatch::label(format!("Constructor {name}")))
}
