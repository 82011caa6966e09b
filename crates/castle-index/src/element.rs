//! Maps lines to the method or field that encloses them.
//!
//! A brace-depth scan over classified lines: members are recognized at the top level of a
//! class, interface or enum body, and a member's element covers every line until its body
//! closes or its declaration ends with `;`.

use crate::classify::ClassifiedLine;

/// Type-label prefixes that open a type body.
const TYPE_PREFIXES: &[&str] = &["class ", "interface ", "enum "];

/// A member being tracked.
struct OpenElement {
    /// Element name.
    name: String,
    /// Brace depth where the member was declared.
    depth: usize,
    /// Whether the member's body has been entered.
    entered: bool,
}

/// Returns the enclosing element for each line, in line order.
pub fn resolve_elements(lines: &[ClassifiedLine]) -> Vec<Option<String>> {
    let mut elements = Vec::with_capacity(lines.len());
    let mut depth = 0usize;
    let mut type_bodies: Vec<usize> = Vec::new();
    let mut pending_type = false;
    let mut current: Option<OpenElement> = None;

    for line in lines {
        if current.is_none()
            && type_bodies.last() == Some(&depth)
            && let Some(name) = member_name(line)
        {
            current = Some(OpenElement {
                name,
                depth,
                entered: false,
            });
        }

        if TYPE_PREFIXES.iter().any(|p| line.line_type.starts_with(p)) {
            pending_type = true;
        }

        elements.push(current.as_ref().map(|e| e.name.clone()));

        for brace in braces(&line.content) {
            if brace == b'{' {
                depth += 1;
                if pending_type {
                    type_bodies.push(depth);
                    pending_type = false;
                }
                if let Some(element) = current.as_mut()
                    && depth > element.depth
                {
                    element.entered = true;
                }
            } else {
                if type_bodies.last() == Some(&depth) {
                    type_bodies.pop();
                }
                depth = depth.saturating_sub(1);
            }
        }

        if let Some(element) = &current {
            let closed = element.entered && depth <= element.depth;
            let terminated = !element.entered && line.content.ends_with(';');
            if closed || terminated {
                current = None;
            }
        }
    }
    elements
}

/// The member declared on `line`, if any.
fn member_name(line: &ClassifiedLine) -> Option<String> {
    if line.line_type.starts_with("Method ") || line.line_type.starts_with("Constructor ") {
        return line
            .line_type
            .split_once(' ')
            .map(|(_, name)| name.to_string());
    }
    if line.line_type.starts_with("declare") {
        return line.var.clone();
    }
    None
}

/// Braces in `content`, skipping string and character literals.
fn braces(content: &str) -> Vec<u8> {
    let bytes = content.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' | b'}' => found.push(b),
                _ => {}
            },
        }
        i += 1;
    }
    found
}
