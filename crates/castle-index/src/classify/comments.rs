//! String-aware comment scanner for a single trimmed line.

use super::CommentMode;

/// A line split into code and comment parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scan {
    /// Comment state the line leaves behind.
    pub mode: CommentMode,
    /// Text the line-type rules run against.
    pub trimmed: String,
    /// Code with comments removed.
    pub content: String,
    /// Comment text, markers included.
    pub comment: String,
}

impl Scan {
    /// A line with no comments at all.
    fn plain(line: &str) -> Self {
        Self {
            mode: CommentMode::None,
            trimmed: line.to_string(),
            content: line.to_string(),
            comment: String::new(),
        }
    }
}

/// A block comment found by the scanner.
struct BlockSpan {
    /// Byte offset of `/*`.
    start: usize,
    /// Byte offset just past `*/`, or the line length when left open.
    end: usize,
    /// Offset of the comment body.
    body_start: usize,
    /// Offset where the body stops.
    body_end: usize,
    /// Whether `*/` was found.
    closed: bool,
    /// Whether the comment opened with `/**`.
    javadoc: bool,
}

/// Returns the offset just past a string literal opening at `start`, if it is terminated.
fn string_literal_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            b'\r' | b'\n' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Reads the block comment opening at `start`.
fn block_span(bytes: &[u8], start: usize) -> BlockSpan {
    let mut body_start = start + 2;
    // `/**/` is an empty block comment, not a Javadoc opener.
    let javadoc = bytes.get(body_start) == Some(&b'*') && bytes.get(body_start + 1) != Some(&b'/');
    if javadoc {
        body_start += 1;
    }

    let mut i = body_start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return BlockSpan {
                start,
                end: i + 2,
                body_start,
                body_end: i,
                closed: true,
                javadoc,
            };
        }
        i += 1;
    }
    BlockSpan {
        start,
        end: bytes.len(),
        body_start,
        body_end: bytes.len(),
        closed: false,
        javadoc,
    }
}

/// Splits a trimmed line into code and comments.
///
/// String literals are skipped whole, so `"//"` inside a literal is code. Several comments
/// may appear on one line; a `//` comment or an unclosed `/*` consumes the rest of it.
pub(crate) fn scan(line: &str) -> Scan {
    let bytes = line.as_bytes();
    let mut content = String::new();
    let mut comment = String::new();
    let mut found = false;
    let mut mode = CommentMode::None;
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => match string_literal_end(bytes, i) {
                Some(end) => i = end,
                None => i += 1,
            },
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                found = true;
                content.push_str(&line[last..i]);
                comment.push_str(&line[i..]);
                last = bytes.len();
                break;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let span = block_span(bytes, i);
                if span.start == 0 && span.end == bytes.len() {
                    let mode = if span.closed {
                        CommentMode::SingleBlock
                    } else if span.javadoc {
                        CommentMode::Javadoc
                    } else {
                        CommentMode::Block
                    };
                    return Scan {
                        mode,
                        trimmed: line[span.body_start..span.body_end].to_string(),
                        content: String::new(),
                        comment: line.to_string(),
                    };
                }

                found = true;
                content.push_str(&line[last..span.start]);
                comment.push_str(&line[span.start..span.end]);
                last = span.end;
                i = span.end;
                if !span.closed {
                    mode = CommentMode::BlockStart;
                    break;
                }
            }
            _ => i += 1,
        }
    }

    if !found {
        return Scan::plain(line);
    }

    content.push_str(&line[last..]);
    let rest = content.trim();
    if rest.is_empty() {
        // Nothing but comments, e.g. `/* a */ // b` or `/* a */ /* b`.
        let mode = match mode {
            CommentMode::BlockStart => CommentMode::Block,
            _ => CommentMode::SingleBlock,
        };
        return Scan {
            mode,
            trimmed: String::new(),
            content: String::new(),
            comment: line.to_string(),
        };
    }

    Scan {
        mode,
        trimmed: rest.to_string(),
        content: rest.to_string(),
        comment,
    }
}
