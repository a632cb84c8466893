//! Splitting source text into lines, and lines into labels and tokens.
//!
//! Lexing cannot fail: comments and surplus input are dropped and malformed
//! lines simply yield fewer tokens, deferring any error to the assembler.

use crate::limits;

/// Source text together with the recorded line start offsets.
///
/// At most [limits::MAX_LINES] starts are recorded. The final recorded line
/// extends to the end of the text, so overflow text is lexed as part of it.
#[derive(Clone, Debug)]
pub struct Source<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Source<'a> {
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the text of line `index`, including its trailing newline.
    pub fn line(&self, index: usize) -> &'a str {
        let begin = self.line_starts[index];
        let end = self
            .line_starts
            .get(index + 1)
            .copied()
            .unwrap_or_else(|| self.text.len());

        &self.text[begin..end]
    }

    pub fn lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        (0..self.line_count()).map(move |index| self.line(index))
    }
}

/// Partitions `text` on newline boundaries, recording each line's start
/// offset up to the line limit.
pub fn split_lines(text: &str) -> Source {
    let mut line_starts = vec![0];

    for (offset, byte) in text.bytes().enumerate() {
        if byte == b'\n' && line_starts.len() < limits::MAX_LINES {
            line_starts.push(offset + 1);
        }
    }

    Source { text, line_starts }
}

/// A single lexed line: an optional label declaration and up to
/// [limits::MAX_TOKENS] operand tokens.
///
/// `empty` marks blank and comment-only lines; a line declaring only a label
/// is not empty even though it has no tokens.
#[derive(Clone, Debug)]
pub struct Line<'a> {
    pub label: Option<&'a str>,
    pub tokens: Vec<&'a str>,
    pub empty: bool,
}

fn is_space(byte: u8) -> bool {
    byte == b' '
        || byte == b'\t'
        || byte == b'\r'
        || byte == b'\n'
        || byte == 0x0b
        || byte == 0x0c
}

fn is_label_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'.'
}

fn is_label_body(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.'
}

/// Cuts the line at the first `#` or `//`, wherever it appears.
fn strip_comment(text: &str) -> &str {
    let bytes = text.as_bytes();

    for index in 0..bytes.len() {
        if bytes[index] == b'#' {
            return &text[..index];
        }

        if bytes[index] == b'/' && index + 1 < bytes.len() && bytes[index + 1] == b'/' {
            return &text[..index];
        }
    }

    text
}

/// Clips a name to the bounded name length. The overflow is dropped
/// silently, so overlong identifiers are unsupported rather than an error.
fn clip(name: &str) -> &str {
    let mut end = limits::MAX_NAME - 1;

    if end >= name.len() {
        return name;
    }

    while !name.is_char_boundary(end) {
        end -= 1;
    }

    &name[..end]
}

fn skip_space(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && is_space(bytes[index]) {
        index += 1;
    }

    index
}

/// Lexes one line: strips comments, captures a leading `name:` label
/// declaration, and splits the rest into tokens on whitespace and commas.
/// Commas are pure separators and never part of a token.
pub fn lex_line(text: &str) -> Line {
    let text = strip_comment(text);
    let bytes = text.as_bytes();

    let mut line = Line {
        label: None,
        tokens: Vec::new(),
        empty: true,
    };

    let mut index = skip_space(bytes, 0);

    if index >= bytes.len() {
        return line;
    }

    line.empty = false;

    if is_label_start(bytes[index]) {
        let mut position = index;

        while position < bytes.len() && is_label_body(bytes[position]) {
            position += 1;
        }

        if position < bytes.len() && bytes[position] == b':' {
            line.label = Some(clip(&text[index..position]));
            index = skip_space(bytes, position + 1);
        }
    }

    while index < bytes.len() {
        index = skip_space(bytes, index);

        if index >= bytes.len() {
            break;
        }

        if bytes[index] == b',' {
            index += 1;
            continue;
        }

        let begin = index;

        while index < bytes.len() && !is_space(bytes[index]) && bytes[index] != b',' {
            index += 1;
        }

        if index > begin && line.tokens.len() < limits::MAX_TOKENS {
            line.tokens.push(clip(&text[begin..index]));
        }
    }

    line
}

#[test]
fn test_split_lines_offsets() {
    let source = split_lines("one\ntwo\nthree");

    assert_eq!(source.line_count(), 3);
    assert_eq!(source.line(0), "one\n");
    assert_eq!(source.line(1), "two\n");
    assert_eq!(source.line(2), "three");
}

#[test]
fn test_split_lines_empty_text() {
    let source = split_lines("");

    assert_eq!(source.line_count(), 1);
    assert_eq!(source.line(0), "");
}

#[test]
fn test_split_lines_cap_folds_tail() {
    let mut text = String::new();

    for _ in 0..3000 {
        text.push_str("addi x1, x1, 1\n");
    }

    let source = split_lines(&text);

    assert_eq!(source.line_count(), limits::MAX_LINES);
    // The overflow lines travel with the last recorded line.
    assert!(source.line(limits::MAX_LINES - 1).matches('\n').count() > 1);
}

#[test]
fn test_lex_comments() {
    assert!(lex_line("# just a comment").empty);
    assert!(lex_line("   // another").empty);
    assert_eq!(lex_line("add x1, x2, x3 # trailing").tokens.len(), 4);
    assert_eq!(lex_line("add x1, x2, x3//glued").tokens.len(), 4);

    // A comment cuts even mid-token.
    let line = lex_line("addi x1, x2, 3#cut");
    assert_eq!(line.tokens, vec!["addi", "x1", "x2", "3"]);
}

#[test]
fn test_lex_labels() {
    let line = lex_line("loop: addi x1, x1, 1");
    assert_eq!(line.label, Some("loop"));
    assert_eq!(line.tokens, vec!["addi", "x1", "x1", "1"]);

    let line = lex_line(".L0:");
    assert_eq!(line.label, Some(".L0"));
    assert!(line.tokens.is_empty());
    assert!(!line.empty);

    // The colon must follow the name immediately.
    let line = lex_line("loop : nop");
    assert_eq!(line.label, None);
    assert_eq!(line.tokens, vec!["loop", ":", "nop"]);

    // A label cannot start with a digit.
    let line = lex_line("9f: nop");
    assert_eq!(line.label, None);
    assert_eq!(line.tokens, vec!["9f:", "nop"]);

    let line = lex_line("done:ret");
    assert_eq!(line.label, Some("done"));
    assert_eq!(line.tokens, vec!["ret"]);
}

#[test]
fn test_lex_token_separators() {
    let line = lex_line("  lw   t0 ,8(sp)  ");
    assert_eq!(line.tokens, vec!["lw", "t0", "8(sp)"]);

    let line = lex_line(",,,");
    assert!(!line.empty);
    assert!(line.tokens.is_empty());
}

#[test]
fn test_lex_token_cap() {
    let line = lex_line("a b c d e f g h i j");
    assert_eq!(line.tokens.len(), limits::MAX_TOKENS);
    assert_eq!(line.tokens[limits::MAX_TOKENS - 1], "h");
}

#[test]
fn test_lex_name_clip() {
    let long = "x".repeat(100);
    let line = lex_line(&long);

    assert_eq!(line.tokens.len(), 1);
    assert_eq!(line.tokens[0].len(), limits::MAX_NAME - 1);

    let labelled = format!("{}: nop", long);
    let line = lex_line(&labelled);
    assert_eq!(line.label.map(str::len), Some(limits::MAX_NAME - 1));
}
