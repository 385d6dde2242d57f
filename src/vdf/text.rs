//! Text encoding: nested `"key" "value"` pairs and braced blocks.
//!
//! ```text
//! "UserLocalConfigStore"
//! {
//!     "apps"
//!     {
//!         "10"
//!         {
//!             "tags"
//!             {
//!                 "0"        "Action"
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Quoted tokens understand the escapes `\\`, `\"`, `\n` and `\t`; any other
//! backslash sequence is kept literally. Unquoted tokens and `//` line
//! comments are accepted on input. A leading UTF-8 byte order mark is
//! skipped. Input must be UTF-8; raw byte leaves from the binary encoding
//! are written out unchanged apart from escaping.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::str::CharIndices;
use std::iter::Peekable;

use super::error::{Position, VdfError};
use super::node::Node;

const BOM: char = '\u{feff}';

/// Options for parsing the text encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Return the first top-level entry's block instead of the whole
    /// document. Client config files wrap everything in a single
    /// top-level key (e.g. `UserLocalConfigStore`); callers that address
    /// paths below it set this.
    pub first_as_root: bool,
}

impl ParseOptions {
    pub fn first_as_root() -> Self {
        Self {
            first_as_root: true,
        }
    }
}

/// Parse a text tree from a string
pub fn parse(input: &str, options: ParseOptions) -> Result<Node, VdfError> {
    let input = input.strip_prefix(BOM).unwrap_or(input);
    let mut parser = Parser::new(input);
    let root = parser.parse_block(false)?;

    if !options.first_as_root {
        return Ok(root);
    }

    match root {
        Node::Interior(mut children) if !children.is_empty() => {
            let (key, first) = children.swap_remove(0);
            if first.is_leaf() {
                return Err(VdfError::parse(
                    Position::Line(1),
                    format!("top-level entry \"{}\" is not a block", key),
                    key,
                ));
            }
            Ok(first)
        }
        other => Ok(other),
    }
}

/// Parse a text tree from a reader
pub fn read<R: Read>(mut reader: R, options: ParseOptions) -> Result<Node, VdfError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let input = String::from_utf8(bytes).map_err(|e| {
        let at = e.utf8_error().valid_up_to();
        VdfError::parse(
            Position::Offset(at),
            "input is not valid UTF-8",
            String::from_utf8_lossy(&e.as_bytes()[at.saturating_sub(16)..at]),
        )
    })?;
    parse(&input, options)
}

/// Load a text tree from a file
pub fn load(path: &Path, options: ParseOptions) -> Result<Node, VdfError> {
    let file = fs::File::open(path)?;
    read(std::io::BufReader::new(file), options)
}

/// Serialize a tree to a string. Fails with [`VdfError::NotUtf8`] if a leaf
/// holds raw bytes that are not UTF-8; use [`write`] for those trees.
pub fn to_string(root: &Node) -> Result<String, VdfError> {
    let mut out = Vec::new();
    write(root, &mut out)?;
    String::from_utf8(out).map_err(|e| VdfError::NotUtf8(e.utf8_error().valid_up_to()))
}

/// Write a tree to a writer. The root must be an interior node; its children
/// become the top-level entries of the document.
pub fn write<W: Write>(root: &Node, writer: &mut W) -> Result<(), VdfError> {
    if root.is_leaf() {
        return Err(VdfError::InvalidRoot);
    }
    write_children(root, writer, 0)?;
    writer.flush()?;
    Ok(())
}

/// Write a tree to a file, creating parent directories as needed
pub fn save(root: &Node, path: &Path) -> Result<(), VdfError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write(root, &mut writer)
}

fn write_children<W: Write>(node: &Node, writer: &mut W, depth: usize) -> Result<(), VdfError> {
    let indent = "\t".repeat(depth);

    for (key, child) in node.iter() {
        match child {
            Node::Leaf(value) => {
                write!(writer, "{}\"{}\"\t\t\"", indent, escape(key))?;
                write_escaped(&value.payload(), writer)?;
                writer.write_all(b"\"\n")?;
            }
            Node::Interior(_) => {
                writeln!(writer, "{}\"{}\"", indent, escape(key))?;
                writeln!(writer, "{}{{", indent)?;
                write_children(child, writer, depth + 1)?;
                writeln!(writer, "{}}}", indent)?;
            }
        }
    }

    Ok(())
}

/// Byte-level form of [`escape`] for leaf payloads
fn write_escaped<W: Write>(bytes: &[u8], writer: &mut W) -> Result<(), VdfError> {
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let escaped: &[u8] = match b {
            b'\\' => b"\\\\",
            b'"' => b"\\\"",
            b'\n' => b"\\n",
            b'\t' => b"\\t",
            _ => continue,
        };
        writer.write_all(&bytes[start..i])?;
        writer.write_all(escaped)?;
        start = i + 1;
    }
    writer.write_all(&bytes[start..])?;
    Ok(())
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, PartialEq)]
enum Token {
    Str(String),
    Open,
    Close,
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
        }
    }

    /// Parse `key value` / `key { ... }` entries until a closing brace
    /// (nested) or end of input (top level).
    fn parse_block(&mut self, nested: bool) -> Result<Node, VdfError> {
        let mut node = Node::new();

        loop {
            let key = match self.next_token()? {
                Some(Token::Str(key)) => key,
                Some(Token::Close) if nested => return Ok(node),
                Some(Token::Close) => return Err(self.error("unbalanced closing brace")),
                Some(Token::Open) => return Err(self.error("expected a key, found '{'")),
                None if nested => {
                    return Err(self.error("unexpected end of input, missing closing brace"))
                }
                None => return Ok(node),
            };

            let child = match self.next_token()? {
                Some(Token::Str(value)) => Node::leaf(value),
                Some(Token::Open) => self.parse_block(true)?,
                Some(Token::Close) => {
                    return Err(self.error(format!("key \"{}\" has no value", key)))
                }
                None => {
                    return Err(self.error(format!(
                        "unexpected end of input after key \"{}\"",
                        key
                    )))
                }
            };

            node.insert(key, child);
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, VdfError> {
        self.skip_trivia();

        let Some(c) = self.bump() else {
            return Ok(None);
        };

        match c {
            '{' => Ok(Some(Token::Open)),
            '}' => Ok(Some(Token::Close)),
            '"' => self.quoted().map(|s| Some(Token::Str(s))),
            other => Ok(Some(Token::Str(self.bare(other)))),
        }
    }

    fn quoted(&mut self) -> Result<String, VdfError> {
        let start_line = self.line;
        let mut out = String::new();

        loop {
            match self.bump() {
                None => {
                    return Err(VdfError::parse(
                        Position::Line(start_line),
                        "unterminated quoted string",
                        self.context_for(start_line),
                    ))
                }
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn bare(&mut self, first: char) -> String {
        let mut out = String::from(first);
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '{' || c == '}' || c == '"' {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn skip_trivia(&mut self) {
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.src[idx..].starts_with("//") {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> VdfError {
        VdfError::parse(
            Position::Line(self.line),
            message,
            self.context_for(self.line),
        )
    }

    fn context_for(&self, line: usize) -> String {
        self.src
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(input: &str) -> Result<Node, VdfError> {
        parse(input, ParseOptions::default())
    }

    #[test]
    fn test_parse_nested() {
        let tree = parse_default(r#""apps"{"10"{"tags"{"0" "Action"}}}"#).unwrap();
        assert_eq!(
            tree.get_path(&["apps", "10", "tags", "0"])
                .and_then(Node::as_str),
            Some("Action")
        );
    }

    #[test]
    fn test_parse_formatted_document() {
        let input = "\u{feff}\"Root\"\n{\n\t// comment line\n\t\"a\"\t\t\"1\"\n\t\"b\"\n\t{\n\t\t\"c\"\t\t\"two words\"\n\t}\n}\n";
        let tree = parse_default(input).unwrap();
        let root = tree.get("Root").unwrap();
        assert_eq!(root.get("a").and_then(Node::as_str), Some("1"));
        assert_eq!(
            root.get_path(&["b", "c"]).and_then(Node::as_str),
            Some("two words")
        );
    }

    #[test]
    fn test_first_as_root() {
        let input = r#""UserLocalConfigStore" { "Software" { "x" "y" } }"#;
        let tree = parse(input, ParseOptions::first_as_root()).unwrap();
        assert!(tree.get("UserLocalConfigStore").is_none());
        assert_eq!(
            tree.get_path(&["Software", "x"]).and_then(Node::as_str),
            Some("y")
        );

        let empty = parse("", ParseOptions::first_as_root()).unwrap();
        assert!(empty.is_interior() && empty.is_empty());
    }

    #[test]
    fn test_unquoted_tokens() {
        let tree = parse_default("key value\nblock { inner 5 }").unwrap();
        assert_eq!(tree.get("key").and_then(Node::as_str), Some("value"));
        assert_eq!(
            tree.get_path(&["block", "inner"]).and_then(Node::as_str),
            Some("5")
        );
    }

    #[test]
    fn test_escapes() {
        let tree = parse_default(r#""k" "say \"hi\" \\ C:\path""#).unwrap();
        assert_eq!(
            tree.get("k").and_then(Node::as_str),
            Some(r#"say "hi" \ C:\path"#)
        );
    }

    #[test]
    fn test_unbalanced_open_brace() {
        let err = parse_default("\"a\"\n{\n\"b\" \"c\"\n").unwrap_err();
        match err {
            VdfError::Parse { position, .. } => assert_eq!(position, Position::Line(4)),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_close_brace() {
        let err = parse_default("\"a\" \"b\"\n}").unwrap_err();
        match err {
            VdfError::Parse {
                position, context, ..
            } => {
                assert_eq!(position, Position::Line(2));
                assert_eq!(context, "}");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_default("\"a\" {\n\"b\" \"never closed\n").unwrap_err();
        match err {
            VdfError::Parse {
                position, message, ..
            } => {
                assert_eq!(position, Position::Line(2));
                assert!(message.contains("unterminated"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_value() {
        assert!(parse_default("\"lonely\"").unwrap_err().is_parse());
        assert!(parse_default("\"a\" { \"k\" }").unwrap_err().is_parse());
        assert!(parse_default("{ \"a\" \"b\" }").unwrap_err().is_parse());
    }

    #[test]
    fn test_write_format() {
        let tree = Node::new().with(
            "Root",
            Node::new()
                .with("a", Node::leaf("1"))
                .with("b", Node::new().with("c", Node::leaf("x\"y"))),
        );

        let text = to_string(&tree).unwrap();
        assert_eq!(
            text,
            "\"Root\"\n{\n\t\"a\"\t\t\"1\"\n\t\"b\"\n\t{\n\t\t\"c\"\t\t\"x\\\"y\"\n\t}\n}\n"
        );
    }

    #[test]
    fn test_write_then_parse_is_stable() {
        let text = "\"Root\"\n{\n\t\"a\"\t\t\"1\"\n\t\"empty\"\n\t{\n\t}\n}\n";
        let tree = parse_default(text).unwrap();
        assert_eq!(to_string(&tree).unwrap(), text);
    }

    #[test]
    fn test_non_utf8_input_rejected() {
        let err = read(&b"\"a\"\t\"Caf\xe9\"\n"[..], ParseOptions::default()).unwrap_err();
        match err {
            VdfError::Parse { position, .. } => assert_eq!(position, Position::Offset(8)),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_bytes_written_unchanged() {
        let tree = Node::new().with("a", Node::leaf(b"Caf\xe9 \"x\"".to_vec()));

        let mut out = Vec::new();
        write(&tree, &mut out).unwrap();
        assert_eq!(out, b"\"a\"\t\t\"Caf\xe9 \\\"x\\\"\"\n".to_vec());

        assert!(matches!(to_string(&tree), Err(VdfError::NotUtf8(_))));
    }

    #[test]
    fn test_write_leaf_root_rejected() {
        assert!(matches!(
            to_string(&Node::leaf("x")),
            Err(VdfError::InvalidRoot)
        ));
    }
}
