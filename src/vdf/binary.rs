//! Binary encoding: a stream of type-tagged, null-terminated records.
//!
//! | Tag    | Record                                         |
//! |--------|------------------------------------------------|
//! | `0x00` | object start: key, then child records          |
//! | `0x01` | string: key, value (both NUL-terminated)       |
//! | `0x02` | 32-bit integer: key, 4 bytes little-endian     |
//! | `0x07` | 64-bit integer: key, 8 bytes little-endian     |
//! | `0x08` | object end                                     |
//!
//! There are no length prefixes; the root is a run of records closed by a
//! final object-end tag. String payloads are read and written raw with no
//! escaping; a payload that is not UTF-8 is kept as [`Value::Bytes`]. Keys
//! must be UTF-8.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use super::error::{Position, VdfError};
use super::node::{Node, Value};

const TAG_OBJECT: u8 = 0x00;
const TAG_STRING: u8 = 0x01;
const TAG_INT32: u8 = 0x02;
const TAG_UINT64: u8 = 0x07;
const TAG_END: u8 = 0x08;

/// Parse a binary tree from bytes
pub fn parse(bytes: &[u8]) -> Result<Node, VdfError> {
    let mut reader = ByteReader { bytes, pos: 0 };
    reader.read_object()
}

/// Parse a binary tree from a reader
pub fn read<R: Read>(mut reader: R) -> Result<Node, VdfError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse(&bytes)
}

/// Load a binary tree from a file
pub fn load(path: &Path) -> Result<Node, VdfError> {
    parse(&fs::read(path)?)
}

/// Serialize a tree to bytes
pub fn to_bytes(root: &Node) -> Result<Vec<u8>, VdfError> {
    let mut out = Vec::new();
    write(root, &mut out)?;
    Ok(out)
}

/// Write a tree to a writer. The root must be an interior node.
pub fn write<W: Write>(root: &Node, writer: &mut W) -> Result<(), VdfError> {
    if root.is_leaf() {
        return Err(VdfError::InvalidRoot);
    }
    write_object(root, writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a tree to a file, replacing its contents
pub fn save(root: &Node, path: &Path) -> Result<(), VdfError> {
    // Serialize fully before truncating the destination
    let bytes = to_bytes(root)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_object<W: Write>(node: &Node, writer: &mut W) -> Result<(), VdfError> {
    for (key, child) in node.iter() {
        match child {
            Node::Interior(_) => {
                writer.write_all(&[TAG_OBJECT])?;
                write_cstr(key, writer)?;
                write_object(child, writer)?;
            }
            Node::Leaf(value @ (Value::String(_) | Value::Bytes(_))) => {
                writer.write_all(&[TAG_STRING])?;
                write_cstr(key, writer)?;
                write_cbytes(&value.payload(), writer)?;
            }
            Node::Leaf(Value::Int32(v)) => {
                writer.write_all(&[TAG_INT32])?;
                write_cstr(key, writer)?;
                writer.write_all(&v.to_le_bytes())?;
            }
            Node::Leaf(Value::UInt64(v)) => {
                writer.write_all(&[TAG_UINT64])?;
                write_cstr(key, writer)?;
                writer.write_all(&v.to_le_bytes())?;
            }
        }
    }
    writer.write_all(&[TAG_END])?;
    Ok(())
}

fn write_cstr<W: Write>(s: &str, writer: &mut W) -> Result<(), VdfError> {
    write_cbytes(s.as_bytes(), writer)
}

fn write_cbytes<W: Write>(bytes: &[u8], writer: &mut W) -> Result<(), VdfError> {
    if bytes.contains(&0) {
        return Err(VdfError::EmbeddedNul(bytes.escape_ascii().to_string()));
    }
    writer.write_all(bytes)?;
    writer.write_all(&[0])?;
    Ok(())
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Read records until the object-end tag
    fn read_object(&mut self) -> Result<Node, VdfError> {
        let mut node = Node::new();

        loop {
            let tag_pos = self.pos;
            let tag = self.byte()?;

            let child = match tag {
                TAG_END => return Ok(node),
                TAG_OBJECT => {
                    let key = self.key()?;
                    (key, self.read_object()?)
                }
                TAG_STRING => {
                    let key = self.key()?;
                    let raw = self.cstr()?.to_vec();
                    (key, Node::Leaf(Value::from(raw)))
                }
                TAG_INT32 => {
                    let key = self.key()?;
                    let raw = self.take::<4>()?;
                    (key, Node::Leaf(Value::Int32(i32::from_le_bytes(raw))))
                }
                TAG_UINT64 => {
                    let key = self.key()?;
                    let raw = self.take::<8>()?;
                    (key, Node::Leaf(Value::UInt64(u64::from_le_bytes(raw))))
                }
                other => {
                    return Err(VdfError::parse(
                        Position::Offset(tag_pos),
                        format!("unrecognized type tag 0x{:02x}", other),
                        self.context(tag_pos),
                    ))
                }
            };

            node.insert(child.0, child.1);
        }
    }

    fn byte(&mut self) -> Result<u8, VdfError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.truncated("expected a type tag"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Raw bytes up to the next NUL
    fn cstr(&mut self) -> Result<&'a [u8], VdfError> {
        let bytes: &'a [u8] = self.bytes;
        let rest = &bytes[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated("unterminated string"))?;

        self.pos += len + 1;
        Ok(&rest[..len])
    }

    fn key(&mut self) -> Result<String, VdfError> {
        let start = self.pos;
        let raw = self.cstr()?;
        String::from_utf8(raw.to_vec()).map_err(|e| {
            let at = start + e.utf8_error().valid_up_to();
            VdfError::parse(Position::Offset(at), "key is not valid UTF-8", self.context(at))
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], VdfError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or_else(|| self.truncated("integer payload cut short"))?;

        let mut raw = [0u8; N];
        raw.copy_from_slice(slice);
        self.pos += N;
        Ok(raw)
    }

    fn truncated(&self, message: &str) -> VdfError {
        VdfError::parse(
            Position::Offset(self.pos),
            format!("truncated input: {}", message),
            self.context(self.pos),
        )
    }

    /// Printable rendering of the bytes around `at`
    fn context(&self, at: usize) -> String {
        let start = at.saturating_sub(8);
        let end = (at + 8).min(self.bytes.len());
        self.bytes[start.min(end)..end]
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    (b as char).to_string()
                } else {
                    format!("\\x{:02x}", b)
                }
            })
            .collect()
    }
}
