//! Tree node type shared by both encodings.

use std::borrow::Cow;
use std::fmt;

/// Payload of a leaf node
///
/// The text encoding only ever produces strings. The binary encoding also
/// carries integer records, and string records whose bytes are not UTF-8;
/// both are kept as-is so shortcut files survive a read/write cycle
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    /// Raw string record that is not valid UTF-8
    Bytes(Vec<u8>),
    Int32(i32),
    UInt64(u64),
}

impl Value {
    /// String payload, if this is a string leaf
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Payload as written in a string position (integers in decimal)
    pub fn payload(&self) -> Cow<'_, [u8]> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_bytes()),
            Value::Bytes(b) => Cow::Borrowed(b),
            Value::Int32(v) => Cow::Owned(v.to_string().into_bytes()),
            Value::UInt64(v) => Cow::Owned(v.to_string().into_bytes()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "{}", b.escape_ascii()),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    /// Valid UTF-8 becomes a string, anything else stays raw
    fn from(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }
}

/// A node in a key-value tree: either a leaf or an ordered set of children
///
/// Children keep insertion order (the binary encoding is order-sensitive)
/// and keys are unique within one interior node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(Value),
    Interior(Vec<(String, Node)>),
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Create an empty interior node
    pub fn new() -> Self {
        Node::Interior(Vec::new())
    }

    /// Create a string leaf
    pub fn leaf(value: impl Into<Value>) -> Self {
        Node::Leaf(value.into())
    }

    /// Add a child and return self (builder style)
    pub fn with(mut self, key: impl Into<String>, child: Node) -> Self {
        self.insert(key, child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, Node::Interior(_))
    }

    /// String payload of a string leaf
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => value.as_str(),
            Node::Interior(_) => None,
        }
    }

    /// Leaf payload
    pub fn value(&self) -> Option<&Value> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Interior(_) => None,
        }
    }

    /// Children of an interior node (empty for a leaf)
    pub fn children(&self) -> &[(String, Node)] {
        match self {
            Node::Interior(children) => children,
            Node::Leaf(_) => &[],
        }
    }

    /// Mutable children of an interior node
    pub fn children_mut(&mut self) -> Option<&mut Vec<(String, Node)>> {
        match self {
            Node::Interior(children) => Some(children),
            Node::Leaf(_) => None,
        }
    }

    /// Iterate over `(key, child)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children().iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children().len()
    }

    /// True for a leaf or an interior node without children
    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.children()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.children_mut()?
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace a child.
    ///
    /// A replaced child keeps its position. Inserting into a leaf turns it
    /// into an empty interior node first.
    pub fn insert(&mut self, key: impl Into<String>, child: Node) -> Option<Node> {
        let key = key.into();
        let children = self.make_interior();

        if let Some(slot) = children.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, child));
        }

        children.push((key, child));
        None
    }

    /// Get a child, creating an empty interior node if it is missing
    pub fn entry(&mut self, key: &str) -> &mut Node {
        let children = self.make_interior();

        let idx = match children.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                children.push((key.to_string(), Node::new()));
                children.len() - 1
            }
        };

        &mut children[idx].1
    }

    /// Remove a direct child
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let children = self.children_mut()?;
        let pos = children.iter().position(|(k, _)| k == key)?;
        Some(children.remove(pos).1)
    }

    /// Follow a path of keys.
    ///
    /// Returns `None` when a key is missing or a leaf sits where an interior
    /// node was expected.
    pub fn get_path(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Follow a path of keys mutably, optionally creating missing nodes.
    ///
    /// With `create` set, missing intermediate nodes are added as empty
    /// interior nodes and a leaf in the way is replaced by one.
    pub fn get_path_mut(&mut self, path: &[&str], create: bool) -> Option<&mut Node> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };

        let child = if create {
            self.entry(first)
        } else {
            self.get_mut(first)?
        };

        child.get_path_mut(rest, create)
    }

    /// Remove the node at `path`, then drop every ancestor left empty by the
    /// removal. `self` is never removed.
    ///
    /// Returns true if a node was removed.
    pub fn remove_pruned(&mut self, path: &[&str]) -> bool {
        match path {
            [] => false,
            [key] => self.remove(key).is_some(),
            [first, rest @ ..] => {
                let Some(child) = self.get_mut(first) else {
                    return false;
                };

                let removed = child.remove_pruned(rest);
                if removed && child.is_interior() && child.is_empty() {
                    self.remove(first);
                }
                removed
            }
        }
    }

    /// Recursively remove interior children that are (or become) empty.
    ///
    /// Returns the number of nodes removed.
    pub fn clean_tree(&mut self) -> usize {
        let Some(children) = self.children_mut() else {
            return 0;
        };

        let mut removed = 0;
        for (_, child) in children.iter_mut() {
            removed += child.clean_tree();
        }

        let before = children.len();
        children.retain(|(_, child)| !(child.is_interior() && child.is_empty()));
        removed + (before - children.len())
    }

    fn make_interior(&mut self) -> &mut Vec<(String, Node)> {
        if self.is_leaf() {
            *self = Node::new();
        }

        match self {
            Node::Interior(children) => children,
            Node::Leaf(_) => unreachable!("leaf was replaced above"),
        }
    }
}
