//! Structured document model.
//!
//! A [`Document`] is a tree of [`Node`]s with integer positions: a text node
//! occupies one position per character, a leaf node one position, and every
//! other node two positions (open and close) plus its content. Position `0`
//! is the start of the document content and `content_size()` its end.

mod html;
mod node;
mod position;
mod transform;

pub use node::{content_size, normalize_inline, split_inline, Node, NodeKind, OBJECT_CHAR};
pub use position::{ResolvedPos, Selection};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value as JsonValue};

use crate::chips::format_date_label;
use crate::error::{Error, Result};

/// Root of a structured note body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    /// A document holding a single empty paragraph.
    pub fn empty() -> Self {
        Self::new(vec![Node::paragraph(Vec::new())])
    }

    pub fn content_size(&self) -> usize {
        content_size(&self.content)
    }

    /// Node at a child-index path; the empty path has no node (it is the root).
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get(*first)?;
        for idx in rest {
            node = node.content().get(*idx)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get_mut(*first)?;
        for idx in rest {
            node = node.content_mut()?.get_mut(*idx)?;
        }
        Some(node)
    }

    /// Content list of the node at `path`, or the root content for `[]`.
    pub fn content_at(&self, path: &[usize]) -> Option<&[Node]> {
        if path.is_empty() {
            Some(&self.content)
        } else {
            self.node_at(path).map(Node::content)
        }
    }

    pub fn content_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            Some(&mut self.content)
        } else {
            self.node_at_mut(path)?.content_mut()
        }
    }

    /// Position directly before the node at `path`.
    pub fn position_before(&self, path: &[usize]) -> Result<usize> {
        let mut pos = 0;
        let mut content: &[Node] = &self.content;
        for (depth, idx) in path.iter().enumerate() {
            let child = content
                .get(*idx)
                .ok_or_else(|| Error::InvalidInput(format!("no node at path {:?}", path)))?;
            pos += content_size(&content[..*idx]);
            if depth + 1 < path.len() {
                pos += 1;
                content = child.content();
            }
        }
        Ok(pos)
    }

    /// Plain-text mirror used for search previews. Blocks are separated by
    /// newlines and date chips render as their display label.
    pub fn plain_text(&self) -> String {
        fn inline(nodes: &[Node], out: &mut String) {
            for node in nodes {
                match node {
                    Node::Text { text } => out.push_str(text),
                    Node::DateChip { date } => out.push_str(&format_date_label(date)),
                    other => inline(other.content(), out),
                }
            }
        }
        fn blocks(nodes: &[Node], lines: &mut Vec<String>) {
            for node in nodes {
                match node.kind() {
                    NodeKind::HorizontalRule => {}
                    kind if kind.is_textblock() => {
                        let mut line = String::new();
                        inline(node.content(), &mut line);
                        lines.push(line);
                    }
                    _ => blocks(node.content(), lines),
                }
            }
        }

        let mut lines = Vec::new();
        blocks(&self.content, &mut lines);
        lines.join("\n").trim().to_string()
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "type": "doc",
            "content": self.content.iter().map(Node::to_json).collect::<Vec<_>>(),
        })
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let type_name = value.get("type").and_then(JsonValue::as_str);
        if type_name != Some("doc") {
            return Err(Error::Serialization(
                "document root must have type \"doc\"".into(),
            ));
        }
        let content = match value.get("content") {
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(Node::from_json)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        if content.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self::new(content))
    }

    /// Render as HTML markup.
    pub fn to_html(&self) -> String {
        html::render(&self.content)
    }

    /// Parse HTML markup produced by [`Document::to_html`] or pasted from
    /// elsewhere. Unknown elements are unwrapped.
    pub fn from_html(markup: &str) -> Result<Self> {
        let content = html::parse(markup)?;
        if content.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self::new(content))
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Document::from_json(&value).map_err(serde::de::Error::custom)
    }
}
