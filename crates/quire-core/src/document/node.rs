//! Document node types and their JSON representation.
//!
//! The persisted JSON form is a tree of `{"type", "attrs", "content", "text"}`
//! objects. `attrs` is only written for kinds that carry attributes and
//! `content` is omitted when empty.

use serde_json::{json, Map, Value as JsonValue};

use crate::chips::ChipColor;
use crate::error::{Error, Result};

/// Placeholder character reported for inline leaf nodes when reading text
/// around a position.
pub const OBJECT_CHAR: char = '\u{FFFC}';

/// Closed set of node kinds known to the editor schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    CodeBlock,
    HorizontalRule,
    TagChip,
    DateChip,
    Text,
}

impl NodeKind {
    /// Schema name used in the JSON `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BulletList => "bulletList",
            Self::OrderedList => "orderedList",
            Self::ListItem => "listItem",
            Self::TaskList => "taskList",
            Self::TaskItem => "taskItem",
            Self::CodeBlock => "codeBlock",
            Self::HorizontalRule => "horizontalRule",
            Self::TagChip => "tagChip",
            Self::DateChip => "dateChip",
            Self::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "paragraph" => Self::Paragraph,
            "heading" => Self::Heading,
            "bulletList" => Self::BulletList,
            "orderedList" => Self::OrderedList,
            "listItem" => Self::ListItem,
            "taskList" => Self::TaskList,
            "taskItem" => Self::TaskItem,
            "codeBlock" => Self::CodeBlock,
            "horizontalRule" => Self::HorizontalRule,
            "tagChip" => Self::TagChip,
            "dateChip" => Self::DateChip,
            "text" => Self::Text,
            _ => return None,
        })
    }

    /// Inline nodes live inside textblocks.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::TagChip | Self::DateChip | Self::Text)
    }

    /// Blocks whose content is inline.
    pub fn is_textblock(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading | Self::CodeBlock)
    }

    /// Nodes without content.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::HorizontalRule | Self::DateChip | Self::Text)
    }

    /// Leaf nodes that the cursor cannot enter.
    pub fn is_atom(&self) -> bool {
        matches!(self, Self::HorizontalRule | Self::DateChip)
    }

    /// Nodes whose content the cursor can sit in.
    pub fn accepts_inline(&self) -> bool {
        self.is_textblock() || *self == Self::TagChip
    }

    /// Default attribute object, or `None` for kinds without attributes.
    pub fn default_attrs(&self) -> Option<JsonValue> {
        match self {
            Self::Heading => Some(json!({ "level": 1 })),
            Self::TaskItem => Some(json!({ "checked": false })),
            Self::CodeBlock => Some(json!({ "language": null })),
            Self::TagChip => Some(json!({ "color": ChipColor::default().as_str() })),
            Self::DateChip => Some(json!({ "date": null })),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Paragraph { content: Vec<Node> },
    Heading { level: u8, content: Vec<Node> },
    BulletList { content: Vec<Node> },
    OrderedList { content: Vec<Node> },
    ListItem { content: Vec<Node> },
    TaskList { content: Vec<Node> },
    TaskItem { checked: bool, content: Vec<Node> },
    CodeBlock { language: Option<String>, content: Vec<Node> },
    HorizontalRule,
    /// Inline, non-atomic chip holding a single text run.
    TagChip { color: ChipColor, content: Vec<Node> },
    /// Inline atom carrying an ISO-8601 date.
    DateChip { date: String },
    Text { text: String },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::Paragraph { content }
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            content,
        }
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::BulletList { content: items }
    }

    pub fn ordered_list(items: Vec<Node>) -> Self {
        Self::OrderedList { content: items }
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Self::ListItem { content }
    }

    pub fn task_list(items: Vec<Node>) -> Self {
        Self::TaskList { content: items }
    }

    pub fn task_item(checked: bool, content: Vec<Node>) -> Self {
        Self::TaskItem { checked, content }
    }

    pub fn code_block(language: Option<String>, code: &str) -> Self {
        let content = if code.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(code)]
        };
        Self::CodeBlock { language, content }
    }

    pub fn horizontal_rule() -> Self {
        Self::HorizontalRule
    }

    pub fn tag_chip(color: ChipColor, label: &str) -> Self {
        let content = if label.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(label)]
        };
        Self::TagChip { color, content }
    }

    pub fn date_chip(date: impl Into<String>) -> Self {
        Self::DateChip { date: date.into() }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Paragraph { .. } => NodeKind::Paragraph,
            Self::Heading { .. } => NodeKind::Heading,
            Self::BulletList { .. } => NodeKind::BulletList,
            Self::OrderedList { .. } => NodeKind::OrderedList,
            Self::ListItem { .. } => NodeKind::ListItem,
            Self::TaskList { .. } => NodeKind::TaskList,
            Self::TaskItem { .. } => NodeKind::TaskItem,
            Self::CodeBlock { .. } => NodeKind::CodeBlock,
            Self::HorizontalRule => NodeKind::HorizontalRule,
            Self::TagChip { .. } => NodeKind::TagChip,
            Self::DateChip { .. } => NodeKind::DateChip,
            Self::Text { .. } => NodeKind::Text,
        }
    }

    pub fn content(&self) -> &[Node] {
        match self {
            Self::Paragraph { content }
            | Self::Heading { content, .. }
            | Self::BulletList { content }
            | Self::OrderedList { content }
            | Self::ListItem { content }
            | Self::TaskList { content }
            | Self::TaskItem { content, .. }
            | Self::CodeBlock { content, .. }
            | Self::TagChip { content, .. } => content,
            Self::HorizontalRule | Self::DateChip { .. } | Self::Text { .. } => &[],
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Paragraph { content }
            | Self::Heading { content, .. }
            | Self::BulletList { content }
            | Self::OrderedList { content }
            | Self::ListItem { content }
            | Self::TaskList { content }
            | Self::TaskItem { content, .. }
            | Self::CodeBlock { content, .. }
            | Self::TagChip { content, .. } => Some(content),
            Self::HorizontalRule | Self::DateChip { .. } | Self::Text { .. } => None,
        }
    }

    /// Number of positions the node occupies in its parent.
    pub fn node_size(&self) -> usize {
        match self {
            Self::Text { text } => text.chars().count(),
            Self::HorizontalRule | Self::DateChip { .. } => 1,
            _ => 2 + content_size(self.content()),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            _ => self.content().iter().map(Node::text_content).collect(),
        }
    }

    fn attrs(&self) -> Option<JsonValue> {
        match self {
            Self::Heading { level, .. } => Some(json!({ "level": level })),
            Self::TaskItem { checked, .. } => Some(json!({ "checked": checked })),
            Self::CodeBlock { language, .. } => Some(json!({ "language": language })),
            Self::TagChip { color, .. } => Some(json!({ "color": color.as_str() })),
            Self::DateChip { date } => Some(json!({ "date": date })),
            _ => None,
        }
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        obj.insert("type".into(), JsonValue::from(self.kind().name()));
        if let Some(attrs) = self.attrs() {
            obj.insert("attrs".into(), attrs);
        }
        if let Self::Text { text } = self {
            obj.insert("text".into(), JsonValue::from(text.as_str()));
        }
        let content = self.content();
        if !content.is_empty() {
            obj.insert(
                "content".into(),
                JsonValue::Array(content.iter().map(Node::to_json).collect()),
            );
        }
        JsonValue::Object(obj)
    }

    /// Parse the persisted JSON form. Missing attributes take their defaults.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Serialization("node must be a JSON object".into()))?;
        let type_name = obj
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Serialization("node is missing \"type\"".into()))?;
        let kind = NodeKind::from_name(type_name)
            .ok_or_else(|| Error::Serialization(format!("unknown node type: {}", type_name)))?;

        let empty = Map::new();
        let attrs = obj
            .get("attrs")
            .and_then(JsonValue::as_object)
            .unwrap_or(&empty);

        let mut content = match obj.get("content") {
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(Node::from_json)
                .collect::<Result<Vec<_>>>()?,
            Some(JsonValue::Null) | None => Vec::new(),
            Some(_) => {
                return Err(Error::Serialization(format!(
                    "{} content must be an array",
                    type_name
                )))
            }
        };
        if kind.accepts_inline() {
            normalize_inline(&mut content);
        }

        let node = match kind {
            NodeKind::Paragraph => Self::Paragraph { content },
            NodeKind::Heading => {
                let level = attrs.get("level").and_then(JsonValue::as_u64).unwrap_or(1);
                Self::heading(level.min(6) as u8, content)
            }
            NodeKind::BulletList => Self::BulletList { content },
            NodeKind::OrderedList => Self::OrderedList { content },
            NodeKind::ListItem => Self::ListItem { content },
            NodeKind::TaskList => Self::TaskList { content },
            NodeKind::TaskItem => Self::TaskItem {
                checked: attrs
                    .get("checked")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
                content,
            },
            NodeKind::CodeBlock => Self::CodeBlock {
                language: attrs
                    .get("language")
                    .and_then(JsonValue::as_str)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
                content,
            },
            NodeKind::HorizontalRule => Self::HorizontalRule,
            NodeKind::TagChip => {
                if content.iter().any(|n| n.kind() != NodeKind::Text) {
                    return Err(Error::Serialization(
                        "tagChip may only contain text".into(),
                    ));
                }
                Self::TagChip {
                    color: attrs
                        .get("color")
                        .and_then(JsonValue::as_str)
                        .and_then(|c| c.parse().ok())
                        .unwrap_or_default(),
                    content,
                }
            }
            NodeKind::DateChip => Self::DateChip {
                date: attrs
                    .get("date")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            NodeKind::Text => Self::Text {
                text: obj
                    .get("text")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| Error::Serialization("text node is missing \"text\"".into()))?
                    .to_string(),
            },
        };
        Ok(node)
    }
}

/// Total size of a content list.
pub fn content_size(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::node_size).sum()
}

/// Merge adjacent text runs and drop empty ones.
pub fn normalize_inline(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content.drain(..) {
        match node {
            Node::Text { text } if text.is_empty() => {}
            Node::Text { text } => {
                if let Some(Node::Text { text: prev }) = merged.last_mut() {
                    prev.push_str(&text);
                } else {
                    merged.push(Node::Text { text });
                }
            }
            other => merged.push(other),
        }
    }
    *content = merged;
}

/// Split inline content at `offset`, cutting a text run in two when the
/// offset falls inside it. Non-text nodes are never split.
pub fn split_inline(content: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut off = 0;
    for node in content {
        let size = node.node_size();
        if off + size <= offset {
            left.push(node.clone());
        } else if off >= offset {
            right.push(node.clone());
        } else if let Node::Text { text } = node {
            let (head, tail) = split_chars(text, offset - off);
            left.push(Node::text(head));
            right.push(Node::text(tail));
        } else {
            right.push(node.clone());
        }
        off += size;
    }
    normalize_inline(&mut left);
    normalize_inline(&mut right);
    (left, right)
}

/// Split a string at a character index.
pub(crate) fn split_chars(text: &str, at: usize) -> (String, String) {
    let byte = text
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (text[..byte].to_string(), text[byte..].to_string())
}
