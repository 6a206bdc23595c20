//! Position resolution and text selections.

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeKind, OBJECT_CHAR};
use super::Document;
use crate::error::{Error, Result};

/// A position resolved against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    /// The absolute position.
    pub pos: usize,
    /// Child-index path of the parent node; empty for the document root.
    pub path: Vec<usize>,
    /// Absolute position where the parent's content starts.
    pub parent_start: usize,
    /// Offset into the parent's content.
    pub offset: usize,
    /// Index of the child at or after `offset`.
    pub index: usize,
    /// Character offset when the position falls strictly inside a text node.
    pub text_offset: usize,
}

impl ResolvedPos {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Kind of the parent node, `None` for the document root.
    pub fn parent_kind(&self, doc: &Document) -> Option<NodeKind> {
        doc.node_at(&self.path).map(Node::kind)
    }

    /// Position right after the parent's content.
    pub fn parent_end(&self, doc: &Document) -> usize {
        let size = doc
            .content_at(&self.path)
            .map(super::content_size)
            .unwrap_or(0);
        self.parent_start + size
    }
}

/// A text selection. `anchor` stays put while `head` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Collapsed selection.
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Clamp both ends into `doc`, snapping each to the nearest position
    /// where a cursor can rest.
    pub fn clamp_to(&self, doc: &Document) -> Self {
        let snap = |pos: usize| doc.nearest_cursor_position(pos).unwrap_or(0);
        Self::new(snap(self.anchor), snap(self.head))
    }
}

impl Document {
    /// Resolve an absolute position.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
        if pos > self.content_size() {
            return Err(Error::InvalidPosition(pos));
        }

        let mut path = Vec::new();
        let mut start = 0;
        let mut content: &[Node] = &self.content;
        'descend: loop {
            let rel = pos - start;
            let mut off = 0;
            for (i, child) in content.iter().enumerate() {
                let size = child.node_size();
                if rel < off + size {
                    let rem = rel - off;
                    if rem == 0 {
                        return Ok(ResolvedPos {
                            pos,
                            path,
                            parent_start: start,
                            offset: rel,
                            index: i,
                            text_offset: 0,
                        });
                    }
                    if let Node::Text { .. } = child {
                        return Ok(ResolvedPos {
                            pos,
                            path,
                            parent_start: start,
                            offset: rel,
                            index: i,
                            text_offset: rem,
                        });
                    }
                    path.push(i);
                    start += off + 1;
                    content = child.content();
                    continue 'descend;
                }
                off += size;
            }
            return Ok(ResolvedPos {
                pos,
                path,
                parent_start: start,
                offset: rel,
                index: content.len(),
                text_offset: 0,
            });
        }
    }

    /// Whether a collapsed cursor may rest at `pos`.
    pub fn is_cursor_position(&self, pos: usize) -> bool {
        self.resolve(pos)
            .ok()
            .and_then(|rp| rp.parent_kind(self))
            .is_some_and(|kind| kind.accepts_inline())
    }

    /// Content ranges `(start, end)` of every textblock, in document order.
    pub fn textblock_ranges(&self) -> Vec<(usize, usize)> {
        fn walk(nodes: &[Node], mut pos: usize, out: &mut Vec<(usize, usize)>) {
            for node in nodes {
                let size = node.node_size();
                if node.kind().is_textblock() {
                    out.push((pos + 1, pos + size - 1));
                } else if !node.kind().is_leaf() {
                    walk(node.content(), pos + 1, out);
                }
                pos += size;
            }
        }
        let mut out = Vec::new();
        walk(&self.content, 0, &mut out);
        out
    }

    /// Closest valid cursor position to `pos`, or `None` for a document
    /// without textblocks.
    pub fn nearest_cursor_position(&self, pos: usize) -> Option<usize> {
        let pos = pos.min(self.content_size());
        if self.is_cursor_position(pos) {
            return Some(pos);
        }
        self.textblock_ranges()
            .into_iter()
            .map(|(start, end)| pos.clamp(start, end))
            .min_by_key(|candidate| candidate.abs_diff(pos))
    }

    /// Units of the parent content around `rp`, rendered as text with
    /// [`OBJECT_CHAR`] standing in for chips.
    fn inline_units(&self, rp: &ResolvedPos) -> Vec<char> {
        let mut units = Vec::new();
        if let Some(content) = self.content_at(&rp.path) {
            for node in content {
                match node {
                    Node::Text { text } => units.extend(text.chars()),
                    other => {
                        units.extend(std::iter::repeat(OBJECT_CHAR).take(other.node_size()))
                    }
                }
            }
        }
        units
    }

    /// Character immediately before `pos` inside the same parent.
    pub fn char_before(&self, pos: usize) -> Option<char> {
        let rp = self.resolve(pos).ok()?;
        if rp.offset == 0 {
            return None;
        }
        self.inline_units(&rp).get(rp.offset - 1).copied()
    }

    /// Character immediately after `pos` inside the same parent.
    pub fn char_after(&self, pos: usize) -> Option<char> {
        let rp = self.resolve(pos).ok()?;
        self.inline_units(&rp).get(rp.offset).copied()
    }

    /// Text of the parent content from its start up to `pos`.
    pub fn text_before(&self, pos: usize) -> Result<String> {
        let rp = self.resolve(pos)?;
        Ok(self.inline_units(&rp)[..rp.offset].iter().collect())
    }
}
