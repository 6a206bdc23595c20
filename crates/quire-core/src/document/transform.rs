//! Structural edits on a document.

use super::node::{content_size, normalize_inline, split_chars, Node, NodeKind};
use super::Document;
use crate::error::{Error, Result};

impl Document {
    /// Insert inline nodes at `pos`, splitting a text run when needed.
    /// Returns the position right after the inserted content.
    pub fn insert_inline(&mut self, pos: usize, nodes: Vec<Node>) -> Result<usize> {
        let rp = self.resolve(pos)?;
        let parent = rp
            .parent_kind(self)
            .filter(NodeKind::accepts_inline)
            .ok_or(Error::InvalidPosition(pos))?;
        if let Some(bad) = nodes.iter().find(|n| !n.kind().is_inline()) {
            return Err(Error::InvalidInput(format!(
                "{} cannot be inserted inline",
                bad.kind()
            )));
        }
        let text_only = matches!(parent, NodeKind::CodeBlock | NodeKind::TagChip);
        if text_only && nodes.iter().any(|n| n.kind() != NodeKind::Text) {
            return Err(Error::InvalidInput(format!("{} only accepts text", parent)));
        }

        let inserted = content_size(&nodes);
        let content = self
            .content_at_mut(&rp.path)
            .ok_or(Error::InvalidPosition(pos))?;
        let mut index = rp.index;
        if rp.text_offset > 0 {
            if let Some(Node::Text { text }) = content.get(index) {
                let (left, right) = split_chars(text, rp.text_offset);
                content[index] = Node::text(left);
                content.insert(index + 1, Node::text(right));
                index += 1;
            }
        }
        content.splice(index..index, nodes);
        normalize_inline(content);
        Ok(pos + inserted)
    }

    /// Insert plain text at `pos`. Returns the position after the text.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<usize> {
        self.insert_inline(pos, vec![Node::text(text)])
    }

    /// Delete the inline range `from..to`, which must stay inside one parent.
    pub fn delete_inline(&mut self, from: usize, to: usize) -> Result<()> {
        if from > to {
            return Err(Error::InvalidInput(format!("inverted range {}..{}", from, to)));
        }
        if from == to {
            return Ok(());
        }
        let start = self.resolve(from)?;
        let end = self.resolve(to)?;
        if start.path != end.path {
            return Err(Error::InvalidInput(format!(
                "range {}..{} spans more than one block",
                from, to
            )));
        }
        if !start
            .parent_kind(self)
            .is_some_and(|kind| kind.accepts_inline())
        {
            return Err(Error::InvalidPosition(from));
        }

        let (lo, hi) = (start.offset, end.offset);
        let content = self
            .content_at_mut(&start.path)
            .ok_or(Error::InvalidPosition(from))?;
        let mut kept = Vec::with_capacity(content.len());
        let mut off = 0;
        for node in content.drain(..) {
            let size = node.node_size();
            let (node_start, node_end) = (off, off + size);
            off = node_end;
            if node_end <= lo || node_start >= hi {
                kept.push(node);
                continue;
            }
            if let Node::Text { text } = &node {
                let chars: Vec<char> = text.chars().collect();
                let head = lo.saturating_sub(node_start).min(size);
                let tail = (hi - node_start).min(size);
                let remaining: String = chars[..head].iter().chain(&chars[tail..]).collect();
                kept.push(Node::text(remaining));
            }
        }
        *content = kept;
        normalize_inline(content);
        Ok(())
    }

    /// Replace `remove` children of the node at `parent_path` starting at
    /// `index` with `nodes`.
    pub fn splice(
        &mut self,
        parent_path: &[usize],
        index: usize,
        remove: usize,
        nodes: Vec<Node>,
    ) -> Result<()> {
        let inline_parent = self
            .node_at(parent_path)
            .is_some_and(|n| n.kind().accepts_inline());
        let content = self
            .content_at_mut(parent_path)
            .ok_or_else(|| Error::InvalidInput(format!("no container at {:?}", parent_path)))?;
        if index + remove > content.len() {
            return Err(Error::InvalidInput(format!(
                "splice {}..{} out of bounds ({} children)",
                index,
                index + remove,
                content.len()
            )));
        }
        content.splice(index..index + remove, nodes);
        if inline_parent {
            normalize_inline(content);
        }
        Ok(())
    }

    /// Replace the node at `path` with `nodes`.
    pub fn replace_node(&mut self, path: &[usize], nodes: Vec<Node>) -> Result<()> {
        let (index, parent) = path
            .split_last()
            .ok_or_else(|| Error::InvalidInput("cannot replace the document root".into()))?;
        self.splice(parent, *index, 1, nodes)
    }
}
