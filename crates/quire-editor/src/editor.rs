//! The editing surface: a document, a selection and a command API.
//!
//! Every mutating command runs against a draft copy of the document and is
//! committed only when it succeeds, so a failed command never leaves a
//! half-applied edit behind. Committed edits publish
//! [`EditorEvent::ContentChanged`]; [`Editor::set_content`] can suppress that
//! so content arriving from the store is not mistaken for a local edit.

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::debug;

use quire_core::document::{content_size, normalize_inline, split_inline};
use quire_core::{Document, Error, EventBus, EventEnvelope, Node, NodeKind, Result, Selection};

use crate::config::EditorConfig;
use crate::events::EditorEvent;

/// Target type for [`Editor::set_block_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    CodeBlock(Option<String>),
}

impl BlockType {
    fn build(&self, source: &Node) -> Node {
        let inline = source.content().to_vec();
        match self {
            Self::Paragraph => Node::paragraph(inline),
            Self::Heading(level) => Node::heading(*level, inline),
            Self::CodeBlock(language) => {
                let language = language.clone().or_else(|| match source {
                    Node::CodeBlock { language, .. } => language.clone(),
                    _ => None,
                });
                Node::code_block(language, &flatten_text(source.content()))
            }
        }
    }
}

/// List flavours for [`Editor::wrap_in_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

impl ListKind {
    pub fn node_kind(self) -> NodeKind {
        match self {
            Self::Bullet => NodeKind::BulletList,
            Self::Ordered => NodeKind::OrderedList,
            Self::Task => NodeKind::TaskList,
        }
    }

    /// A single item of this list kind. Task items start unchecked.
    pub fn item(self, content: Vec<Node>) -> Node {
        match self {
            Self::Task => Node::task_item(false, content),
            Self::Bullet | Self::Ordered => Node::list_item(content),
        }
    }

    pub fn list(self, items: Vec<Node>) -> Node {
        match self {
            Self::Bullet => Node::bullet_list(items),
            Self::Ordered => Node::ordered_list(items),
            Self::Task => Node::task_list(items),
        }
    }

    /// `n` items, each holding one empty paragraph.
    pub fn empty_items(self, n: usize) -> Vec<Node> {
        (0..n)
            .map(|_| self.item(vec![Node::paragraph(Vec::new())]))
            .collect()
    }

    /// Rebuild `list` as this kind, keeping every item's content.
    fn convert(self, list: &Node) -> Node {
        self.list(
            list.content()
                .iter()
                .map(|item| self.item(item.content().to_vec()))
                .collect(),
        )
    }
}

/// Text of inline content with chips flattened to their text (tag chips)
/// or ISO date (date chips).
pub(crate) fn flatten_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text { text } => out.push_str(text),
            Node::DateChip { date } => out.push_str(date),
            other => out.push_str(&flatten_text(other.content())),
        }
    }
    out
}

/// Copy of `node` with its content replaced.
pub(crate) fn with_content(node: &Node, content: Vec<Node>) -> Node {
    let mut node = node.clone();
    if let Some(slot) = node.content_mut() {
        *slot = content;
    }
    node
}

/// Path of the list item whose first child is the textblock at `path`.
fn enclosing_list_item(doc: &Document, path: &[usize]) -> Option<(Vec<usize>, Node)> {
    let (last, item_path) = path.split_last()?;
    if *last != 0 || item_path.is_empty() {
        return None;
    }
    let item = doc.node_at(item_path)?;
    matches!(item.kind(), NodeKind::ListItem | NodeKind::TaskItem)
        .then(|| (item_path.to_vec(), item.clone()))
}

/// In-memory editing surface.
#[derive(Debug)]
pub struct Editor {
    doc: Document,
    selection: Selection,
    focused: bool,
    pending_date_pick: Option<usize>,
    events: EventBus<EditorEvent>,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    /// An editor over an empty document with the cursor in its paragraph.
    pub fn new(config: EditorConfig) -> Self {
        let doc = Document::empty();
        let selection = Selection::cursor(1).clamp_to(&doc);
        Self {
            doc,
            selection,
            focused: false,
            pending_date_pick: None,
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    /// Replace the initial document. No events are published.
    pub fn with_document(mut self, doc: Document) -> Self {
        self.doc = doc;
        self.selection = Selection::cursor(0).clamp_to(&self.doc);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Current document as its persisted JSON tree.
    pub fn to_json(&self) -> JsonValue {
        self.doc.to_json()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<EditorEvent>> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: EditorEvent) {
        self.events.emit(event);
    }

    pub fn focus(&mut self) {
        if !self.focused {
            self.focused = true;
            self.emit(EditorEvent::FocusChanged { focused: true });
        }
    }

    pub fn blur(&mut self) {
        if self.focused {
            self.focused = false;
            self.emit(EditorEvent::FocusChanged { focused: false });
        }
    }

    /// Move the selection. Both ends are snapped to valid cursor positions.
    pub fn set_selection(&mut self, selection: Selection) {
        let clamped = selection.clamp_to(&self.doc);
        if clamped != self.selection {
            self.selection = clamped;
            self.emit(EditorEvent::SelectionChanged { selection: clamped });
        }
    }

    /// Replace the whole document. The current selection is clamped into
    /// the new content. With `emit_update == false` no
    /// [`EditorEvent::ContentChanged`] is published.
    pub fn set_content(&mut self, doc: Document, emit_update: bool) {
        self.doc = doc;
        self.pending_date_pick = None;
        let selection = self.selection.clamp_to(&self.doc);
        debug!(
            subsystem = "editor",
            op = "set_content",
            emit_update,
            size = self.doc.content_size(),
            "Content replaced"
        );
        if emit_update {
            self.emit(EditorEvent::ContentChanged);
        }
        if selection != self.selection {
            self.selection = selection;
            self.emit(EditorEvent::SelectionChanged { selection });
        }
    }

    /// Run `edit` against a draft of the document and commit it when it
    /// succeeds. The closure receives the current selection and returns the
    /// selection to set afterwards.
    pub fn apply<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Document, Selection) -> Result<Selection>,
    {
        let mut draft = self.doc.clone();
        let selection = edit(&mut draft, self.selection)?;
        self.doc = draft;
        self.emit(EditorEvent::ContentChanged);
        self.set_selection(selection);
        Ok(())
    }

    /// Path of the textblock holding `pos`. A position inside a tag chip
    /// resolves to the chip's textblock.
    pub fn textblock_path(&self, pos: usize) -> Result<Vec<usize>> {
        let mut path = self.doc.resolve(pos)?.path;
        if self
            .doc
            .node_at(&path)
            .is_some_and(|n| n.kind() == NodeKind::TagChip)
        {
            path.pop();
        }
        match self.doc.node_at(&path) {
            Some(node) if node.kind().is_textblock() => Ok(path),
            _ => Err(Error::InvalidPosition(pos)),
        }
    }

    /// Kind of the node directly holding the cursor.
    pub fn parent_kind_at_head(&self) -> Option<NodeKind> {
        self.doc
            .resolve(self.selection.head)
            .ok()
            .and_then(|rp| rp.parent_kind(&self.doc))
    }

    /// Replace the selection with `text` and put the cursor after it.
    pub fn insert_text(&mut self, text: &str) -> Result<()> {
        self.apply(|doc, sel| {
            if !sel.is_empty() {
                doc.delete_inline(sel.from(), sel.to())?;
            }
            let end = doc.insert_text(sel.from(), text)?;
            Ok(Selection::cursor(end))
        })
    }

    /// Delete `from..to` inside one parent and put the cursor at `from`.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<()> {
        self.apply(|doc, _| {
            doc.delete_inline(from, to)?;
            Ok(Selection::cursor(from))
        })
    }

    /// Backspace: delete the selection, the unit before the cursor (a whole
    /// chip counts as one unit), or join with the previous textblock.
    pub fn delete_backward(&mut self) -> Result<()> {
        let sel = self.selection;
        if !sel.is_empty() {
            return self.delete_range(sel.from(), sel.to());
        }
        let head = sel.head;
        let rp = self.doc.resolve(head)?;
        if rp.offset > 0 {
            let mut range = (head - 1, head);
            let mut off = 0;
            for node in self.doc.content_at(&rp.path).unwrap_or(&[]) {
                let size = node.node_size();
                if off + size >= rp.offset {
                    if !matches!(node, Node::Text { .. }) {
                        range = (rp.parent_start + off, rp.parent_start + off + size);
                    }
                    break;
                }
                off += size;
            }
            return self.delete_range(range.0, range.1);
        }
        if rp.parent_kind(&self.doc) == Some(NodeKind::TagChip) {
            return Ok(());
        }

        let path = self.textblock_path(head)?;
        let Some((index, parent)) = path.split_last() else {
            return Ok(());
        };
        if *index == 0 {
            return Ok(());
        }
        let mut prev_path = parent.to_vec();
        prev_path.push(index - 1);
        let (Some(prev), Some(block)) = (self.doc.node_at(&prev_path), self.doc.node_at(&path))
        else {
            return Ok(());
        };
        if prev.kind() == NodeKind::HorizontalRule {
            return self.apply(|doc, _| {
                doc.replace_node(&prev_path, Vec::new())?;
                Ok(Selection::cursor(head - 1))
            });
        }
        let joinable = prev.kind().is_textblock()
            && (prev.kind() == NodeKind::CodeBlock) == (block.kind() == NodeKind::CodeBlock);
        if !joinable {
            return Ok(());
        }
        let (prev, block) = (prev.clone(), block.clone());
        let parent = parent.to_vec();
        let at = *index - 1;
        self.apply(|doc, _| {
            let prev_pos = doc.position_before(&prev_path)?;
            let cursor = prev_pos + 1 + content_size(prev.content());
            let mut merged = prev.content().to_vec();
            merged.extend(block.content().iter().cloned());
            normalize_inline(&mut merged);
            doc.splice(&parent, at, 2, vec![with_content(&prev, merged)])?;
            Ok(Selection::cursor(cursor))
        })
    }

    /// Enter: split the textblock at the cursor. Inside a list item the
    /// item is split; an empty last item is lifted out of its list. Code
    /// blocks get a newline instead.
    pub fn split_block(&mut self) -> Result<()> {
        let head = self.selection.head;
        match self.parent_kind_at_head() {
            Some(NodeKind::TagChip) => return Ok(()),
            Some(NodeKind::CodeBlock) => return self.insert_text("\n"),
            _ => {}
        }
        let path = self.textblock_path(head)?;
        self.apply(|doc, sel| {
            if !sel.is_empty() {
                doc.delete_inline(sel.from(), sel.to())?;
            }
            let block_pos = doc.position_before(&path)?;
            let block = doc
                .node_at(&path)
                .cloned()
                .ok_or(Error::InvalidPosition(head))?;
            let offset = sel.from().saturating_sub(block_pos + 1);
            let (before, after) = split_inline(block.content(), offset);

            if let Some((item_path, item)) = enclosing_list_item(doc, &path) {
                let (item_index, list_path) = item_path
                    .split_last()
                    .ok_or(Error::InvalidPosition(head))?;
                let list = doc
                    .node_at(list_path)
                    .cloned()
                    .ok_or(Error::InvalidPosition(head))?;
                let empty_last_item = item.content().len() == 1
                    && block.content().is_empty()
                    && item_index + 1 == list.content().len();
                if empty_last_item {
                    let list_pos = doc.position_before(list_path)?;
                    let mut items = list.content().to_vec();
                    items.pop();
                    if items.is_empty() {
                        doc.replace_node(list_path, vec![Node::paragraph(Vec::new())])?;
                        return Ok(Selection::cursor(list_pos + 1));
                    }
                    let kept = with_content(&list, items);
                    let cursor = list_pos + kept.node_size() + 1;
                    doc.replace_node(list_path, vec![kept, Node::paragraph(Vec::new())])?;
                    return Ok(Selection::cursor(cursor));
                }

                let first = with_content(&item, vec![with_content(&block, before)]);
                let mut rest = vec![Node::paragraph(after)];
                rest.extend(item.content().iter().skip(1).cloned());
                let second = match item {
                    Node::TaskItem { .. } => Node::task_item(false, rest),
                    _ => Node::list_item(rest),
                };
                let item_pos = doc.position_before(&item_path)?;
                let cursor = item_pos + first.node_size() + 2;
                doc.replace_node(&item_path, vec![first, second])?;
                return Ok(Selection::cursor(cursor));
            }

            let first = with_content(&block, before);
            let second = match &block {
                Node::Heading { level, .. } if !after.is_empty() => Node::heading(*level, after),
                _ => Node::paragraph(after),
            };
            let cursor = block_pos + first.node_size() + 1;
            doc.replace_node(&path, vec![first, second])?;
            Ok(Selection::cursor(cursor))
        })
    }

    /// Arrow key default: collapse a range selection, or step to the next
    /// position a cursor can rest at.
    pub fn move_cursor(&mut self, forward: bool) {
        let sel = self.selection;
        if !sel.is_empty() {
            let pos = if forward { sel.to() } else { sel.from() };
            self.set_selection(Selection::cursor(pos));
            return;
        }
        let size = self.doc.content_size();
        let mut pos = sel.head;
        loop {
            pos = match forward {
                true if pos < size => pos + 1,
                false if pos > 0 => pos - 1,
                _ => return,
            };
            if self.doc.is_cursor_position(pos) {
                break;
            }
        }
        self.set_selection(Selection::cursor(pos));
    }

    /// Convert the textblock at the cursor, keeping its inline content.
    pub fn set_block_type(&mut self, block_type: BlockType) -> Result<()> {
        let path = self.textblock_path(self.selection.head)?;
        self.apply(|doc, sel| {
            let start = doc.position_before(&path)? + 1;
            let node = doc
                .node_at(&path)
                .map(|node| block_type.build(node))
                .ok_or(Error::InvalidPosition(start))?;
            let size = content_size(node.content());
            let rel = |pos: usize| start + pos.saturating_sub(start).min(size);
            let selection = Selection::new(rel(sel.anchor), rel(sel.head));
            doc.replace_node(&path, vec![node])?;
            Ok(selection)
        })
    }

    /// Wrap the textblock at the cursor in a one-item list of `kind`. When
    /// the block already starts a list item the enclosing list is converted
    /// instead (a no-op when it is already of `kind`).
    pub fn wrap_in_list(&mut self, kind: ListKind) -> Result<()> {
        let path = self.textblock_path(self.selection.head)?;
        if let Some((item_path, _)) = enclosing_list_item(&self.doc, &path) {
            let list_path = &item_path[..item_path.len() - 1];
            let Some(list) = self.doc.node_at(list_path) else {
                return Ok(());
            };
            if list.kind() == kind.node_kind() {
                return Ok(());
            }
            let converted = kind.convert(list);
            return self.apply(|doc, sel| {
                doc.replace_node(list_path, vec![converted])?;
                Ok(sel)
            });
        }

        self.apply(|doc, sel| {
            let start = doc.position_before(&path)? + 1;
            let block = doc
                .node_at(&path)
                .ok_or(Error::InvalidPosition(start))?;
            let paragraph = BlockType::Paragraph.build(block);
            let size = content_size(paragraph.content());
            let rel = |pos: usize| start + 2 + pos.saturating_sub(start).min(size);
            let selection = Selection::new(rel(sel.anchor), rel(sel.head));
            doc.replace_node(&path, vec![kind.list(vec![kind.item(vec![paragraph])])])?;
            Ok(selection)
        })
    }

    /// Insert a horizontal rule at the cursor, splitting the textblock. The
    /// cursor lands in the paragraph after the rule.
    pub fn insert_horizontal_rule(&mut self) -> Result<()> {
        let path = self.textblock_path(self.selection.head)?;
        self.apply(|doc, sel| {
            let block_pos = doc.position_before(&path)?;
            let block = doc
                .node_at(&path)
                .cloned()
                .ok_or(Error::InvalidPosition(block_pos))?;
            let offset = sel.head.saturating_sub(block_pos + 1);
            let (before, after) = split_inline(block.content(), offset);
            let mut nodes = Vec::with_capacity(3);
            if !before.is_empty() {
                nodes.push(with_content(&block, before));
            }
            nodes.push(Node::horizontal_rule());
            let cursor = block_pos + content_size(&nodes) + 1;
            nodes.push(Node::paragraph(after));
            doc.replace_node(&path, nodes)?;
            Ok(Selection::cursor(cursor))
        })
    }

    /// Ask the host for a date. The pick is inserted at the current cursor
    /// by [`crate::chips::apply_date_pick`].
    pub fn request_date_pick(&mut self) {
        let at = self.selection.from();
        self.pending_date_pick = Some(at);
        self.emit(EditorEvent::OpenDatePicker { at });
    }

    pub fn pending_date_pick(&self) -> Option<usize> {
        self.pending_date_pick
    }

    pub(crate) fn take_pending_date_pick(&mut self) -> Option<usize> {
        self.pending_date_pick.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::ChipColor;
    use tokio::sync::broadcast::error::TryRecvError;

    fn editor_with(content: Vec<Node>) -> Editor {
        Editor::default().with_document(Document::new(content))
    }

    fn para(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    fn drain(rx: &mut broadcast::Receiver<EventEnvelope<EditorEvent>>) -> Vec<EditorEvent> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(envelope) => out.push(envelope.payload),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[test]
    fn test_new_editor_has_cursor_in_empty_paragraph() {
        let editor = Editor::default();
        assert_eq!(editor.selection(), Selection::cursor(1));
        assert_eq!(editor.document(), &Document::empty());
    }

    #[test]
    fn test_insert_text_publishes_change() {
        let mut editor = Editor::default();
        let mut rx = editor.subscribe();
        editor.insert_text("hi").unwrap();
        assert_eq!(editor.document(), &Document::new(vec![para("hi")]));
        assert_eq!(editor.selection(), Selection::cursor(3));
        assert_eq!(
            drain(&mut rx),
            vec![
                EditorEvent::ContentChanged,
                EditorEvent::SelectionChanged {
                    selection: Selection::cursor(3)
                },
            ]
        );
    }

    #[test]
    fn test_insert_text_replaces_selection() {
        let mut editor = editor_with(vec![para("hello world")]);
        editor.set_selection(Selection::new(7, 12));
        editor.insert_text("there").unwrap();
        assert_eq!(editor.document().plain_text(), "hello there");
    }

    #[test]
    fn test_set_content_without_update_is_silent() {
        let mut editor = editor_with(vec![para("hello")]);
        editor.set_selection(Selection::cursor(4));
        let mut rx = editor.subscribe();
        editor.set_content(Document::new(vec![para("hello there")]), false);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(editor.selection(), Selection::cursor(4));
    }

    #[test]
    fn test_set_content_clamps_selection() {
        let mut editor = editor_with(vec![para("hello world")]);
        editor.set_selection(Selection::cursor(12));
        editor.set_content(Document::new(vec![para("hi")]), true);
        assert_eq!(editor.selection(), Selection::cursor(3));
    }

    #[test]
    fn test_failed_edit_leaves_document_untouched() {
        let mut editor = editor_with(vec![para("ab")]);
        let before = editor.document().clone();
        let mut rx = editor.subscribe();
        let err = editor.apply(|doc, sel| {
            doc.insert_text(sel.head, "x")?;
            Err(Error::Internal("boom".into()))
        });
        assert!(err.is_err());
        assert_eq!(editor.document(), &before);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_delete_backward_removes_whole_chip() {
        let mut editor = editor_with(vec![Node::paragraph(vec![
            Node::text("a"),
            Node::tag_chip(ChipColor::Red, "foo"),
        ])]);
        // 0 <p> 1 a 2 <chip> 3 foo 6 </chip> 7 </p>
        editor.set_selection(Selection::cursor(7));
        editor.delete_backward().unwrap();
        assert_eq!(editor.document(), &Document::new(vec![para("a")]));
        assert_eq!(editor.selection(), Selection::cursor(2));
    }

    #[test]
    fn test_delete_backward_joins_paragraphs() {
        let mut editor = editor_with(vec![para("ab"), para("cd")]);
        editor.set_selection(Selection::cursor(5));
        editor.delete_backward().unwrap();
        assert_eq!(editor.document(), &Document::new(vec![para("abcd")]));
        assert_eq!(editor.selection(), Selection::cursor(3));
    }

    #[test]
    fn test_delete_backward_removes_rule() {
        let mut editor = editor_with(vec![para("a"), Node::horizontal_rule(), para("b")]);
        // 0 <p> 1 a 2 </p> 3 <hr> 4 <p> 5 b
        editor.set_selection(Selection::cursor(5));
        editor.delete_backward().unwrap();
        assert_eq!(editor.document(), &Document::new(vec![para("a"), para("b")]));
        assert_eq!(editor.selection(), Selection::cursor(4));
    }

    #[test]
    fn test_split_paragraph() {
        let mut editor = editor_with(vec![para("hello")]);
        editor.set_selection(Selection::cursor(3));
        editor.split_block().unwrap();
        assert_eq!(
            editor.document(),
            &Document::new(vec![para("he"), para("llo")])
        );
        assert_eq!(editor.selection(), Selection::cursor(5));
    }

    #[test]
    fn test_split_heading_at_end_gives_paragraph() {
        let mut editor = editor_with(vec![Node::heading(2, vec![Node::text("Title")])]);
        editor.set_selection(Selection::cursor(6));
        editor.split_block().unwrap();
        assert_eq!(editor.document().content[1], Node::paragraph(Vec::new()));
    }

    #[test]
    fn test_split_task_item_and_lift_empty_item() {
        let mut editor = editor_with(vec![Node::task_list(vec![Node::task_item(
            true,
            vec![para("milk")],
        )])]);
        // 0 <ul> 1 <li> 2 <p> 3 milk 7
        editor.set_selection(Selection::cursor(7));
        editor.split_block().unwrap();
        let list = &editor.document().content[0];
        assert_eq!(list.content().len(), 2);
        assert_eq!(list.content()[1], Node::task_item(false, vec![Node::paragraph(vec![])]));
        assert_eq!(editor.selection(), Selection::cursor(11));

        editor.split_block().unwrap();
        assert_eq!(editor.document().content.len(), 2);
        assert_eq!(editor.document().content[1], Node::paragraph(Vec::new()));
        assert_eq!(
            editor.parent_kind_at_head(),
            Some(NodeKind::Paragraph)
        );
    }

    #[test]
    fn test_code_block_enter_inserts_newline() {
        let mut editor = editor_with(vec![Node::code_block(None, "a")]);
        editor.set_selection(Selection::cursor(2));
        editor.split_block().unwrap();
        assert_eq!(editor.document().content[0], Node::code_block(None, "a\n"));
    }

    #[test]
    fn test_move_cursor_skips_block_boundaries() {
        let mut editor = editor_with(vec![para("a"), para("b")]);
        editor.set_selection(Selection::cursor(2));
        editor.move_cursor(true);
        assert_eq!(editor.selection(), Selection::cursor(4));
        editor.move_cursor(false);
        assert_eq!(editor.selection(), Selection::cursor(2));
    }

    #[test]
    fn test_set_block_type_keeps_chips_except_in_code() {
        let mut editor = editor_with(vec![Node::paragraph(vec![
            Node::text("due "),
            Node::date_chip("2024-03-05"),
        ])]);
        editor.set_block_type(BlockType::Heading(3)).unwrap();
        assert_eq!(editor.document().content[0].kind(), NodeKind::Heading);
        assert_eq!(editor.document().content[0].content().len(), 2);

        editor.set_block_type(BlockType::CodeBlock(None)).unwrap();
        assert_eq!(
            editor.document().content[0],
            Node::code_block(None, "due 2024-03-05")
        );
    }

    #[test]
    fn test_wrap_in_list_and_convert() {
        let mut editor = editor_with(vec![para("item")]);
        editor.set_selection(Selection::cursor(3));
        editor.wrap_in_list(ListKind::Bullet).unwrap();
        assert_eq!(
            editor.document().content[0],
            Node::bullet_list(vec![Node::list_item(vec![para("item")])])
        );
        assert_eq!(editor.selection(), Selection::cursor(5));

        editor.wrap_in_list(ListKind::Task).unwrap();
        assert_eq!(
            editor.document().content[0],
            Node::task_list(vec![Node::task_item(false, vec![para("item")])])
        );
        assert_eq!(editor.selection(), Selection::cursor(5));
    }

    #[test]
    fn test_insert_horizontal_rule_splits_block() {
        let mut editor = editor_with(vec![para("abcd")]);
        editor.set_selection(Selection::cursor(3));
        editor.insert_horizontal_rule().unwrap();
        assert_eq!(
            editor.document(),
            &Document::new(vec![para("ab"), Node::horizontal_rule(), para("cd")])
        );
        // 0 <p> ab </p> 4 <hr> 5 <p> 6
        assert_eq!(editor.selection(), Selection::cursor(6));
    }

    #[test]
    fn test_focus_events() {
        let mut editor = Editor::default();
        let mut rx = editor.subscribe();
        editor.focus();
        editor.focus();
        editor.blur();
        assert_eq!(
            drain(&mut rx),
            vec![
                EditorEvent::FocusChanged { focused: true },
                EditorEvent::FocusChanged { focused: false },
            ]
        );
    }

    #[test]
    fn test_request_date_pick_emits_side_channel() {
        let mut editor = editor_with(vec![para("on ")]);
        editor.set_selection(Selection::cursor(4));
        let mut rx = editor.subscribe();
        editor.request_date_pick();
        assert_eq!(editor.pending_date_pick(), Some(4));
        assert_eq!(drain(&mut rx), vec![EditorEvent::OpenDatePicker { at: 4 }]);
    }
}
