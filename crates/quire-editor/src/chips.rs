//! Tag and date chip behaviors: insertion with space synthesis, recoloring,
//! arrow-key exits and the `#word` input rule.

use regex::Regex;
use tracing::{debug, trace};

use quire_core::{ChipColor, Error, Node, NodeKind, Result, Selection};

use crate::editor::Editor;
use crate::keymap::Key;

/// Label used when a tag chip is inserted without text.
pub const DEFAULT_TAG_TEXT: &str = "tag";

/// Insert a tag chip at the selection and select its text.
///
/// A space is synthesized before the chip when the preceding character is
/// not whitespace, and after it when the following character is not
/// whitespace or there is none.
pub fn insert_tag_chip(
    editor: &mut Editor,
    color: Option<ChipColor>,
    text: Option<&str>,
) -> Result<()> {
    let color = color.unwrap_or_default();
    let label = text
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TAG_TEXT)
        .to_string();
    let label_len = label.chars().count();

    editor.apply(|doc, sel| {
        if !sel.is_empty() {
            doc.delete_inline(sel.from(), sel.to())?;
        }
        let pos = sel.from();
        if doc.resolve(pos)?.parent_kind(doc) == Some(NodeKind::TagChip) {
            return Err(Error::InvalidInput("tag chips cannot be nested".into()));
        }
        let lead = doc.char_before(pos).is_some_and(|c| !c.is_whitespace());
        let trail = doc.char_after(pos).map_or(true, |c| !c.is_whitespace());

        let mut nodes = Vec::with_capacity(3);
        if lead {
            nodes.push(Node::text(" "));
        }
        nodes.push(Node::tag_chip(color, &label));
        if trail {
            nodes.push(Node::text(" "));
        }
        doc.insert_inline(pos, nodes)?;

        let inner = pos + usize::from(lead) + 1;
        Ok(Selection::new(inner, inner + label_len))
    })?;

    debug!(subsystem = "editor", component = "tag_chip", color = %color, "Tag chip inserted");
    Ok(())
}

/// Change the color of the chip holding the cursor. Returns `false` when
/// the cursor is not inside a tag chip.
pub fn recolor_tag_chip(editor: &mut Editor, color: ChipColor) -> Result<bool> {
    let doc = editor.document();
    let rp = doc.resolve(editor.selection().head)?;
    let path = rp.path;
    match doc.node_at(&path) {
        Some(Node::TagChip { color: current, .. }) if *current == color => return Ok(true),
        Some(Node::TagChip { .. }) => {}
        _ => return Ok(false),
    }
    editor.apply(|doc, sel| {
        if let Some(Node::TagChip { color: current, .. }) = doc.node_at_mut(&path) {
            *current = color;
        }
        Ok(sel)
    })?;
    Ok(true)
}

/// ArrowLeft at a chip's start or ArrowRight at its end leaves the chip in
/// one step. Leaving to the right synthesizes a space when the next
/// character is not whitespace. Returns whether the key was consumed.
pub fn handle_chip_boundary(editor: &mut Editor, key: Key) -> Result<bool> {
    let forward = match key {
        Key::ArrowLeft => false,
        Key::ArrowRight => true,
        _ => return Ok(false),
    };
    let sel = editor.selection();
    if !sel.is_empty() {
        return Ok(false);
    }
    let doc = editor.document();
    let rp = doc.resolve(sel.head)?;
    if rp.parent_kind(doc) != Some(NodeKind::TagChip) {
        return Ok(false);
    }

    if !forward {
        if rp.offset != 0 {
            return Ok(false);
        }
        editor.set_selection(Selection::cursor(rp.parent_start - 1));
        return Ok(true);
    }

    let end = rp.parent_end(doc);
    if sel.head != end {
        return Ok(false);
    }
    let after = end + 1;
    match doc.char_after(after) {
        Some(c) if c.is_whitespace() => editor.set_selection(Selection::cursor(after + 1)),
        _ => editor.apply(|doc, _| {
            let end = doc.insert_text(after, " ")?;
            Ok(Selection::cursor(end))
        })?,
    }
    Ok(true)
}

/// Converts `#word` followed by whitespace into a tag chip of the default
/// color. Leading whitespace is kept and a space follows the chip.
#[derive(Debug, Clone)]
pub struct TagInputRule {
    pattern: Regex,
}

impl TagInputRule {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"(?:^|\s)#([\w-]+)\s$")
            .map_err(|e| Error::Internal(format!("tag input rule: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Run the rule against the text before the cursor. Returns whether it
    /// fired.
    pub fn apply(&self, editor: &mut Editor) -> Result<bool> {
        let sel = editor.selection();
        if !sel.is_empty() {
            return Ok(false);
        }
        let doc = editor.document();
        let rp = doc.resolve(sel.head)?;
        if !matches!(
            rp.parent_kind(doc),
            Some(NodeKind::Paragraph | NodeKind::Heading)
        ) {
            return Ok(false);
        }
        let before = doc.text_before(sel.head)?;
        let Some(word) = self
            .pattern
            .captures(&before)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return Ok(false);
        };
        trace!(subsystem = "editor", component = "tag_rule", word = %word, "Tag rule matched");

        // '#', the word and the trailing whitespace character.
        let from = sel.head - (word.chars().count() + 2);
        editor.apply(|doc, _| {
            doc.delete_inline(from, sel.head)?;
            let end = doc.insert_inline(
                from,
                vec![Node::tag_chip(ChipColor::default(), &word), Node::text(" ")],
            )?;
            Ok(Selection::cursor(end))
        })?;
        Ok(true)
    }
}

/// Insert a date chip followed by a space at the selection.
pub fn insert_date_chip(editor: &mut Editor, date: &str) -> Result<()> {
    editor.apply(|doc, sel| {
        if !sel.is_empty() {
            doc.delete_inline(sel.from(), sel.to())?;
        }
        let end = doc.insert_inline(sel.from(), vec![Node::date_chip(date), Node::text(" ")])?;
        Ok(Selection::cursor(end))
    })?;
    debug!(subsystem = "editor", component = "date_chip", date, "Date chip inserted");
    Ok(())
}

/// Insert the date the host picked after an
/// [`EditorEvent::OpenDatePicker`](crate::EditorEvent::OpenDatePicker)
/// request. Returns `false` when no pick was pending.
pub fn apply_date_pick(editor: &mut Editor, date: &str) -> Result<bool> {
    let Some(at) = editor.take_pending_date_pick() else {
        return Ok(false);
    };
    editor.set_selection(Selection::cursor(at));
    insert_date_chip(editor, date)?;
    Ok(true)
}
