//! Abbreviation expansion.
//!
//! On the trigger key the text of the current line up to the cursor is
//! matched against a small fixed grammar:
//!
//! | Line | Expansion |
//! |------|-----------|
//! | `todo`, `todo>N` | task list with N unchecked items |
//! | `ul`, `ul>li*N` | bullet list with N items |
//! | `ol`, `ol>li*N` | numbered list with N items |
//! | `h1`..`h6`, optionally `.` or a space then text | heading with that text |
//! | `hr` | horizontal rule |
//!
//! Matching is case-insensitive and covers the whole line. Only top-level
//! paragraphs expand. Text after the cursor moves into the new block.

use tracing::{debug, trace};

use quire_core::defaults::ABBREVIATION_MAX_ITEMS;
use quire_core::document::{content_size, normalize_inline, split_inline};
use quire_core::{Node, NodeKind, Result, Selection, OBJECT_CHAR};

use crate::editor::{Editor, ListKind};

/// A recognized abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    List { kind: ListKind, items: usize },
    Heading { level: u8, text: String },
    Rule,
}

impl Expansion {
    /// Parse a whole line. Repeat counts are clamped to
    /// [`ABBREVIATION_MAX_ITEMS`]; a count of zero does not match.
    pub fn parse(line: &str) -> Option<Self> {
        if line.contains(OBJECT_CHAR) {
            return None;
        }
        let lower = line.to_ascii_lowercase();
        let count = |rest: &str, separator: &str| -> Option<usize> {
            if rest.is_empty() {
                return Some(1);
            }
            rest.strip_prefix(separator)?
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .map(|n| n.min(ABBREVIATION_MAX_ITEMS))
        };

        if let Some(rest) = lower.strip_prefix("todo") {
            return count(rest, ">").map(|items| Self::List {
                kind: ListKind::Task,
                items,
            });
        }
        if let Some(rest) = lower.strip_prefix("ul") {
            return count(rest, ">li*").map(|items| Self::List {
                kind: ListKind::Bullet,
                items,
            });
        }
        if let Some(rest) = lower.strip_prefix("ol") {
            return count(rest, ">li*").map(|items| Self::List {
                kind: ListKind::Ordered,
                items,
            });
        }
        if lower == "hr" {
            return Some(Self::Rule);
        }

        let bytes = lower.as_bytes();
        if bytes.len() >= 2 && bytes[0] == b'h' && (b'1'..=b'6').contains(&bytes[1]) {
            let level = bytes[1] - b'0';
            // Lowercasing is ASCII-only, so byte offsets match `line`.
            let rest = &line[2..];
            let text = match rest.chars().next() {
                None => String::new(),
                Some(c) if c == '.' || c.is_whitespace() => {
                    rest[c.len_utf8()..].trim_start().to_string()
                }
                Some(_) => return None,
            };
            return Some(Self::Heading { level, text });
        }
        None
    }

    /// Replacement blocks with `rest` (the inline content after the cursor)
    /// moved into the first textblock, and the cursor offset from the start
    /// of the replaced block.
    fn build(&self, rest: Vec<Node>) -> (Vec<Node>, usize) {
        match self {
            Self::List { kind, items } => {
                let mut list_items = kind.empty_items(*items);
                if let Some(first) = list_items.first_mut() {
                    *first = kind.item(vec![Node::paragraph(rest)]);
                }
                // list, item, paragraph openings
                (vec![kind.list(list_items)], 3)
            }
            Self::Heading { level, text } => {
                let mut content = vec![Node::text(text.as_str())];
                content.extend(rest);
                normalize_inline(&mut content);
                (
                    vec![Node::heading(*level, content)],
                    1 + text.chars().count(),
                )
            }
            Self::Rule => (vec![Node::horizontal_rule(), Node::paragraph(rest)], 2),
        }
    }
}

/// Try to expand the line at the cursor. Returns `true` when the line was
/// replaced and the trigger key should be consumed.
pub fn expand(editor: &mut Editor) -> Result<bool> {
    let sel = editor.selection();
    if !sel.is_empty() {
        return Ok(false);
    }
    let doc = editor.document();
    let rp = doc.resolve(sel.head)?;
    if rp.depth() != 1 || rp.parent_kind(doc) != Some(NodeKind::Paragraph) {
        return Ok(false);
    }
    let line = doc.text_before(sel.head)?;
    let Some(expansion) = Expansion::parse(&line) else {
        trace!(subsystem = "editor", component = "abbreviation", "No abbreviation");
        return Ok(false);
    };
    let rest = doc
        .content_at(&rp.path)
        .map(|content| split_inline(content, rp.offset).1)
        .unwrap_or_default();
    let path = rp.path;

    debug!(
        subsystem = "editor",
        component = "abbreviation",
        expansion = ?expansion,
        tail = content_size(&rest),
        "Expanding abbreviation"
    );
    editor.apply(|doc, _| {
        let block_pos = doc.position_before(&path)?;
        let (nodes, cursor) = expansion.build(rest);
        doc.replace_node(&path, nodes)?;
        Ok(Selection::cursor(block_pos + cursor))
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::Document;

    fn editor_with_line(text: &str) -> Editor {
        let mut editor = Editor::default().with_document(Document::new(vec![Node::paragraph(
            vec![Node::text(text)],
        )]));
        editor.set_selection(Selection::cursor(1 + text.chars().count()));
        editor
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(
            Expansion::parse("todo"),
            Some(Expansion::List {
                kind: ListKind::Task,
                items: 1
            })
        );
        assert_eq!(
            Expansion::parse("TODO>3"),
            Some(Expansion::List {
                kind: ListKind::Task,
                items: 3
            })
        );
        assert_eq!(
            Expansion::parse("ul>li*4"),
            Some(Expansion::List {
                kind: ListKind::Bullet,
                items: 4
            })
        );
        assert_eq!(
            Expansion::parse("ol>li*999"),
            Some(Expansion::List {
                kind: ListKind::Ordered,
                items: ABBREVIATION_MAX_ITEMS
            })
        );
    }

    #[test]
    fn test_parse_headings() {
        assert_eq!(
            Expansion::parse("h2 Meeting Notes"),
            Some(Expansion::Heading {
                level: 2,
                text: "Meeting Notes".into()
            })
        );
        assert_eq!(
            Expansion::parse("H1.Intro"),
            Some(Expansion::Heading {
                level: 1,
                text: "Intro".into()
            })
        );
        assert_eq!(
            Expansion::parse("h6"),
            Some(Expansion::Heading {
                level: 6,
                text: String::new()
            })
        );
    }

    #[test]
    fn test_parse_rejects_near_misses() {
        for line in [
            "", "todo>0", "todo>", "todos", "ul>li", "ul>li*x", "h7", "h2x", "hrx", " hr", "ol*3",
        ] {
            assert_eq!(Expansion::parse(line), None, "{:?} should not match", line);
        }
        assert_eq!(Expansion::parse("hr"), Some(Expansion::Rule));
    }

    #[test]
    fn test_expand_heading_line() {
        let mut editor = editor_with_line("h2 Meeting Notes");
        assert!(expand(&mut editor).unwrap());
        assert_eq!(
            editor.document(),
            &Document::new(vec![Node::heading(2, vec![Node::text("Meeting Notes")])])
        );
        assert_eq!(editor.selection(), Selection::cursor(14));
    }

    #[test]
    fn test_expand_task_list_with_items() {
        let mut editor = editor_with_line("todo>2");
        assert!(expand(&mut editor).unwrap());
        assert_eq!(
            editor.document().content[0],
            Node::task_list(vec![
                Node::task_item(false, vec![Node::paragraph(vec![])]),
                Node::task_item(false, vec![Node::paragraph(vec![])]),
            ])
        );
        assert_eq!(editor.selection(), Selection::cursor(3));
    }

    #[test]
    fn test_expand_rule_keeps_text_after_cursor() {
        let mut editor = editor_with_line("hrtail");
        editor.set_selection(Selection::cursor(3));
        assert!(expand(&mut editor).unwrap());
        assert_eq!(
            editor.document(),
            &Document::new(vec![
                Node::horizontal_rule(),
                Node::paragraph(vec![Node::text("tail")])
            ])
        );
        assert_eq!(editor.selection(), Selection::cursor(2));
    }

    #[test]
    fn test_no_match_leaves_document() {
        let mut editor = editor_with_line("hello");
        assert!(!expand(&mut editor).unwrap());
        assert_eq!(editor.document().plain_text(), "hello");
    }

    #[test]
    fn test_inactive_in_code_block_and_with_selection() {
        let mut editor = Editor::default()
            .with_document(Document::new(vec![Node::code_block(None, "ul")]));
        editor.set_selection(Selection::cursor(3));
        assert!(!expand(&mut editor).unwrap());

        let mut editor = editor_with_line("ul");
        editor.set_selection(Selection::new(1, 3));
        assert!(!expand(&mut editor).unwrap());
    }

    #[test]
    fn test_inactive_inside_list_items() {
        let mut editor = Editor::default().with_document(Document::new(vec![Node::bullet_list(
            vec![Node::list_item(vec![Node::paragraph(vec![Node::text("ul")])])],
        )]));
        editor.set_selection(Selection::cursor(5));
        assert!(!expand(&mut editor).unwrap());
    }
}
