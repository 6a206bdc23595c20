//! Label normalization for note-level tag metadata.
//!
//! Tag chips carry free-form text while the user is typing. When a note is
//! persisted, chip texts (and any labels entered elsewhere) are folded into
//! the global label vocabulary: lowercase ASCII letters, digits and single
//! hyphens, at most [`MAX_LABEL_LENGTH`] characters, at most
//! [`MAX_NOTE_LABELS`] labels per note.
//!
//! # Examples
//!
//! ```
//! use quire_core::labels::{normalize, normalize_list};
//!
//! assert_eq!(normalize("  Rust Lang "), Some("rust-lang".to_string()));
//! assert_eq!(normalize("!!!"), None);
//! assert_eq!(normalize_list(&["Work", "work", "Home"]), vec!["work", "home"]);
//! ```

use std::collections::HashSet;

use crate::defaults::{MAX_LABEL_LENGTH, MAX_NOTE_LABELS};
use crate::document::{Document, Node};

/// Normalize a raw label. Returns `None` when nothing survives.
///
/// Whitespace and underscores become hyphens, any other character outside
/// `[a-z0-9-]` is dropped, hyphen runs collapse to one and leading/trailing
/// hyphens are removed. The function is pure and idempotent.
pub fn normalize(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().to_lowercase().chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => ch,
            '-' | '_' => '-',
            c if c.is_whitespace() => '-',
            _ => continue,
        };
        if mapped == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(mapped);
    }

    // Only ASCII remains, so byte truncation is char-safe.
    out.truncate(MAX_LABEL_LENGTH);
    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Normalize, deduplicate (first occurrence wins) and cap a label list.
pub fn normalize_list<S: AsRef<str>>(raws: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for raw in raws {
        let Some(label) = normalize(raw.as_ref()) else {
            continue;
        };
        if seen.insert(label.clone()) {
            labels.push(label);
            if labels.len() == MAX_NOTE_LABELS {
                break;
            }
        }
    }
    labels
}

/// Collect the normalized labels carried by the tag chips of a document,
/// in document order.
pub fn labels_from_document(doc: &Document) -> Vec<String> {
    fn walk(nodes: &[Node], out: &mut Vec<String>) {
        for node in nodes {
            if let Node::TagChip { .. } = node {
                out.push(node.text_content());
            } else {
                walk(node.content(), out);
            }
        }
    }

    let mut raw = Vec::new();
    walk(&doc.content, &mut raw);
    normalize_list(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::ChipColor;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Rust"), Some("rust".to_string()));
        assert_eq!(normalize("  spaced out  "), Some("spaced-out".to_string()));
        assert_eq!(normalize("snake_case"), Some("snake-case".to_string()));
        assert_eq!(normalize("c++"), Some("c".to_string()));
    }

    #[test]
    fn test_normalize_collapses_hyphens() {
        assert_eq!(normalize("--a---b--"), Some("a-b".to_string()));
        assert_eq!(normalize("a - b"), Some("a-b".to_string()));
    }

    #[test]
    fn test_normalize_empty_results() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("#!?"), None);
        assert_eq!(normalize("---"), None);
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize("café"), Some("caf".to_string()));
        assert_eq!(normalize("日本"), None);
    }

    #[test]
    fn test_normalize_truncates() {
        let long = "a".repeat(100);
        assert_eq!(normalize(&long).unwrap().len(), MAX_LABEL_LENGTH);

        // A hyphen landing on the cut point is trimmed.
        let edge = format!("{}-tail", "b".repeat(MAX_LABEL_LENGTH - 1));
        let normalized = normalize(&edge).unwrap();
        assert!(!normalized.ends_with('-'));
    }

    #[test]
    fn test_normalize_list_dedupes_in_order() {
        let labels = normalize_list(&["Work", "home", "WORK", "", "Home "]);
        assert_eq!(labels, vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn test_normalize_list_caps_at_ten() {
        let raws: Vec<String> = (0..25).map(|i| format!("label{}", i)).collect();
        let labels = normalize_list(&raws);
        assert_eq!(labels.len(), MAX_NOTE_LABELS);
        assert_eq!(labels[0], "label0");
        assert_eq!(labels[9], "label9");
    }

    #[test]
    fn test_labels_from_document() {
        let doc = Document::new(vec![
            Node::paragraph(vec![
                Node::text("see "),
                Node::tag_chip(ChipColor::Green, "Project X"),
                Node::text(" and "),
                Node::tag_chip(ChipColor::Blue, "project-x"),
            ]),
            Node::bullet_list(vec![Node::list_item(vec![Node::paragraph(vec![
                Node::tag_chip(ChipColor::Red, "urgent"),
            ])])]),
        ]);
        assert_eq!(
            labels_from_document(&doc),
            vec!["project-x".to_string(), "urgent".to_string()]
        );
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in ".{0,64}") {
            let once = normalize(&raw);
            if let Some(ref value) = once {
                prop_assert_eq!(normalize(value), once.clone());
            }
        }

        #[test]
        fn prop_normalize_list_bounded_and_unique(raws in proptest::collection::vec("[a-zA-Z0-9 _-]{0,12}", 0..40)) {
            let labels = normalize_list(&raws);
            prop_assert!(labels.len() <= MAX_NOTE_LABELS);
            let unique: HashSet<&String> = labels.iter().collect();
            prop_assert_eq!(unique.len(), labels.len());
        }
    }
}
