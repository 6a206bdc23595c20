//! Messages published by the editing surface.

use serde::Serialize;

use quire_core::{BusEvent, Selection};

/// Side-channel messages emitted by an [`Editor`](crate::Editor).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// A local edit changed the document.
    ContentChanged,
    /// The selection moved.
    SelectionChanged { selection: Selection },
    /// The editor gained or lost focus.
    FocusChanged { focused: bool },
    /// A command asked the host to show a date picker. The pick is inserted
    /// at `at` once the host hands it back.
    OpenDatePicker { at: usize },
    /// A code block was relabelled by language detection.
    CodeLanguageChanged {
        at: usize,
        language: String,
    },
}

impl BusEvent for EditorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ContentChanged => "editor.content_changed",
            Self::SelectionChanged { .. } => "editor.selection_changed",
            Self::FocusChanged { .. } => "editor.focus_changed",
            Self::OpenDatePicker { .. } => "editor.open_date_picker",
            Self::CodeLanguageChanged { .. } => "editor.code_language_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types_are_namespaced() {
        let events = [
            EditorEvent::ContentChanged,
            EditorEvent::SelectionChanged {
                selection: Selection::cursor(1),
            },
            EditorEvent::FocusChanged { focused: true },
            EditorEvent::OpenDatePicker { at: 3 },
            EditorEvent::CodeLanguageChanged {
                at: 0,
                language: "sql".into(),
            },
        ];
        for event in &events {
            assert!(event.event_type().starts_with("editor."));
        }
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(EditorEvent::OpenDatePicker { at: 7 }).unwrap();
        assert_eq!(json["type"], "open_date_picker");
        assert_eq!(json["at"], 7);
    }
}
