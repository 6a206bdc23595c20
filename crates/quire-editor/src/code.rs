//! Code block hooks: language relabelling and formatting.

use tracing::debug;

use quire_code::{detect, format_with, should_auto_correct, FormatOptions, FormatResult};
use quire_core::{Node, Result};

use crate::editor::{flatten_text, Editor};
use crate::events::EditorEvent;

/// Path, language label and text of the code block holding the cursor.
fn code_block_at_cursor(editor: &Editor) -> Option<(Vec<usize>, Option<String>, String)> {
    let path = editor.textblock_path(editor.selection().head).ok()?;
    match editor.document().node_at(&path)? {
        Node::CodeBlock { language, content } => {
            Some((path, language.clone(), flatten_text(content)))
        }
        _ => None,
    }
}

/// Re-run language detection on the code block holding the cursor and
/// relabel it when the auto-correct policy allows. `aggressive` is for use
/// right after a paste. Returns the new label.
pub fn relabel_code_block(editor: &mut Editor, aggressive: bool) -> Result<Option<String>> {
    let Some((path, current, code)) = code_block_at_cursor(editor) else {
        return Ok(None);
    };
    let detection = detect(&code);
    if !should_auto_correct(current.as_deref(), &code, &detection, aggressive) {
        return Ok(None);
    }
    let Some(language) = detection.language.clone() else {
        return Ok(None);
    };

    let at = editor.document().position_before(&path)?;
    editor.apply(|doc, sel| {
        if let Some(Node::CodeBlock { language: label, .. }) = doc.node_at_mut(&path) {
            *label = Some(language.clone());
        }
        Ok(sel)
    })?;
    debug!(
        subsystem = "editor",
        component = "code_block",
        language = %language,
        strategy = detection.strategy.as_str(),
        relevance = detection.relevance,
        aggressive,
        "Code block relabelled"
    );
    editor.emit(EditorEvent::CodeLanguageChanged {
        at,
        language: language.clone(),
    });
    Ok(Some(language))
}

/// Format the code block holding the cursor. A failed format leaves the
/// block untouched; the message travels in the returned result. `None`
/// when the cursor is not in a code block.
pub fn format_code_block(
    editor: &mut Editor,
    options: &FormatOptions,
) -> Result<Option<FormatResult>> {
    let Some((path, current, code)) = code_block_at_cursor(editor) else {
        return Ok(None);
    };
    let result = format_with(&code, current.as_deref(), options);
    if let Some(error) = &result.error {
        debug!(subsystem = "editor", component = "code_block", error = %error, "Code block left as is");
        return Ok(Some(result));
    }

    let language = result.language.clone().or(current.clone());
    if result.formatted != code || language != current {
        let block = Node::code_block(language, &result.formatted);
        editor.apply(|doc, sel| {
            doc.replace_node(&path, vec![block])?;
            Ok(sel)
        })?;
    }
    Ok(Some(result))
}
