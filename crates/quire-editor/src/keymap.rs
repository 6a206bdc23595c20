//! Key dispatch.
//!
//! A key press goes to the input extensions in priority order (slash menu
//! navigation, chip boundaries, abbreviation expansion). When none of them
//! consumes it the editor's default behavior runs, followed by the
//! post-input hooks (tag input rule, slash menu tracking).

use tracing::trace;

use quire_core::Result;

use crate::abbreviation;
use crate::chips::{self, TagInputRule};
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::slash::SlashMenu;

/// A key the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Escape,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Parse a key name (`"Tab"`, `"Enter"`, `"ArrowUp"`, `"Space"`, or a
    /// single character). Names are case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Self::Char(c));
        }
        Some(match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "escape" | "esc" => Self::Escape,
            "backspace" => Self::Backspace,
            "arrowup" | "up" => Self::ArrowUp,
            "arrowdown" | "down" => Self::ArrowDown,
            "arrowleft" | "left" => Self::ArrowLeft,
            "arrowright" | "right" => Self::ArrowRight,
            "space" => Self::Char(' '),
            _ => return None,
        })
    }
}

/// Routes key presses through the input extensions.
#[derive(Debug)]
pub struct KeyDispatcher {
    slash: SlashMenu,
    tag_rule: TagInputRule,
}

impl KeyDispatcher {
    pub fn new(config: &EditorConfig) -> Result<Self> {
        Ok(Self {
            slash: SlashMenu::new(config.slash_trigger),
            tag_rule: TagInputRule::new()?,
        })
    }

    pub fn slash_menu(&self) -> &SlashMenu {
        &self.slash
    }

    /// Handle one key press. Returns `true` when an extension consumed the
    /// key, `false` when the default behavior ran instead.
    pub fn press(&mut self, editor: &mut Editor, key: Key) -> Result<bool> {
        if self.slash.is_open() {
            let consumed = match key {
                Key::ArrowUp => self.slash.move_selection(false),
                Key::ArrowDown => self.slash.move_selection(true),
                Key::Enter => self.slash.commit(editor)?,
                Key::Escape => {
                    self.slash.close();
                    true
                }
                _ => false,
            };
            if consumed {
                return Ok(true);
            }
        }

        if chips::handle_chip_boundary(editor, key)? {
            return Ok(true);
        }

        if key == editor.config().abbreviation_key && abbreviation::expand(editor)? {
            self.slash.close();
            return Ok(true);
        }

        trace!(subsystem = "editor", key = ?key, "Default key behavior");
        Self::apply_default(editor, key)?;
        if matches!(key, Key::Char(c) if c.is_whitespace()) {
            self.tag_rule.apply(editor)?;
        }
        self.slash.sync(editor, key);
        Ok(false)
    }

    /// Type each character of `text` as a key press.
    pub fn type_text(&mut self, editor: &mut Editor, text: &str) -> Result<()> {
        for c in text.chars() {
            self.press(editor, Key::Char(c))?;
        }
        Ok(())
    }

    /// Pointer press on a menu item commits it immediately.
    pub fn pointer_down(&mut self, editor: &mut Editor, index: usize) -> Result<bool> {
        self.slash.activate(editor, index)
    }

    pub fn blur(&mut self, editor: &mut Editor) {
        self.slash.close();
        editor.blur();
    }

    fn apply_default(editor: &mut Editor, key: Key) -> Result<()> {
        match key {
            Key::Char(c) => editor.insert_text(c.encode_utf8(&mut [0; 4])),
            Key::Enter => editor.split_block(),
            Key::Backspace => editor.delete_backward(),
            Key::ArrowLeft => {
                editor.move_cursor(false);
                Ok(())
            }
            Key::ArrowRight => {
                editor.move_cursor(true);
                Ok(())
            }
            Key::Tab | Key::Escape | Key::ArrowUp | Key::ArrowDown => Ok(()),
        }
    }
}
