//! # quire-editor
//!
//! In-memory editing surface for quire notes plus its input extensions:
//! tag and date chips, the `#word` input rule, abbreviation expansion, the
//! slash command menu and code block hooks. Key presses are routed through
//! [`KeyDispatcher`].

pub mod abbreviation;
pub mod chips;
pub mod code;
pub mod config;
pub mod editor;
pub mod events;
pub mod keymap;
pub mod slash;

pub use abbreviation::Expansion;
pub use chips::{
    apply_date_pick, handle_chip_boundary, insert_date_chip, insert_tag_chip, recolor_tag_chip,
    TagInputRule,
};
pub use config::EditorConfig;
pub use editor::{BlockType, Editor, ListKind};
pub use events::EditorEvent;
pub use keymap::{Key, KeyDispatcher};
pub use slash::{filter_commands, MenuState, SlashCommand, SlashMenu, TextRange, COMMANDS};
