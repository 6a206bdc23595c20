//! Slash command menu.
//!
//! Typing the trigger character at the start of a line or after whitespace
//! opens the menu over the full command list. Every further keystroke
//! narrows the list by a case-insensitive substring match on title and
//! aliases, keeping declaration order. Committing an item deletes the
//! trigger and the typed filter, then runs the command.

use std::fmt;

use tracing::{debug, trace};

use quire_core::{NodeKind, Result, Selection, OBJECT_CHAR};

use crate::chips;
use crate::editor::{BlockType, Editor, ListKind};
use crate::keymap::Key;

/// Half-open document range `from..to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub from: usize,
    pub to: usize,
}

/// Command body. The range is where the trigger text was, already deleted
/// and collapsed to its start.
pub type CommandAction = fn(&mut Editor, TextRange) -> Result<()>;

/// A static menu entry.
#[derive(Clone, Copy)]
pub struct SlashCommand {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub aliases: &'static [&'static str],
    pub action: CommandAction,
}

impl fmt::Debug for SlashCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlashCommand")
            .field("title", &self.title)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

impl SlashCommand {
    /// Case-insensitive substring match against the title or any alias.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.aliases.iter().any(|a| a.to_lowercase().contains(&query))
    }
}

fn at(editor: &mut Editor, range: TextRange) {
    editor.set_selection(Selection::cursor(range.from));
}

fn text(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.set_block_type(BlockType::Paragraph)
}

fn heading_1(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.set_block_type(BlockType::Heading(1))
}

fn heading_2(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.set_block_type(BlockType::Heading(2))
}

fn heading_3(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.set_block_type(BlockType::Heading(3))
}

fn bullet_list(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.wrap_in_list(ListKind::Bullet)
}

fn numbered_list(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.wrap_in_list(ListKind::Ordered)
}

fn todo_list(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.wrap_in_list(ListKind::Task)
}

fn code_block(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.set_block_type(BlockType::CodeBlock(None))
}

fn divider(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.insert_horizontal_rule()
}

fn tag(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    chips::insert_tag_chip(editor, None, None)
}

fn today(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    let date = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    chips::insert_date_chip(editor, &date)
}

fn date(editor: &mut Editor, range: TextRange) -> Result<()> {
    at(editor, range);
    editor.request_date_pick();
    Ok(())
}

/// The command list, in menu order.
pub static COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        title: "Text",
        description: "Plain paragraph",
        icon: "text",
        aliases: &["paragraph", "p"],
        action: text,
    },
    SlashCommand {
        title: "Heading 1",
        description: "Large section heading",
        icon: "heading-1",
        aliases: &["h1", "title"],
        action: heading_1,
    },
    SlashCommand {
        title: "Heading 2",
        description: "Medium section heading",
        icon: "heading-2",
        aliases: &["h2", "subtitle"],
        action: heading_2,
    },
    SlashCommand {
        title: "Heading 3",
        description: "Small section heading",
        icon: "heading-3",
        aliases: &["h3"],
        action: heading_3,
    },
    SlashCommand {
        title: "Bullet List",
        description: "Unordered list",
        icon: "list",
        aliases: &["ul", "unordered", "bullets"],
        action: bullet_list,
    },
    SlashCommand {
        title: "Numbered List",
        description: "Ordered list",
        icon: "list-ordered",
        aliases: &["ol", "ordered", "numbers"],
        action: numbered_list,
    },
    SlashCommand {
        title: "To-do List",
        description: "Checklist with checkboxes",
        icon: "list-checks",
        aliases: &["todo", "task", "checkbox", "checklist"],
        action: todo_list,
    },
    SlashCommand {
        title: "Code Block",
        description: "Code with syntax highlighting",
        icon: "code",
        aliases: &["code", "pre", "snippet"],
        action: code_block,
    },
    SlashCommand {
        title: "Divider",
        description: "Horizontal rule",
        icon: "minus",
        aliases: &["hr", "rule", "separator", "line"],
        action: divider,
    },
    SlashCommand {
        title: "Tag",
        description: "Inline tag chip",
        icon: "tag",
        aliases: &["label", "hashtag", "chip"],
        action: tag,
    },
    SlashCommand {
        title: "Today",
        description: "Insert today's date",
        icon: "calendar",
        aliases: &["now", "date"],
        action: today,
    },
    SlashCommand {
        title: "Date",
        description: "Pick a date",
        icon: "calendar-days",
        aliases: &["calendar", "due", "deadline"],
        action: date,
    },
];

/// Commands matching `query`, in declaration order.
pub fn filter_commands(query: &str) -> Vec<&'static SlashCommand> {
    COMMANDS.iter().filter(|c| c.matches(query)).collect()
}

/// State of an open menu.
#[derive(Debug, Clone)]
pub struct OpenMenu {
    /// Trigger character plus typed filter.
    pub range: TextRange,
    pub query: String,
    pub items: Vec<&'static SlashCommand>,
    /// Always inside `items`; meaningless when `items` is empty.
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub enum MenuState {
    #[default]
    Closed,
    Open(OpenMenu),
}

/// Slash menu controller.
#[derive(Debug)]
pub struct SlashMenu {
    trigger: char,
    state: MenuState,
}

impl SlashMenu {
    pub fn new(trigger: char) -> Self {
        Self {
            trigger,
            state: MenuState::Closed,
        }
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Open(_))
    }

    /// Visible items; empty when closed.
    pub fn items(&self) -> &[&'static SlashCommand] {
        match &self.state {
            MenuState::Open(menu) => &menu.items,
            MenuState::Closed => &[],
        }
    }

    /// Highlighted item index, `None` when closed or nothing matches.
    pub fn selected_index(&self) -> Option<usize> {
        match &self.state {
            MenuState::Open(menu) if !menu.items.is_empty() => Some(menu.selected),
            _ => None,
        }
    }

    /// Open over the full list for the trigger at `range`.
    pub fn open(&mut self, range: TextRange) {
        trace!(subsystem = "editor", component = "slash_menu", from = range.from, "Menu opened");
        self.state = MenuState::Open(OpenMenu {
            range,
            query: String::new(),
            items: filter_commands(""),
            selected: 0,
        });
    }

    /// Narrow the list. The highlight resets to the first item when the
    /// query changes.
    pub fn set_query(&mut self, query: &str, to: usize) {
        let MenuState::Open(menu) = &mut self.state else {
            return;
        };
        menu.range.to = to;
        if menu.query != query {
            menu.query = query.to_string();
            menu.items = filter_commands(query);
            menu.selected = 0;
            trace!(
                subsystem = "editor",
                component = "slash_menu",
                item_count = menu.items.len(),
                "Menu filtered"
            );
        }
    }

    /// Move the highlight with wrap-around. Returns `false` (key not
    /// consumed) when the list is empty or the menu is closed.
    pub fn move_selection(&mut self, down: bool) -> bool {
        let MenuState::Open(menu) = &mut self.state else {
            return false;
        };
        let len = menu.items.len();
        if len == 0 {
            return false;
        }
        menu.selected = if down {
            (menu.selected + 1) % len
        } else {
            (menu.selected + len - 1) % len
        };
        true
    }

    pub fn close(&mut self) {
        self.state = MenuState::Closed;
    }

    /// Commit the highlighted item. Returns `false` when nothing is
    /// highlighted.
    pub fn commit(&mut self, editor: &mut Editor) -> Result<bool> {
        match self.selected_index() {
            Some(index) => self.activate(editor, index),
            None => Ok(false),
        }
    }

    /// Commit the item at `index`: delete the trigger range, close the
    /// menu and run the command.
    pub fn activate(&mut self, editor: &mut Editor, index: usize) -> Result<bool> {
        let MenuState::Open(menu) = &self.state else {
            return Ok(false);
        };
        let Some(command) = menu.items.get(index).copied() else {
            return Ok(false);
        };
        let range = menu.range;
        self.close();
        editor.delete_range(range.from, range.to)?;
        (command.action)(
            editor,
            TextRange {
                from: range.from,
                to: range.from,
            },
        )?;
        debug!(
            subsystem = "editor",
            component = "slash_menu",
            command = command.title,
            "Slash command committed"
        );
        Ok(true)
    }

    /// Track the document after a key's default behavior ran: open on the
    /// trigger, refresh the filter, or close when the trigger range is no
    /// longer valid.
    pub fn sync(&mut self, editor: &Editor, key: Key) {
        if self.is_open() {
            self.refresh(editor);
        } else if key == Key::Char(self.trigger) {
            self.try_open(editor);
        }
    }

    fn try_open(&mut self, editor: &Editor) {
        let sel = editor.selection();
        if !sel.is_empty() || sel.head == 0 {
            return;
        }
        let doc = editor.document();
        let from = sel.head - 1;
        if doc.char_after(from) != Some(self.trigger) {
            return;
        }
        if !matches!(
            editor.parent_kind_at_head(),
            Some(NodeKind::Paragraph | NodeKind::Heading)
        ) {
            return;
        }
        if doc.char_before(from).is_some_and(|c| !c.is_whitespace()) {
            return;
        }
        self.open(TextRange { from, to: sel.head });
    }

    fn refresh(&mut self, editor: &Editor) {
        let MenuState::Open(menu) = &self.state else {
            return;
        };
        let from = menu.range.from;
        let sel = editor.selection();
        let doc = editor.document();
        let query = match (doc.resolve(from), doc.resolve(sel.head)) {
            (Ok(start), Ok(head))
                if sel.is_empty()
                    && sel.head > from
                    && start.path == head.path
                    && doc.char_after(from) == Some(self.trigger) =>
            {
                doc.text_before(sel.head)
                    .map(|text| text.chars().skip(start.offset + 1).collect::<String>())
                    .ok()
            }
            _ => None,
        };
        match query {
            Some(query)
                if !query.starts_with(char::is_whitespace)
                    && !query.contains("  ")
                    && !query.contains(OBJECT_CHAR) =>
            {
                self.set_query(&query, sel.head)
            }
            _ => self.close(),
        }
    }
}
