//! HTML import/export for the document schema.
//!
//! Rendering emits a fixed, well-formed subset. Parsing accepts that subset
//! plus common pasted markup: unknown elements are unwrapped, loose inline
//! content at block level is wrapped in paragraphs.

use super::node::{normalize_inline, Node};
use crate::chips::{format_date_label, ChipColor};
use crate::error::{Error, Result};

const TAG_CHIP_TYPE: &str = "tag-chip";
const DATE_CHIP_TYPE: &str = "date-chip";
const VOID_ELEMENTS: &[&str] = &["hr", "br", "img", "input", "meta", "link", "wbr"];

// ── Rendering ──────────────────────────────────────────────────────────────

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

pub(super) fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, &mut out);
    }
    out
}

fn render_node(node: &Node, out: &mut String) {
    let wrap = |out: &mut String, open: &str, close: &str, content: &[Node]| {
        out.push_str(open);
        for child in content {
            render_node(child, out);
        }
        out.push_str(close);
    };

    match node {
        Node::Text { text } => out.push_str(&escape_text(text)),
        Node::Paragraph { content } => wrap(out, "<p>", "</p>", content),
        Node::Heading { level, content } => {
            wrap(out, &format!("<h{}>", level), &format!("</h{}>", level), content)
        }
        Node::BulletList { content } => wrap(out, "<ul>", "</ul>", content),
        Node::OrderedList { content } => wrap(out, "<ol>", "</ol>", content),
        Node::ListItem { content } => wrap(out, "<li>", "</li>", content),
        Node::TaskList { content } => wrap(out, "<ul data-type=\"taskList\">", "</ul>", content),
        Node::TaskItem { checked, content } => wrap(
            out,
            &format!("<li data-type=\"taskItem\" data-checked=\"{}\">", checked),
            "</li>",
            content,
        ),
        Node::CodeBlock { language, content } => {
            let open = match language {
                Some(lang) => format!("<pre><code class=\"language-{}\">", escape_attr(lang)),
                None => "<pre><code>".to_string(),
            };
            wrap(out, &open, "</code></pre>", content)
        }
        Node::HorizontalRule => out.push_str("<hr>"),
        Node::TagChip { color, content } => wrap(
            out,
            &format!(
                "<span data-type=\"{}\" data-color=\"{}\">",
                TAG_CHIP_TYPE, color
            ),
            "</span>",
            content,
        ),
        Node::DateChip { date } => {
            out.push_str(&format!(
                "<span data-type=\"{}\" data-date=\"{}\">{}</span>",
                DATE_CHIP_TYPE,
                escape_attr(date),
                escape_text(&format_date_label(date))
            ));
        }
    }
}

// ── Tokenizing ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Markup {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Markup>,
    },
}

impl Markup {
    fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Markup::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            Markup::Text(_) => None,
        }
    }

    fn text_content(&self) -> String {
        match self {
            Markup::Text(t) => t.clone(),
            Markup::Element { children, .. } => children.iter().map(Markup::text_content).collect(),
        }
    }
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = raw.char_indices().peekable();
    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() || ch == '/' {
            chars.next();
            continue;
        }
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() || c == '/' {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let name = raw[start..end].to_ascii_lowercase();
        if name.is_empty() {
            chars.next();
            continue;
        }
        let mut value = String::new();
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            match chars.peek().map(|&(_, c)| c) {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        attrs.push((name, decode_entities(&value)));
    }
    attrs
}

/// Build a forgiving element tree. Unmatched closing tags are ignored and
/// unclosed elements are closed at the end of input.
fn tokenize(markup: &str) -> Result<Vec<Markup>> {
    struct Open {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Markup>,
    }

    let mut stack: Vec<Open> = vec![Open {
        tag: String::new(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];
    let mut rest = markup;

    fn close_top(stack: &mut Vec<Open>) {
        if let Some(open) = stack.pop() {
            let element = Markup::Element {
                tag: open.tag,
                attrs: open.attrs,
                children: open.children,
            };
            if let Some(parent) = stack.last_mut() {
                parent.children.push(element);
            }
        }
    }

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            if let Some(top) = stack.last_mut() {
                top.children.push(Markup::Text(decode_entities(rest)));
            }
            break;
        };
        if lt > 0 {
            if let Some(top) = stack.last_mut() {
                top.children.push(Markup::Text(decode_entities(&rest[..lt])));
            }
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|i| &after[i + 3..]).unwrap_or("");
            continue;
        }
        let gt = rest
            .find('>')
            .ok_or_else(|| Error::Serialization("unterminated HTML tag".into()))?;
        let inner = &rest[1..gt];
        rest = &rest[gt + 1..];

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim().to_ascii_lowercase();
            if let Some(depth) = stack.iter().rposition(|o| o.tag == name) {
                if depth > 0 {
                    while stack.len() > depth {
                        close_top(&mut stack);
                    }
                }
            }
            continue;
        }

        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/');
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let tag = inner[..name_end].to_ascii_lowercase();
        if tag.is_empty() {
            continue;
        }
        let attrs = parse_attrs(&inner[name_end..]);
        stack.push(Open {
            tag: tag.clone(),
            attrs,
            children: Vec::new(),
        });
        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            close_top(&mut stack);
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

// ── Schema mapping ─────────────────────────────────────────────────────────

pub(super) fn parse(markup: &str) -> Result<Vec<Node>> {
    let tree = tokenize(markup)?;
    Ok(to_blocks(&tree))
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "hr"
            | "div"
            | "blockquote"
            | "section"
            | "article"
    )
}

fn is_block(markup: &Markup) -> bool {
    matches!(markup, Markup::Element { tag, .. } if is_block_tag(tag))
}

fn to_blocks(items: &[Markup]) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut pending_inline: Vec<Markup> = Vec::new();

    let flush = |pending: &mut Vec<Markup>, blocks: &mut Vec<Node>| {
        if pending.is_empty() {
            return;
        }
        let inline = to_inline(pending);
        pending.clear();
        let has_content = inline
            .iter()
            .any(|n| !matches!(n, Node::Text { text } if text.trim().is_empty()));
        if has_content {
            blocks.push(Node::paragraph(inline));
        }
    };

    for item in items {
        if !is_block(item) {
            pending_inline.push(item.clone());
            continue;
        }
        flush(&mut pending_inline, &mut blocks);
        let Markup::Element {
            tag,
            children,
            ..
        } = item
        else {
            continue;
        };
        match tag.as_str() {
            "p" => blocks.push(Node::paragraph(to_inline(children))),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse().unwrap_or(1);
                blocks.push(Node::heading(level, to_inline(children)));
            }
            "ul" if item.attr("data-type") == Some("taskList") => {
                blocks.push(Node::task_list(list_items(children, true)))
            }
            "ul" => blocks.push(Node::bullet_list(list_items(children, false))),
            "ol" => blocks.push(Node::ordered_list(list_items(children, false))),
            "li" => blocks.extend(to_blocks(children)),
            "pre" => {
                let code = children.iter().find_map(|c| match c {
                    Markup::Element { tag, .. } if tag == "code" => Some(c),
                    _ => None,
                });
                let language = code
                    .and_then(|c| c.attr("class"))
                    .and_then(|class| {
                        class
                            .split_whitespace()
                            .find_map(|cls| cls.strip_prefix("language-"))
                    })
                    .map(str::to_string);
                blocks.push(Node::code_block(language, &item.text_content()));
            }
            "hr" => blocks.push(Node::horizontal_rule()),
            _ => blocks.extend(to_blocks(children)),
        }
    }
    flush(&mut pending_inline, &mut blocks);
    blocks
}

fn list_items(children: &[Markup], tasks: bool) -> Vec<Node> {
    children
        .iter()
        .filter_map(|child| match child {
            Markup::Element { tag, children, .. } if tag == "li" => {
                let mut content = to_blocks(children);
                if content.is_empty() {
                    content.push(Node::paragraph(Vec::new()));
                }
                Some(if tasks {
                    let checked = child.attr("data-checked") == Some("true");
                    Node::task_item(checked, content)
                } else {
                    Node::list_item(content)
                })
            }
            _ => None,
        })
        .collect()
}

fn to_inline(items: &[Markup]) -> Vec<Node> {
    fn walk(items: &[Markup], out: &mut Vec<Node>) {
        for item in items {
            match item {
                Markup::Text(text) => out.push(Node::text(text.as_str())),
                Markup::Element { tag, children, .. } => {
                    match (tag.as_str(), item.attr("data-type")) {
                        ("span", Some(TAG_CHIP_TYPE)) => {
                            let color: ChipColor = item
                                .attr("data-color")
                                .and_then(|c| c.parse().ok())
                                .unwrap_or_default();
                            out.push(Node::tag_chip(color, &item.text_content()));
                        }
                        ("span", Some(DATE_CHIP_TYPE)) => {
                            out.push(Node::date_chip(item.attr("data-date").unwrap_or_default()));
                        }
                        ("br", _) => out.push(Node::text(" ")),
                        _ => walk(children, out),
                    }
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(items, &mut out);
    normalize_inline(&mut out);
    out
}
