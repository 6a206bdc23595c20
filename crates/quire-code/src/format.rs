//! Code block formatting.
//!
//! [`format`] resolves the effective language, picks a backend from a fixed
//! table and runs it. Backend failures never escape: the result carries the
//! original source plus a message.

use serde::Serialize;
use tracing::debug;

use quire_core::defaults::FORMAT_INDENT_WIDTH;

use crate::detect::{default_registry, detect, is_strict_json};
use crate::grammar::{normalize_language, GrammarRegistry};
use crate::sql;

/// Options handed to every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent_width: usize,
    /// Prefer single-quoted string literals (JavaScript/TypeScript).
    pub single_quote: bool,
    /// Add trailing commas to multi-line array and object literals
    /// (JavaScript/TypeScript).
    pub trailing_comma: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_width: FORMAT_INDENT_WIDTH,
            single_quote: true,
            trailing_comma: true,
        }
    }
}

impl FormatOptions {
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_single_quote(mut self, enabled: bool) -> Self {
        self.single_quote = enabled;
        self
    }

    pub fn with_trailing_comma(mut self, enabled: bool) -> Self {
        self.trailing_comma = enabled;
        self
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(self.indent_width * level)
    }
}

/// Outcome of a format request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatResult {
    /// Formatted text, or the untouched source when `error` is set.
    pub formatted: String,
    /// Effective language, `None` when nothing could be determined.
    pub language: Option<String>,
    /// Backend used, `None` when the language has no formatter.
    pub parser: Option<&'static str>,
    pub error: Option<String>,
}

impl FormatResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Formatter backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Json,
    Sql,
    /// Brace-delimited languages, reindented by nesting depth.
    Braces(Dialect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
    CFamily,
    Css,
}

impl Backend {
    /// Fixed language table.
    pub fn for_language(language: &str) -> Option<Self> {
        Some(match language {
            "json" => Self::Json,
            "sql" => Self::Sql,
            "javascript" => Self::Braces(Dialect::JavaScript),
            "typescript" => Self::Braces(Dialect::TypeScript),
            "java" | "c" | "cpp" | "csharp" | "rust" | "go" | "php" => Self::Braces(Dialect::CFamily),
            "css" => Self::Braces(Dialect::Css),
            _ => return None,
        })
    }

    pub fn parser_name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sql => "sql",
            Self::Braces(Dialect::JavaScript) => "babel",
            Self::Braces(Dialect::TypeScript) => "typescript",
            Self::Braces(Dialect::CFamily) => "braces",
            Self::Braces(Dialect::Css) => "css",
        }
    }

    fn run(&self, source: &str, options: &FormatOptions) -> Result<String, String> {
        match self {
            Self::Json => format_json(source, options),
            Self::Sql => sql::format_sql(source, options.indent_width),
            Self::Braces(dialect) => format_braces(source, *dialect, options),
        }
    }
}

const JSON_COMPATIBLE: &[&str] = &["json", "javascript", "typescript"];

/// Pick the language to format as.
///
/// Strict JSON with a JSON-compatible candidate is forced to `json`.
/// Otherwise a recognized preferred language wins over detection.
pub fn resolve_language(source: &str, preferred: Option<&str>) -> Option<String> {
    let registry = default_registry();
    let known = registry.list_languages();
    let preferred = preferred
        .map(normalize_language)
        .filter(|lang| !lang.is_empty())
        .filter(|lang| known.contains(&lang.as_str()) || Backend::for_language(lang).is_some());

    let candidate = preferred.or_else(|| detect(source).language);
    if is_strict_json(source)
        && candidate
            .as_deref()
            .map_or(true, |lang| JSON_COMPATIBLE.contains(&lang))
    {
        return Some("json".to_string());
    }
    candidate
}

/// Format `source` with default options.
///
/// ```
/// use quire_code::format::format;
///
/// let result = format("{\"a\":1}", Some("javascript"));
/// assert_eq!(result.language.as_deref(), Some("json"));
/// assert_eq!(result.formatted, "{\n  \"a\": 1\n}");
/// ```
pub fn format(source: &str, preferred: Option<&str>) -> FormatResult {
    format_with(source, preferred, &FormatOptions::default())
}

pub fn format_with(source: &str, preferred: Option<&str>, options: &FormatOptions) -> FormatResult {
    let language = resolve_language(source, preferred);
    let Some(backend) = language.as_deref().and_then(Backend::for_language) else {
        let name = language.as_deref().unwrap_or("plain text");
        debug!(subsystem = "code", component = "formatter", language = name, "No formatter");
        return FormatResult {
            formatted: source.to_string(),
            error: Some(format!("No formatter available for {}", name)),
            language,
            parser: None,
        };
    };

    match backend.run(source, options) {
        Ok(formatted) => {
            debug!(
                subsystem = "code",
                component = "formatter",
                language = language.as_deref().unwrap_or_default(),
                parser = backend.parser_name(),
                "Formatted code block"
            );
            FormatResult {
                formatted,
                language,
                parser: Some(backend.parser_name()),
                error: None,
            }
        }
        Err(message) => {
            debug!(
                subsystem = "code",
                component = "formatter",
                parser = backend.parser_name(),
                error = %message,
                "Formatting failed, source preserved"
            );
            FormatResult {
                formatted: source.to_string(),
                language,
                parser: Some(backend.parser_name()),
                error: Some(message),
            }
        }
    }
}

// ── JSON ───────────────────────────────────────────────────────────────────

fn format_json(source: &str, options: &FormatOptions) -> Result<String, String> {
    let value: serde_json::Value =
        serde_json::from_str(source.trim()).map_err(|e| format!("Invalid JSON: {}", e))?;
    let indent = options.indent(1);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(&value, &mut serializer).map_err(|e| e.to_string())?;
    String::from_utf8(out).map_err(|e| e.to_string())
}

// ── Brace languages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    Code,
    BlockComment,
    /// Inside a string literal; the char is the closing quote.
    Str(char),
}

#[derive(Debug, Clone, Copy)]
struct Open {
    ch: char,
    line: usize,
    /// Array or object literal, eligible for trailing commas.
    literal: bool,
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Scan one line, updating the bracket stack. Returns the code portion of
/// the line (comments and string bodies dropped) and whether it ends in a
/// line comment.
fn scan_line(
    line: &str,
    line_no: usize,
    state: &mut Lexical,
    stack: &mut Vec<Open>,
    dialect: Dialect,
) -> Result<(String, bool), String> {
    let chars: Vec<char> = line.chars().collect();
    let mut code = String::with_capacity(line.len());
    let mut line_comment = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match *state {
            Lexical::BlockComment => {
                if c == '*' && next == Some('/') {
                    *state = Lexical::Code;
                    i += 1;
                }
            }
            Lexical::Str(quote) => {
                if c == '\\' {
                    i += 1;
                } else if c == quote {
                    *state = Lexical::Code;
                    code.push(quote);
                }
            }
            Lexical::Code => match c {
                '/' if next == Some('/') && dialect != Dialect::Css => {
                    line_comment = true;
                    break;
                }
                // Rust lifetimes and labels are not char literals.
                '\'' if dialect == Dialect::CFamily
                    && next != Some('\\')
                    && chars.get(i + 2) != Some(&'\'') =>
                {
                    code.push(c)
                }
                '/' if next == Some('*') => {
                    *state = Lexical::BlockComment;
                    i += 1;
                }
                '"' | '\'' | '`' => {
                    code.push(c);
                    *state = Lexical::Str(c);
                }
                '(' | '[' | '{' => {
                    let literal = c == '[' || (c == '{' && opens_object_literal(&code, stack));
                    stack.push(Open {
                        ch: c,
                        line: line_no,
                        literal,
                    });
                    code.push(c);
                }
                ')' | ']' | '}' => {
                    match stack.pop() {
                        Some(open) if closing_for(open.ch) == c => {}
                        Some(open) => {
                            return Err(format!(
                                "Mismatched '{}' on line {} (expected '{}' for '{}' opened on line {})",
                                c,
                                line_no,
                                closing_for(open.ch),
                                open.ch,
                                open.line
                            ))
                        }
                        None => return Err(format!("Unexpected '{}' on line {}", c, line_no)),
                    }
                    code.push(c);
                }
                _ => code.push(c),
            },
        }
        i += 1;
    }
    // Strings, template literals included, end on the line they start.
    if let Lexical::Str(_) = *state {
        return Err(format!("Unterminated string on line {}", line_no));
    }
    Ok((code, line_comment))
}

/// `{` opens an object literal after `=`, `:`, `(`, `,`, `[`, `?`, `return`
/// or at the start of an expression inside another literal.
fn opens_object_literal(code_before: &str, stack: &[Open]) -> bool {
    let trimmed = code_before.trim_end();
    match trimmed.chars().last() {
        Some('=' | ':' | '(' | ',' | '[' | '?') => true,
        None => stack.last().is_some_and(|open| open.literal),
        _ => trimmed.ends_with("return"),
    }
}

fn leading_closers(line: &str) -> usize {
    line.chars()
        .take_while(|c| matches!(c, ')' | ']' | '}') || c.is_whitespace())
        .filter(|c| !c.is_whitespace())
        .count()
}

/// Convert a double-quoted literal to single quotes when that needs no
/// extra escaping.
fn prefer_single_quotes(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                out.extend(&chars[i..]);
                break;
            }
            '\'' | '`' => {
                let end = string_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
            '"' => {
                let end = string_end(&chars, i);
                let body: String = chars[i + 1..end.saturating_sub(1).max(i + 1)].iter().collect();
                let closed = end > i + 1 && chars.get(end - 1) == Some(&'"');
                if closed && !body.contains('\'') {
                    out.push('\'');
                    out.push_str(&body.replace("\\\"", "\""));
                    out.push('\'');
                } else {
                    out.extend(&chars[i..end]);
                }
                i = end;
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index just past the string literal starting at `start`.
fn string_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn needs_trailing_comma(code: &str) -> bool {
    let trimmed = code.trim_end();
    match trimmed.chars().last() {
        Some(c) => !matches!(c, ',' | '{' | '[' | '(' | ';' | ':' | '=' | '>' | '+' | '-' | '*' | '/' | '&' | '|' | '?'),
        None => false,
    }
}

struct Line {
    text: String,
    code: String,
    line_comment: bool,
    /// Lines inside a block comment keep their text.
    verbatim: bool,
    /// The innermost open bracket at the end of this line, if it is a literal.
    in_literal: bool,
}

fn format_braces(source: &str, dialect: Dialect, options: &FormatOptions) -> Result<String, String> {
    let js = matches!(dialect, Dialect::JavaScript | Dialect::TypeScript);
    let mut state = Lexical::Code;
    let mut stack: Vec<Open> = Vec::new();
    let mut lines: Vec<Line> = Vec::new();
    let mut blank_run = 0;

    for (idx, raw) in source.lines().enumerate() {
        let verbatim = state != Lexical::Code;
        let depth_before = stack.len();
        let trimmed = raw.trim();
        let (code, line_comment) = scan_line(trimmed, idx + 1, &mut state, &mut stack, dialect)?;

        if verbatim {
            lines.push(Line {
                text: raw.trim_end().to_string(),
                code,
                line_comment,
                verbatim: true,
                in_literal: false,
            });
            blank_run = 0;
            continue;
        }
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !lines.is_empty() {
                lines.push(Line {
                    text: String::new(),
                    code: String::new(),
                    line_comment: false,
                    verbatim: false,
                    in_literal: false,
                });
            }
            continue;
        }
        blank_run = 0;

        let level = depth_before.saturating_sub(leading_closers(trimmed));
        let body = if js && options.single_quote {
            prefer_single_quotes(trimmed)
        } else {
            trimmed.to_string()
        };
        lines.push(Line {
            text: format!("{}{}", options.indent(level), body),
            code,
            line_comment,
            verbatim: false,
            in_literal: stack.last().is_some_and(|open| open.literal),
        });
    }

    if let Some(open) = stack.last() {
        return Err(format!(
            "Unclosed '{}' opened on line {}",
            open.ch, open.line
        ));
    }
    if state == Lexical::BlockComment {
        return Err("Unterminated block comment".to_string());
    }

    if js && options.trailing_comma {
        for i in 0..lines.len() {
            let next_closes = lines[i + 1..]
                .iter()
                .find(|l| !l.text.trim().is_empty())
                .is_some_and(|l| {
                    !l.verbatim && matches!(l.text.trim_start().chars().next(), Some(']' | '}'))
                });
            let line = &mut lines[i];
            if line.in_literal
                && !line.verbatim
                && !line.line_comment
                && next_closes
                && needs_trailing_comma(&line.code)
            {
                line.text.push(',');
            }
        }
    }

    while lines.last().is_some_and(|l| l.text.trim().is_empty()) {
        lines.pop();
    }
    Ok(lines
        .into_iter()
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n"))
}
