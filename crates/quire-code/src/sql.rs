//! SQL formatter.
//!
//! Each top-level clause keyword starts its own line and the clause body is
//! indented below it. Commas and `AND`/`OR` at clause level break lines;
//! anything inside parentheses stays inline. Keywords are uppercased.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    /// String literal or quoted identifier, kept verbatim.
    Quoted(String),
    Comment(String),
    Punct(char),
    Operator(String),
}

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CASCADE", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
    "END", "EXISTS", "EXPLAIN", "FALSE", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING",
    "IF", "ILIKE", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY",
    "LEFT", "LIKE", "LIMIT", "MERGE", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "PRIMARY", "REFERENCES", "RETURNING", "REVOKE", "RIGHT", "SELECT", "SET", "TABLE", "THEN",
    "TRUE", "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE",
    "WITH", "EXCEPT",
];

/// Clause keywords (after multi-word merging) that start a new line and
/// indent their body.
const CLAUSES: &[&str] = &[
    "SELECT", "SELECT DISTINCT", "FROM", "WHERE", "GROUP BY", "ORDER BY", "HAVING", "LIMIT",
    "OFFSET", "INSERT INTO", "VALUES", "UPDATE", "SET", "DELETE FROM", "RETURNING", "WITH",
    "CREATE TABLE", "ALTER TABLE", "DROP TABLE", "UNION", "UNION ALL", "INTERSECT", "EXCEPT",
];

/// Keywords that start a new line at body level without changing indent.
const BODY_BREAKS: &[&str] = &[
    "JOIN", "INNER JOIN", "LEFT JOIN", "RIGHT JOIN", "FULL JOIN", "CROSS JOIN",
    "LEFT OUTER JOIN", "RIGHT OUTER JOIN", "FULL OUTER JOIN", "AND", "OR",
];

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && next == Some('-') {
            let end = chars[i..]
                .iter()
                .position(|&ch| ch == '\n')
                .map_or(chars.len(), |p| i + p);
            tokens.push(Token::Comment(chars[i..end].iter().collect::<String>().trim_end().to_string()));
            i = end;
        } else if c == '/' && next == Some('*') {
            let close = chars[i + 2..]
                .windows(2)
                .position(|w| w == ['*', '/'])
                .ok_or_else(|| "Unterminated block comment".to_string())?;
            let end = i + 2 + close + 2;
            tokens.push(Token::Comment(chars[i..end].iter().collect()));
            i = end;
        } else if matches!(c, '\'' | '"' | '`') {
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => return Err(format!("Unterminated quoted literal starting with {}", c)),
                    // Doubled quote escapes itself.
                    Some(&ch) if ch == c && chars.get(j + 1) == Some(&c) => j += 2,
                    Some(&ch) if ch == c => break,
                    Some(_) => j += 1,
                }
            }
            tokens.push(Token::Quoted(chars[i..=j].iter().collect()));
            i = j + 1;
        } else if c.is_alphanumeric() || c == '_' || c == '$' || c == '@' {
            let end = chars[i..]
                .iter()
                .position(|ch| !(ch.is_alphanumeric() || matches!(ch, '_' | '$' | '@')))
                .map_or(chars.len(), |p| i + p);
            tokens.push(Token::Word(chars[i..end].iter().collect()));
            i = end;
        } else if matches!(c, '(' | ')' | ',' | ';' | '.') {
            tokens.push(Token::Punct(c));
            i += 1;
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            if matches!(two.as_str(), "<=" | ">=" | "<>" | "!=" | "||" | "::" | "->") {
                tokens.push(Token::Operator(two));
                i += 2;
            } else {
                tokens.push(Token::Operator(c.to_string()));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

fn keyword(word: &str) -> Option<String> {
    let upper = word.to_ascii_uppercase();
    KEYWORDS.contains(&upper.as_str()).then_some(upper)
}

/// Merge multi-word keywords (`GROUP BY`, `LEFT OUTER JOIN`, ...) into one
/// word token so the layout pass sees them as a unit.
fn merge_keywords(tokens: Vec<Token>) -> Vec<Token> {
    let upper = |t: Option<&Token>| match t {
        Some(Token::Word(w)) => keyword(w),
        _ => None,
    };
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let Some(first) = upper(tokens.get(i)) else {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        };
        let mut phrase = first;
        let mut consumed = 1;
        loop {
            let Some(next) = upper(tokens.get(i + consumed)) else {
                break;
            };
            let candidate = format!("{} {}", phrase, next);
            let is_prefix = CLAUSES
                .iter()
                .chain(BODY_BREAKS)
                .any(|k| *k == candidate || k.starts_with(&format!("{} ", candidate)));
            if !is_prefix {
                break;
            }
            phrase = candidate;
            consumed += 1;
        }
        out.push(Token::Word(phrase));
        i += consumed;
    }
    out
}

struct Writer {
    out: String,
    indent_width: usize,
    at_line_start: bool,
    space_pending: bool,
}

impl Writer {
    fn newline(&mut self) {
        if !self.at_line_start {
            let trimmed = self.out.trim_end_matches(' ').len();
            self.out.truncate(trimmed);
            self.out.push('\n');
            self.at_line_start = true;
        }
        self.space_pending = false;
    }

    fn write(&mut self, text: &str, level: usize) {
        if self.at_line_start {
            self.out.push_str(&" ".repeat(self.indent_width * level));
        } else if self.space_pending {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.at_line_start = false;
        self.space_pending = true;
    }
}

/// Format SQL source. Fails on unbalanced parentheses or unterminated
/// literals and comments.
pub fn format_sql(source: &str, indent_width: usize) -> Result<String, String> {
    let tokens = merge_keywords(tokenize(source)?);
    let mut w = Writer {
        out: String::with_capacity(source.len() + 16),
        indent_width,
        at_line_start: true,
        space_pending: false,
    };
    let mut depth = 0usize;
    let mut body_level = 0usize;
    let mut prev: Option<&Token> = None;

    for token in &tokens {
        match token {
            Token::Word(word) => {
                let upper = keyword(word).or_else(|| {
                    word.contains(' ').then(|| word.to_ascii_uppercase())
                });
                match upper {
                    Some(kw) if depth == 0 && CLAUSES.contains(&kw.as_str()) => {
                        w.newline();
                        w.write(&kw, 0);
                        w.newline();
                        body_level = 1;
                    }
                    Some(kw) if depth == 0 && BODY_BREAKS.contains(&kw.as_str()) => {
                        w.newline();
                        w.write(&kw, body_level);
                    }
                    Some(kw) => w.write(&kw, body_level),
                    None => w.write(word, body_level),
                }
            }
            Token::Quoted(text) | Token::Operator(text) => w.write(text, body_level),
            Token::Comment(text) => {
                w.write(text, body_level);
                if text.starts_with("--") {
                    w.newline();
                }
            }
            Token::Punct('(') => {
                // Function calls hug their parenthesis.
                let hug = matches!(prev, Some(Token::Word(word)) if keyword(word).is_none());
                if hug {
                    w.space_pending = false;
                }
                w.write("(", body_level);
                w.space_pending = false;
                depth += 1;
            }
            Token::Punct(')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "Unbalanced parenthesis: unexpected ')'".to_string())?;
                w.space_pending = false;
                w.write(")", body_level);
            }
            Token::Punct(',') => {
                w.space_pending = false;
                w.write(",", body_level);
                if depth == 0 {
                    w.newline();
                }
            }
            Token::Punct(';') => {
                if depth != 0 {
                    return Err("Unbalanced parenthesis: statement ended inside '('".to_string());
                }
                w.space_pending = false;
                w.write(";", body_level);
                w.newline();
                w.out.push('\n');
                body_level = 0;
            }
            Token::Punct('.') => {
                w.space_pending = false;
                w.write(".", body_level);
                w.space_pending = false;
            }
            Token::Punct(other) => w.write(&other.to_string(), body_level),
        }
        prev = Some(token);
    }

    if depth != 0 {
        return Err("Unbalanced parenthesis: missing ')'".to_string());
    }
    Ok(w.out.trim_end().to_string())
}
