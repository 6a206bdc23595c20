//! Grammar registry used to score how well a snippet matches a language.
//!
//! [`KeywordRegistry`] is the built-in registry. Each grammar scores a
//! snippet by counting keyword tokens and weighted structural patterns; a
//! match on one of the grammar's illegal patterns drops its score to zero.

use std::collections::HashSet;

use regex::Regex;

/// Source of per-language relevance scores.
pub trait GrammarRegistry: Send + Sync {
    /// Canonical names of every registered language.
    fn list_languages(&self) -> Vec<&str>;

    /// Relevance of `text` under `language`. Unknown languages score `0.0`.
    fn relevance(&self, language: &str, text: &str) -> f64;
}

struct GrammarDef {
    name: &'static str,
    keywords: &'static [&'static str],
    patterns: &'static [(&'static str, f64)],
    illegal: &'static [&'static str],
}

const GRAMMARS: &[GrammarDef] = &[
    GrammarDef {
        name: "javascript",
        keywords: &[
            "const", "let", "var", "function", "return", "async", "await", "undefined", "null",
            "typeof", "instanceof", "require", "module", "exports", "this", "new",
        ],
        patterns: &[
            (r"\bconsole\.(log|error|warn)\(", 3.0),
            (r"=>", 1.0),
            (r"\b(const|let)\s+\w+\s*=", 2.0),
            (r"\bfunction\s*\w*\s*\(", 2.0),
            (r"===|!==", 2.0),
            (r"\bdocument\.|\bwindow\.", 2.0),
        ],
        illegal: &[r"(?m)^\s*#include", r"\bdef\s+\w+\s*\(.*\)\s*:", r"(?m)^\s*package\s+main\b"],
    },
    GrammarDef {
        name: "typescript",
        keywords: &[
            "const", "let", "function", "return", "async", "await", "interface", "type",
            "implements", "readonly", "enum", "namespace", "declare", "keyof", "as",
        ],
        patterns: &[
            (r"\binterface\s+\w+\s*\{", 3.0),
            (r":\s*(string|number|boolean|void|any|unknown)\b", 3.0),
            (r"\btype\s+\w+\s*=", 2.0),
            (r"<\w+(\[\])?>\s*\(", 1.0),
            (r"\bexport\s+(default\s+)?(class|function|const|interface|type)\b", 1.0),
        ],
        illegal: &[r"(?m)^\s*#include", r"\bdef\s+\w+\s*\(.*\)\s*:", r"\bfn\s+\w+\s*\("],
    },
    GrammarDef {
        name: "python",
        keywords: &[
            "def", "import", "from", "return", "self", "None", "True", "False", "elif", "lambda",
            "yield", "pass", "with", "as", "in", "not", "and", "or", "print",
        ],
        patterns: &[
            (r"(?m)^\s*def\s+\w+\s*\(.*\)\s*(->\s*[\w\[\], ]+)?:", 4.0),
            (r"(?m)^\s*class\s+\w+(\(.*\))?:", 3.0),
            (r"(?m)^\s*(from\s+[\w.]+\s+)?import\s+\w+", 2.0),
            (r"(?m)^\s*(if|for|while|elif|else|try|except)\b.*:\s*$", 2.0),
            (r"__\w+__", 2.0),
        ],
        illegal: &[r"(?m);\s*$", r"(?m)^\s*\}", r"\bfunction\b", r"=>"],
    },
    GrammarDef {
        name: "java",
        keywords: &[
            "public", "private", "protected", "class", "static", "void", "final", "extends",
            "implements", "import", "package", "new", "return", "throws", "int", "String",
        ],
        patterns: &[
            (r"\bSystem\.out\.print", 4.0),
            (r"\bpublic\s+static\s+void\s+main\b", 4.0),
            (r"@Override\b", 3.0),
            (r"\b(public|private|protected)\s+[\w<>\[\]]+\s+\w+\s*\(", 2.0),
        ],
        illegal: &[r"\bfn\s+\w+\s*\(", r"\bdef\s+\w+\s*\(", r"\bfunc\s+\w+\s*\(", r"=>"],
    },
    GrammarDef {
        name: "c",
        keywords: &[
            "int", "char", "void", "return", "struct", "sizeof", "unsigned", "long", "static",
            "const", "typedef", "NULL", "malloc", "free",
        ],
        patterns: &[
            (r"(?m)^\s*#include\s*<\w+\.h>", 4.0),
            (r"\bprintf\s*\(", 2.0),
            (r"\bint\s+main\s*\(", 3.0),
            (r"->\w+", 1.0),
        ],
        illegal: &[r"\bclass\s+\w+", r"::", r"\bfunction\b", r"\bdef\s+\w+"],
    },
    GrammarDef {
        name: "cpp",
        keywords: &[
            "int", "void", "return", "class", "public", "private", "template", "typename",
            "namespace", "using", "std", "auto", "const", "virtual", "nullptr",
        ],
        patterns: &[
            (r"(?m)^\s*#include\s*<\w+>", 4.0),
            (r"\bstd::\w+", 3.0),
            (r"\bstd::(cout|cin|endl)\b|<<", 2.0),
            (r"\btemplate\s*<", 3.0),
        ],
        illegal: &[r"\bfunction\b", r"\bdef\s+\w+", r"\bfn\s+\w+\s*\("],
    },
    GrammarDef {
        name: "csharp",
        keywords: &[
            "using", "namespace", "public", "private", "class", "static", "void", "var",
            "string", "async", "await", "override", "readonly", "get", "set",
        ],
        patterns: &[
            (r"(?m)^\s*using\s+System(\.\w+)*;", 4.0),
            (r"\bConsole\.Write(Line)?\s*\(", 4.0),
            (r"\{\s*get;\s*(set;)?\s*\}", 3.0),
            (r"\bnamespace\s+[\w.]+", 2.0),
        ],
        illegal: &[r"\bfn\s+\w+\s*\(", r"\bdef\s+\w+", r"\bfunction\b"],
    },
    GrammarDef {
        name: "go",
        keywords: &[
            "func", "package", "import", "return", "var", "type", "struct", "interface", "defer",
            "go", "chan", "select", "range", "nil", "map",
        ],
        patterns: &[
            (r"(?m)^\s*package\s+\w+", 3.0),
            (r"\bfunc\s+(\(\w+\s+\*?\w+\)\s*)?\w+\s*\(", 4.0),
            (r":=", 2.0),
            (r"\bfmt\.\w+\(", 3.0),
        ],
        illegal: &[r"(?m);\s*$", r"\bfunction\b", r"\bdef\s+\w+"],
    },
    GrammarDef {
        name: "rust",
        keywords: &[
            "fn", "let", "mut", "impl", "struct", "enum", "trait", "pub", "use", "mod", "match",
            "Some", "None", "Ok", "Err", "self", "Self", "crate",
        ],
        patterns: &[
            (r"\bfn\s+\w+\s*(<[^>]*>)?\s*\(", 4.0),
            (r"\blet\s+mut\b", 3.0),
            (r"\w+!\(", 2.0),
            (r"&(mut\s+)?self\b", 2.0),
            (r"->\s*(Self|Result|Option|String|&?\w+)", 1.0),
            (r"::", 1.0),
        ],
        illegal: &[r"\bfunction\b", r"\bdef\s+\w+", r"\bfunc\s+\w+"],
    },
    GrammarDef {
        name: "ruby",
        keywords: &[
            "def", "end", "class", "module", "require", "puts", "attr_accessor", "do", "nil",
            "unless", "elsif", "yield", "self",
        ],
        patterns: &[
            (r"(?m)^\s*end\s*$", 2.0),
            (r"\bputs\s+", 2.0),
            (r"\|\w+(,\s*\w+)*\|", 2.0),
            (r":\w+\s*=>", 2.0),
        ],
        illegal: &[r"(?m)[{;]\s*$", r"\bfunction\b"],
    },
    GrammarDef {
        name: "php",
        keywords: &[
            "function", "echo", "return", "public", "private", "class", "array", "foreach",
            "namespace", "use", "new", "null",
        ],
        patterns: &[
            (r"<\?php", 10.0),
            (r"\$\w+\s*=", 3.0),
            (r"\$this->", 3.0),
            (r"\becho\s+", 2.0),
        ],
        illegal: &[r"\bfn\s+\w+\s*\(", r"\bdef\s+\w+"],
    },
    GrammarDef {
        name: "bash",
        keywords: &[
            "echo", "if", "then", "fi", "for", "do", "done", "case", "esac", "export", "local",
            "sudo", "cd", "grep",
        ],
        patterns: &[
            (r"^#!/(usr/)?bin/(env\s+)?(ba|z)?sh", 10.0),
            (r"\$\{?\w+\}?", 1.0),
            (r"(?m)^\s*(fi|done|esac)\s*$", 3.0),
            (r"\s\|\s*\w+", 1.0),
            (r"(?m)^\s*\$\s+\w+", 2.0),
        ],
        illegal: &[r"(?m)[{;]\s*$"],
    },
    GrammarDef {
        name: "css",
        keywords: &[
            "color", "margin", "padding", "display", "border", "width", "height", "font",
            "background", "position", "flex",
        ],
        patterns: &[
            (r"(?m)^\s*[.#]?[\w-]+(\s*[>+~]?\s*[.#]?[\w-]+)*\s*\{", 2.0),
            (r"(?m)^\s*[\w-]+\s*:\s*[^;{}]+;", 2.0),
            (r"\b\d+(px|em|rem|vh|vw|%)", 2.0),
            (r"#[0-9a-fA-F]{3,6}\b", 1.0),
        ],
        illegal: &[r"\bfunction\b", r"\breturn\b", r"=>", r"\bdef\s+"],
    },
    GrammarDef {
        name: "html",
        keywords: &[],
        patterns: &[
            (r"<!DOCTYPE\s+html", 10.0),
            (r"</?(div|span|p|a|ul|li|html|body|head|script|table)\b[^>]*>", 3.0),
            (r#"\b(class|href|src|id)=""#, 1.0),
        ],
        illegal: &[r"\bfn\s+\w+\s*\(", r"\bdef\s+\w+"],
    },
    GrammarDef {
        name: "sql",
        keywords: &[
            "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE",
            "JOIN", "GROUP", "ORDER", "BY", "CREATE", "TABLE", "select", "from", "where",
        ],
        patterns: &[
            (r"(?i)\bselect\b[\s\S]+\bfrom\b", 4.0),
            (r"(?i)\binsert\s+into\b", 4.0),
            (r"(?i)\bcreate\s+table\b", 4.0),
        ],
        illegal: &[r"\bfn\s+\w+\s*\(", r"\bdef\s+\w+", r"\bfunction\b"],
    },
    GrammarDef {
        name: "json",
        keywords: &["true", "false", "null"],
        patterns: &[(r#""[\w-]+"\s*:"#, 2.0)],
        illegal: &[r"\bfunction\b", r"=", r";"],
    },
    GrammarDef {
        name: "yaml",
        keywords: &["true", "false", "null"],
        patterns: &[
            (r"(?m)^\s*[\w-]+:\s+\S", 2.0),
            (r"(?m)^\s*-\s+\w+", 1.0),
            (r"(?m)^---\s*$", 3.0),
        ],
        illegal: &[r"(?m)[{};]\s*$", r"\bfunction\b", r"=>"],
    },
    GrammarDef {
        name: "markdown",
        keywords: &[],
        patterns: &[
            (r"(?m)^#{1,6}\s+\w", 2.0),
            (r"(?m)^\s*[-*]\s+\[[ xX]\]", 3.0),
            (r"\[[^\]]+\]\([^)]+\)", 3.0),
            (r"(?m)^```", 3.0),
        ],
        illegal: &[r"(?m);\s*$", r"\bfunction\b"],
    },
];

struct Grammar {
    name: &'static str,
    keywords: HashSet<&'static str>,
    patterns: Vec<(Regex, f64)>,
    illegal: Vec<Regex>,
}

impl Grammar {
    fn compile(def: &GrammarDef) -> Self {
        let compile = |pattern: &str| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(language = def.name, pattern, error = %e, "Skipping invalid grammar pattern");
                None
            }
        };
        Self {
            name: def.name,
            keywords: def.keywords.iter().copied().collect(),
            patterns: def
                .patterns
                .iter()
                .filter_map(|(p, weight)| compile(p).map(|re| (re, *weight)))
                .collect(),
            illegal: def.illegal.iter().filter_map(|p| compile(p)).collect(),
        }
    }

    fn relevance(&self, text: &str) -> f64 {
        if self.illegal.iter().any(|re| re.is_match(text)) {
            return 0.0;
        }
        let keyword_hits = tokens(text)
            .filter(|tok| self.keywords.contains(tok))
            .count() as f64;
        let pattern_hits: f64 = self
            .patterns
            .iter()
            .map(|(re, weight)| re.find_iter(text).count() as f64 * weight)
            .sum();
        keyword_hits + pattern_hits
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|tok| !tok.is_empty())
}

/// Built-in registry of keyword and pattern grammars.
pub struct KeywordRegistry {
    grammars: Vec<Grammar>,
}

impl KeywordRegistry {
    pub fn new() -> Self {
        Self {
            grammars: GRAMMARS.iter().map(Grammar::compile).collect(),
        }
    }
}

impl Default for KeywordRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarRegistry for KeywordRegistry {
    fn list_languages(&self) -> Vec<&str> {
        self.grammars.iter().map(|g| g.name).collect()
    }

    fn relevance(&self, language: &str, text: &str) -> f64 {
        let language = normalize_language(language);
        self.grammars
            .iter()
            .find(|g| g.name == language)
            .map(|g| g.relevance(text))
            .unwrap_or(0.0)
    }
}

/// Map a language name or alias to its canonical lowercase name.
///
/// ```
/// use quire_code::grammar::normalize_language;
///
/// assert_eq!(normalize_language("JS"), "javascript");
/// assert_eq!(normalize_language(" c++ "), "cpp");
/// assert_eq!(normalize_language("Kotlin"), "kotlin");
/// ```
pub fn normalize_language(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "js" | "jsx" | "mjs" | "cjs" | "node" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "python3" => "python",
        "sh" | "shell" | "zsh" | "console" => "bash",
        "c++" | "cc" | "cxx" | "hpp" | "h++" => "cpp",
        "cs" | "c#" => "csharp",
        "golang" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "yml" => "yaml",
        "md" => "markdown",
        "htm" | "xhtml" => "html",
        "postgres" | "postgresql" | "mysql" | "sqlite" | "psql" => "sql",
        "text" | "txt" | "plain" => "plaintext",
        other => other,
    };
    canonical.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        for def in GRAMMARS {
            for (pattern, _) in def.patterns {
                assert!(Regex::new(pattern).is_ok(), "{}: {}", def.name, pattern);
            }
            for pattern in def.illegal {
                assert!(Regex::new(pattern).is_ok(), "{}: {}", def.name, pattern);
            }
        }
    }

    #[test]
    fn test_list_languages_canonical() {
        let registry = KeywordRegistry::new();
        let languages = registry.list_languages();
        assert!(languages.contains(&"rust"));
        assert!(languages.contains(&"python"));
        for lang in languages {
            assert_eq!(normalize_language(lang), lang);
        }
    }

    #[test]
    fn test_rust_relevance() {
        let registry = KeywordRegistry::new();
        let code = "fn main() {\n    let mut total = 0;\n    println!(\"{}\", total);\n}";
        let rust = registry.relevance("rust", code);
        assert!(rust >= 4.0, "rust relevance {}", rust);
        assert!(rust > registry.relevance("python", code));
        assert_eq!(registry.relevance("rs", code), rust);
    }

    #[test]
    fn test_illegal_pattern_zeroes_score() {
        let registry = KeywordRegistry::new();
        let code = "def greet(name):\n    return name";
        assert_eq!(registry.relevance("javascript", code), 0.0);
        assert!(registry.relevance("python", code) > 0.0);
    }

    #[test]
    fn test_unknown_language_scores_zero() {
        assert_eq!(KeywordRegistry::new().relevance("cobol", "MOVE A TO B"), 0.0);
    }

    #[test]
    fn test_tokens() {
        let toks: Vec<_> = tokens("const x = (a) => a_b;").collect();
        assert_eq!(toks, vec!["const", "x", "a", "a_b"]);
    }

    #[test]
    fn test_normalize_language_aliases() {
        assert_eq!(normalize_language("TS"), "typescript");
        assert_eq!(normalize_language("yml"), "yaml");
        assert_eq!(normalize_language("C#"), "csharp");
        assert_eq!(normalize_language("PostgreSQL"), "sql");
    }
}
