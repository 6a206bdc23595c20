//! Code block language detection and the auto-correct policy.
//!
//! Detection runs structural detectors first (strict JSON, SQL, Java). A
//! structural hit is trusted outright; otherwise every registered grammar is
//! scored and the best one wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use quire_core::defaults::{
    AUTOCORRECT_AGGRESSIVE_MARGIN, AUTOCORRECT_AGGRESSIVE_MIN_RELEVANCE,
    AUTOCORRECT_MIN_SNIPPET_LEN, AUTOCORRECT_PASSIVE_MARGIN, AUTOCORRECT_PASSIVE_MIN_RELEVANCE,
};

use crate::grammar::{normalize_language, GrammarRegistry, KeywordRegistry};

static DEFAULT_REGISTRY: Lazy<KeywordRegistry> = Lazy::new(KeywordRegistry::new);

/// The built-in grammar registry shared by [`detect`] and [`format`](crate::format).
pub fn default_registry() -> &'static KeywordRegistry {
    &DEFAULT_REGISTRY
}

/// How a language was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStrategy {
    /// A structural signature matched.
    Deterministic,
    /// Best relevance score across the registry.
    Relevance,
}

impl DetectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Relevance => "relevance",
        }
    }
}

/// Result of language detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDetection {
    pub language: Option<String>,
    pub strategy: DetectionStrategy,
    /// Score of the winning language; infinite for deterministic hits.
    pub relevance: f64,
    /// Score of the runner-up; infinite for deterministic hits.
    pub second_relevance: f64,
}

impl LanguageDetection {
    fn none() -> Self {
        Self {
            language: None,
            strategy: DetectionStrategy::Relevance,
            relevance: 0.0,
            second_relevance: 0.0,
        }
    }

    fn deterministic(language: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            strategy: DetectionStrategy::Deterministic,
            relevance: f64::INFINITY,
            second_relevance: f64::INFINITY,
        }
    }

    pub fn is_deterministic(&self) -> bool {
        self.strategy == DetectionStrategy::Deterministic
    }
}

// ── Structural detectors ───────────────────────────────────────────────────

const SQL_VERBS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP", "WITH", "TRUNCATE",
    "MERGE", "GRANT", "REVOKE", "EXPLAIN",
];

const SQL_CLAUSES: &[&str] = &[
    "FROM", "WHERE", "INTO", "VALUES", "SET", "TABLE", "JOIN", "GROUP", "ORDER", "HAVING",
    "LIMIT", "INDEX", "VIEW", "AS", "ON", "RETURNING", "DATABASE", "SCHEMA",
];

const JAVA_SIGNATURES: &[&str] = &[
    "System.out.print",
    "System.err.print",
    "public static void main",
    "import java.",
    "import javax.",
    "@Override",
    "String[] args",
];

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| tracing::warn!(pattern, error = %e, "Invalid detector pattern"))
        .ok()
}

static JAVA_MEMBER: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"\b(public|private|protected)\s+(static\s+)?(final\s+)?[A-Za-z_][\w<>,\s]*?(\[\])?\s+\w+\s*(\(|=|;)",
    )
});

static BRACE_BLOCK: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\{[\s\S]*\}"));

/// Strict JSON: starts with `{` or `[` and parses as a JSON value.
pub fn is_strict_json(snippet: &str) -> bool {
    let trimmed = snippet.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// Starts with a SQL verb and has a core clause keyword, `;` or `*`.
pub fn looks_like_sql(snippet: &str) -> bool {
    let trimmed = snippet.trim();
    let mut words = trimmed
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase);
    let starts_with_verb = trimmed
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && words
            .next()
            .is_some_and(|w| SQL_VERBS.contains(&w.as_str()));
    if !starts_with_verb {
        return false;
    }
    words.any(|w| SQL_CLAUSES.contains(&w.as_str())) || trimmed.contains(';') || trimmed.contains('*')
}

/// A Java-only signature token, or a typed member declaration plus a brace block.
pub fn looks_like_java(snippet: &str) -> bool {
    if JAVA_SIGNATURES.iter().any(|sig| snippet.contains(sig)) {
        return true;
    }
    let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(snippet));
    matches(&JAVA_MEMBER) && matches(&BRACE_BLOCK)
}

fn detect_structural(snippet: &str) -> Option<&'static str> {
    if is_strict_json(snippet) {
        Some("json")
    } else if looks_like_sql(snippet) {
        Some("sql")
    } else if looks_like_java(snippet) {
        Some("java")
    } else {
        None
    }
}

// ── Detection ──────────────────────────────────────────────────────────────

/// Detect the language of `snippet` with the built-in registry.
///
/// ```
/// use quire_code::detect::{detect, DetectionStrategy};
///
/// let result = detect("SELECT * FROM users WHERE id = 1;");
/// assert_eq!(result.language.as_deref(), Some("sql"));
/// assert_eq!(result.strategy, DetectionStrategy::Deterministic);
/// ```
pub fn detect(snippet: &str) -> LanguageDetection {
    detect_with(default_registry(), snippet)
}

/// Detect the language of `snippet` against `registry`.
pub fn detect_with(registry: &dyn GrammarRegistry, snippet: &str) -> LanguageDetection {
    let trimmed = snippet.trim();
    if trimmed.is_empty() {
        return LanguageDetection::none();
    }

    if let Some(language) = detect_structural(trimmed) {
        debug!(
            subsystem = "code",
            component = "classifier",
            language = language,
            strategy = "deterministic",
            "Structural language match"
        );
        return LanguageDetection::deterministic(language);
    }

    let languages = registry.list_languages();
    let mut scored: Vec<(&str, f64)> = languages
        .iter()
        .map(|lang| (*lang, registry.relevance(lang, trimmed)))
        .collect();
    // Stable: ties keep registry order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(&(top, relevance)) = scored.first().filter(|(_, score)| *score > 0.0) else {
        return LanguageDetection::none();
    };
    let second_relevance = scored.get(1).map(|(_, score)| *score).unwrap_or(0.0);
    let normalized = normalize_language(top);
    let language = if languages.contains(&normalized.as_str()) {
        normalized
    } else {
        top.to_string()
    };

    debug!(
        subsystem = "code",
        component = "classifier",
        language = %language,
        strategy = "relevance",
        relevance = relevance,
        second_relevance,
        "Relevance language match"
    );
    LanguageDetection {
        language: Some(language),
        strategy: DetectionStrategy::Relevance,
        relevance,
        second_relevance,
    }
}

// ── Auto-correct policy ────────────────────────────────────────────────────

/// Decide whether a code block labelled `current` should be relabelled to
/// the detected language, using the built-in registry.
///
/// `aggressive` is set right after a paste or bulk typing; idle
/// re-evaluation passes `false` and needs a much larger margin.
pub fn should_auto_correct(
    current: Option<&str>,
    code: &str,
    detection: &LanguageDetection,
    aggressive: bool,
) -> bool {
    should_auto_correct_with(default_registry(), current, code, detection, aggressive)
}

pub fn should_auto_correct_with(
    registry: &dyn GrammarRegistry,
    current: Option<&str>,
    code: &str,
    detection: &LanguageDetection,
    aggressive: bool,
) -> bool {
    let Some(current) = current.map(normalize_language).filter(|c| !c.is_empty()) else {
        return false;
    };
    let Some(detected) = detection.language.as_deref().map(normalize_language) else {
        return false;
    };
    if current == detected {
        return false;
    }
    if detection.is_deterministic() {
        return true;
    }
    if !aggressive && code.trim().chars().count() < AUTOCORRECT_MIN_SNIPPET_LEN {
        return false;
    }

    let current_relevance = registry.relevance(&current, code);
    let decision = if aggressive {
        detection.relevance >= AUTOCORRECT_AGGRESSIVE_MIN_RELEVANCE
            && detection.relevance - current_relevance >= AUTOCORRECT_AGGRESSIVE_MARGIN
    } else {
        detection.relevance >= AUTOCORRECT_PASSIVE_MIN_RELEVANCE
            && detection.relevance - detection.second_relevance.max(current_relevance)
                >= AUTOCORRECT_PASSIVE_MARGIN
    };
    debug!(
        subsystem = "code",
        component = "autocorrect",
        current = %current,
        language = %detected,
        relevance = detection.relevance,
        current_relevance,
        aggressive,
        decision,
        "Auto-correct decision"
    );
    decision
}
