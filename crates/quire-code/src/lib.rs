//! # quire-code
//!
//! Language detection and formatting for code blocks: a grammar registry,
//! the structural-then-relevance classifier with its auto-correct policy,
//! and a formatter adapter that never lets a backend failure escape.

pub mod detect;
pub mod format;
pub mod grammar;
mod sql;

pub use detect::{
    detect, detect_with, should_auto_correct, should_auto_correct_with, DetectionStrategy,
    LanguageDetection,
};
pub use format::{format, format_with, FormatOptions, FormatResult};
pub use grammar::{normalize_language, GrammarRegistry, KeywordRegistry};
