//! quire-fmt: detect and format code snippets from the command line.
//!
//! Reads a file (or stdin when no file is given) and either prints the
//! detected language as JSON or writes the formatted code to stdout.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire_code::{detect, format_with, should_auto_correct, FormatOptions};

#[derive(Parser)]
#[command(name = "quire-fmt")]
#[command(author, version, about = "Detect and format code snippets")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected language as JSON
    Detect {
        /// Input file (default: stdin)
        input: Option<PathBuf>,

        /// Also report whether a block labelled with this language would be relabelled
        #[arg(long)]
        current: Option<String>,

        /// Use the eager policy applied right after a paste
        #[arg(long)]
        aggressive: bool,
    },

    /// Format a snippet and print the result
    Format {
        /// Input file (default: stdin)
        input: Option<PathBuf>,

        /// Preferred language (detected when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Spaces per indent level
        #[arg(long, default_value_t = quire_core::defaults::FORMAT_INDENT_WIDTH)]
        indent: usize,

        /// Keep double-quoted strings
        #[arg(long)]
        double_quote: bool,

        /// Do not add trailing commas
        #[arg(long)]
        no_trailing_comma: bool,

        /// Exit non-zero when the input is not already formatted
        #[arg(long)]
        check: bool,
    },
}

fn init_tracing() {
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   RUST_LOG    - standard env filter (default: "quire_code=warn")
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quire_code=warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Detect {
            input,
            current,
            aggressive,
        } => {
            let source = read_input(input.as_ref())?;
            let detection = detect(&source);
            let mut report = serde_json::to_value(&detection)?;
            if let Some(current) = current {
                report["autoCorrect"] = serde_json::Value::Bool(should_auto_correct(
                    Some(&current),
                    &source,
                    &detection,
                    aggressive,
                ));
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Format {
            input,
            language,
            indent,
            double_quote,
            no_trailing_comma,
            check,
        } => {
            let source = read_input(input.as_ref())?;
            let options = FormatOptions::default()
                .with_indent_width(indent)
                .with_single_quote(!double_quote)
                .with_trailing_comma(!no_trailing_comma);
            let result = format_with(&source, language.as_deref(), &options);
            if let Some(error) = &result.error {
                eprintln!("{}", error);
            }
            if check {
                let unchanged = result.formatted.trim_end() == source.trim_end();
                return Ok(if unchanged && result.is_ok() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                });
            }
            println!("{}", result.formatted);
            Ok(if result.parser.is_some() && !result.is_ok() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
