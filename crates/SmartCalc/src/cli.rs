//! # Smart Calculator CLI
//!
//! Evaluates a document from a file or stdin and prints one result per input line.
//!
//! ## Command Line Options
//!
//! ```text
//! [FILE]                      Document to evaluate ('-' or omitted for stdin)
//! -c, --culture <CULTURE>     Culture identifier [env: SMARTCALC_CULTURE] [default: en-us]
//! -r, --resources <DIR>       Resource tables directory [env: SMARTCALC_RESOURCES]
//!     --rates <FILE>          Exchange rates JSON file [env: SMARTCALC_RATES]
//!     --json                  Print results as a JSON array
//!     --log-level <LEVEL>     Log level when RUST_LOG is unset [env: SMARTCALC_LOG_LEVEL]
//! -h, --help                  Print help
//! ```
//!
//! ## Usage Examples
//!
//! ```bash
//! printf 'rent = 1200\nrent * 12' | smartcalc-cli
//! smartcalc-cli budget.txt --culture fr-FR
//! smartcalc-cli trip.txt --rates rates.json --json
//! ```
//!
//! The rates file has the shape `{ "base": "USD", "rates": { "EUR": 0.9 } }`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use smart_calc_support::ResultLine;
use tracing::{debug, info};

use crate::config::{InterpreterConfig, ResourceSource};
use crate::currency::StaticCurrencyService;
use crate::error::CalcResult;
use crate::lexer::split_lines;
use crate::resources::Culture;
use crate::session::ParserAndInterpreter;

#[derive(Parser, Debug)]
#[command(name = "smartcalc-cli")]
#[command(about = "Evaluate a smart calculator document line by line")]
#[command(
    long_about = "Evaluate a plain-text document where each line is an expression, a variable declaration, a comparison, a comment or a header, and print the result of each line"
)]
pub struct Args {
    /// Document to evaluate (use '-' or omit for stdin)
    pub input: Option<PathBuf>,

    /// Culture selecting grammar, units and number formats
    #[arg(short, long, env = "SMARTCALC_CULTURE", default_value = "en-us")]
    pub culture: String,

    /// Directory holding <culture>/{grammar,units,functions}.json tables
    #[arg(short, long, env = "SMARTCALC_RESOURCES")]
    pub resources: Option<PathBuf>,

    /// Exchange rates JSON file enabling currency conversions
    #[arg(long, env = "SMARTCALC_RATES")]
    pub rates: Option<PathBuf>,

    /// Print results as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "SMARTCALC_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Serialize)]
struct JsonLine<'a> {
    line_index: usize,
    input: &'a str,
    display_text: &'a str,
}

impl Args {
    pub fn to_config(&self) -> CalcResult<InterpreterConfig> {
        let mut config = InterpreterConfig::new(Culture::new(&self.culture));
        if let Some(dir) = &self.resources {
            config = config.with_resources(ResourceSource::Directory(dir.clone()));
        }
        if let Some(path) = &self.rates {
            let service = StaticCurrencyService::from_file(path)?;
            debug!(base = service.base(), "Loaded exchange rates");
            config = config.with_currency_service(Arc::new(service));
        }
        Ok(config)
    }
}

/// Installs the tracing subscriber. Logs go to stderr so results stay pipeable.
pub fn init_tracing(log_level: &str) {
    let filter = format!("smart_calc={},smartcalc_cli={}", log_level, log_level);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Main CLI execution function
pub async fn run_cli(args: Args) -> CalcResult<()> {
    init_tracing(&args.log_level);

    let text = read_input(args.input.as_deref())?;
    let config = args.to_config()?;
    info!(culture = %config.culture, "Evaluating document");

    let session = ParserAndInterpreter::new(config)?;
    session.set_text(text.clone());
    let lines = session.wait_for_result().await;

    let output = if args.json {
        render_json(&text, &lines)?
    } else {
        render_text(&text, &lines)
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(output.as_bytes())?;
    handle.write_all(b"\n")?;
    Ok(())
}

/// Read input from file or stdin
fn read_input(path: Option<&Path>) -> CalcResult<String> {
    match path {
        Some(path) if path.to_str() != Some("-") => Ok(fs::read_to_string(path)?),
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// `input  => result`, with results aligned after the longest input line.
pub fn render_text(text: &str, lines: &[ResultLine]) -> String {
    let inputs: Vec<&str> = split_lines(text).collect();
    let width = inputs.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    inputs
        .iter()
        .zip(lines)
        .map(|(input, line)| {
            if line.display_text.is_empty() {
                input.to_string()
            } else {
                format!("{:<width$}  => {}", input, line.display_text, width = width)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(text: &str, lines: &[ResultLine]) -> CalcResult<String> {
    let rows: Vec<JsonLine<'_>> = split_lines(text)
        .zip(lines)
        .map(|(input, line)| JsonLine {
            line_index: line.line_index,
            input,
            display_text: &line.display_text,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}
