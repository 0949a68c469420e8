//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use smart_calc::{Culture, Interpreter, InterpreterConfig, ResultLine};
use tokio_util::sync::CancellationToken;

pub fn interpreter(culture: &str) -> Interpreter {
    Interpreter::new(&InterpreterConfig::new(Culture::new(culture)))
        .expect("embedded resources load")
}

pub fn evaluate(culture: &str, text: &str) -> Vec<ResultLine> {
    interpreter(culture)
        .evaluate_document(text, &CancellationToken::new())
        .expect("pass is not cancelled")
        .lines
}

/// Display text of every line.
pub fn display(culture: &str, text: &str) -> Vec<String> {
    evaluate(culture, text)
        .into_iter()
        .map(|line| line.display_text)
        .collect()
}

/// Display text of the last line.
pub fn last(culture: &str, text: &str) -> String {
    display(culture, text).pop().unwrap_or_default()
}

/// The resource tables shipped with the crate.
pub fn shipped_resources() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources")
}
