//! # Smart Calculator Interpreter
//!
//! This crate evaluates plain-text "smart calculator" documents: one statement per
//! line, mixing numbers, units of measure, durations, dates, percentages and currency
//! amounts, with variables that later lines can reuse.
//!
//! ## Overview
//!
//! A document such as
//!
//! ```text
//! # Road trip
//! distance = 420 km
//! fuel = distance / 100 km * 6.5
//! distance in mi
//! fuel > 25            // true
//! ```
//!
//! produces one result per line, rendered with the conventions of the selected culture.
//!
//! ## Key Features
//!
//! ### Pipeline
//! - **Resources**: Per-culture grammar, unit and function tables loaded from JSON and cached
//! - **Lexer**: Grammar-driven tokenizer that never fails and keeps exact offsets
//! - **Data Parsers**: Independent recognizers for numbers, percentages, dates, durations,
//!   quantities and currency amounts, with priority-based conflict resolution
//! - **Expression Interpreter**: Fused recursive descent parse and evaluation
//! - **Arithmetic Service**: Unit-aware operations that keep the left operand's unit
//! - **Statements**: Comment, header, variable declaration, condition and expression
//!   lines, tried in an order derived from declared before/after constraints
//!
//! ### Sessions
//! - **Live documents**: [`ParserAndInterpreter`] re-evaluates on every text change,
//!   cancels stale passes and only publishes the newest snapshot
//! - **Currency**: Conversions go through an injected async [`CurrencyService`]
//!
//! ## Usage Examples
//!
//! ### One-shot evaluation
//!
//! ```rust,no_run
//! use smart_calc::evaluate_document;
//!
//! let lines = evaluate_document("x = 5\nx + 3", "en-us")?;
//! assert_eq!(lines[1].display_text, "8");
//! # Ok::<(), smart_calc::CalcError>(())
//! ```
//!
//! ### Live session
//!
//! ```rust,no_run
//! use smart_calc::{InterpreterConfig, ParserAndInterpreter, Culture};
//!
//! # async fn demo() -> smart_calc::CalcResult<()> {
//! let session = ParserAndInterpreter::new(InterpreterConfig::new(Culture::new("fr-FR")))?;
//! session.set_text("prix = 12,5\nprix × 4");
//! let lines = session.wait_for_result().await;
//! assert_eq!(lines[1].display_text, "50");
//! # Ok(())
//! # }
//! ```

pub mod arithmetic;
pub mod cli;
pub mod config;
pub mod currency;
pub mod data_parsers;
pub mod error;
pub mod expression;
pub mod format;
pub mod interpreter;
pub mod lexer;
pub mod resources;
pub mod session;
pub mod statements;
pub mod token;
pub mod variables;

use tokio_util::sync::CancellationToken;

pub use arithmetic::{ArithmeticService, BinaryOperatorType, ConversionTarget};
pub use config::{InterpreterConfig, ResourceSource};
pub use currency::{CurrencyService, StaticCurrencyService};
pub use error::{CalcError, CalcResult};
pub use interpreter::{DocumentEvaluation, Interpreter};
pub use resources::Culture;
pub use session::ParserAndInterpreter;
pub use smart_calc_support::{Data, DataKind, DataValue, OperationError, ResultLine, TextSpan};
pub use statements::Statement;
pub use variables::VariableService;

/// Evaluates `text` once with the embedded tables of `culture`.
pub fn evaluate_document(text: &str, culture: &str) -> CalcResult<Vec<ResultLine>> {
    let interpreter = Interpreter::new(&InterpreterConfig::new(Culture::new(culture)))?;
    Ok(interpreter
        .evaluate_document(text, &CancellationToken::new())?
        .lines)
}
