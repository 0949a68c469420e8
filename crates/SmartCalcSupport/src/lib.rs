//! # Smart Calculator Support Types
//!
//! This crate provides the foundational types shared by every stage of the smart
//! calculator pipeline: the lexer, the data recognizers, the expression interpreter,
//! the arithmetic service and the session that publishes per-line results.
//!
//! ## Overview
//!
//! The support crate acts as the common vocabulary that allows:
//! - data recognizers to emit typed, span-tagged values ([`Data`])
//! - the arithmetic service to normalize operands through the [`NumericData`] capability
//! - semantic failures to travel as values ([`OperationError`]) instead of unwinding
//! - the session to expose results ([`ParserAndInterpreterResultLine`]) to its caller
//!
//! ## Usage Example
//!
//! ```rust
//! use smart_calc_support::{Data, DataValue, TextSpan};
//! use rust_decimal::Decimal;
//!
//! let five = Data::new(DataValue::Number(Decimal::from(5)), TextSpan::new(0, 1));
//! let other = Data::new(DataValue::Number(Decimal::from(7)), TextSpan::new(0, 1));
//!
//! // Data items are compared by span only
//! assert_eq!(five, other);
//! ```

pub mod data;
pub mod numeric;
pub mod operation_error;
pub mod result_line;
pub mod span;

pub use data::{
    CURRENCY_DIMENSION, CurrencyAmount, Data, DataKind, DataValue, Percentage, Quantity,
    SCALAR_DIMENSION, TIME_DIMENSION, Unit,
};
pub use numeric::NumericData;
pub use operation_error::OperationError;
pub use result_line::{ParserAndInterpreterResultLine, ResultLine};
pub use span::TextSpan;
