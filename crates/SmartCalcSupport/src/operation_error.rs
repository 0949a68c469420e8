/// Semantic failure raised by the arithmetic and relation operation service.
///
/// These errors are recoverable: the interpreter turns them into an error [`Data`]
/// value that occupies the result slot of the line which requested the operation.
/// They never abort the evaluation of the document.
///
/// # Error Categories
///
/// - **Unit errors**: operands whose dimensions cannot be combined
/// - **Operator errors**: operators that make no sense for the operand kinds
/// - **Numeric errors**: division by zero and decimal overflow
/// - **Collaborator errors**: currency conversions the rate provider could not answer
///
/// [`Data`]: crate::Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The operand kinds are numerically incompatible.
    ///
    /// Example: adding a duration and a currency amount (`2 hours + 5 USD`).
    IncompatibleUnits { left: String, right: String },
    /// The operator is not supported for the operand kinds.
    ///
    /// Example: dividing two dates.
    UnsupportedOperation { operation: String, operand: String },
    /// Attempted division by zero.
    DivisionByZero,
    /// Decimal arithmetic left the representable range.
    Overflow,
    /// No exchange rate could be obtained between two currencies.
    CurrencyUnavailable { from: String, to: String },
}

impl OperationError {
    /// Key used to look the error up in a culture's message table.
    pub fn message_key(&self) -> &'static str {
        match self {
            OperationError::IncompatibleUnits { .. } => "incompatible_units",
            OperationError::UnsupportedOperation { .. } => "unsupported_operation",
            OperationError::DivisionByZero => "division_by_zero",
            OperationError::Overflow => "overflow",
            OperationError::CurrencyUnavailable { .. } => "currency_unavailable",
        }
    }

    pub fn incompatible(left: impl Into<String>, right: impl Into<String>) -> Self {
        OperationError::IncompatibleUnits {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, operand: impl Into<String>) -> Self {
        OperationError::UnsupportedOperation {
            operation: operation.into(),
            operand: operand.into(),
        }
    }
}

impl std::error::Error for OperationError {}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationError::IncompatibleUnits { left, right } => {
                write!(f, "Incompatible units: {} and {}", left, right)
            }
            OperationError::UnsupportedOperation { operation, operand } => {
                write!(f, "Unsupported operation: {} on {}", operation, operand)
            }
            OperationError::DivisionByZero => write!(f, "Division by zero"),
            OperationError::Overflow => write!(f, "Arithmetic overflow"),
            OperationError::CurrencyUnavailable { from, to } => {
                write!(f, "No exchange rate from {} to {}", from, to)
            }
        }
    }
}
