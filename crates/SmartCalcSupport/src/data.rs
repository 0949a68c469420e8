use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::numeric::NumericData;
use crate::operation_error::OperationError;
use crate::span::TextSpan;

/// Dimension name shared by every unit that measures time.
pub const TIME_DIMENSION: &str = "time";
/// Dimension reported by plain numbers and percentages.
pub const SCALAR_DIMENSION: &str = "scalar";
/// Dimension reported by currency amounts.
pub const CURRENCY_DIMENSION: &str = "currency";

/// A unit of measure resolved from a culture's unit table.
///
/// A value expressed in this unit converts to the dimension's standard unit with
/// `standard = value * factor + offset`. The offset is only non-zero for scales
/// whose zero point differs from the standard unit (temperatures).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    /// Canonical display symbol (e.g. `km`, `h`, `°C`)
    pub symbol: String,
    /// Dimension name (e.g. `length`, `time`)
    pub dimension: String,
    /// Multiplier to the dimension's standard unit
    pub factor: Decimal,
    /// Additive shift to the dimension's standard unit
    pub offset: Decimal,
}

impl Unit {
    pub fn new(symbol: impl Into<String>, dimension: impl Into<String>, factor: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            dimension: dimension.into(),
            factor,
            offset: Decimal::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Decimal) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_time(&self) -> bool {
        self.dimension == TIME_DIMENSION
    }
}

/// A numeric value expressed in a unit of measure.
///
/// Quantities whose unit measures time are durations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantity {
    pub value: Decimal,
    pub unit: Unit,
}

/// An amount of money in a given ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyAmount {
    pub amount: Decimal,
    pub iso: String,
}

/// A percentage, stored as written (`25%` holds `25`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Percentage(pub Decimal);

/// The typed payload carried by a [`Data`] item.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// A plain number.
    Number(Decimal),
    /// A percentage (`25%`).
    Percentage(Percentage),
    /// A quantity in a unit of measure; a duration when the unit measures time.
    Quantity(Quantity),
    /// An amount of money.
    Currency(CurrencyAmount),
    /// A calendar date.
    Date(NaiveDate),
    /// Outcome of a relational comparison.
    Boolean(bool),
    /// A recoverable operation failure occupying a result slot.
    Error(OperationError),
}

/// Coarse classification of a [`DataValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Number,
    Percentage,
    Quantity,
    Duration,
    Currency,
    Date,
    Boolean,
    Error,
}

impl DataValue {
    pub fn kind(&self) -> DataKind {
        match self {
            DataValue::Number(_) => DataKind::Number,
            DataValue::Percentage(_) => DataKind::Percentage,
            DataValue::Quantity(q) if q.unit.is_time() => DataKind::Duration,
            DataValue::Quantity(_) => DataKind::Quantity,
            DataValue::Currency(_) => DataKind::Currency,
            DataValue::Date(_) => DataKind::Date,
            DataValue::Boolean(_) => DataKind::Boolean,
            DataValue::Error(_) => DataKind::Error,
        }
    }

    /// Exposes the numeric capability of number-like values.
    ///
    /// Returns `None` for dates, booleans and errors.
    pub fn as_numeric(&self) -> Option<&dyn NumericData> {
        match self {
            DataValue::Number(value) => Some(value),
            DataValue::Percentage(percentage) => Some(percentage),
            DataValue::Quantity(quantity) => Some(quantity),
            DataValue::Currency(amount) => Some(amount),
            DataValue::Date(_) | DataValue::Boolean(_) | DataValue::Error(_) => None,
        }
    }

    /// Subtype tag attached to freshly produced data of this value.
    pub fn default_subtype(&self) -> String {
        match self {
            DataValue::Number(value) if value.fract().is_zero() => "integer".to_string(),
            DataValue::Number(_) => "decimal".to_string(),
            DataValue::Percentage(_) => "percentage".to_string(),
            DataValue::Quantity(q) if q.unit.is_time() => "duration".to_string(),
            DataValue::Quantity(q) => q.unit.dimension.clone(),
            DataValue::Currency(amount) => amount.iso.clone(),
            DataValue::Date(_) => "date".to_string(),
            DataValue::Boolean(_) => "boolean".to_string(),
            DataValue::Error(error) => error.message_key().to_string(),
        }
    }

    /// Short operand description used inside operation error messages.
    pub fn describe(&self) -> String {
        match self {
            DataValue::Number(_) => "number".to_string(),
            DataValue::Percentage(_) => "percentage".to_string(),
            DataValue::Quantity(q) => q.unit.symbol.clone(),
            DataValue::Currency(amount) => amount.iso.clone(),
            DataValue::Date(_) => "date".to_string(),
            DataValue::Boolean(_) => "boolean".to_string(),
            DataValue::Error(_) => "error".to_string(),
        }
    }
}

/// A typed, span-tagged value recognized in, or computed from, one line of text.
///
/// Equality and ordering are defined purely by span (`start`, then `length`), never by
/// value: two items recognized at the same position are the same item as far as
/// conflict resolution is concerned. `Data` is immutable; the `with_*` methods return
/// a replacement.
#[derive(Debug, Clone)]
pub struct Data {
    value: DataValue,
    subtype: Option<String>,
    conflict_priority: i32,
    span: TextSpan,
}

impl Data {
    /// Priority that wins against every other candidate.
    pub const HIGHEST_PRIORITY: i32 = i32::MIN;

    pub fn new(value: DataValue, span: TextSpan) -> Self {
        let subtype = Some(value.default_subtype());
        Self {
            value,
            subtype,
            conflict_priority: 0,
            span,
        }
    }

    pub fn error(error: OperationError, span: TextSpan) -> Self {
        Self::new(DataValue::Error(error), span)
    }

    pub fn with_subtype(mut self, subtype: Option<String>) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn with_priority(mut self, conflict_priority: i32) -> Self {
        self.conflict_priority = conflict_priority;
        self
    }

    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.span = span;
        self
    }

    pub fn value(&self) -> &DataValue {
        &self.value
    }

    pub fn into_value(self) -> DataValue {
        self.value
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn conflict_priority(&self) -> i32 {
        self.conflict_priority
    }

    pub fn span(&self) -> TextSpan {
        self.span
    }

    pub fn kind(&self) -> DataKind {
        self.value.kind()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.value, DataValue::Error(_))
    }

    pub fn as_error(&self) -> Option<&OperationError> {
        match &self.value {
            DataValue::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&dyn NumericData> {
        self.value.as_numeric()
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span
    }
}

impl Eq for Data {}

impl PartialOrd for Data {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Data {
    fn cmp(&self, other: &Self) -> Ordering {
        self.span
            .start
            .cmp(&other.span.start)
            .then(self.span.length.cmp(&other.span.length))
    }
}

impl Hash for Data {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.span.hash(state);
    }
}
