//! # Arithmetic & Relation Operation Service
//!
//! Executes binary operations, comparisons, unit conversions and built-in functions
//! between recognized [`Data`] values.
//!
//! ## Unit handling
//!
//! Numeric operands expose their value in the current unit and in the standard unit of
//! their dimension through [`NumericData`]. Mixed-unit operations normalize both sides to
//! standard units, compute, then re-express the result in the **left** operand's unit:
//!
//! ```text
//! 1 km + 500 m   => 1.5 km
//! 500 m + 1 km   => 1500 m
//! ```
//!
//! A bare number next to a unit-bearing value takes that value's unit (`5 km + 3` is
//! `8 km`), and percentages scale the other operand (`200 + 10%` is `220`).
//!
//! ## Failures
//!
//! Semantic failures are returned as [`OperationError`] and turned into error data by
//! [`ArithmeticService::perform_operation`]. An error operand propagates unchanged, so
//! one bad sub-expression never hides behind a later operator.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Months, NaiveDate, TimeDelta};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use smart_calc_support::{
    CurrencyAmount, Data, DataValue, NumericData, OperationError, Percentage, Quantity, Unit,
};
use tracing::trace;

use crate::currency::{CurrencyService, convert_blocking};
use crate::resources::{BuiltinFunction, CultureResources};
use crate::token::TokenType;

const SECONDS_PER_DAY: i64 = 86_400;

/// Binary operators understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperatorType {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
}

impl BinaryOperatorType {
    pub fn from_token(token_type: TokenType) -> Option<Self> {
        match token_type {
            TokenType::Plus => Some(BinaryOperatorType::Add),
            TokenType::Minus => Some(BinaryOperatorType::Subtract),
            TokenType::Multiply => Some(BinaryOperatorType::Multiply),
            TokenType::Divide => Some(BinaryOperatorType::Divide),
            TokenType::LessThan => Some(BinaryOperatorType::LessThan),
            TokenType::LessThanOrEqual => Some(BinaryOperatorType::LessThanOrEqual),
            TokenType::GreaterThan => Some(BinaryOperatorType::GreaterThan),
            TokenType::GreaterThanOrEqual => Some(BinaryOperatorType::GreaterThanOrEqual),
            TokenType::Equal => Some(BinaryOperatorType::Equal),
            TokenType::NotEqual => Some(BinaryOperatorType::NotEqual),
            _ => None,
        }
    }

    pub fn is_relational(self) -> bool {
        !matches!(
            self,
            BinaryOperatorType::Add
                | BinaryOperatorType::Subtract
                | BinaryOperatorType::Multiply
                | BinaryOperatorType::Divide
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperatorType::Add => "+",
            BinaryOperatorType::Subtract => "-",
            BinaryOperatorType::Multiply => "*",
            BinaryOperatorType::Divide => "/",
            BinaryOperatorType::LessThan => "<",
            BinaryOperatorType::LessThanOrEqual => "<=",
            BinaryOperatorType::GreaterThan => ">",
            BinaryOperatorType::GreaterThanOrEqual => ">=",
            BinaryOperatorType::Equal => "==",
            BinaryOperatorType::NotEqual => "!=",
        }
    }
}

/// Target of an `in` / `to` conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionTarget {
    Unit(Unit),
    Currency(String),
}

impl ConversionTarget {
    pub fn describe(&self) -> &str {
        match self {
            ConversionTarget::Unit(unit) => &unit.symbol,
            ConversionTarget::Currency(iso) => iso,
        }
    }
}

/// Performs operations on data values for one culture.
#[derive(Clone)]
pub struct ArithmeticService {
    resources: Arc<CultureResources>,
    currency: Option<Arc<dyn CurrencyService>>,
}

impl std::fmt::Debug for ArithmeticService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArithmeticService")
            .field("culture", &self.resources.culture)
            .field("currency", &self.currency.is_some())
            .finish()
    }
}

fn is_unit_bearing(value: &DataValue) -> bool {
    matches!(value, DataValue::Quantity(_) | DataValue::Currency(_))
}

fn numeric(value: &DataValue) -> Result<&dyn NumericData, OperationError> {
    value
        .as_numeric()
        .ok_or_else(|| OperationError::unsupported("arithmetic", value.describe()))
}

fn checked(
    op: BinaryOperatorType,
    left: Decimal,
    right: Decimal,
) -> Result<Decimal, OperationError> {
    let result = match op {
        BinaryOperatorType::Add => left.checked_add(right),
        BinaryOperatorType::Subtract => left.checked_sub(right),
        BinaryOperatorType::Multiply => left.checked_mul(right),
        BinaryOperatorType::Divide => {
            if right.is_zero() {
                return Err(OperationError::DivisionByZero);
            }
            left.checked_div(right)
        }
        _ => return Err(OperationError::unsupported(op.symbol(), "number")),
    };
    result.ok_or(OperationError::Overflow)
}

/// Square root by Newton-Raphson iteration.
pub fn sqrt_decimal(value: Decimal) -> Option<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    if value.is_zero() || value == Decimal::ONE {
        return Some(value);
    }

    let precision = dec!(0.000000000001);
    let mut x = if value > Decimal::ONE { value / dec!(2) } else { value };
    for _ in 0..200 {
        let next = dec!(0.5) * (x + value.checked_div(x)?);
        if (next - x).abs() < precision {
            return Some(next.round_dp(16).normalize());
        }
        x = next;
    }
    Some(x.round_dp(16).normalize())
}

impl ArithmeticService {
    pub fn new(
        resources: Arc<CultureResources>,
        currency: Option<Arc<dyn CurrencyService>>,
    ) -> Self {
        Self {
            resources,
            currency,
        }
    }

    pub fn resources(&self) -> &Arc<CultureResources> {
        &self.resources
    }

    /// Applies `op` to two operands. A missing operand yields no result; a failed
    /// operation yields error data covering both operands.
    pub fn perform_operation(
        &self,
        left: Option<&Data>,
        op: BinaryOperatorType,
        right: Option<&Data>,
    ) -> Option<Data> {
        let (left, right) = (left?, right?);
        let span = left.span().cover(&right.span());

        let value = if op.is_relational() {
            self.perform_relation_operation(left, op, right)
                .map(DataValue::Boolean)
        } else {
            self.perform_algebra_operation(left, op, right)
        };

        trace!(
            op = op.symbol(),
            left = %left.value().describe(),
            right = %right.value().describe(),
            ok = value.is_ok(),
            "Binary operation"
        );
        Some(match value {
            Ok(value) => Data::new(value, span),
            Err(error) => Data::error(error, span),
        })
    }

    /// `+ - * /` between two values.
    pub fn perform_algebra_operation(
        &self,
        left: &Data,
        op: BinaryOperatorType,
        right: &Data,
    ) -> Result<DataValue, OperationError> {
        match (left.value(), right.value()) {
            (DataValue::Error(error), _) | (_, DataValue::Error(error)) => Err(error.clone()),
            (DataValue::Boolean(_), _) | (_, DataValue::Boolean(_)) => {
                Err(OperationError::unsupported(op.symbol(), "boolean"))
            }
            (DataValue::Date(_), _) | (_, DataValue::Date(_)) => {
                self.date_operation(left.value(), op, right.value())
            }
            (DataValue::Currency(a), DataValue::Currency(b)) if a.iso != b.iso => {
                let converted = DataValue::Currency(self.convert_currency(b, &a.iso)?);
                self.numeric_operation(left.value(), op, &converted)
            }
            (l, r) => self.numeric_operation(l, op, r),
        }
    }

    fn numeric_operation(
        &self,
        left: &DataValue,
        op: BinaryOperatorType,
        right: &DataValue,
    ) -> Result<DataValue, OperationError> {
        let l = numeric(left)?;
        let r = numeric(right)?;
        match op {
            BinaryOperatorType::Add | BinaryOperatorType::Subtract => {
                self.additive(left, l, op, right, r)
            }
            BinaryOperatorType::Multiply => Self::multiply(left, l, right, r),
            BinaryOperatorType::Divide => Self::divide(left, l, right, r),
            _ => Err(OperationError::unsupported(op.symbol(), left.describe())),
        }
    }

    fn additive(
        &self,
        left: &DataValue,
        l: &dyn NumericData,
        op: BinaryOperatorType,
        right: &DataValue,
        r: &dyn NumericData,
    ) -> Result<DataValue, OperationError> {
        let is_percentage = |v: &DataValue| matches!(v, DataValue::Percentage(_));

        // X ± p%  =>  X * (1 ± p/100)
        if is_percentage(right) && !is_percentage(left) {
            let factor = checked(op, Decimal::ONE, r.value_in_standard_unit()?)?;
            let scaled = checked(BinaryOperatorType::Multiply, l.value_in_current_unit(), factor)?;
            return Ok(l.from_current_unit(scaled));
        }
        // p% ± X has no unit to keep
        if is_percentage(left) && is_unit_bearing(right) {
            return Err(OperationError::incompatible(left.describe(), right.describe()));
        }

        match (is_unit_bearing(left), is_unit_bearing(right)) {
            (true, true) => {
                if l.dimension() != r.dimension() {
                    return Err(OperationError::incompatible(
                        left.describe(),
                        right.describe(),
                    ));
                }
                if left.describe() == right.describe() {
                    let value =
                        checked(op, l.value_in_current_unit(), r.value_in_current_unit())?;
                    Ok(l.from_current_unit(value))
                } else {
                    let value =
                        checked(op, l.value_in_standard_unit()?, r.value_in_standard_unit()?)?;
                    l.from_standard_unit(value)
                }
            }
            (true, false) => {
                let value = checked(op, l.value_in_current_unit(), r.value_in_current_unit())?;
                Ok(l.from_current_unit(value))
            }
            (false, true) => {
                let value = checked(op, l.value_in_current_unit(), r.value_in_current_unit())?;
                Ok(r.from_current_unit(value))
            }
            (false, false) => {
                let value = checked(op, l.value_in_current_unit(), r.value_in_current_unit())?;
                Ok(l.from_current_unit(value))
            }
        }
    }

    fn multiply(
        left: &DataValue,
        l: &dyn NumericData,
        right: &DataValue,
        r: &dyn NumericData,
    ) -> Result<DataValue, OperationError> {
        let op = BinaryOperatorType::Multiply;
        match (is_unit_bearing(left), is_unit_bearing(right)) {
            (true, true) => Err(OperationError::unsupported(op.symbol(), right.describe())),
            (true, false) => {
                let value = checked(op, l.value_in_current_unit(), r.value_in_standard_unit()?)?;
                Ok(l.from_current_unit(value))
            }
            (false, true) => {
                let value = checked(op, l.value_in_standard_unit()?, r.value_in_current_unit())?;
                Ok(r.from_current_unit(value))
            }
            (false, false) => {
                let value = checked(op, l.value_in_standard_unit()?, r.value_in_standard_unit()?)?;
                match (left, right) {
                    (DataValue::Percentage(_), DataValue::Percentage(_)) => {
                        l.from_standard_unit(value)
                    }
                    _ => Ok(DataValue::Number(value.normalize())),
                }
            }
        }
    }

    fn divide(
        left: &DataValue,
        l: &dyn NumericData,
        right: &DataValue,
        r: &dyn NumericData,
    ) -> Result<DataValue, OperationError> {
        let op = BinaryOperatorType::Divide;
        // Every supported division runs on the divisor in standard units, so `0 °C`
        // (273.15 K) is not a zero divisor.
        match (is_unit_bearing(left), is_unit_bearing(right)) {
            (true, true) => {
                if l.dimension() != r.dimension() {
                    return Err(OperationError::unsupported(op.symbol(), right.describe()));
                }
                let ratio = checked(op, l.value_in_standard_unit()?, r.value_in_standard_unit()?)?;
                Ok(DataValue::Number(ratio.normalize()))
            }
            (true, false) => {
                let value = checked(op, l.value_in_current_unit(), r.value_in_standard_unit()?)?;
                Ok(l.from_current_unit(value))
            }
            (false, true) => Err(OperationError::unsupported(op.symbol(), right.describe())),
            (false, false) => {
                let value = checked(op, l.value_in_standard_unit()?, r.value_in_standard_unit()?)?;
                Ok(DataValue::Number(value.normalize()))
            }
        }
    }

    fn date_operation(
        &self,
        left: &DataValue,
        op: BinaryOperatorType,
        right: &DataValue,
    ) -> Result<DataValue, OperationError> {
        if matches!(op, BinaryOperatorType::Multiply | BinaryOperatorType::Divide) {
            return Err(OperationError::unsupported(op.symbol(), "date"));
        }
        let subtract = op == BinaryOperatorType::Subtract;
        match (left, right) {
            (DataValue::Date(a), DataValue::Date(b)) if subtract => {
                let days = a.signed_duration_since(*b).num_days();
                Ok(DataValue::Quantity(Quantity {
                    value: Decimal::from(days),
                    unit: self.resources.units.day_unit(),
                }))
            }
            (DataValue::Date(_), DataValue::Date(_)) => {
                Err(OperationError::unsupported(op.symbol(), "date"))
            }
            (DataValue::Date(date), DataValue::Quantity(q)) if q.unit.is_time() => {
                shift_date(*date, q, subtract).map(DataValue::Date)
            }
            (DataValue::Quantity(q), DataValue::Date(date)) if q.unit.is_time() && !subtract => {
                shift_date(*date, q, false).map(DataValue::Date)
            }
            (DataValue::Quantity(q), DataValue::Date(_)) if q.unit.is_time() => {
                Err(OperationError::unsupported(op.symbol(), "date"))
            }
            (DataValue::Date(_), other) => {
                Err(OperationError::incompatible("date", other.describe()))
            }
            (other, _) => Err(OperationError::incompatible(other.describe(), "date")),
        }
    }

    /// Comparison between two values, in standard units.
    pub fn perform_relation_operation(
        &self,
        left: &Data,
        op: BinaryOperatorType,
        right: &Data,
    ) -> Result<bool, OperationError> {
        let ordering = match (left.value(), right.value()) {
            (DataValue::Error(error), _) | (_, DataValue::Error(error)) => {
                return Err(error.clone());
            }
            (DataValue::Boolean(a), DataValue::Boolean(b)) => match op {
                BinaryOperatorType::Equal => return Ok(a == b),
                BinaryOperatorType::NotEqual => return Ok(a != b),
                _ => return Err(OperationError::unsupported(op.symbol(), "boolean")),
            },
            (DataValue::Boolean(_), other) | (other, DataValue::Boolean(_)) => {
                return Err(OperationError::incompatible("boolean", other.describe()));
            }
            (DataValue::Date(a), DataValue::Date(b)) => a.cmp(b),
            (DataValue::Date(_), other) | (other, DataValue::Date(_)) => {
                return Err(OperationError::incompatible("date", other.describe()));
            }
            (DataValue::Currency(a), DataValue::Currency(b)) if a.iso != b.iso => {
                let converted = self.convert_currency(b, &a.iso)?;
                a.amount.cmp(&converted.amount)
            }
            (l_value, r_value) => {
                let l = numeric(l_value)?;
                let r = numeric(r_value)?;
                match (is_unit_bearing(l_value), is_unit_bearing(r_value)) {
                    (true, true) if l.dimension() != r.dimension() => {
                        return Err(OperationError::incompatible(
                            l_value.describe(),
                            r_value.describe(),
                        ));
                    }
                    (true, true) | (false, false) => {
                        l.value_in_standard_unit()?.cmp(&r.value_in_standard_unit()?)
                    }
                    _ => l.value_in_current_unit().cmp(&r.value_in_current_unit()),
                }
            }
        };

        Ok(match op {
            BinaryOperatorType::LessThan => ordering == Ordering::Less,
            BinaryOperatorType::LessThanOrEqual => ordering != Ordering::Greater,
            BinaryOperatorType::GreaterThan => ordering == Ordering::Greater,
            BinaryOperatorType::GreaterThanOrEqual => ordering != Ordering::Less,
            BinaryOperatorType::Equal => ordering == Ordering::Equal,
            BinaryOperatorType::NotEqual => ordering != Ordering::Equal,
            _ => return Err(OperationError::unsupported(op.symbol(), left.value().describe())),
        })
    }

    /// Re-expresses a value in another unit or currency.
    pub fn convert(
        &self,
        value: &Data,
        target: &ConversionTarget,
    ) -> Result<DataValue, OperationError> {
        match (value.value(), target) {
            (DataValue::Error(error), _) => Err(error.clone()),
            (DataValue::Quantity(q), ConversionTarget::Unit(unit)) => {
                if q.unit.dimension != unit.dimension {
                    return Err(OperationError::incompatible(&q.unit.symbol, &unit.symbol));
                }
                let target = Quantity {
                    value: Decimal::ZERO,
                    unit: unit.clone(),
                };
                target.from_standard_unit(q.value_in_standard_unit()?)
            }
            (DataValue::Number(n), ConversionTarget::Unit(unit)) => Ok(DataValue::Quantity(Quantity {
                value: *n,
                unit: unit.clone(),
            })),
            (DataValue::Currency(amount), ConversionTarget::Currency(iso)) => self
                .convert_currency(amount, iso)
                .map(DataValue::Currency),
            (DataValue::Number(n), ConversionTarget::Currency(iso)) => {
                Ok(DataValue::Currency(CurrencyAmount {
                    amount: *n,
                    iso: iso.clone(),
                }))
            }
            (DataValue::Quantity(_) | DataValue::Currency(_), _) => Err(
                OperationError::incompatible(value.value().describe(), target.describe()),
            ),
            (other, _) => Err(OperationError::unsupported("in", other.describe())),
        }
    }

    fn convert_currency(
        &self,
        amount: &CurrencyAmount,
        to_iso: &str,
    ) -> Result<CurrencyAmount, OperationError> {
        if amount.iso == to_iso {
            return Ok(amount.clone());
        }
        let unavailable = || OperationError::CurrencyUnavailable {
            from: amount.iso.clone(),
            to: to_iso.to_string(),
        };
        let service = self.currency.as_deref().ok_or_else(unavailable)?;
        let value = amount.amount.to_f64().ok_or(OperationError::Overflow)?;
        let converted = convert_blocking(service, &amount.iso, value, to_iso).ok_or_else(unavailable)?;
        let converted = Decimal::try_from(converted).map_err(|_| OperationError::Overflow)?;
        Ok(CurrencyAmount {
            amount: converted.round_dp(10).normalize(),
            iso: to_iso.to_string(),
        })
    }

    /// Unary minus.
    pub fn negate(&self, operand: &Data) -> Result<DataValue, OperationError> {
        if let Some(error) = operand.as_error() {
            return Err(error.clone());
        }
        let value = operand.value();
        let n = value
            .as_numeric()
            .ok_or_else(|| OperationError::unsupported("-", value.describe()))?;
        Ok(n.from_current_unit(-n.value_in_current_unit()))
    }

    /// Applies a built-in function to the value in its current unit, keeping the unit.
    pub fn apply_function(
        &self,
        function: BuiltinFunction,
        argument: &Data,
    ) -> Result<DataValue, OperationError> {
        if let Some(error) = argument.as_error() {
            return Err(error.clone());
        }
        let value = argument.value();
        let n = value
            .as_numeric()
            .ok_or_else(|| OperationError::unsupported(function.name(), value.describe()))?;
        let current = n.value_in_current_unit();
        let result = match function {
            BuiltinFunction::Sqrt => sqrt_decimal(current)
                .ok_or_else(|| OperationError::unsupported(function.name(), "negative number"))?,
            BuiltinFunction::Abs => current.abs(),
            BuiltinFunction::Round => {
                current.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            BuiltinFunction::Floor => current.floor(),
            BuiltinFunction::Ceiling => current.ceil(),
        };
        Ok(n.from_current_unit(result))
    }
}

fn shift_date(date: NaiveDate, quantity: &Quantity, subtract: bool) -> Result<NaiveDate, OperationError> {
    let calendar_months = match quantity.unit.symbol.as_str() {
        "month" => Some(quantity.value),
        "year" => quantity.value.checked_mul(Decimal::from(12)),
        _ => None,
    };

    let shifted = match calendar_months.filter(|months| months.fract().is_zero()) {
        Some(months) => {
            let negative = months.is_sign_negative() != subtract;
            let count = months.abs().to_u32().ok_or(OperationError::Overflow)?;
            if negative {
                date.checked_sub_months(Months::new(count))
            } else {
                date.checked_add_months(Months::new(count))
            }
        }
        None => {
            let seconds = quantity.value_in_standard_unit()?;
            let days = (seconds / Decimal::from(SECONDS_PER_DAY))
                .trunc()
                .to_i64()
                .ok_or(OperationError::Overflow)?;
            let days = if subtract { -days } else { days };
            TimeDelta::try_days(days).and_then(|delta| date.checked_add_signed(delta))
        }
    };
    shifted.ok_or(OperationError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceSource;
    use crate::currency::StaticCurrencyService;
    use crate::resources::{Culture, load_culture};
    use smart_calc_support::TextSpan;
    use std::str::FromStr;

    fn service() -> ArithmeticService {
        let resources = load_culture(&ResourceSource::Embedded, &Culture::new("en-us")).unwrap();
        ArithmeticService::new(resources, None)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn number(n: &str) -> Data {
        Data::new(DataValue::Number(dec(n)), TextSpan::new(0, 1))
    }

    fn quantity(n: &str, symbol: &str) -> Data {
        let arithmetic = service();
        let unit = arithmetic.resources().units.lookup_unit(symbol).unwrap().clone();
        Data::new(
            DataValue::Quantity(Quantity {
                value: dec(n),
                unit,
            }),
            TextSpan::new(4, 2),
        )
    }

    fn currency(n: &str, iso: &str) -> Data {
        Data::new(
            DataValue::Currency(CurrencyAmount {
                amount: dec(n),
                iso: iso.to_string(),
            }),
            TextSpan::new(2, 3),
        )
    }

    fn percent(n: &str) -> Data {
        Data::new(DataValue::Percentage(Percentage(dec(n))), TextSpan::new(8, 2))
    }

    fn date(y: i32, m: u32, d: u32) -> Data {
        Data::new(
            DataValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            TextSpan::new(0, 10),
        )
    }

    fn as_quantity(value: DataValue) -> (Decimal, String) {
        match value {
            DataValue::Quantity(q) => (q.value, q.unit.symbol),
            other => panic!("not a quantity: {:?}", other),
        }
    }

    fn algebra(left: &Data, op: BinaryOperatorType, right: &Data) -> Result<DataValue, OperationError> {
        service().perform_algebra_operation(left, op, right)
    }

    #[test]
    fn test_left_operand_unit_bias() {
        let km = quantity("1", "km");
        let m = quantity("500", "m");
        let sum = algebra(&km, BinaryOperatorType::Add, &m).unwrap();
        assert_eq!(as_quantity(sum), (dec("1.5"), "km".to_string()));
        let sum = algebra(&m, BinaryOperatorType::Add, &km).unwrap();
        assert_eq!(as_quantity(sum), (dec("1500"), "m".to_string()));
    }

    #[test]
    fn test_same_dimension_division_is_ratio() {
        let result = algebra(
            &quantity("1000", "m2"),
            BinaryOperatorType::Divide,
            &quantity("10", "m2"),
        );
        assert_eq!(result, Ok(DataValue::Number(dec("100"))));
    }

    #[test]
    fn test_incompatible_units() {
        let result = algebra(
            &quantity("2", "h"),
            BinaryOperatorType::Add,
            &currency("5", "USD"),
        );
        assert!(matches!(result, Err(OperationError::IncompatibleUnits { .. })));
    }

    #[test]
    fn test_error_data_covers_both_operands() {
        let arithmetic = service();
        let left = quantity("2", "h");
        let right = quantity("3", "kg");
        let data = arithmetic
            .perform_operation(Some(&left), BinaryOperatorType::Add, Some(&right))
            .unwrap();
        assert!(data.is_error());
        assert_eq!(data.span(), TextSpan::new(4, 2));
        assert!(
            arithmetic
                .perform_operation(None, BinaryOperatorType::Add, Some(&right))
                .is_none()
        );
    }

    #[test]
    fn test_error_operand_propagates() {
        let arithmetic = service();
        let error = Data::error(OperationError::DivisionByZero, TextSpan::new(0, 3));
        let result = arithmetic
            .perform_operation(Some(&error), BinaryOperatorType::Add, Some(&number("1")))
            .unwrap();
        assert_eq!(result.as_error(), Some(&OperationError::DivisionByZero));
    }

    #[test]
    fn test_percentages() {
        assert_eq!(
            algebra(&number("200"), BinaryOperatorType::Add, &percent("10")),
            Ok(DataValue::Number(dec("220")))
        );
        assert_eq!(
            algebra(&number("200"), BinaryOperatorType::Multiply, &percent("10")),
            Ok(DataValue::Number(dec("20")))
        );
        assert_eq!(
            algebra(&percent("50"), BinaryOperatorType::Multiply, &percent("50")),
            Ok(DataValue::Percentage(Percentage(dec("25"))))
        );
        let discounted = algebra(&quantity("80", "kg"), BinaryOperatorType::Subtract, &percent("25"));
        assert_eq!(as_quantity(discounted.unwrap()), (dec("60"), "kg".to_string()));
    }

    #[test]
    fn test_scalar_takes_unit() {
        let sum = algebra(&quantity("5", "km"), BinaryOperatorType::Add, &number("3")).unwrap();
        assert_eq!(as_quantity(sum), (dec("8"), "km".to_string()));
        let product = algebra(&number("3"), BinaryOperatorType::Multiply, &quantity("2", "kg")).unwrap();
        assert_eq!(as_quantity(product), (dec("6"), "kg".to_string()));
    }

    #[test]
    fn test_unsupported_operations() {
        assert!(matches!(
            algebra(&quantity("2", "m"), BinaryOperatorType::Multiply, &quantity("3", "m")),
            Err(OperationError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            algebra(&number("2"), BinaryOperatorType::Divide, &quantity("3", "m")),
            Err(OperationError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            algebra(&date(2024, 1, 1), BinaryOperatorType::Divide, &date(2024, 1, 2)),
            Err(OperationError::UnsupportedOperation { .. })
        ));
        assert_eq!(
            algebra(&number("2"), BinaryOperatorType::Divide, &number("0")),
            Err(OperationError::DivisionByZero)
        );
    }

    #[test]
    fn test_temperature_same_unit_and_mixed() {
        let sum = algebra(&quantity("20", "°C"), BinaryOperatorType::Add, &quantity("5", "°C")).unwrap();
        assert_eq!(as_quantity(sum), (dec("25"), "°C".to_string()));
        let sum = algebra(&quantity("20", "°C"), BinaryOperatorType::Add, &quantity("10", "K")).unwrap();
        assert_eq!(as_quantity(sum), (dec("30"), "°C".to_string()));
    }

    #[test]
    fn test_date_arithmetic() {
        let days = algebra(&date(2024, 3, 1), BinaryOperatorType::Subtract, &date(2024, 2, 1)).unwrap();
        assert_eq!(as_quantity(days), (dec("29"), "day".to_string()));

        let shifted = algebra(&date(2024, 1, 31), BinaryOperatorType::Add, &quantity("1", "month"));
        assert_eq!(
            shifted,
            Ok(DataValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        let shifted = algebra(&date(2024, 1, 10), BinaryOperatorType::Subtract, &quantity("36", "h"));
        assert_eq!(
            shifted,
            Ok(DataValue::Date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()))
        );
        assert!(matches!(
            algebra(&date(2024, 1, 10), BinaryOperatorType::Add, &quantity("3", "kg")),
            Err(OperationError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_relations() {
        let arithmetic = service();
        let km = quantity("1", "km");
        let m = quantity("900", "m");
        assert_eq!(
            arithmetic.perform_relation_operation(&km, BinaryOperatorType::GreaterThan, &m),
            Ok(true)
        );
        assert_eq!(
            arithmetic.perform_relation_operation(&number("3"), BinaryOperatorType::Equal, &number("3.0")),
            Ok(true)
        );
        assert!(matches!(
            arithmetic.perform_relation_operation(&km, BinaryOperatorType::LessThan, &quantity("1", "kg")),
            Err(OperationError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_currency_without_service() {
        let result = algebra(&currency("1", "USD"), BinaryOperatorType::Add, &currency("1", "EUR"));
        assert!(matches!(result, Err(OperationError::CurrencyUnavailable { .. })));
        let same = algebra(&currency("1", "USD"), BinaryOperatorType::Add, &currency("2", "USD"));
        assert_eq!(
            same,
            Ok(DataValue::Currency(CurrencyAmount {
                amount: dec("3"),
                iso: "USD".to_string()
            }))
        );
    }

    #[test]
    fn test_currency_with_service() {
        let resources = load_culture(&ResourceSource::Embedded, &Culture::new("en-us")).unwrap();
        let rates = StaticCurrencyService::new("USD").with_rate("EUR", 0.5);
        let arithmetic = ArithmeticService::new(resources, Some(Arc::new(rates)));
        let sum = arithmetic
            .perform_algebra_operation(&currency("10", "USD"), BinaryOperatorType::Add, &currency("5", "EUR"))
            .unwrap();
        assert_eq!(
            sum,
            DataValue::Currency(CurrencyAmount {
                amount: dec("20"),
                iso: "USD".to_string()
            })
        );
        let converted = arithmetic
            .convert(&currency("10", "USD"), &ConversionTarget::Currency("EUR".to_string()))
            .unwrap();
        assert_eq!(
            converted,
            DataValue::Currency(CurrencyAmount {
                amount: dec("5"),
                iso: "EUR".to_string()
            })
        );
    }

    #[test]
    fn test_unit_conversion() {
        let arithmetic = service();
        let feet = arithmetic.resources().units.lookup_unit("ft").unwrap().clone();
        let converted = arithmetic
            .convert(&quantity("3.048", "m"), &ConversionTarget::Unit(feet))
            .unwrap();
        assert_eq!(as_quantity(converted), (dec("10"), "ft".to_string()));

        let kg = arithmetic.resources().units.lookup_unit("kg").unwrap().clone();
        assert!(matches!(
            arithmetic.convert(&quantity("1", "m"), &ConversionTarget::Unit(kg)),
            Err(OperationError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_functions() {
        let arithmetic = service();
        assert_eq!(
            arithmetic.apply_function(BuiltinFunction::Sqrt, &number("16")),
            Ok(DataValue::Number(dec("4")))
        );
        let rounded = arithmetic
            .apply_function(BuiltinFunction::Round, &quantity("2.6", "km"))
            .unwrap();
        assert_eq!(as_quantity(rounded), (dec("3"), "km".to_string()));
        assert!(matches!(
            arithmetic.apply_function(BuiltinFunction::Sqrt, &number("-4")),
            Err(OperationError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            arithmetic.apply_function(BuiltinFunction::Abs, &date(2024, 1, 1)),
            Err(OperationError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_negate_keeps_unit() {
        let arithmetic = service();
        let negated = arithmetic.negate(&quantity("3", "km")).unwrap();
        assert_eq!(as_quantity(negated), (dec("-3"), "km".to_string()));
        assert!(arithmetic.negate(&date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_sqrt_decimal() {
        assert_eq!(sqrt_decimal(dec("2.25")), Some(dec("1.5")));
        assert_eq!(sqrt_decimal(Decimal::ZERO), Some(Decimal::ZERO));
        let root_two = sqrt_decimal(dec("2")).unwrap();
        assert!((root_two - dec("1.41421356237")).abs() < dec("0.00000000001"));
    }
}
