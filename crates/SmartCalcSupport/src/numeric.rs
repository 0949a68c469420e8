use rust_decimal::Decimal;

use crate::data::{
    CURRENCY_DIMENSION, CurrencyAmount, DataValue, Percentage, Quantity, SCALAR_DIMENSION,
};
use crate::operation_error::OperationError;

/// Capability shared by every number-like [`DataValue`].
///
/// Cross-unit arithmetic relies on it: both operands are normalized to their
/// dimension's standard unit, the operation runs on the normalized values, and the
/// result is rebuilt in the unit of the dominant operand through
/// [`from_standard_unit`](NumericData::from_standard_unit). Moving between units can
/// leave the decimal range, so both directions report [`OperationError::Overflow`].
pub trait NumericData {
    /// Value as written, in the operand's own unit.
    fn value_in_current_unit(&self) -> Decimal;

    /// Value normalized to the dimension's standard unit.
    fn value_in_standard_unit(&self) -> Result<Decimal, OperationError>;

    /// Name of the dimension the value belongs to.
    fn dimension(&self) -> &str;

    /// Rebuilds a value of the same kind and unit from a standard-unit value.
    fn from_standard_unit(&self, value: Decimal) -> Result<DataValue, OperationError>;

    /// Rebuilds a value of the same kind and unit from a current-unit value.
    fn from_current_unit(&self, value: Decimal) -> DataValue;

    fn is_negative(&self) -> bool {
        self.value_in_current_unit() < Decimal::ZERO
    }

    /// True for plain numbers and percentages.
    fn is_scalar(&self) -> bool {
        self.dimension() == SCALAR_DIMENSION
    }
}

impl NumericData for Decimal {
    fn value_in_current_unit(&self) -> Decimal {
        *self
    }

    fn value_in_standard_unit(&self) -> Result<Decimal, OperationError> {
        Ok(*self)
    }

    fn dimension(&self) -> &str {
        SCALAR_DIMENSION
    }

    fn from_standard_unit(&self, value: Decimal) -> Result<DataValue, OperationError> {
        Ok(DataValue::Number(value.normalize()))
    }

    fn from_current_unit(&self, value: Decimal) -> DataValue {
        DataValue::Number(value.normalize())
    }
}

impl NumericData for Percentage {
    fn value_in_current_unit(&self) -> Decimal {
        self.0
    }

    fn value_in_standard_unit(&self) -> Result<Decimal, OperationError> {
        self.0
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or(OperationError::Overflow)
    }

    fn dimension(&self) -> &str {
        SCALAR_DIMENSION
    }

    fn from_standard_unit(&self, value: Decimal) -> Result<DataValue, OperationError> {
        let percent = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(OperationError::Overflow)?;
        Ok(DataValue::Percentage(Percentage(percent.normalize())))
    }

    fn from_current_unit(&self, value: Decimal) -> DataValue {
        DataValue::Percentage(Percentage(value.normalize()))
    }
}

impl NumericData for Quantity {
    fn value_in_current_unit(&self) -> Decimal {
        self.value
    }

    fn value_in_standard_unit(&self) -> Result<Decimal, OperationError> {
        self.value
            .checked_mul(self.unit.factor)
            .and_then(|scaled| scaled.checked_add(self.unit.offset))
            .ok_or(OperationError::Overflow)
    }

    fn dimension(&self) -> &str {
        &self.unit.dimension
    }

    fn from_standard_unit(&self, value: Decimal) -> Result<DataValue, OperationError> {
        let current = value
            .checked_sub(self.unit.offset)
            .and_then(|shifted| shifted.checked_div(self.unit.factor))
            .ok_or(OperationError::Overflow)?;
        Ok(self.from_current_unit(current))
    }

    fn from_current_unit(&self, value: Decimal) -> DataValue {
        DataValue::Quantity(Quantity {
            value: value.normalize(),
            unit: self.unit.clone(),
        })
    }
}

impl NumericData for CurrencyAmount {
    fn value_in_current_unit(&self) -> Decimal {
        self.amount
    }

    // Currencies have no common standard unit; cross-currency operands are
    // converted through the currency service before they reach this point.
    fn value_in_standard_unit(&self) -> Result<Decimal, OperationError> {
        Ok(self.amount)
    }

    fn dimension(&self) -> &str {
        CURRENCY_DIMENSION
    }

    fn from_standard_unit(&self, value: Decimal) -> Result<DataValue, OperationError> {
        Ok(self.from_current_unit(value))
    }

    fn from_current_unit(&self, value: Decimal) -> DataValue {
        DataValue::Currency(CurrencyAmount {
            amount: value.normalize(),
            iso: self.iso.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Unit;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_quantity_standard_round_trip() {
        let km = Quantity {
            value: dec("1.5"),
            unit: Unit::new("km", "length", dec("1000")),
        };
        assert_eq!(km.value_in_standard_unit(), Ok(dec("1500")));
        assert_eq!(
            km.from_standard_unit(dec("2500")),
            Ok(DataValue::Quantity(Quantity {
                value: dec("2.5"),
                unit: km.unit.clone(),
            }))
        );
    }

    #[test]
    fn test_temperature_offset() {
        let celsius = Quantity {
            value: dec("25"),
            unit: Unit::new("°C", "temperature", Decimal::ONE).with_offset(dec("273.15")),
        };
        assert_eq!(celsius.value_in_standard_unit(), Ok(dec("298.15")));
        match celsius.from_standard_unit(dec("273.15")) {
            Ok(DataValue::Quantity(q)) => assert!(q.value.is_zero()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_percentage_normalizes_to_fraction() {
        let pct = Percentage(dec("25"));
        assert_eq!(pct.value_in_standard_unit(), Ok(dec("0.25")));
        assert!(pct.is_scalar());
        assert!(!pct.is_negative());
        assert!(Percentage(dec("-3")).is_negative());
    }

    #[test]
    fn test_out_of_range_conversions_overflow() {
        let km = Quantity {
            value: Decimal::MAX,
            unit: Unit::new("km", "length", dec("1000")),
        };
        assert_eq!(km.value_in_standard_unit(), Err(OperationError::Overflow));

        let mm = Quantity {
            value: Decimal::ZERO,
            unit: Unit::new("mm", "length", dec("0.001")),
        };
        assert_eq!(mm.from_standard_unit(Decimal::MAX), Err(OperationError::Overflow));
        assert_eq!(
            Percentage(Decimal::ONE).from_standard_unit(Decimal::MAX),
            Err(OperationError::Overflow)
        );
    }
}
