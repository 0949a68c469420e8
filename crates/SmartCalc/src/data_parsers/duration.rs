use regex::Regex;
use rust_decimal::Decimal;
use smart_calc_support::{Data, DataValue, Quantity, Unit};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::format::parse_number;
use crate::resources::{CultureResources, spelling_alternation};
use crate::token::TokenChain;

pub const DURATION_PRIORITY: i32 = 30;

/// Time spans, including compound ones: `90 min`, `1 h 30 min`, `2 days 4 hours`.
///
/// A compound duration is expressed in the unit of its first component.
#[derive(Debug, Default)]
pub struct DurationParser {
    patterns: PatternCache,
    components: PatternCache,
}

impl DurationParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// One `<number> <time unit>` component. Only the standalone component regex
    /// needs named groups.
    fn component(resources: &CultureResources, named: bool) -> Option<String> {
        let spellings = resources.units.unit_spellings(Unit::is_time);
        if spellings.is_empty() {
            return None;
        }
        let (number, unit) = if named {
            ("?P<number>", "?P<unit>")
        } else {
            ("?:", "?:")
        };
        Some(format!(
            r"({}{})\s*({}{})",
            number,
            resources.grammar.number_pattern(),
            unit,
            spelling_alternation(&spellings)
        ))
    }

    fn combine(
        resources: &CultureResources,
        component: &Regex,
        text: &str,
    ) -> Option<Quantity> {
        let mut first_unit: Option<&Unit> = None;
        let mut seconds = Decimal::ZERO;
        let mut rest = text.trim_start();

        while !rest.is_empty() {
            let captures = component.captures(rest)?;
            let value = parse_number(&resources.grammar, captures.name("number")?.as_str())?;
            let unit = resources.units.lookup_unit(captures.name("unit")?.as_str())?;
            seconds = seconds.checked_add(value.checked_mul(unit.factor)?)?;
            first_unit.get_or_insert(unit);
            rest = rest[captures.get(0)?.end()..].trim_start();
        }

        let unit = first_unit?.clone();
        let value = seconds.checked_div(unit.factor)?.normalize();
        Some(Quantity { value, unit })
    }
}

impl DataParser for DurationParser {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let regex = self.patterns.get_or_build(resources, |r| {
            let component = Self::component(r, false)?;
            Some(format!(r"{c}(?:\s*{c})*", c = component))
        })?;
        let component = self
            .components
            .get_or_build(resources, |r| Self::component(r, true))?;

        let found: Vec<Data> = scan_aligned(&regex, line, cancellation)?
            .into_iter()
            .filter_map(|(span, captures)| {
                let quantity = Self::combine(resources, component.prefix(), captures.get(0)?.as_str())?;
                Some(Data::new(DataValue::Quantity(quantity), span).with_priority(DURATION_PRIORITY))
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_parsers::test_support::run;
    use smart_calc_support::{DataKind, TextSpan};
    use std::str::FromStr;

    fn duration(data: &Data) -> (Decimal, String) {
        match data.value() {
            DataValue::Quantity(q) => (q.value, q.unit.symbol.clone()),
            other => panic!("not a duration: {:?}", other),
        }
    }

    #[test]
    fn test_simple_duration() {
        let found = run(&DurationParser::new(), "en-us", "90 min");
        assert_eq!(found[0].kind(), DataKind::Duration);
        assert_eq!(duration(&found[0]), (Decimal::from(90), "min".to_string()));
    }

    #[test]
    fn test_compound_duration_uses_first_unit() {
        let found = run(&DurationParser::new(), "en-us", "1 h 30 min + 2");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span(), TextSpan::new(0, 10));
        assert_eq!(
            duration(&found[0]),
            (Decimal::from_str("1.5").unwrap(), "h".to_string())
        );
    }

    #[test]
    fn test_lengths_are_not_durations() {
        assert!(run(&DurationParser::new(), "en-us", "5 m").is_empty());
    }

    #[test]
    fn test_french_days() {
        let found = run(&DurationParser::new(), "fr-fr", "3 jours");
        assert_eq!(duration(&found[0]), (Decimal::from(3), "day".to_string()));
    }
}
