use smart_calc_support::{Data, DataValue, Quantity};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::format::parse_number;
use crate::resources::{CultureResources, spelling_alternation};
use crate::token::TokenChain;

pub const UNIT_PRIORITY: i32 = 40;

/// A number followed by a unit of measure: `12 km`, `3.5kg`, `20 °C`, `2 square meters`.
#[derive(Debug, Default)]
pub struct UnitParser {
    patterns: PatternCache,
}

impl UnitParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataParser for UnitParser {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let regex = self.patterns.get_or_build(resources, |r| {
            let spellings = r.units.unit_spellings(|_| true);
            if spellings.is_empty() {
                return None;
            }
            Some(format!(
                r"(?P<number>{})\s*(?P<unit>{})",
                r.grammar.number_pattern(),
                spelling_alternation(&spellings)
            ))
        })?;

        let found: Vec<Data> = scan_aligned(&regex, line, cancellation)?
            .into_iter()
            .filter_map(|(span, captures)| {
                let value = parse_number(&resources.grammar, captures.name("number")?.as_str())?;
                let unit = resources.units.lookup_unit(captures.name("unit")?.as_str())?;
                Some(
                    Data::new(
                        DataValue::Quantity(Quantity {
                            value,
                            unit: unit.clone(),
                        }),
                        span,
                    )
                    .with_priority(UNIT_PRIORITY),
                )
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}
