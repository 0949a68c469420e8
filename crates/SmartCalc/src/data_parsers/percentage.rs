use smart_calc_support::{Data, DataValue, Percentage};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::format::parse_number;
use crate::resources::CultureResources;
use crate::token::TokenChain;

pub const PERCENTAGE_PRIORITY: i32 = 50;

/// `25%`, `12.5 %`
#[derive(Debug, Default)]
pub struct PercentageParser {
    patterns: PatternCache,
}

impl PercentageParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataParser for PercentageParser {
    fn name(&self) -> &'static str {
        "percentage"
    }

    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let regex = self.patterns.get_or_build(resources, |r| {
            Some(format!(r"(?P<number>{})\s*%", r.grammar.number_pattern()))
        })?;

        let found: Vec<Data> = scan_aligned(&regex, line, cancellation)?
            .into_iter()
            .filter_map(|(span, captures)| {
                let value = parse_number(&resources.grammar, captures.name("number")?.as_str())?;
                Some(
                    Data::new(DataValue::Percentage(Percentage(value)), span)
                        .with_priority(PERCENTAGE_PRIORITY),
                )
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}
