use smart_calc_support::{Data, DataValue};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::format::parse_number;
use crate::resources::CultureResources;
use crate::token::TokenChain;

/// Plain numbers. Everything more specific outranks them.
pub const NUMBER_PRIORITY: i32 = 100;

#[derive(Debug, Default)]
pub struct NumberParser {
    patterns: PatternCache,
}

impl NumberParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataParser for NumberParser {
    fn name(&self) -> &'static str {
        "number"
    }

    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let regex = self
            .patterns
            .get_or_build(resources, |r| Some(r.grammar.number_pattern()))?;

        let found: Vec<Data> = scan_aligned(&regex, line, cancellation)?
            .into_iter()
            .filter_map(|(span, captures)| {
                let value = parse_number(&resources.grammar, captures.get(0)?.as_str())?;
                Some(Data::new(DataValue::Number(value), span).with_priority(NUMBER_PRIORITY))
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}
