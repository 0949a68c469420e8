use smart_calc_support::{CurrencyAmount, Data, DataValue};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::format::parse_number;
use crate::resources::{CultureResources, spelling_alternation};
use crate::token::TokenChain;

pub const CURRENCY_PRIORITY: i32 = 20;

/// Currency amounts: `$5`, `€ 12.50`, `10 USD`, `3 euros`.
#[derive(Debug, Default)]
pub struct CurrencyParser {
    patterns: PatternCache,
}

impl CurrencyParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn pattern(resources: &CultureResources) -> Option<String> {
        let number = resources.grammar.number_pattern();
        let prefixes = resources.units.currency_prefix_spellings();
        let suffixes = resources.units.currency_suffix_spellings();
        if suffixes.is_empty() {
            return None;
        }
        let suffix_form = format!(
            r"(?P<amount>{})\s*(?P<suffix>{})",
            number,
            spelling_alternation(suffixes)
        );
        if prefixes.is_empty() {
            return Some(suffix_form);
        }
        Some(format!(
            r"(?P<prefix>{})\s*(?P<prefixed>{})|{}",
            spelling_alternation(prefixes),
            number,
            suffix_form
        ))
    }
}

impl DataParser for CurrencyParser {
    fn name(&self) -> &'static str {
        "currency"
    }

    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let regex = self.patterns.get_or_build(resources, Self::pattern)?;

        let found: Vec<Data> = scan_aligned(&regex, line, cancellation)?
            .into_iter()
            .filter_map(|(span, captures)| {
                let (amount, spelling) = match (captures.name("prefixed"), captures.name("prefix")) {
                    (Some(amount), Some(symbol)) => (amount, symbol),
                    _ => (captures.name("amount")?, captures.name("suffix")?),
                };
                let amount = parse_number(&resources.grammar, amount.as_str())?;
                let iso = resources.units.lookup_currency(spelling.as_str())?;
                Some(
                    Data::new(
                        DataValue::Currency(CurrencyAmount {
                            amount,
                            iso: iso.to_string(),
                        }),
                        span,
                    )
                    .with_priority(CURRENCY_PRIORITY),
                )
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}
