use chrono::{Local, NaiveDate};
use smart_calc_support::{Data, DataValue};
use tokio_util::sync::CancellationToken;

use super::{DataParser, PatternCache, scan_aligned};
use crate::resources::CultureResources;
use crate::token::TokenChain;

pub const DATE_PRIORITY: i32 = 10;

/// Dates written in one of the culture's date formats, plus the "today" keywords.
#[derive(Debug, Default)]
pub struct DateParser {
    patterns: PatternCache,
    today: Option<NaiveDate>,
}

impl DateParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the date the "today" keywords resolve to.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn pattern(resources: &CultureResources) -> Option<String> {
        let mut alternatives: Vec<String> = resources
            .grammar
            .date_formats
            .iter()
            .enumerate()
            .filter_map(|(index, format)| {
                format_to_regex(format).map(|regex| format!("(?P<f{}>{})", index, regex))
            })
            .collect();

        if !resources.grammar.today_keywords.is_empty() {
            let keywords = resources
                .grammar
                .today_keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            alternatives.push(format!("(?P<today>(?i:{}))", keywords));
        }

        (!alternatives.is_empty()).then(|| alternatives.join("|"))
    }
}

/// Translates a strftime-style date format into a regex. Unsupported specifiers
/// disable the format.
fn format_to_regex(format: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push_str(&regex::escape(&c.to_string()));
            continue;
        }
        match chars.next()? {
            'Y' => out.push_str(r"\d{4}"),
            'y' => out.push_str(r"\d{2}"),
            'm' | 'd' => out.push_str(r"\d{1,2}"),
            'e' => out.push_str(r"\s?\d{1,2}"),
            'b' | 'B' => out.push_str(r"\p{L}+"),
            '%' => out.push('%'),
            _ => return None,
        }
    }
    Some(out)
}

impl DataParser for DateParser {
    fn name(&self) -> &'static str {
        "date"
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
                let date = if captures.name("today").is_some() {
                    self.today()
                } else {
                    resources
                        .grammar
                        .date_formats
                        .iter()
                        .enumerate()
                        .find_map(|(index, format)| {
                            let text = captures.name(&format!("f{}", index))?.as_str();
                            NaiveDate::parse_from_str(text, format).ok()
                        })?
                };
                Some(Data::new(DataValue::Date(date), span).with_priority(DATE_PRIORITY))
            })
            .collect();
        (!found.is_empty()).then_some(found)
    }
}
