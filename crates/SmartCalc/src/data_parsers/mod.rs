//! # Data Parsers
//!
//! Recognizers that scan a tokenized line and report typed [`Data`] values
//! (numbers, percentages, dates, durations, quantities, currency amounts).
//!
//! ## Overview
//!
//! Each recognizer builds one regex from the culture's grammar and unit tables and
//! runs it from every token start of the line. A match only counts when it ends on a
//! token boundary, so `5 m` is a quantity but `5 mx` is not. Every recognizer is
//! independent; overlapping claims are settled afterwards by [`resolve_conflicts`]:
//!
//! 1. the lower `conflict_priority` wins
//! 2. on a tie, the recognizer registered first wins
//!
//! The accepted data are merged back into the line with
//! [`TokenChain::with_data`](crate::token::TokenChain::with_data).
//!
//! ## Registry
//!
//! [`DataParserRegistry::standard`] registers the built-in recognizers in a fixed
//! order. Recognizers may restrict themselves to some cultures with
//! [`CultureScope::Only`].

mod currency;
mod date;
mod duration;
mod number;
mod percentage;
mod unit;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Captures, Regex};
use smart_calc_support::{Data, TextSpan};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::resources::{Culture, CultureResources};
use crate::token::TokenChain;

pub use currency::CurrencyParser;
pub use date::DateParser;
pub use duration::DurationParser;
pub use number::NumberParser;
pub use percentage::PercentageParser;
pub use unit::UnitParser;

/// Cultures a recognizer applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultureScope {
    Any,
    Only(&'static [&'static str]),
}

impl CultureScope {
    pub fn includes(&self, culture: &Culture) -> bool {
        match self {
            CultureScope::Any => true,
            CultureScope::Only(cultures) => cultures.iter().any(|c| *c == culture.as_str()),
        }
    }
}

/// A recognizer for one kind of data.
pub trait DataParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn cultures(&self) -> CultureScope {
        CultureScope::Any
    }

    /// Returns the data found in `line`, or `None` when nothing matched or the
    /// pass was cancelled.
    fn parse(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>>;
}

/// A recognizer regex compiled anchored at the start of the input, and anchored at
/// both ends for retrying a shorter token-aligned match.
#[derive(Debug)]
pub struct LinePattern {
    prefix: Regex,
    exact: Regex,
}

impl LinePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            prefix: Regex::new(&format!("^(?:{})", pattern))?,
            exact: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn prefix(&self) -> &Regex {
        &self.prefix
    }
}

/// Compiled recognizer patterns, one per loaded culture.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<u64, Option<Arc<LinePattern>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pattern for `resources`, compiling `build`'s output on first use.
    ///
    /// A pattern that fails to compile is logged once and disables the recognizer
    /// for that culture.
    pub fn get_or_build(
        &self,
        resources: &CultureResources,
        build: impl FnOnce(&CultureResources) -> Option<String>,
    ) -> Option<Arc<LinePattern>> {
        if let Some(entry) = self.compiled.read().get(&resources.id()) {
            return entry.clone();
        }

        let compiled = build(resources).and_then(|pattern| match LinePattern::new(&pattern) {
            Ok(compiled) => Some(Arc::new(compiled)),
            Err(e) => {
                warn!(culture = %resources.culture, error = %e, "Failed to compile recognizer pattern");
                None
            }
        });
        self.compiled
            .write()
            .entry(resources.id())
            .or_insert(compiled)
            .clone()
    }
}

/// Runs `pattern` from every token start of `line` and keeps the matches that end
/// on a token boundary. When the longest match ends inside a token, shorter matches
/// ending on earlier token boundaries are tried. Matches never overlap; the
/// earliest one wins.
///
/// Returns `None` if the pass was cancelled.
pub fn scan_aligned<'l>(
    pattern: &LinePattern,
    line: &'l TokenChain,
    cancellation: &CancellationToken,
) -> Option<Vec<(TextSpan, Captures<'l>)>> {
    let text = line.line();
    let bounds: Vec<TextSpan> = line.iter().map(|node| node.token.span).collect();
    let ends: Vec<usize> = bounds.iter().map(TextSpan::end).collect();
    let mut matches = Vec::new();
    let mut resume = 0;

    for (index, token) in bounds.iter().enumerate() {
        if cancellation.is_cancelled() {
            return None;
        }
        let start = token.start;
        if start < resume {
            continue;
        }
        let Some(longest) = pattern.prefix.find(&text[start..]).map(|m| start + m.end()) else {
            continue;
        };
        let reachable = index + ends[index..].partition_point(|end| *end <= longest);
        let aligned = ends[index..reachable].iter().rev().find_map(|&end| {
            let captures = pattern.exact.captures(&text[start..end])?;
            Some((TextSpan::new(start, end - start), captures))
        });
        if let Some((span, captures)) = aligned {
            resume = span.end();
            matches.push((span, captures));
        }
    }
    Some(matches)
}

/// Keeps the non-overlapping winners among `candidates`.
///
/// Each candidate carries the registration index of the recognizer that produced
/// it. The result is ordered by span.
pub fn resolve_conflicts(mut candidates: Vec<(usize, Data)>) -> Vec<Data> {
    candidates.sort_by(|(a_order, a), (b_order, b)| {
        a.conflict_priority()
            .cmp(&b.conflict_priority())
            .then(a_order.cmp(b_order))
    });

    let mut accepted: Vec<Data> = Vec::with_capacity(candidates.len());
    for (_, candidate) in candidates {
        if accepted
            .iter()
            .all(|kept| !kept.span().overlaps(&candidate.span()))
        {
            accepted.push(candidate);
        }
    }
    accepted.sort();
    accepted
}

/// The recognizers of an interpreter, in registration order.
pub struct DataParserRegistry {
    parsers: Vec<Box<dyn DataParser>>,
}

impl DataParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// The built-in recognizers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(DateParser::new());
        registry.register(CurrencyParser::new());
        registry.register(DurationParser::new());
        registry.register(UnitParser::new());
        registry.register(PercentageParser::new());
        registry.register(NumberParser::new());
        registry
    }

    pub fn register(&mut self, parser: impl DataParser + 'static) {
        self.parsers.push(Box::new(parser));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Runs every recognizer that applies to the culture and resolves their claims.
    ///
    /// Returns `None` if the pass was cancelled.
    pub fn parse_line(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<Vec<Data>> {
        let mut candidates = Vec::new();
        for (order, parser) in self.parsers.iter().enumerate() {
            if cancellation.is_cancelled() {
                return None;
            }
            if !parser.cultures().includes(&resources.culture) {
                continue;
            }
            if let Some(found) = parser.parse(resources, line, cancellation) {
                candidates.extend(found.into_iter().map(|data| (order, data)));
            }
        }
        if cancellation.is_cancelled() {
            return None;
        }
        Some(resolve_conflicts(candidates))
    }

    /// Tokenized line with recognized data merged in as pseudo-tokens.
    pub fn annotate(
        &self,
        resources: &CultureResources,
        line: &TokenChain,
        cancellation: &CancellationToken,
    ) -> Option<TokenChain> {
        let data = self.parse_line(resources, line, cancellation)?;
        Some(line.with_data(&data))
    }
}

impl Default for DataParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
