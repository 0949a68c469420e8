//! # Culture Resources
//!
//! Loads, per culture, the token-definition grammar, the unit name table and the
//! function-name definitions from JSON documents, and caches the compiled result.
//!
//! ## Layout
//!
//! Every table exists for the culture-invariant fallback (`invariant`) and may be
//! supplied again for a specific culture (`en-us`, `fr-fr`, ...):
//!
//! - `grammar.json`: complete per culture; the invariant grammar is used when a culture
//!   has none
//! - `units.json`: the invariant table defines units and currencies; a culture table adds
//!   localized spellings (`unit_aliases`, `currency_aliases`) and may define extra units
//! - `functions.json`: maps spellings to built-in functions; culture entries are merged over
//!   the invariant ones
//!
//! A missing or corrupt invariant table is fatal: the culture cannot initialize.
//!
//! ## Caching
//!
//! Loaded cultures live in a process-wide cache. Readers take a lock-free snapshot of
//! the cache; the first request for a culture loads it under a mutex and publishes a
//! new snapshot.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use smart_calc_support::{TIME_DIMENSION, Unit};
use tracing::{debug, info};

use crate::config::ResourceSource;
use crate::error::{CalcError, CalcResult};
use crate::token::TokenType;

/// A normalized culture identifier (`en-us`, `fr-fr`, `invariant`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Culture(String);

impl Culture {
    pub const INVARIANT: &'static str = "invariant";

    pub fn new(id: &str) -> Self {
        let normalized = id.trim().replace('_', "-").to_lowercase();
        if normalized.is_empty() {
            Culture(Self::INVARIANT.to_string())
        } else {
            Culture(normalized)
        }
    }

    pub fn invariant() -> Self {
        Culture(Self::INVARIANT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_invariant(&self) -> bool {
        self.0 == Self::INVARIANT
    }
}

impl Default for Culture {
    fn default() -> Self {
        Culture("en-us".to_string())
    }
}

impl FromStr for Culture {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Culture::new(s))
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three resource tables a culture is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Grammar,
    Units,
    Functions,
}

impl ResourceKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ResourceKind::Grammar => "grammar.json",
            ResourceKind::Units => "units.json",
            ResourceKind::Functions => "functions.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Grammar => "grammar",
            ResourceKind::Units => "units",
            ResourceKind::Functions => "functions",
        }
    }
}

/// Built-in functions that culture function tables can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinFunction {
    Sqrt,
    Abs,
    Round,
    Floor,
    Ceiling,
}

impl BuiltinFunction {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Sqrt => "sqrt",
            BuiltinFunction::Abs => "abs",
            BuiltinFunction::Round => "round",
            BuiltinFunction::Floor => "floor",
            BuiltinFunction::Ceiling => "ceiling",
        }
    }
}

// --- JSON documents ---

#[derive(Debug, Deserialize)]
struct GrammarDocument {
    decimal_separator: String,
    group_separator: String,
    #[serde(default)]
    date_formats: Vec<String>,
    display_date_format: String,
    #[serde(default)]
    today_keywords: Vec<String>,
    true_text: String,
    false_text: String,
    tokens: Vec<TokenRuleDocument>,
    #[serde(default)]
    messages: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TokenRuleDocument {
    #[serde(rename = "type")]
    token_type: TokenType,
    pattern: String,
}

#[derive(Debug, Default, Deserialize)]
struct UnitsDocument {
    #[serde(default)]
    units: Vec<UnitDefinition>,
    #[serde(default)]
    currencies: Vec<CurrencyDefinition>,
    #[serde(default)]
    unit_aliases: HashMap<String, String>,
    #[serde(default)]
    currency_aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UnitDefinition {
    symbol: String,
    dimension: String,
    #[serde(with = "rust_decimal::serde::str")]
    factor: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    offset: Option<Decimal>,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CurrencyDefinition {
    iso: String,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionsDocument {
    #[serde(default)]
    functions: HashMap<String, BuiltinFunction>,
}

// --- Grammar ---

/// One compiled token rule. Rules are tried in declaration order at each position.
#[derive(Debug, Clone)]
pub struct TokenRule {
    pub token_type: TokenType,
    regex: Regex,
}

impl TokenRule {
    pub fn new(token_type: TokenType, pattern: &str) -> Result<Self, regex::Error> {
        // Anchor at the start of the remaining input
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self { token_type, regex })
    }

    /// Length in bytes of the non-empty match at the start of `rest`, if any.
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        self.regex
            .find(rest)
            .map(|m| m.end())
            .filter(|len| *len > 0)
    }
}

/// The compiled token-definition grammar and number/date conventions of a culture.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub decimal_separator: String,
    pub group_separator: String,
    pub date_formats: Vec<String>,
    pub display_date_format: String,
    pub today_keywords: Vec<String>,
    pub true_text: String,
    pub false_text: String,
    rules: Vec<TokenRule>,
    messages: HashMap<String, String>,
}

impl Grammar {
    fn compile(document: GrammarDocument, culture: &Culture) -> CalcResult<Self> {
        let label = ResourceKind::Grammar.label();
        if document.decimal_separator.is_empty() {
            return Err(CalcError::resource_load(
                culture.as_str(),
                label,
                "decimal separator is empty",
            ));
        }
        if document.decimal_separator == document.group_separator {
            return Err(CalcError::resource_load(
                culture.as_str(),
                label,
                "decimal and group separators are identical",
            ));
        }
        if document.tokens.is_empty() {
            return Err(CalcError::resource_load(
                culture.as_str(),
                label,
                "grammar declares no token rules",
            ));
        }

        let rules = document
            .tokens
            .iter()
            .map(|rule| {
                TokenRule::new(rule.token_type, &rule.pattern).map_err(|e| {
                    CalcError::resource_load(
                        culture.as_str(),
                        label,
                        format!("invalid pattern '{}': {}", rule.pattern, e),
                    )
                })
            })
            .collect::<CalcResult<Vec<_>>>()?;

        Ok(Self {
            decimal_separator: document.decimal_separator,
            group_separator: document.group_separator,
            date_formats: document.date_formats,
            display_date_format: document.display_date_format,
            today_keywords: document.today_keywords,
            true_text: document.true_text,
            false_text: document.false_text,
            rules,
            messages: document.messages,
        })
    }

    pub fn rules(&self) -> &[TokenRule] {
        &self.rules
    }

    /// Localized message for an error key, or the key itself when the table lacks it.
    pub fn message<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Regex source matching a number written with this culture's separators.
    pub fn number_pattern(&self) -> String {
        let decimal = regex::escape(&self.decimal_separator);
        let group = regex::escape(&self.group_separator);
        format!(
            r"(?:\d{{1,3}}(?:{group}\d{{3}})+|\d+)(?:{decimal}\d+)?|{decimal}\d+",
            group = group,
            decimal = decimal
        )
    }
}

// --- Units ---

/// A spelling a recognizer may match for a unit or currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spelling {
    pub text: String,
    pub case_insensitive: bool,
}

/// Unit and currency names of a culture.
///
/// Symbols are matched exactly (`m` is not `M`); names are matched case-insensitively
/// with collapsed whitespace. A localized alias spelled with an uppercase letter is
/// treated as a symbol.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: Vec<Unit>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
    spellings: Vec<(Spelling, usize)>,
    currency_exact: HashMap<String, String>,
    currency_folded: HashMap<String, String>,
    currency_prefixes: Vec<Spelling>,
    currency_suffixes: Vec<Spelling>,
}

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl UnitTable {
    fn build(
        base: UnitsDocument,
        overlay: Option<UnitsDocument>,
        culture: &Culture,
    ) -> CalcResult<Self> {
        let label = ResourceKind::Units.label();
        let mut table = UnitTable::default();
        let overlay = overlay.unwrap_or_default();

        for definition in base.units.into_iter().chain(overlay.units) {
            if definition.factor.is_zero() {
                return Err(CalcError::resource_load(
                    culture.as_str(),
                    label,
                    format!("unit '{}' has a zero factor", definition.symbol),
                ));
            }
            let index = table.units.len();
            let unit = Unit::new(
                definition.symbol.clone(),
                definition.dimension,
                definition.factor,
            )
            .with_offset(definition.offset.unwrap_or(Decimal::ZERO));
            table.units.push(unit);

            table.add_symbol(&definition.symbol, index);
            for symbol in &definition.symbols {
                table.add_symbol(symbol, index);
            }
            for name in &definition.names {
                table.add_name(name, index);
            }
        }

        for (alias, symbol) in base.unit_aliases.iter().chain(overlay.unit_aliases.iter()) {
            let index = *table.exact.get(symbol).ok_or_else(|| {
                CalcError::resource_load(
                    culture.as_str(),
                    label,
                    format!("alias '{}' refers to unknown unit '{}'", alias, symbol),
                )
            })?;
            if alias.chars().any(char::is_uppercase) {
                table.add_symbol(alias, index);
            } else {
                table.add_name(alias, index);
            }
        }

        for currency in base.currencies.into_iter().chain(overlay.currencies) {
            let iso = currency.iso.to_uppercase();
            table.add_currency_code(&iso);
            for symbol in &currency.symbols {
                table.add_currency_symbol(symbol, &iso);
            }
            for name in &currency.names {
                table.add_currency_name(name, &iso);
            }
        }

        for (alias, iso) in base
            .currency_aliases
            .iter()
            .chain(overlay.currency_aliases.iter())
        {
            let iso = iso.to_uppercase();
            if !table.currency_exact.contains_key(&iso) {
                return Err(CalcError::resource_load(
                    culture.as_str(),
                    label,
                    format!("alias '{}' refers to unknown currency '{}'", alias, iso),
                ));
            }
            table.add_currency_name(alias, &iso);
        }

        // Longest spellings first so regex alternations prefer `min` over `m`
        table
            .spellings
            .sort_by(|a, b| b.0.text.len().cmp(&a.0.text.len()));
        table
            .currency_prefixes
            .sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        table
            .currency_suffixes
            .sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        Ok(table)
    }

    fn add_symbol(&mut self, symbol: &str, index: usize) {
        self.exact.insert(symbol.to_string(), index);
        self.spellings.push((
            Spelling {
                text: symbol.to_string(),
                case_insensitive: false,
            },
            index,
        ));
    }

    fn add_name(&mut self, name: &str, index: usize) {
        self.folded.insert(fold(name), index);
        self.spellings.push((
            Spelling {
                text: name.to_string(),
                case_insensitive: true,
            },
            index,
        ));
    }

    fn add_currency_symbol(&mut self, symbol: &str, iso: &str) {
        self.currency_exact.insert(symbol.to_string(), iso.to_string());
        let spelling = Spelling {
            text: symbol.to_string(),
            case_insensitive: false,
        };
        self.currency_prefixes.push(spelling.clone());
        self.currency_suffixes.push(spelling);
    }

    /// ISO codes are looked up upper-cased, so `usd` spells `USD` too.
    fn add_currency_code(&mut self, iso: &str) {
        self.currency_exact.insert(iso.to_string(), iso.to_string());
        self.currency_suffixes.push(Spelling {
            text: iso.to_string(),
            case_insensitive: true,
        });
    }

    fn add_currency_name(&mut self, name: &str, iso: &str) {
        self.currency_folded.insert(fold(name), iso.to_string());
        self.currency_suffixes.push(Spelling {
            text: name.to_string(),
            case_insensitive: true,
        });
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Resolves a unit from any of its spellings.
    pub fn lookup_unit(&self, spelling: &str) -> Option<&Unit> {
        self.exact
            .get(spelling)
            .or_else(|| self.folded.get(&fold(spelling)))
            .map(|index| &self.units[*index])
    }

    /// Resolves a currency ISO code from a symbol, code or name.
    pub fn lookup_currency(&self, spelling: &str) -> Option<&str> {
        self.currency_exact
            .get(spelling)
            .or_else(|| self.currency_exact.get(&spelling.to_uppercase()))
            .or_else(|| self.currency_folded.get(&fold(spelling)))
            .map(String::as_str)
    }

    /// Spellings of the units accepted by `filter`, longest first.
    pub fn unit_spellings(&self, filter: impl Fn(&Unit) -> bool) -> Vec<Spelling> {
        self.spellings
            .iter()
            .filter(|(_, index)| filter(&self.units[*index]))
            .map(|(spelling, _)| spelling.clone())
            .collect()
    }

    /// Currency spellings that may precede an amount (`$5`).
    pub fn currency_prefix_spellings(&self) -> &[Spelling] {
        &self.currency_prefixes
    }

    /// Currency spellings that may follow an amount (`5 USD`, `5 euros`).
    pub fn currency_suffix_spellings(&self) -> &[Spelling] {
        &self.currency_suffixes
    }

    /// Unit used to express the difference between two dates.
    pub fn day_unit(&self) -> Unit {
        self.lookup_unit("day")
            .filter(|unit| unit.dimension == TIME_DIMENSION)
            .cloned()
            .unwrap_or_else(|| Unit::new("day", TIME_DIMENSION, Decimal::from(86_400)))
    }
}

/// Builds a regex alternation from spellings, keeping their order.
pub fn spelling_alternation(spellings: &[Spelling]) -> String {
    spellings
        .iter()
        .map(|spelling| {
            let escaped = spelling
                .text
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            if spelling.case_insensitive {
                format!("(?i:{})", escaped)
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

// --- Functions ---

/// Function names of a culture.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    by_name: HashMap<String, BuiltinFunction>,
}

impl FunctionTable {
    fn build(base: FunctionsDocument, overlay: Option<FunctionsDocument>) -> Self {
        let mut by_name = HashMap::new();
        for (name, function) in base
            .functions
            .into_iter()
            .chain(overlay.unwrap_or_default().functions)
        {
            by_name.insert(fold(&name), function);
        }
        Self { by_name }
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFunction> {
        self.by_name.get(&fold(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// --- Loading ---

static NEXT_RESOURCES_ID: AtomicU64 = AtomicU64::new(1);

/// Everything the pipeline needs to know about one culture.
#[derive(Debug)]
pub struct CultureResources {
    id: u64,
    pub culture: Culture,
    pub grammar: Grammar,
    pub units: UnitTable,
    pub functions: FunctionTable,
}

impl CultureResources {
    /// Unique identifier of this loaded instance, used to key derived caches.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Loads and compiles the tables of `culture` from `source`, bypassing the cache.
    pub fn load(source: &ResourceSource, culture: &Culture) -> CalcResult<Self> {
        let grammar_text = match read_resource(source, culture, ResourceKind::Grammar)? {
            Some(text) => text,
            None => require_invariant(source, culture, ResourceKind::Grammar)?,
        };
        let grammar_doc: GrammarDocument = parse_document(&grammar_text, culture, ResourceKind::Grammar)?;
        let grammar = Grammar::compile(grammar_doc, culture)?;

        let units_base: UnitsDocument = parse_document(
            &require_invariant(source, culture, ResourceKind::Units)?,
            culture,
            ResourceKind::Units,
        )?;
        let units_overlay = overlay_document(source, culture, ResourceKind::Units)?;
        let units = UnitTable::build(units_base, units_overlay, culture)?;

        let functions_base: FunctionsDocument = parse_document(
            &require_invariant(source, culture, ResourceKind::Functions)?,
            culture,
            ResourceKind::Functions,
        )?;
        let functions_overlay = overlay_document(source, culture, ResourceKind::Functions)?;
        let functions = FunctionTable::build(functions_base, functions_overlay);

        debug!(
            culture = %culture,
            rules = grammar.rules().len(),
            units = units.units().len(),
            functions = functions.len(),
            "Compiled culture resources"
        );

        Ok(Self {
            id: NEXT_RESOURCES_ID.fetch_add(1, Ordering::Relaxed),
            culture: culture.clone(),
            grammar,
            units,
            functions,
        })
    }
}

fn parse_document<T: for<'de> Deserialize<'de>>(
    text: &str,
    culture: &Culture,
    kind: ResourceKind,
) -> CalcResult<T> {
    serde_json::from_str(text).map_err(|e| CalcError::resource_load(culture.as_str(), kind.label(), e))
}

fn require_invariant(
    source: &ResourceSource,
    culture: &Culture,
    kind: ResourceKind,
) -> CalcResult<Cow<'static, str>> {
    read_resource(source, &Culture::invariant(), kind)?.ok_or_else(|| {
        CalcError::resource_load(
            culture.as_str(),
            kind.label(),
            format!("missing invariant {}", kind.file_name()),
        )
    })
}

fn overlay_document<T: for<'de> Deserialize<'de>>(
    source: &ResourceSource,
    culture: &Culture,
    kind: ResourceKind,
) -> CalcResult<Option<T>> {
    if culture.is_invariant() {
        return Ok(None);
    }
    read_resource(source, culture, kind)?
        .map(|text| parse_document(&text, culture, kind))
        .transpose()
}

fn embedded_resource(culture: &str, kind: ResourceKind) -> Option<&'static str> {
    match (culture, kind) {
        ("invariant", ResourceKind::Grammar) => {
            Some(include_str!("../resources/invariant/grammar.json"))
        }
        ("invariant", ResourceKind::Units) => Some(include_str!("../resources/invariant/units.json")),
        ("invariant", ResourceKind::Functions) => {
            Some(include_str!("../resources/invariant/functions.json"))
        }
        ("en-us", ResourceKind::Grammar) => Some(include_str!("../resources/en-us/grammar.json")),
        ("fr-fr", ResourceKind::Grammar) => Some(include_str!("../resources/fr-fr/grammar.json")),
        ("fr-fr", ResourceKind::Units) => Some(include_str!("../resources/fr-fr/units.json")),
        ("fr-fr", ResourceKind::Functions) => {
            Some(include_str!("../resources/fr-fr/functions.json"))
        }
        _ => None,
    }
}

/// Reads one table. `Ok(None)` means the culture does not provide it.
fn read_resource(
    source: &ResourceSource,
    culture: &Culture,
    kind: ResourceKind,
) -> CalcResult<Option<Cow<'static, str>>> {
    match source {
        ResourceSource::Embedded => Ok(embedded_resource(culture.as_str(), kind).map(Cow::Borrowed)),
        ResourceSource::Directory(dir) => read_from_directory(dir, culture, kind),
    }
}

fn read_from_directory(
    dir: &Path,
    culture: &Culture,
    kind: ResourceKind,
) -> CalcResult<Option<Cow<'static, str>>> {
    let path = dir.join(culture.as_str()).join(kind.file_name());
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(Cow::Owned(text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CalcError::resource_load(
            culture.as_str(),
            kind.label(),
            format!("{}: {}", path.display(), e),
        )),
    }
}

// --- Cache ---

type CacheKey = (ResourceSource, Culture);

/// Process-wide cache of loaded cultures.
pub struct ResourceCache {
    loaded: ArcSwap<HashMap<CacheKey, Arc<CultureResources>>>,
    load_lock: Mutex<()>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self {
            loaded: ArcSwap::from_pointee(HashMap::new()),
            load_lock: Mutex::new(()),
        }
    }

    pub fn get_or_load(
        &self,
        source: &ResourceSource,
        culture: &Culture,
    ) -> CalcResult<Arc<CultureResources>> {
        let key = (source.clone(), culture.clone());
        if let Some(resources) = self.loaded.load().get(&key) {
            return Ok(Arc::clone(resources));
        }

        let _guard = self.load_lock.lock();
        // Another caller may have finished loading while we waited
        if let Some(resources) = self.loaded.load().get(&key) {
            return Ok(Arc::clone(resources));
        }

        let resources = Arc::new(CultureResources::load(source, culture)?);
        let mut next = HashMap::clone(&self.loaded.load());
        next.insert(key, Arc::clone(&resources));
        self.loaded.store(Arc::new(next));
        info!(culture = %culture, "Loaded culture resources");
        Ok(resources)
    }

    pub fn len(&self) -> usize {
        self.loaded.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

static RESOURCE_CACHE: Lazy<ResourceCache> = Lazy::new(ResourceCache::new);

/// Returns the cached resources of `culture`, loading them on first use.
pub fn load_culture(
    source: &ResourceSource,
    culture: &Culture,
) -> CalcResult<Arc<CultureResources>> {
    RESOURCE_CACHE.get_or_load(source, culture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn en() -> Arc<CultureResources> {
        load_culture(&ResourceSource::Embedded, &Culture::new("en-US")).unwrap()
    }

    #[test]
    fn test_culture_normalization() {
        assert_eq!(Culture::new(" fr_FR ").as_str(), "fr-fr");
        assert!(Culture::new("").is_invariant());
    }

    #[test]
    fn test_embedded_cultures_load() {
        for culture in ["invariant", "en-us", "fr-fr", "de-de"] {
            let resources = load_culture(&ResourceSource::Embedded, &Culture::new(culture));
            assert!(resources.is_ok(), "culture {} failed: {:?}", culture, resources.err());
        }
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let a = en();
        let b = en();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unit_lookup() {
        let resources = en();
        assert_eq!(resources.units.lookup_unit("km").unwrap().symbol, "km");
        assert_eq!(resources.units.lookup_unit("Kilometers").unwrap().symbol, "km");
        assert_eq!(resources.units.lookup_unit("square  meters").unwrap().symbol, "m2");
        assert!(resources.units.lookup_unit("M").is_none());
        assert_eq!(resources.units.day_unit().factor, Decimal::from(86_400));
    }

    #[test]
    fn test_currency_lookup() {
        let resources = en();
        assert_eq!(resources.units.lookup_currency("$"), Some("USD"));
        assert_eq!(resources.units.lookup_currency("eur"), Some("EUR"));
        assert_eq!(resources.units.lookup_currency("Euros"), Some("EUR"));
        assert_eq!(resources.units.lookup_currency("XYZ"), None);
    }

    #[test]
    fn test_french_overlay() {
        let fr = load_culture(&ResourceSource::Embedded, &Culture::new("fr-fr")).unwrap();
        assert_eq!(fr.grammar.decimal_separator, ",");
        assert_eq!(fr.units.lookup_unit("kilomètres").unwrap().symbol, "km");
        assert_eq!(fr.units.lookup_unit("Mo").unwrap().symbol, "MB");
        assert_eq!(fr.units.lookup_unit("mo").unwrap().symbol, "month");
        assert_eq!(fr.functions.lookup("racine"), Some(BuiltinFunction::Sqrt));
        assert_eq!(fr.functions.lookup("sqrt"), Some(BuiltinFunction::Sqrt));
    }

    #[test]
    fn test_directory_source_falls_back_to_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let invariant = dir.path().join("invariant");
        fs::create_dir_all(&invariant).unwrap();
        fs::write(
            invariant.join("grammar.json"),
            include_str!("../resources/invariant/grammar.json"),
        )
        .unwrap();
        fs::write(
            invariant.join("units.json"),
            r#"{"units":[{"symbol":"m","dimension":"length","factor":"1"}]}"#,
        )
        .unwrap();
        fs::write(invariant.join("functions.json"), r#"{"functions":{}}"#).unwrap();

        let source = ResourceSource::Directory(dir.path().to_path_buf());
        let resources = CultureResources::load(&source, &Culture::new("xx-yy")).unwrap();
        assert_eq!(resources.units.units().len(), 1);
        assert!(resources.functions.is_empty());
    }

    #[test]
    fn test_missing_invariant_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = ResourceSource::Directory(dir.path().to_path_buf());
        let result = CultureResources::load(&source, &Culture::new("en-us"));
        assert!(matches!(result, Err(CalcError::ResourceLoad { .. })));
    }

    #[test]
    fn test_corrupt_grammar_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let invariant = dir.path().join("invariant");
        fs::create_dir_all(&invariant).unwrap();
        fs::write(invariant.join("grammar.json"), "{ not json").unwrap();
        let source = ResourceSource::Directory(dir.path().to_path_buf());
        match CultureResources::load(&source, &Culture::invariant()) {
            Err(CalcError::ResourceLoad { resource, .. }) => assert_eq!(resource, "grammar"),
            other => panic!("expected resource error, got {:?}", other.map(|r| r.id())),
        }
    }

    #[test]
    fn test_number_pattern_uses_separators() {
        let fr = load_culture(&ResourceSource::Embedded, &Culture::new("fr-fr")).unwrap();
        let regex = Regex::new(&format!("^(?:{})$", fr.grammar.number_pattern())).unwrap();
        assert!(regex.is_match("1\u{a0}234,5"));
        assert!(regex.is_match("3,25"));
        assert!(!regex.is_match("1.5"));
    }
}
