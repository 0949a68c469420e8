//! Per-document variable table.

use std::collections::HashMap;

use smart_calc_support::Data;

/// Maps a variable name to the value of its most recent assignment.
///
/// One table lives for one evaluation pass. Lines are interpreted top to bottom, so
/// a line only sees assignments made by earlier lines.
#[derive(Debug, Clone, Default)]
pub struct VariableService {
    values: HashMap<String, Data>,
}

impl VariableService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the words of a multi-word name with single spaces.
    pub fn normalize_name<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
        words.into_iter().collect::<Vec<_>>().join(" ")
    }

    pub fn set(&mut self, name: impl Into<String>, value: Data) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Defined names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Longest prefix of `words` naming a defined variable, as `(word count, value)`.
    pub fn longest_match(&self, words: &[&str]) -> Option<(usize, &Data)> {
        (1..=words.len()).rev().find_map(|count| {
            self.get(&Self::normalize_name(words[..count].iter().copied()))
                .map(|value| (count, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use smart_calc_support::{DataValue, TextSpan};

    fn number(n: i64) -> Data {
        Data::new(DataValue::Number(Decimal::from(n)), TextSpan::default())
    }

    #[test]
    fn test_set_overwrites() {
        let mut variables = VariableService::new();
        variables.set("x", number(1));
        variables.set("x", number(2));
        assert_eq!(variables.len(), 1);
        assert_eq!(
            variables.get("x").unwrap().value(),
            &DataValue::Number(Decimal::from(2))
        );
    }

    #[test]
    fn test_longest_match_prefers_multi_word_names() {
        let mut variables = VariableService::new();
        variables.set("rent", number(1));
        variables.set("rent per month", number(2));

        let (count, value) = variables
            .longest_match(&["rent", "per", "month", "extra"])
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(value.value(), &DataValue::Number(Decimal::from(2)));

        let (count, _) = variables.longest_match(&["rent", "per"]).unwrap();
        assert_eq!(count, 1);
        assert!(variables.longest_match(&["other"]).is_none());
    }

    #[test]
    fn test_names_sorted_and_clear() {
        let mut variables = VariableService::new();
        variables.set("b", number(1));
        variables.set("a", number(1));
        assert_eq!(variables.names(), vec!["a", "b"]);
        variables.clear();
        assert!(variables.is_empty());
    }
}
