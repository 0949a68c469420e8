//! Grammar-driven tokenizer.
//!
//! At every position the first grammar rule that matches wins. Characters no rule
//! matches become single-character [`TokenType::Symbol`] tokens, so tokenizing
//! never fails. Whitespace tokens are dropped from the chain; their text stays
//! reachable through the spans of the surrounding tokens.

use std::sync::Arc;

use smart_calc_support::TextSpan;

use crate::resources::Grammar;
use crate::token::{Token, TokenChain, TokenType, TokenizedDocument};

/// Tokenizes one line.
pub fn tokenize_line(grammar: &Grammar, line_index: usize, text: &str) -> TokenChain {
    let line: Arc<str> = Arc::from(text);
    let mut tokens = Vec::new();
    let mut position = 0;

    while position < text.len() {
        let rest = &text[position..];
        let matched = grammar
            .rules()
            .iter()
            .find_map(|rule| rule.match_len(rest).map(|len| (rule.token_type, len)));

        let (token_type, length) = match matched {
            Some(found) => found,
            None => {
                let width = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                (TokenType::Symbol, width)
            }
        };

        if token_type != TokenType::Whitespace {
            tokens.push(Token::new(
                Arc::clone(&line),
                TextSpan::new(position, length),
                token_type,
            ));
        }
        position += length;
    }

    TokenChain::new(line_index, line, tokens)
}

/// Splits `text` into lines and tokenizes each of them.
pub fn tokenize_document(grammar: &Grammar, text: &str) -> TokenizedDocument {
    TokenizedDocument::new(
        split_lines(text)
            .enumerate()
            .map(|(index, line)| tokenize_line(grammar, index, line))
            .collect(),
    )
}

/// Lines of a document, accepting `\n` and `\r\n` endings.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}
