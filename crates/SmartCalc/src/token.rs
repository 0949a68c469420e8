//! # Token Model
//!
//! Tokens are immutable spans of a line tagged with a [`TokenType`]. The lexer
//! produces one [`TokenChain`] per line: a flat arena of [`LinkedToken`] nodes with
//! explicit `previous`/`next` indices. Once data recognizers have run, the chain is
//! rebuilt with [`TokenChain::with_data`] so that every recognized value occupies a
//! single [`TokenType::Data`] pseudo-token.
//!
//! Offsets are byte offsets into the line text, so `&line[start..end]` always
//! round-trips to the original input.
//!
//! ## Navigation
//!
//! - [`TokenCursor`] walks one line in both directions and can jump to the next
//!   token of a given type
//! - [`DocumentCursor`] walks the whole [`TokenizedDocument`], crossing line ends

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smart_calc_support::{Data, TextSpan};

/// Token categories. Grammar files refer to them by their snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Word,
    Digits,
    Whitespace,
    Symbol,
    Plus,
    Minus,
    Multiply,
    Divide,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    Assignment,
    LeftParenthesis,
    RightParenthesis,
    Conversion,
    Comment,
    Header,
    /// Pseudo-token standing for a recognized [`Data`] value
    Data,
}

impl TokenType {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            TokenType::LessThan
                | TokenType::LessThanOrEqual
                | TokenType::GreaterThan
                | TokenType::GreaterThanOrEqual
                | TokenType::Equal
                | TokenType::NotEqual
        )
    }
}

/// An immutable span of a line.
#[derive(Debug, Clone)]
pub struct Token {
    line: Arc<str>,
    pub span: TextSpan,
    pub token_type: TokenType,
}

impl Token {
    pub fn new(line: Arc<str>, span: TextSpan, token_type: TokenType) -> Self {
        Self {
            line,
            span,
            token_type,
        }
    }

    pub fn text(&self) -> &str {
        self.line
            .get(self.span.start..self.span.end())
            .unwrap_or_default()
    }
}

/// A token inside a [`TokenChain`], with its neighbours as arena indices.
#[derive(Debug, Clone)]
pub struct LinkedToken {
    pub token: Token,
    pub data: Option<Data>,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

/// The tokens of one line.
#[derive(Debug, Clone)]
pub struct TokenChain {
    line_index: usize,
    line: Arc<str>,
    nodes: Vec<LinkedToken>,
}

impl TokenChain {
    pub fn new(line_index: usize, line: Arc<str>, tokens: Vec<Token>) -> Self {
        let count = tokens.len();
        let nodes = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| LinkedToken {
                token,
                data: None,
                previous: index.checked_sub(1),
                next: (index + 1 < count).then_some(index + 1),
            })
            .collect();
        Self {
            line_index,
            line,
            nodes,
        }
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LinkedToken> {
        self.nodes.get(index)
    }

    /// Cursor on the first token, if the line has any.
    pub fn first(&self) -> Option<TokenCursor<'_>> {
        (!self.nodes.is_empty()).then_some(TokenCursor {
            chain: self,
            index: 0,
        })
    }

    pub fn cursor_at(&self, index: usize) -> Option<TokenCursor<'_>> {
        (index < self.nodes.len()).then_some(TokenCursor { chain: self, index })
    }

    /// Tokens in chain order.
    pub fn iter(&self) -> impl Iterator<Item = &LinkedToken> {
        let mut current = self.first().map(|cursor| cursor.index);
        std::iter::from_fn(move || {
            let index = current?;
            let node = &self.nodes[index];
            current = node.next;
            Some(node)
        })
    }

    /// Recognized data in line order.
    pub fn data(&self) -> impl Iterator<Item = &Data> {
        self.iter().filter_map(|node| node.data.as_ref())
    }

    /// Rebuilds the chain with each data item replacing the tokens its span covers.
    ///
    /// `data` must be free of overlaps. Tokens only partially covered by a data span
    /// are kept as they are.
    pub fn with_data(&self, data: &[Data]) -> TokenChain {
        let mut sorted: Vec<&Data> = data.iter().collect();
        sorted.sort();

        let mut tokens = Vec::with_capacity(self.nodes.len());
        let mut attached = Vec::with_capacity(self.nodes.len());
        let mut pending = sorted.into_iter().peekable();

        for node in self.iter() {
            let span = node.token.span;
            while pending.peek().is_some_and(|d| d.span().end() <= span.start) {
                pending.next();
            }
            match pending.peek() {
                Some(item) if item.span().contains(&span) => {
                    if span.start == item.span().start {
                        tokens.push(Token::new(
                            Arc::clone(&self.line),
                            item.span(),
                            TokenType::Data,
                        ));
                        attached.push(Some((*item).clone()));
                    }
                }
                _ => {
                    tokens.push(node.token.clone());
                    attached.push(node.data.clone());
                }
            }
        }

        let mut chain = TokenChain::new(self.line_index, Arc::clone(&self.line), tokens);
        for (node, data) in chain.nodes.iter_mut().zip(attached) {
            node.data = data;
        }
        chain
    }
}

/// A position inside a [`TokenChain`].
#[derive(Debug, Clone, Copy)]
pub struct TokenCursor<'a> {
    chain: &'a TokenChain,
    index: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn chain(&self) -> &'a TokenChain {
        self.chain
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn linked(&self) -> &'a LinkedToken {
        &self.chain.nodes[self.index]
    }

    pub fn token(&self) -> &'a Token {
        &self.linked().token
    }

    pub fn token_type(&self) -> TokenType {
        self.token().token_type
    }

    pub fn text(&self) -> &'a str {
        self.token().text()
    }

    pub fn span(&self) -> TextSpan {
        self.token().span
    }

    pub fn data(&self) -> Option<&'a Data> {
        self.linked().data.as_ref()
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.token_type() == token_type
    }

    pub fn next(&self) -> Option<TokenCursor<'a>> {
        self.linked().next.map(|index| TokenCursor {
            chain: self.chain,
            index,
        })
    }

    pub fn previous(&self) -> Option<TokenCursor<'a>> {
        self.linked().previous.map(|index| TokenCursor {
            chain: self.chain,
            index,
        })
    }

    /// The next token of `token_type` after this one.
    pub fn jump_to_next(&self, token_type: TokenType) -> Option<TokenCursor<'a>> {
        let mut current = self.next();
        while let Some(cursor) = current {
            if cursor.is(token_type) {
                return Some(cursor);
            }
            current = cursor.next();
        }
        None
    }
}

/// The token chains of every line of a document.
#[derive(Debug, Clone, Default)]
pub struct TokenizedDocument {
    pub lines: Vec<TokenChain>,
}

impl TokenizedDocument {
    pub fn new(lines: Vec<TokenChain>) -> Self {
        Self { lines }
    }

    /// Cursor on the first token of the document.
    pub fn first(&self) -> Option<DocumentCursor<'_>> {
        self.lines
            .iter()
            .find_map(TokenChain::first)
            .map(|cursor| DocumentCursor { cursor })
    }

    pub fn token_count(&self) -> usize {
        self.lines.iter().map(TokenChain::len).sum()
    }
}

/// A position in a [`TokenizedDocument`] that continues across lines.
#[derive(Debug, Clone, Copy)]
pub struct DocumentCursor<'a> {
    cursor: TokenCursor<'a>,
}

impl<'a> DocumentCursor<'a> {
    pub fn line_cursor(&self) -> TokenCursor<'a> {
        self.cursor
    }

    pub fn line_index(&self) -> usize {
        self.cursor.chain.line_index
    }

    pub fn next(&self, document: &'a TokenizedDocument) -> Option<DocumentCursor<'a>> {
        if let Some(cursor) = self.cursor.next() {
            return Some(DocumentCursor { cursor });
        }
        let position = document
            .lines
            .iter()
            .position(|chain| std::ptr::eq(chain, self.cursor.chain))?;
        document.lines[position + 1..]
            .iter()
            .find_map(TokenChain::first)
            .map(|cursor| DocumentCursor { cursor })
    }

    pub fn previous(&self, document: &'a TokenizedDocument) -> Option<DocumentCursor<'a>> {
        if let Some(cursor) = self.cursor.previous() {
            return Some(DocumentCursor { cursor });
        }
        let position = document
            .lines
            .iter()
            .position(|chain| std::ptr::eq(chain, self.cursor.chain))?;
        document.lines[..position]
            .iter()
            .rev()
            .find_map(|chain| chain.len().checked_sub(1).and_then(|last| chain.cursor_at(last)))
            .map(|cursor| DocumentCursor { cursor })
    }

    pub fn jump_to_next(
        &self,
        document: &'a TokenizedDocument,
        token_type: TokenType,
    ) -> Option<DocumentCursor<'a>> {
        let mut current = self.next(document);
        while let Some(cursor) = current {
            if cursor.cursor.is(token_type) {
                return Some(cursor);
            }
            current = cursor.next(document);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use smart_calc_support::DataValue;

    fn chain(line_index: usize, text: &str, parts: &[(usize, usize, TokenType)]) -> TokenChain {
        let line: Arc<str> = Arc::from(text);
        let tokens = parts
            .iter()
            .map(|(start, len, ty)| Token::new(Arc::clone(&line), TextSpan::new(*start, *len), *ty))
            .collect();
        TokenChain::new(line_index, line, tokens)
    }

    fn sample() -> TokenChain {
        // "12 km + x"
        chain(
            0,
            "12 km + x",
            &[
                (0, 2, TokenType::Digits),
                (3, 2, TokenType::Word),
                (6, 1, TokenType::Plus),
                (8, 1, TokenType::Word),
            ],
        )
    }

    #[test]
    fn test_bidirectional_navigation() {
        let chain = sample();
        let first = chain.first().unwrap();
        assert_eq!(first.text(), "12");
        assert!(first.previous().is_none());
        let plus = first.jump_to_next(TokenType::Plus).unwrap();
        assert_eq!(plus.text(), "+");
        assert_eq!(plus.previous().unwrap().text(), "km");
        assert!(plus.jump_to_next(TokenType::Plus).is_none());
    }

    #[test]
    fn test_with_data_collapses_covered_tokens() {
        let chain = sample();
        let quantity = Data::new(DataValue::Number(Decimal::from(12)), TextSpan::new(0, 5));
        let merged = chain.with_data(&[quantity]);

        let types: Vec<TokenType> = merged.iter().map(|node| node.token.token_type).collect();
        assert_eq!(
            types,
            vec![TokenType::Data, TokenType::Plus, TokenType::Word]
        );
        let first = merged.first().unwrap();
        assert_eq!(first.text(), "12 km");
        assert!(first.data().is_some());
        assert_eq!(merged.data().count(), 1);
    }

    #[test]
    fn test_document_cursor_crosses_lines() {
        let document = TokenizedDocument::new(vec![
            chain(0, "a", &[(0, 1, TokenType::Word)]),
            chain(1, "", &[]),
            chain(2, "b = 1", &[(0, 1, TokenType::Word), (2, 1, TokenType::Assignment), (4, 1, TokenType::Digits)]),
        ]);
        let first = document.first().unwrap();
        let second = first.next(&document).unwrap();
        assert_eq!(second.line_index(), 2);
        assert_eq!(second.line_cursor().text(), "b");
        assert_eq!(second.previous(&document).unwrap().line_index(), 0);

        let digits = first.jump_to_next(&document, TokenType::Digits).unwrap();
        assert_eq!(digits.line_cursor().text(), "1");
        assert_eq!(document.token_count(), 4);
    }
}
