//! # Expression Parser/Interpreter
//!
//! Recursive descent over a data-annotated [`TokenChain`](crate::token::TokenChain).
//! Parsing and evaluation are fused: every reduction is evaluated on the spot, so the
//! caller receives both the tree and its value in one pass.
//!
//! ## Grammar
//!
//! From lowest to highest precedence:
//!
//! ```text
//! comparison     := conversion (relop conversion)?
//! conversion     := additive ((in | to) target)*
//! additive       := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/') unary)*
//! unary          := '-' unary | primary
//! primary        := DATA | '(' comparison ')' | function '(' comparison ')' | variable
//! ```
//!
//! A variable reference is the longest run of words naming a defined variable. An
//! unknown word makes the parse fail; a semantic failure (incompatible units, division
//! by zero) does not: it becomes error data and parsing continues.

use std::cell::Cell;

use smart_calc_support::{Data, TextSpan};
use tokio_util::sync::CancellationToken;

use crate::arithmetic::{ArithmeticService, BinaryOperatorType, ConversionTarget};
use crate::resources::BuiltinFunction;
use crate::token::{TokenCursor, TokenType};
use crate::variables::VariableService;

/// Nesting limit for groups, function calls and unary minus.
const MAX_DEPTH: usize = 128;

/// Longest multi-word function name or conversion target looked up.
const MAX_NAME_WORDS: usize = 4;

/// A parsed expression. Every node spans the tokens it consumed.
#[derive(Debug, Clone)]
pub enum Expression {
    Data(Data),
    VariableReference {
        name: String,
        span: TextSpan,
    },
    Group {
        inner: Box<Expression>,
        span: TextSpan,
    },
    BinaryOperator {
        left: Box<Expression>,
        operator: BinaryOperatorType,
        right: Box<Expression>,
    },
    Negation {
        operand: Box<Expression>,
        span: TextSpan,
    },
    FunctionCall {
        function: BuiltinFunction,
        argument: Box<Expression>,
        span: TextSpan,
    },
    Conversion {
        operand: Box<Expression>,
        target: ConversionTarget,
        span: TextSpan,
    },
}

impl Expression {
    pub fn span(&self) -> TextSpan {
        match self {
            Expression::Data(data) => data.span(),
            Expression::VariableReference { span, .. }
            | Expression::Group { span, .. }
            | Expression::Negation { span, .. }
            | Expression::FunctionCall { span, .. }
            | Expression::Conversion { span, .. } => *span,
            Expression::BinaryOperator { left, right, .. } => left.span().cover(&right.span()),
        }
    }

    /// Whether the top-level operator is a comparison.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Expression::BinaryOperator { operator, .. } if operator.is_relational()
        )
    }
}

/// An expression, its value and the first token after it.
#[derive(Debug, Clone)]
pub struct ParsedExpression<'t> {
    pub expression: Expression,
    pub result: Data,
    pub rest: Option<TokenCursor<'t>>,
}

impl ParsedExpression<'_> {
    /// Whether nothing but an optional trailing comment follows the expression.
    pub fn reaches_end_of_statement(&self) -> bool {
        is_end_of_statement(self.rest)
    }
}

pub fn is_end_of_statement(cursor: Option<TokenCursor<'_>>) -> bool {
    cursor.is_none_or(|c| c.is(TokenType::Comment))
}

/// Whether a comparison operator appears outside any parentheses before the end of
/// the statement. Only such a line can parse to a relational expression, and the
/// check runs no arithmetic.
pub fn has_top_level_comparison(start: TokenCursor<'_>) -> bool {
    let mut depth = 0usize;
    let mut current = Some(start);
    while let Some(cursor) = current.filter(|c| !c.is(TokenType::Comment)) {
        match cursor.token_type() {
            TokenType::LeftParenthesis => depth += 1,
            TokenType::RightParenthesis => depth = depth.saturating_sub(1),
            other => {
                let relational = BinaryOperatorType::from_token(other)
                    .is_some_and(BinaryOperatorType::is_relational);
                if depth == 0 && relational {
                    return true;
                }
            }
        }
        current = cursor.next();
    }
    false
}

type Step<'t> = Option<ParsedExpression<'t>>;

/// Parses and evaluates expressions against one variable table.
pub struct ExpressionParser<'a> {
    arithmetic: &'a ArithmeticService,
    variables: &'a VariableService,
    cancellation: &'a CancellationToken,
    depth: Cell<usize>,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(
        arithmetic: &'a ArithmeticService,
        variables: &'a VariableService,
        cancellation: &'a CancellationToken,
    ) -> Self {
        Self {
            arithmetic,
            variables,
            cancellation,
            depth: Cell::new(0),
        }
    }

    /// Parses the longest expression starting at `start`.
    pub fn parse<'t>(&self, start: TokenCursor<'t>) -> Step<'t> {
        self.comparison(Some(start))
    }

    /// Parses an expression that must run to the end of the statement.
    pub fn parse_statement<'t>(&self, start: TokenCursor<'t>) -> Step<'t> {
        self.parse(start)
            .filter(ParsedExpression::reaches_end_of_statement)
    }

    fn comparison<'t>(&self, position: Option<TokenCursor<'t>>) -> Step<'t> {
        let left = self.conversion(position)?;
        let Some((operator, after)) = Self::operator_at(left.rest, |op| op.is_relational()) else {
            return Some(left);
        };
        let right = self.conversion(after)?;
        self.combine(left, operator, right)
    }

    fn conversion<'t>(&self, position: Option<TokenCursor<'t>>) -> Step<'t> {
        let mut current = self.additive(position)?;
        while let Some(keyword) = current.rest.filter(|c| c.is(TokenType::Conversion)) {
            let (target, last) = self.conversion_target(keyword.next()?)?;
            let span = current.expression.span().cover(&last.span());
            let result = match self.arithmetic.convert(&current.result, &target) {
                Ok(value) => Data::new(value, span),
                Err(error) => Data::error(error, span),
            };
            current = ParsedExpression {
                expression: Expression::Conversion {
                    operand: Box::new(current.expression),
                    target,
                    span,
                },
                result,
                rest: last.next(),
            };
        }
        Some(current)
    }

    /// Longest run of tokens after `in`/`to` naming a unit or currency.
    fn conversion_target<'t>(
        &self,
        first: TokenCursor<'t>,
    ) -> Option<(ConversionTarget, TokenCursor<'t>)> {
        let line = first.chain().line();
        let units = &self.arithmetic.resources().units;
        let mut best = None;
        let mut last = Some(first);
        for _ in 0..MAX_NAME_WORDS {
            let Some(cursor) = last.filter(|c| {
                matches!(
                    c.token_type(),
                    TokenType::Word | TokenType::Symbol | TokenType::Divide
                )
            }) else {
                break;
            };
            let text = &line[first.span().start..cursor.span().end()];
            if let Some(unit) = units.lookup_unit(text) {
                best = Some((ConversionTarget::Unit(unit.clone()), cursor));
            } else if let Some(iso) = units.lookup_currency(text) {
                best = Some((ConversionTarget::Currency(iso.to_string()), cursor));
            }
            last = cursor.next();
        }
        best
    }

    fn additive<'t>(&self, position: Option<TokenCursor<'t>>) -> Step<'t> {
        let mut left = self.multiplicative(position)?;
        while let Some((operator, after)) = Self::operator_at(left.rest, |op| {
            matches!(op, BinaryOperatorType::Add | BinaryOperatorType::Subtract)
        }) {
            let right = self.multiplicative(after)?;
            left = self.combine(left, operator, right)?;
        }
        Some(left)
    }

    fn multiplicative<'t>(&self, position: Option<TokenCursor<'t>>) -> Step<'t> {
        let mut left = self.unary(position)?;
        while let Some((operator, after)) = Self::operator_at(left.rest, |op| {
            matches!(op, BinaryOperatorType::Multiply | BinaryOperatorType::Divide)
        }) {
            let right = self.unary(after)?;
            left = self.combine(left, operator, right)?;
        }
        Some(left)
    }

    fn unary<'t>(&self, position: Option<TokenCursor<'t>>) -> Step<'t> {
        let cursor = position?;
        if !cursor.is(TokenType::Minus) {
            return self.primary(cursor);
        }
        let operand = self.nested(|| self.unary(cursor.next()))?;
        let span = cursor.span().cover(&operand.expression.span());
        let result = match self.arithmetic.negate(&operand.result) {
            Ok(value) => Data::new(value, span),
            Err(error) => Data::error(error, span),
        };
        Some(ParsedExpression {
            expression: Expression::Negation {
                operand: Box::new(operand.expression),
                span,
            },
            result,
            rest: operand.rest,
        })
    }

    fn primary<'t>(&self, cursor: TokenCursor<'t>) -> Step<'t> {
        if self.cancellation.is_cancelled() {
            return None;
        }
        match cursor.token_type() {
            TokenType::Data => {
                let data = cursor.data()?.clone();
                Some(ParsedExpression {
                    expression: Expression::Data(data.clone()),
                    result: data,
                    rest: cursor.next(),
                })
            }
            TokenType::LeftParenthesis => {
                let (inner, close) = self.parenthesized(cursor)?;
                let span = cursor.span().cover(&close.span());
                Some(ParsedExpression {
                    result: inner.result.with_span(span),
                    expression: Expression::Group {
                        inner: Box::new(inner.expression),
                        span,
                    },
                    rest: close.next(),
                })
            }
            TokenType::Word => self
                .function_call(cursor)
                .or_else(|| self.variable_reference(cursor)),
            _ => None,
        }
    }

    /// `( comparison )` starting at the opening parenthesis.
    fn parenthesized<'t>(
        &self,
        open: TokenCursor<'t>,
    ) -> Option<(ParsedExpression<'t>, TokenCursor<'t>)> {
        let inner = self.nested(|| self.comparison(open.next()))?;
        let close = inner.rest.filter(|c| c.is(TokenType::RightParenthesis))?;
        Some((inner, close))
    }

    fn function_call<'t>(&self, first: TokenCursor<'t>) -> Step<'t> {
        let functions = &self.arithmetic.resources().functions;
        let line = first.chain().line();

        let mut words = Some(first);
        let mut call = None;
        for _ in 0..MAX_NAME_WORDS {
            let Some(word) = words.filter(|c| c.is(TokenType::Word)) else {
                break;
            };
            let name = &line[first.span().start..word.span().end()];
            if let (Some(function), Some(open)) = (
                functions.lookup(name),
                word.next().filter(|c| c.is(TokenType::LeftParenthesis)),
            ) {
                call = Some((function, open));
            }
            words = word.next();
        }

        let (function, open) = call?;
        let (argument, close) = self.parenthesized(open)?;
        let span = first.span().cover(&close.span());
        let result = match self.arithmetic.apply_function(function, &argument.result) {
            Ok(value) => Data::new(value, span),
            Err(error) => Data::error(error, span),
        };
        Some(ParsedExpression {
            expression: Expression::FunctionCall {
                function,
                argument: Box::new(argument.expression),
                span,
            },
            result,
            rest: close.next(),
        })
    }

    fn variable_reference<'t>(&self, first: TokenCursor<'t>) -> Step<'t> {
        let mut cursors = Vec::new();
        let mut current = Some(first);
        while let Some(word) = current.filter(|c| c.is(TokenType::Word)) {
            cursors.push(word);
            current = word.next();
        }
        let words: Vec<&str> = cursors.iter().map(TokenCursor::text).collect();
        let (count, value) = self.variables.longest_match(&words)?;
        let last = cursors[count - 1];
        let span = first.span().cover(&last.span());
        Some(ParsedExpression {
            expression: Expression::VariableReference {
                name: VariableService::normalize_name(words[..count].iter().copied()),
                span,
            },
            result: value.clone().with_span(span),
            rest: last.next(),
        })
    }

    fn combine<'t>(
        &self,
        left: ParsedExpression<'t>,
        operator: BinaryOperatorType,
        right: ParsedExpression<'t>,
    ) -> Step<'t> {
        let result =
            self.arithmetic
                .perform_operation(Some(&left.result), operator, Some(&right.result))?;
        Some(ParsedExpression {
            expression: Expression::BinaryOperator {
                left: Box::new(left.expression),
                operator,
                right: Box::new(right.expression),
            },
            result,
            rest: right.rest,
        })
    }

    fn operator_at<'t>(
        position: Option<TokenCursor<'t>>,
        accept: impl Fn(BinaryOperatorType) -> bool,
    ) -> Option<(BinaryOperatorType, Option<TokenCursor<'t>>)> {
        let cursor = position?;
        let operator = BinaryOperatorType::from_token(cursor.token_type()).filter(|op| accept(*op))?;
        Some((operator, cursor.next()))
    }

    fn nested<T>(&self, parse: impl FnOnce() -> Option<T>) -> Option<T> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return None;
        }
        self.depth.set(depth + 1);
        let result = parse();
        self.depth.set(depth);
        result
    }
}
