use tokio_util::sync::CancellationToken;

use super::{Statement, StatementParser};
use crate::arithmetic::ArithmeticService;
use crate::expression::{ExpressionParser, has_top_level_comparison};
use crate::token::TokenCursor;
use crate::variables::VariableService;

/// A whole-line comparison such as `3 km > 2000 m`.
pub struct ConditionStatementParser;

impl StatementParser for ConditionStatementParser {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn after(&self) -> &'static [&'static str] {
        &["variable_declaration"]
    }

    fn try_parse_and_interpret(
        &self,
        arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        variables: &mut VariableService,
        cancellation: &CancellationToken,
    ) -> Option<Statement> {
        if !has_top_level_comparison(start) {
            return None;
        }
        let parser = ExpressionParser::new(arithmetic, variables, cancellation);
        let parsed = parser.parse_statement(start)?;
        if !parsed.expression.is_relational() {
            return None;
        }
        Some(Statement::Condition {
            expression: parsed.expression,
            result: parsed.result,
        })
    }
}
