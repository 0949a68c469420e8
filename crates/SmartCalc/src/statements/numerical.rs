use tokio_util::sync::CancellationToken;

use super::{Statement, StatementParser};
use crate::arithmetic::ArithmeticService;
use crate::expression::ExpressionParser;
use crate::token::TokenCursor;
use crate::variables::VariableService;

/// Any line that is a complete expression.
pub struct NumericalCalculusStatementParser;

impl StatementParser for NumericalCalculusStatementParser {
    fn name(&self) -> &'static str {
        "numerical_calculus"
    }

    fn after(&self) -> &'static [&'static str] {
        &["condition"]
    }

    fn try_parse_and_interpret(
        &self,
        arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        variables: &mut VariableService,
        cancellation: &CancellationToken,
    ) -> Option<Statement> {
        let parser = ExpressionParser::new(arithmetic, variables, cancellation);
        let parsed = parser.parse_statement(start)?;
        Some(Statement::NumericalCalculus {
            expression: parsed.expression,
            result: parsed.result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;
    use crate::format::format_data;
    use crate::statements::test_support::arithmetic;

    #[test]
    fn test_expression_line() {
        let mut variables = VariableService::new();
        let statement = run(&NumericalCalculusStatementParser, "25%", &mut variables).unwrap();
        let arithmetic = arithmetic();
        assert_eq!(
            format_data(&arithmetic.resources().grammar, statement.result_data().unwrap()),
            "25%"
        );
    }

    #[test]
    fn test_trailing_comment_is_allowed() {
        let mut variables = VariableService::new();
        assert!(run(&NumericalCalculusStatementParser, "2 * 3 // six", &mut variables).is_some());
        assert!(run(&NumericalCalculusStatementParser, "2 * 3 apples", &mut variables).is_none());
    }
}
