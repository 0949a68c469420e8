use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{Statement, StatementParser};
use crate::arithmetic::ArithmeticService;
use crate::expression::ExpressionParser;
use crate::token::{TokenCursor, TokenType};
use crate::variables::VariableService;

/// `name words = expression`
///
/// The name is the run of word tokens between the start of the line and the first
/// `=`. Any other token in that run means the line is not a declaration. A right-hand
/// side that evaluates to an error is still reported but leaves the variable undefined.
pub struct VariableDeclarationStatementParser;

impl StatementParser for VariableDeclarationStatementParser {
    fn name(&self) -> &'static str {
        "variable_declaration"
    }

    fn after(&self) -> &'static [&'static str] {
        &["comment", "header"]
    }

    fn try_parse_and_interpret(
        &self,
        arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        variables: &mut VariableService,
        cancellation: &CancellationToken,
    ) -> Option<Statement> {
        let assignment = if start.is(TokenType::Assignment) {
            start
        } else {
            start.jump_to_next(TokenType::Assignment)?
        };

        let mut words = Vec::new();
        let mut current = assignment.previous();
        while let Some(word) = current {
            if !word.is(TokenType::Word) {
                return None;
            }
            words.push(word.text());
            current = word.previous();
        }
        if words.is_empty() {
            return None;
        }
        words.reverse();
        let name = VariableService::normalize_name(words);

        let parsed = {
            let parser = ExpressionParser::new(arithmetic, variables, cancellation);
            parser.parse_statement(assignment.next()?)?
        };
        if parsed.result.is_error() {
            trace!(name = %name, "Declaration evaluated to an error; variable left undefined");
        } else {
            variables.set(name.clone(), parsed.result.clone());
        }
        Some(Statement::VariableDeclaration {
            name,
            expression: parsed.expression,
            result: parsed.result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_declares_multi_word_variable() {
        let mut variables = VariableService::new();
        let statement = run(
            &VariableDeclarationStatementParser,
            "monthly rent = 1200 + 50",
            &mut variables,
        )
        .unwrap();
        match statement {
            Statement::VariableDeclaration { name, .. } => assert_eq!(name, "monthly rent"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            variables.get("monthly rent").and_then(|d| d.as_numeric()).map(|n| n.value_in_current_unit()),
            Some(Decimal::from(1250))
        );
    }

    #[test]
    fn test_reassignment_uses_previous_value() {
        let mut variables = VariableService::new();
        run(&VariableDeclarationStatementParser, "x = 5", &mut variables).unwrap();
        run(&VariableDeclarationStatementParser, "x = x * 2", &mut variables).unwrap();
        let x = variables.get("x").and_then(|d| d.as_numeric()).unwrap();
        assert_eq!(x.value_in_current_unit(), Decimal::from(10));
    }

    #[test]
    fn test_not_a_declaration() {
        let mut variables = VariableService::new();
        for text in ["= 5", "5 + x = 3", "x = ", "x = 5 +", "1 + 2"] {
            assert!(
                run(&VariableDeclarationStatementParser, text, &mut variables).is_none(),
                "{text}"
            );
        }
        assert!(variables.is_empty());
    }

    #[test]
    fn test_error_result_leaves_variable_undefined() {
        let mut variables = VariableService::new();
        let statement = run(&VariableDeclarationStatementParser, "y = 2 h + 3 m", &mut variables).unwrap();
        assert!(statement.result_data().unwrap().is_error());
        assert!(!variables.contains("y"));
    }
}
