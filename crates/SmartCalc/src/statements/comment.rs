use tokio_util::sync::CancellationToken;

use super::{Statement, StatementParser};
use crate::arithmetic::ArithmeticService;
use crate::token::{TokenCursor, TokenType};
use crate::variables::VariableService;

/// A line that starts with `//`.
pub struct CommentStatementParser;

impl StatementParser for CommentStatementParser {
    fn name(&self) -> &'static str {
        "comment"
    }

    fn try_parse_and_interpret(
        &self,
        _arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        _variables: &mut VariableService,
        _cancellation: &CancellationToken,
    ) -> Option<Statement> {
        start
            .is(TokenType::Comment)
            .then(|| Statement::Comment { span: start.span() })
    }
}
