use tokio_util::sync::CancellationToken;

use super::{Statement, StatementParser};
use crate::arithmetic::ArithmeticService;
use crate::token::{TokenCursor, TokenType};
use crate::variables::VariableService;

/// A line that starts with `#`. The rest of the line is the title.
pub struct HeaderStatementParser;

impl StatementParser for HeaderStatementParser {
    fn name(&self) -> &'static str {
        "header"
    }

    fn try_parse_and_interpret(
        &self,
        _arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        _variables: &mut VariableService,
        _cancellation: &CancellationToken,
    ) -> Option<Statement> {
        if !start.is(TokenType::Header) {
            return None;
        }
        Some(Statement::Header {
            title: start.text().trim_start_matches('#').trim().to_string(),
            span: start.span(),
        })
    }
}
