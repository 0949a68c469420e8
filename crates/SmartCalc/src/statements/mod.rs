//! # Statement Dispatch Chain
//!
//! Each line of a document is offered to a chain of statement parsers. The first
//! parser that recognizes the line interprets it and its [`Statement`] becomes the
//! line's result. A line no parser recognizes has no result.
//!
//! ## Ordering
//!
//! Parsers declare relative constraints (`after: ["comment"]`) instead of absolute
//! positions. [`StatementRegistry::new`] resolves them once with Kahn's algorithm:
//! among parsers whose constraints are satisfied, the one registered first goes
//! first. A cyclic constraint set is rejected. A constraint naming an unknown parser
//! is ignored with a warning.
//!
//! The built-in order is:
//!
//! ```text
//! comment, header -> variable_declaration -> condition -> numerical_calculus
//! ```

mod comment;
mod condition;
mod header;
mod numerical;
mod variable_declaration;

use std::collections::{BTreeSet, HashMap};

use smart_calc_support::{Data, TextSpan};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::arithmetic::ArithmeticService;
use crate::error::{CalcError, CalcResult};
use crate::expression::Expression;
use crate::token::{TokenChain, TokenCursor};
use crate::variables::VariableService;

pub use comment::CommentStatementParser;
pub use condition::ConditionStatementParser;
pub use header::HeaderStatementParser;
pub use numerical::NumericalCalculusStatementParser;
pub use variable_declaration::VariableDeclarationStatementParser;

/// The interpreted form of one line.
#[derive(Debug, Clone)]
pub enum Statement {
    NumericalCalculus {
        expression: Expression,
        result: Data,
    },
    VariableDeclaration {
        name: String,
        expression: Expression,
        result: Data,
    },
    Comment {
        span: TextSpan,
    },
    Header {
        title: String,
        span: TextSpan,
    },
    Condition {
        expression: Expression,
        result: Data,
    },
}

impl Statement {
    /// The value shown for the line, if the statement has one.
    pub fn result_data(&self) -> Option<&Data> {
        match self {
            Statement::NumericalCalculus { result, .. }
            | Statement::VariableDeclaration { result, .. }
            | Statement::Condition { result, .. } => Some(result),
            Statement::Comment { .. } | Statement::Header { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::NumericalCalculus { .. } => "numerical_calculus",
            Statement::VariableDeclaration { .. } => "variable_declaration",
            Statement::Comment { .. } => "comment",
            Statement::Header { .. } => "header",
            Statement::Condition { .. } => "condition",
        }
    }
}

/// A parser for one kind of statement.
pub trait StatementParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parsers that must be tried before this one.
    fn after(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parsers that must be tried after this one.
    fn before(&self) -> &'static [&'static str] {
        &[]
    }

    /// Recognizes and interprets the line starting at `start`. Returns `None` when the
    /// line is not this kind of statement or the pass was cancelled.
    fn try_parse_and_interpret(
        &self,
        arithmetic: &ArithmeticService,
        start: TokenCursor<'_>,
        variables: &mut VariableService,
        cancellation: &CancellationToken,
    ) -> Option<Statement>;
}

/// Orders `parsers` so every before/after constraint holds.
///
/// Returns indices into `parsers`.
pub fn resolve_order(parsers: &[Box<dyn StatementParser>]) -> CalcResult<Vec<usize>> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (index, parser) in parsers.iter().enumerate() {
        if index_of.insert(parser.name(), index).is_some() {
            return Err(CalcError::InvalidInput(format!(
                "statement parser '{}' is registered twice",
                parser.name()
            )));
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); parsers.len()];
    let mut in_degree = vec![0usize; parsers.len()];
    let mut add_edge = |from: usize, to: usize| {
        successors[from].push(to);
        in_degree[to] += 1;
    };

    for (index, parser) in parsers.iter().enumerate() {
        for name in parser.after() {
            match index_of.get(name) {
                Some(&earlier) => add_edge(earlier, index),
                None => warn!(parser = parser.name(), after = name, "Unknown statement parser in ordering constraint"),
            }
        }
        for name in parser.before() {
            match index_of.get(name) {
                Some(&later) => add_edge(index, later),
                None => warn!(parser = parser.name(), before = name, "Unknown statement parser in ordering constraint"),
            }
        }
    }

    // Kahn's algorithm; ready parsers leave in registration order
    let mut ready: BTreeSet<usize> = (0..parsers.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(parsers.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &successor in &successors[next] {
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                ready.insert(successor);
            }
        }
    }

    if order.len() < parsers.len() {
        let involved = (0..parsers.len())
            .filter(|i| in_degree[*i] > 0)
            .map(|i| parsers[i].name().to_string())
            .collect();
        return Err(CalcError::CyclicStatementOrder(involved));
    }
    Ok(order)
}

/// Statement parsers in resolved order.
pub struct StatementRegistry {
    parsers: Vec<Box<dyn StatementParser>>,
}

impl StatementRegistry {
    pub fn new(parsers: Vec<Box<dyn StatementParser>>) -> CalcResult<Self> {
        let order = resolve_order(&parsers)?;
        let mut slots: Vec<Option<Box<dyn StatementParser>>> =
            parsers.into_iter().map(Some).collect();
        let parsers: Vec<Box<dyn StatementParser>> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();
        debug!(
            order = ?parsers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Resolved statement order"
        );
        Ok(Self { parsers })
    }

    /// The built-in statement parsers.
    pub fn standard() -> CalcResult<Self> {
        Self::new(vec![
            Box::new(NumericalCalculusStatementParser),
            Box::new(ConditionStatementParser),
            Box::new(VariableDeclarationStatementParser),
            Box::new(CommentStatementParser),
            Box::new(HeaderStatementParser),
        ])
    }

    pub fn order(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    /// Offers the line to each parser in order; the first match wins.
    pub fn interpret_line(
        &self,
        arithmetic: &ArithmeticService,
        line: &TokenChain,
        variables: &mut VariableService,
        cancellation: &CancellationToken,
    ) -> Option<Statement> {
        let start = line.first()?;
        self.parsers.iter().find_map(|parser| {
            if cancellation.is_cancelled() {
                return None;
            }
            parser.try_parse_and_interpret(arithmetic, start, variables, cancellation)
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ResourceSource;
    use crate::data_parsers::DataParserRegistry;
    use crate::lexer::tokenize_line;
    use crate::resources::{Culture, load_culture};

    pub fn arithmetic() -> ArithmeticService {
        let resources = load_culture(&ResourceSource::Embedded, &Culture::new("en-us")).unwrap();
        ArithmeticService::new(resources, None)
    }

    pub fn chain(arithmetic: &ArithmeticService, text: &str) -> TokenChain {
        let line = tokenize_line(&arithmetic.resources().grammar, 0, text);
        DataParserRegistry::standard()
            .annotate(arithmetic.resources(), &line, &CancellationToken::new())
            .unwrap()
    }

    /// Runs one parser over `text`.
    pub fn run(
        parser: &dyn StatementParser,
        text: &str,
        variables: &mut VariableService,
    ) -> Option<Statement> {
        let arithmetic = arithmetic();
        let chain = chain(&arithmetic, text);
        parser.try_parse_and_interpret(
            &arithmetic,
            chain.first()?,
            variables,
            &CancellationToken::new(),
        )
    }
}
