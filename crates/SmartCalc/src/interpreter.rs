//! # Document Interpreter
//!
//! Runs the whole pipeline over one document snapshot:
//!
//! 1. split into lines and tokenize each with the culture's grammar
//! 2. run the data parsers over each line and merge the winners into the tokens
//! 3. interpret lines top to bottom through the statement chain, threading one
//!    [`VariableService`] through the pass
//! 4. render each line's value with the culture's conventions
//!
//! Steps 1 and 2 only look at one line at a time and run in parallel on the rayon
//! pool. Step 3 is sequential because a line may read variables declared above it.
//!
//! Cancellation is checked between lines. A cancelled pass returns
//! [`CalcError::Cancelled`] and its partial results are dropped.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use smart_calc_support::ResultLine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::arithmetic::ArithmeticService;
use crate::config::InterpreterConfig;
use crate::data_parsers::DataParserRegistry;
use crate::error::{CalcError, CalcResult};
use crate::format::format_data;
use crate::lexer::{split_lines, tokenize_line};
use crate::resources::{Culture, CultureResources, load_culture};
use crate::statements::{Statement, StatementRegistry};
use crate::token::{TokenChain, TokenizedDocument};
use crate::variables::VariableService;

/// Outcome of one complete pass.
#[derive(Debug, Clone)]
pub struct DocumentEvaluation {
    /// One entry per input line
    pub lines: Vec<ResultLine>,
    /// The statement each line matched, if any
    pub statements: Vec<Option<Statement>>,
    /// Variables as left by the last line
    pub variables: VariableService,
}

impl DocumentEvaluation {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            statements: Vec::new(),
            variables: VariableService::new(),
        }
    }
}

/// Interprets documents for one culture.
pub struct Interpreter {
    arithmetic: ArithmeticService,
    data_parsers: DataParserRegistry,
    statements: StatementRegistry,
}

impl Interpreter {
    /// Loads the culture's resources and builds the standard registries.
    pub fn new(config: &InterpreterConfig) -> CalcResult<Self> {
        let resources = load_culture(&config.resources, &config.culture)?;
        Ok(Self::with_registries(
            ArithmeticService::new(resources, config.currency_service.clone()),
            DataParserRegistry::standard(),
            StatementRegistry::standard()?,
        ))
    }

    pub fn with_registries(
        arithmetic: ArithmeticService,
        data_parsers: DataParserRegistry,
        statements: StatementRegistry,
    ) -> Self {
        Self {
            arithmetic,
            data_parsers,
            statements,
        }
    }

    pub fn resources(&self) -> &Arc<CultureResources> {
        self.arithmetic.resources()
    }

    pub fn culture(&self) -> &Culture {
        &self.resources().culture
    }

    /// Tokenizes and annotates every line of `text`.
    pub fn tokenize(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> CalcResult<TokenizedDocument> {
        let resources = self.resources();
        let lines: Vec<&str> = split_lines(text).collect();
        let chains = lines
            .par_iter()
            .enumerate()
            .map(|(index, line)| {
                if cancellation.is_cancelled() {
                    return None;
                }
                let chain = tokenize_line(&resources.grammar, index, line);
                self.data_parsers.annotate(resources, &chain, cancellation)
            })
            .collect::<Option<Vec<TokenChain>>>()
            .ok_or(CalcError::Cancelled)?;
        Ok(TokenizedDocument::new(chains))
    }

    /// Evaluates a whole document.
    pub fn evaluate_document(
        &self,
        text: &str,
        cancellation: &CancellationToken,
    ) -> CalcResult<DocumentEvaluation> {
        let started = Instant::now();
        let document = self.tokenize(text, cancellation)?;
        let grammar = &self.resources().grammar;

        let mut variables = VariableService::new();
        let mut lines = Vec::with_capacity(document.lines.len());
        let mut statements = Vec::with_capacity(document.lines.len());

        for chain in &document.lines {
            if cancellation.is_cancelled() {
                return Err(CalcError::Cancelled);
            }
            let statement =
                self.statements
                    .interpret_line(&self.arithmetic, chain, &mut variables, cancellation);
            if cancellation.is_cancelled() {
                return Err(CalcError::Cancelled);
            }

            let line_index = chain.line_index();
            let line = match statement.as_ref().and_then(Statement::result_data) {
                Some(data) => ResultLine {
                    line_index,
                    display_text: format_data(grammar, data),
                    summarized_result_data: Some(data.clone()),
                },
                None => ResultLine::empty(line_index),
            };
            trace!(
                line = line_index,
                statement = statement.as_ref().map(Statement::kind_name),
                result = %line.display_text,
                "Interpreted line"
            );
            lines.push(line);
            statements.push(statement);
        }

        debug!(
            culture = %self.culture(),
            lines = lines.len(),
            tokens = document.token_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Evaluated document"
        );
        Ok(DocumentEvaluation {
            lines,
            statements,
            variables,
        })
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("arithmetic", &self.arithmetic)
            .field("data_parsers", &self.data_parsers.names())
            .field("statements", &self.statements.order())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{CurrencyService, StaticCurrencyService};
    use async_trait::async_trait;
    use smart_calc_support::{DataKind, OperationError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn interpreter(culture: &str) -> Interpreter {
        Interpreter::new(&InterpreterConfig::new(Culture::new(culture))).unwrap()
    }

    fn display(interpreter: &Interpreter, text: &str) -> Vec<String> {
        interpreter
            .evaluate_document(text, &CancellationToken::new())
            .unwrap()
            .lines
            .into_iter()
            .map(|line| line.display_text)
            .collect()
    }

    #[test]
    fn test_one_result_per_line() {
        let interpreter = interpreter("en-us");
        let text = "# Trip\n// fuel\nd = 120 km\n\nd / 2 h\nnonsense words\nd > 100 km";
        let result = display(&interpreter, text);
        assert_eq!(result.len(), 7);
        assert_eq!(result[0], "");
        assert_eq!(result[1], "");
        assert_eq!(result[2], "120 km");
        assert_eq!(result[3], "");
        assert_eq!(result[5], "");
        assert_eq!(result[6], "true");
    }

    #[test]
    fn test_variables_flow_downwards_only() {
        let interpreter = interpreter("en-us");
        let evaluation = interpreter
            .evaluate_document("y + 1\ny = 2\ny + 1", &CancellationToken::new())
            .unwrap();
        assert!(!evaluation.lines[0].has_result());
        assert_eq!(evaluation.lines[2].display_text, "3");
        assert_eq!(evaluation.variables.names(), vec!["y"]);
    }

    #[test]
    fn test_bad_line_does_not_stop_evaluation() {
        let interpreter = interpreter("en-us");
        let evaluation = interpreter
            .evaluate_document("a = 2 h + $3\n1 / 0\n4 * 2", &CancellationToken::new())
            .unwrap();
        assert!(matches!(
            evaluation.lines[0].summarized_result_data.as_ref().and_then(|d| d.as_error()),
            Some(OperationError::IncompatibleUnits { .. })
        ));
        assert_eq!(evaluation.lines[1].display_text, "Division by zero");
        assert_eq!(evaluation.lines[2].display_text, "8");
        assert!(evaluation.variables.is_empty());
    }

    #[test]
    fn test_currency_conversion_with_service() {
        let service = StaticCurrencyService::new("USD").with_rate("EUR", 0.5);
        let config = InterpreterConfig::new(Culture::new("en-us"))
            .with_currency_service(Arc::new(service));
        let interpreter = Interpreter::new(&config).unwrap();
        assert_eq!(display(&interpreter, "10 USD in EUR"), vec!["5 EUR"]);
    }

    #[derive(Default)]
    struct CountingRates {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CurrencyService for CountingRates {
        async fn convert(&self, _from_iso: &str, amount: f64, _to_iso: &str) -> Option<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(amount * 2.0)
        }
    }

    #[test]
    fn test_each_conversion_reaches_the_service_once() {
        let rates = Arc::new(CountingRates::default());
        let config = InterpreterConfig::new(Culture::new("en-us"))
            .with_currency_service(rates.clone());
        let interpreter = Interpreter::new(&config).unwrap();

        assert_eq!(display(&interpreter, "10 USD in EUR"), vec!["20 EUR"]);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 1);

        let result = display(&interpreter, "x = 1 USD in EUR
(3 USD in EUR) > 5 EUR");
        assert_eq!(result, vec!["2 EUR", "true"]);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_lowercase_iso_code() {
        let service = StaticCurrencyService::new("USD").with_rate("EUR", 0.5);
        let config = InterpreterConfig::new(Culture::new("en-us"))
            .with_currency_service(Arc::new(service));
        let interpreter = Interpreter::new(&config).unwrap();
        assert_eq!(display(&interpreter, "10 usd in EUR"), vec!["5 EUR"]);
    }

    #[test]
    fn test_currency_without_service() {
        let interpreter = interpreter("en-us");
        let evaluation = interpreter
            .evaluate_document("1 USD\n1 USD in EUR", &CancellationToken::new())
            .unwrap();
        assert_eq!(evaluation.lines[0].display_text, "1 USD");
        assert_eq!(
            evaluation.lines[1].summarized_result_data.as_ref().map(|d| d.kind()),
            Some(DataKind::Error)
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let interpreter = interpreter("en-us");
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            interpreter.evaluate_document("1 + 1", &token),
            Err(CalcError::Cancelled)
        ));
    }

    #[test]
    fn test_french_document() {
        let interpreter = interpreter("fr-FR");
        let result = display(&interpreter, "prix = 1\u{a0}234,5\nprix × 2");
        assert_eq!(result, vec!["1\u{a0}234,5", "2\u{a0}469"]);
    }
}
