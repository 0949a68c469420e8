//! # Session Orchestrator
//!
//! [`ParserAndInterpreter`] owns one document and keeps its results up to date while
//! the text changes.
//!
//! ## Overview
//!
//! - [`set_text`](ParserAndInterpreter::set_text) is synchronous and cheap. It stores
//!   the snapshot, cancels the pass in flight and schedules a new one on the Tokio
//!   runtime the session was created in.
//! - A pass waits out the debounce delay, then runs the interpreter on a blocking
//!   thread with its own cancellation token.
//! - A finished pass publishes its lines and variables only if it is still the newest
//!   one. Cancelled and superseded passes are dropped whole, so readers never see a
//!   mix of two snapshots.
//! - [`wait_for_result`](ParserAndInterpreter::wait_for_result) resolves with the
//!   lines of the newest snapshot known at the time of the call.
//!
//! ## Example
//!
//! ```no_run
//! use smart_calc::{InterpreterConfig, ParserAndInterpreter};
//!
//! # async fn demo() -> smart_calc::CalcResult<()> {
//! let session = ParserAndInterpreter::new(InterpreterConfig::default())?;
//! session.set_text("price = 40\nprice * 3");
//! let lines = session.wait_for_result().await;
//! assert_eq!(lines[1].display_text, "120");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use smart_calc_support::ResultLine;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::InterpreterConfig;
use crate::error::{CalcError, CalcResult};
use crate::interpreter::{DocumentEvaluation, Interpreter};
use crate::resources::Culture;
use crate::variables::VariableService;

struct PassState {
    generation: u64,
    cancellation: CancellationToken,
    text: Arc<str>,
}

#[derive(Clone, Default)]
struct Published {
    generation: u64,
    lines: Arc<Vec<ResultLine>>,
}

struct SessionInner {
    interpreter: Arc<Interpreter>,
    runtime: Handle,
    debounce: Duration,
    state: Mutex<PassState>,
    published: watch::Sender<Published>,
    variables: ArcSwap<VariableService>,
}

/// A live document with incrementally refreshed results.
pub struct ParserAndInterpreter {
    inner: Arc<SessionInner>,
}

impl ParserAndInterpreter {
    /// Creates a session on the current Tokio runtime.
    ///
    /// Fails with [`CalcError::NoRuntime`] outside of a runtime, or with
    /// [`CalcError::ResourceLoad`] if the culture cannot be initialized.
    pub fn new(config: InterpreterConfig) -> CalcResult<Self> {
        let runtime = Handle::try_current().map_err(|_| CalcError::NoRuntime)?;
        let interpreter = Interpreter::new(&config)?;
        info!(culture = %interpreter.culture(), "Created calculator session");
        Ok(Self::with_interpreter(
            Arc::new(interpreter),
            runtime,
            config.debounce,
        ))
    }

    pub fn with_interpreter(
        interpreter: Arc<Interpreter>,
        runtime: Handle,
        debounce: Duration,
    ) -> Self {
        let (published, _) = watch::channel(Published::default());
        Self {
            inner: Arc::new(SessionInner {
                interpreter,
                runtime,
                debounce,
                state: Mutex::new(PassState {
                    generation: 0,
                    cancellation: CancellationToken::new(),
                    text: Arc::from(""),
                }),
                published,
                variables: ArcSwap::from_pointee(VariableService::new()),
            }),
        }
    }

    pub fn culture(&self) -> &Culture {
        self.inner.interpreter.culture()
    }

    /// The latest text handed to [`set_text`](Self::set_text).
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.inner.state.lock().text)
    }

    /// Replaces the document and schedules its evaluation.
    pub fn set_text(&self, text: impl Into<String>) {
        let text: Arc<str> = Arc::from(text.into());
        let (generation, cancellation) = {
            let mut state = self.inner.state.lock();
            state.cancellation.cancel();
            state.generation += 1;
            state.cancellation = CancellationToken::new();
            state.text = Arc::clone(&text);
            (state.generation, state.cancellation.clone())
        };
        debug!(generation, bytes = text.len(), "Scheduled evaluation pass");

        let inner = Arc::clone(&self.inner);
        self.inner
            .runtime
            .spawn(async move { inner.run_pass(generation, text, cancellation).await });
    }

    /// Waits for the result of the newest text snapshot.
    ///
    /// Before the first [`set_text`](Self::set_text) this resolves immediately with
    /// no lines.
    pub async fn wait_for_result(&self) -> Vec<ResultLine> {
        let mut receiver = self.inner.published.subscribe();
        loop {
            let target = self.inner.state.lock().generation;
            {
                let current = receiver.borrow_and_update();
                if current.generation >= target {
                    return current.lines.as_ref().clone();
                }
            }
            if receiver.changed().await.is_err() {
                return Vec::new();
            }
        }
    }

    /// Variables of the last published pass.
    pub fn variables(&self) -> Arc<VariableService> {
        self.inner.variables.load_full()
    }
}

impl Drop for ParserAndInterpreter {
    fn drop(&mut self) {
        self.inner.state.lock().cancellation.cancel();
    }
}

impl SessionInner {
    async fn run_pass(&self, generation: u64, text: Arc<str>, cancellation: CancellationToken) {
        if !self.debounce.is_zero() {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!(generation, "Pass superseded during debounce");
                    return;
                }
                _ = tokio::time::sleep(self.debounce) => {}
            }
        }

        let interpreter = Arc::clone(&self.interpreter);
        let token = cancellation.clone();
        let outcome =
            tokio::task::spawn_blocking(move || interpreter.evaluate_document(&text, &token)).await;

        match outcome {
            Ok(Ok(evaluation)) => self.publish(generation, &cancellation, evaluation),
            Ok(Err(CalcError::Cancelled)) => debug!(generation, "Pass cancelled"),
            Ok(Err(e)) => {
                warn!(generation, error = %e, "Evaluation pass failed");
                self.publish(generation, &cancellation, DocumentEvaluation::empty());
            }
            Err(e) => {
                warn!(generation, error = %e, "Evaluation task failed");
                self.publish(generation, &cancellation, DocumentEvaluation::empty());
            }
        }
    }

    fn publish(
        &self,
        generation: u64,
        cancellation: &CancellationToken,
        evaluation: DocumentEvaluation,
    ) {
        let state = self.state.lock();
        if cancellation.is_cancelled() || state.generation != generation {
            debug!(generation, newest = state.generation, "Discarded stale pass");
            return;
        }
        self.variables.store(Arc::new(evaluation.variables));
        self.published.send_replace(Published {
            generation,
            lines: Arc::new(evaluation.lines),
        });
        debug!(generation, "Published pass");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ParserAndInterpreter {
        ParserAndInterpreter::new(InterpreterConfig::new(Culture::new("en-us"))).unwrap()
    }

    fn texts(lines: &[ResultLine]) -> Vec<&str> {
        lines.iter().map(|l| l.display_text.as_str()).collect()
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(
            ParserAndInterpreter::new(InterpreterConfig::default()),
            Err(CalcError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_wait_before_any_text() {
        assert!(session().wait_for_result().await.is_empty());
    }

    #[tokio::test]
    async fn test_evaluates_latest_text() {
        let session = session();
        session.set_text("x = 5\nx + 3");
        assert_eq!(texts(&session.wait_for_result().await), vec!["5", "8"]);
        assert_eq!(&*session.text(), "x = 5\nx + 3");
    }

    #[tokio::test]
    async fn test_superseded_pass_never_publishes() {
        let session = session();
        session.set_text("stale = 1\nstale * 2");
        session.set_text("fresh = 2");
        let lines = session.wait_for_result().await;
        assert_eq!(texts(&lines), vec!["2"]);
        let variables = session.variables();
        assert!(variables.contains("fresh"));
        assert!(!variables.contains("stale"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_debounce_coalesces_edits() {
        let config = InterpreterConfig::new(Culture::new("en-us"))
            .with_debounce(Duration::from_millis(20));
        let session = ParserAndInterpreter::new(config).unwrap();
        for n in 1..=5 {
            session.set_text(format!("{n} * 10"));
        }
        assert_eq!(texts(&session.wait_for_result().await), vec!["50"]);
    }
}
