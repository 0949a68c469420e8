//! Interpreter configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::currency::CurrencyService;
use crate::resources::Culture;

/// Where grammar, unit and function tables come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ResourceSource {
    /// Tables compiled into the binary
    #[default]
    Embedded,
    /// Tables read from `<dir>/<culture>/{grammar,units,functions}.json`
    Directory(PathBuf),
}

/// Configuration for an [`Interpreter`](crate::interpreter::Interpreter) or a
/// [`ParserAndInterpreter`](crate::session::ParserAndInterpreter) session.
#[derive(Clone, Default)]
pub struct InterpreterConfig {
    /// Culture selecting grammar, unit names and number/date conventions
    pub culture: Culture,
    /// Resource tables location
    pub resources: ResourceSource,
    /// Delay before a session starts evaluating a new text snapshot
    pub debounce: Duration,
    /// Exchange-rate provider; currency conversions fail without one
    pub currency_service: Option<Arc<dyn CurrencyService>>,
}

impl InterpreterConfig {
    pub fn new(culture: Culture) -> Self {
        Self {
            culture,
            ..Self::default()
        }
    }

    pub fn with_resources(mut self, resources: ResourceSource) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_currency_service(mut self, service: Arc<dyn CurrencyService>) -> Self {
        self.currency_service = Some(service);
        self
    }
}

impl fmt::Debug for InterpreterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterConfig")
            .field("culture", &self.culture)
            .field("resources", &self.resources)
            .field("debounce", &self.debounce)
            .field("currency_service", &self.currency_service.is_some())
            .finish()
    }
}
