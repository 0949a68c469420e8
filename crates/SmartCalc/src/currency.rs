//! Exchange-rate collaborator.
//!
//! The arithmetic service never owns exchange rates. It is handed an optional
//! [`CurrencyService`] and treats a missing service, or a `None` answer, as
//! "no conversion possible": the operation yields a `CurrencyUnavailable` error value
//! for that line and evaluation carries on.
//!
//! ## Sync vs async
//!
//! Rate lookups are `async` so a provider may call out to a remote service.
//! Expression evaluation is synchronous, so [`convert_blocking`] drives the lookup to
//! completion from whatever thread evaluates:
//!
//! - on a multi-threaded tokio runtime, through `block_in_place` and the current handle
//! - on a current-thread runtime, whose only worker may be the caller, on a scoped
//!   thread against a shared bridge runtime
//! - outside any runtime, on the bridge runtime directly

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, warn};

use crate::error::{CalcError, CalcResult};

/// Asynchronous currency conversion.
#[async_trait]
pub trait CurrencyService: Send + Sync {
    /// Converts `amount` from one ISO currency into another. `None` means no rate is
    /// known.
    async fn convert(&self, from_iso: &str, amount: f64, to_iso: &str) -> Option<f64>;
}

/// Runtime for lookups made outside a multi-threaded tokio runtime.
static BRIDGE_RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("smartcalc-currency")
        .enable_all()
        .build()
        .map_err(|e| warn!(error = %e, "Failed to start currency runtime"))
        .ok()
});

fn block_on_bridge<F>(future: F) -> F::Output
where
    F: Future,
{
    match BRIDGE_RUNTIME.as_ref() {
        Some(runtime) => runtime.block_on(future),
        None => futures::executor::block_on(future),
    }
}

fn block_on_service<F>(future: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| block_on_bridge(future))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => block_on_bridge(future),
    }
}

/// Runs [`CurrencyService::convert`] to completion from synchronous code, inside or
/// outside a tokio runtime.
pub fn convert_blocking(
    service: &dyn CurrencyService,
    from_iso: &str,
    amount: f64,
    to_iso: &str,
) -> Option<f64> {
    let converted = block_on_service(service.convert(from_iso, amount, to_iso));
    debug!(from = from_iso, to = to_iso, amount, ?converted, "Currency conversion");
    converted.filter(|value| value.is_finite())
}

/// Fixed exchange rates relative to one base currency.
///
/// A rate is the amount of that currency worth one unit of the base currency, so
/// with base `USD` and `EUR = 0.9`, `10 USD` converts to `9 EUR`.
#[derive(Debug, Clone, Default)]
pub struct StaticCurrencyService {
    base: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct RatesDocument {
    base: String,
    rates: HashMap<String, f64>,
}

impl StaticCurrencyService {
    pub fn new(base: &str) -> Self {
        let base = base.to_uppercase();
        let mut rates = HashMap::new();
        rates.insert(base.clone(), 1.0);
        Self { base, rates }
    }

    pub fn with_rate(mut self, iso: &str, rate: f64) -> Self {
        self.rates.insert(iso.to_uppercase(), rate);
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Parses `{ "base": "USD", "rates": { "EUR": 0.9, ... } }`.
    pub fn from_json_str(text: &str) -> CalcResult<Self> {
        let document: RatesDocument = serde_json::from_str(text)?;
        let mut service = Self::new(&document.base);
        for (iso, rate) in document.rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CalcError::InvalidInput(format!(
                    "exchange rate for {} must be positive, got {}",
                    iso, rate
                )));
            }
            service = service.with_rate(&iso, rate);
        }
        Ok(service)
    }

    pub fn from_file(path: &Path) -> CalcResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn rate(&self, iso: &str) -> Option<f64> {
        self.rates.get(&iso.to_uppercase()).copied()
    }
}

#[async_trait]
impl CurrencyService for StaticCurrencyService {
    async fn convert(&self, from_iso: &str, amount: f64, to_iso: &str) -> Option<f64> {
        let from = self.rate(from_iso)?;
        let to = self.rate(to_iso)?;
        Some(amount / from * to)
    }
}
