//! Prioritized acquisition strategies with graceful degradation.
//!
//! Biological source APIs are unreliable: rate limits, schema drift,
//! expired auth. Each adapter hands an ordered strategy list to
//! [`resolve`], which returns the first success and only raises once every
//! strategy is exhausted. Failures are logged per strategy so a degraded
//! run is visible in the logs, not silent.

use crate::error::{AcquireError, StrategyError};
use tracing::{info, warn};

/// One way of acquiring raw data for a source. Strategies are cheap to
/// construct and attempted at most once per `resolve` call.
pub struct Strategy<'a> {
    pub name: &'static str,
    fetch: Box<dyn Fn() -> Result<String, StrategyError> + 'a>,
}

impl<'a> Strategy<'a> {
    pub fn new(
        name: &'static str,
        fetch: impl Fn() -> Result<String, StrategyError> + 'a,
    ) -> Self {
        Self {
            name,
            fetch: Box::new(fetch),
        }
    }
}

/// Attempt strategies in order, returning the first success.
///
/// An empty-but-successful payload is a success; callers that consider
/// empty data invalid must reject it inside the strategy with
/// `StrategyError::Parse`. Only acquisition-layer errors are caught here;
/// programming errors panic and propagate.
pub fn resolve(source: &str, strategies: &[Strategy<'_>]) -> Result<String, AcquireError> {
    let mut attempts = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match (strategy.fetch)() {
            Ok(raw) => {
                info!(
                    source,
                    strategy = strategy.name,
                    bytes = raw.len(),
                    "Acquisition succeeded"
                );
                return Ok(raw);
            }
            Err(e) => {
                warn!(
                    source,
                    strategy = strategy.name,
                    error = %e,
                    "Acquisition strategy failed, trying next"
                );
                attempts.push((strategy.name.to_string(), e.to_string()));
            }
        }
    }

    Err(AcquireError {
        adapter: source.to_string(),
        attempts,
    })
}
