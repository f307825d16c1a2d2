//! Transport construction with a native mechanism and legacy fallbacks.
//!
//! # Design
//! The host environment is reached only through `TransportEnvironment`: it
//! may expose a native mechanism, and it may be able to instantiate legacy
//! mechanisms by identifier. `TransportFactory` prefers the native one. When
//! that is absent it probes `LEGACY_TRANSPORTS` newest first and records the
//! first identifier that instantiates in a `StrategyCache`, so later calls
//! go straight to it.
//!
//! The cache is write-once. `StrategyCache::global` is shared by every
//! factory built with `TransportFactory::new`; tests hand a factory its own
//! cache instead.

use std::sync::{Arc, LazyLock, OnceLock};

use tracing::debug;

use crate::error::{AjaxError, ExchangeError};
use crate::native::NativeEnvironment;
use crate::transport::{Exchange, Transport};

/// Identifier carried by handles created from the native mechanism.
pub const NATIVE_TRANSPORT: &str = "native";

/// Legacy mechanism identifiers, most recent first.
pub const LEGACY_TRANSPORTS: [&str; 4] = [
    "MSXML2.XMLHttp.6.0",
    "MSXML2.XMLHttp.3.0",
    "MSXML2.XMLHttp",
    "Microsoft.XMLHttp",
];

/// What the host offers for building transports.
pub trait TransportEnvironment: Send + Sync {
    /// A fresh instance of the native mechanism, if the host has one.
    fn native(&self) -> Option<Arc<dyn Exchange>>;

    /// Instantiate the legacy mechanism named `identifier`.
    fn instantiate(&self, identifier: &str) -> Result<Arc<dyn Exchange>, ExchangeError>;
}

/// Which legacy identifier worked. Empty until the first successful probe,
/// then fixed for the life of the cache.
#[derive(Debug, Default)]
pub struct StrategyCache {
    chosen: OnceLock<String>,
}

static GLOBAL_STRATEGY: LazyLock<Arc<StrategyCache>> = LazyLock::new(|| Arc::new(StrategyCache::new()));

impl StrategyCache {
    pub const fn new() -> Self {
        Self {
            chosen: OnceLock::new(),
        }
    }

    /// The process-wide cache.
    pub fn global() -> Arc<StrategyCache> {
        GLOBAL_STRATEGY.clone()
    }

    pub fn get(&self) -> Option<&str> {
        self.chosen.get().map(String::as_str)
    }

    /// Record `identifier` unless another one got there first. Returns the
    /// identifier that is cached afterwards.
    fn record(&self, identifier: &str) -> &str {
        self.chosen.get_or_init(|| identifier.to_string())
    }
}

/// Produces one `Transport` per call.
#[derive(Clone)]
pub struct TransportFactory {
    environment: Arc<dyn TransportEnvironment>,
    strategy: Arc<StrategyCache>,
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::new(Arc::new(NativeEnvironment::default()))
    }
}

impl TransportFactory {
    /// Factory over `environment` sharing the process-wide strategy cache.
    pub fn new(environment: Arc<dyn TransportEnvironment>) -> Self {
        Self::with_strategy(environment, StrategyCache::global())
    }

    pub fn with_strategy(environment: Arc<dyn TransportEnvironment>, strategy: Arc<StrategyCache>) -> Self {
        Self { environment, strategy }
    }

    pub fn strategy(&self) -> &StrategyCache {
        &self.strategy
    }

    pub fn create_transport(&self) -> Result<Transport, AjaxError> {
        if let Some(exchange) = self.environment.native() {
            return Ok(Transport::new(NATIVE_TRANSPORT, exchange));
        }

        if let Some(identifier) = self.strategy.get() {
            let exchange = self.environment.instantiate(identifier).map_err(|e| {
                AjaxError::TransportUnavailable(format!("cached transport {identifier} failed: {e}"))
            })?;
            return Ok(Transport::new(identifier, exchange));
        }

        for identifier in LEGACY_TRANSPORTS {
            match self.environment.instantiate(identifier) {
                Ok(exchange) => {
                    let cached = self.strategy.record(identifier);
                    debug!(transport = identifier, cached, "legacy transport selected");
                    return Ok(Transport::new(identifier, exchange));
                }
                Err(e) => debug!(transport = identifier, error = %e, "legacy transport unavailable"),
            }
        }

        Err(AjaxError::TransportUnavailable(
            "no native transport and no legacy transport could be instantiated".to_string(),
        ))
    }
}
