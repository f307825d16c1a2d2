//! The native mechanism, backed by a blocking `ureq` agent.
//!
//! Status-code-as-error is disabled on the agent so 4xx/5xx responses come
//! back as data and classification stays with the completion dispatcher.
//! Only failures before a status arrives (DNS, refused connection) become
//! `ExchangeError`. The body is read without a size limit and decoded
//! lossily.

use std::sync::Arc;

use tracing::debug;

use crate::error::ExchangeError;
use crate::factory::TransportEnvironment;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Exchange;

/// Executes exchanges with `ureq`.
#[derive(Clone)]
pub struct UreqExchange {
    agent: ureq::Agent,
}

impl Default for UreqExchange {
    fn default() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Exchange for UreqExchange {
    fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ExchangeError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        // The status is already known; a body that cannot be read only
        // leaves the response text short.
        let body = match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(status, error = %e, "failed to read response body");
                String::new()
            }
        };

        Ok(HttpResponse { status, headers, body })
    }
}

/// The default host: a native `ureq` mechanism and no legacy mechanisms.
#[derive(Clone, Default)]
pub struct NativeEnvironment {
    exchange: UreqExchange,
}

impl TransportEnvironment for NativeEnvironment {
    fn native(&self) -> Option<Arc<dyn Exchange>> {
        Some(Arc::new(self.exchange.clone()))
    }

    fn instantiate(&self, identifier: &str) -> Result<Arc<dyn Exchange>, ExchangeError> {
        Err(ExchangeError::new(format!(
            "legacy transport {identifier} is not available on this host"
        )))
    }
}
