//! The transport handle: one request/response exchange with an observable
//! lifecycle.
//!
//! # Design
//! `Transport` mirrors the browser request object: `open` records method,
//! URL and sync/async mode, `set_request_header` adds headers, and `send`
//! hands an `HttpRequest` to the mechanism (`Exchange`) that created the
//! handle. Every lifecycle transition notifies the registered observer.
//!
//! A synchronous send runs the exchange on the calling thread, so the
//! handle is `Done` when `send` returns. An asynchronous send runs it on a
//! worker thread and returns at once; the observer then fires on that
//! thread. The observer is always invoked with the state lock released, so
//! it may read the handle freely.
//!
//! Connection failures do not surface as `Err`: the handle reaches `Done`
//! with status 0 and the message available through `Transport::error`.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{AjaxError, ExchangeError};
use crate::http::{find_header, HttpMethod, HttpRequest, HttpResponse};

/// A mechanism able to execute one exchange.
pub trait Exchange: Send + Sync {
    fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeError>;
}

/// Lifecycle of a handle. `Done` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

type Observer = Arc<dyn Fn(&Transport) + Send + Sync>;

#[derive(Debug, Clone)]
struct Opened {
    method: HttpMethod,
    url: String,
    asynchronous: bool,
}

#[derive(Default)]
struct State {
    ready_state: ReadyState,
    opened: Option<Opened>,
    request_headers: Vec<(String, String)>,
    sent: bool,
    request: Option<HttpRequest>,
    status: u16,
    response_headers: Vec<(String, String)>,
    response_body: String,
    error: Option<String>,
    observer: Option<Observer>,
}

struct Inner {
    identifier: String,
    exchange: Arc<dyn Exchange>,
    state: Mutex<State>,
}

/// Handle for one exchange. Cloning yields another handle to the same
/// exchange.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Transport")
            .field("identifier", &self.inner.identifier)
            .field("ready_state", &state.ready_state)
            .field("status", &state.status)
            .finish()
    }
}

impl Transport {
    /// Wrap a mechanism instance. `identifier` names the mechanism that
    /// produced it.
    pub fn new(identifier: impl Into<String>, exchange: Arc<dyn Exchange>) -> Self {
        Self {
            inner: Arc::new(Inner {
                identifier: identifier.into(),
                exchange,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    /// Register the lifecycle observer, replacing any previous one.
    pub fn on_ready_state_change<F>(&self, observer: F)
    where
        F: Fn(&Transport) + Send + Sync + 'static,
    {
        self.inner.state.lock().observer = Some(Arc::new(observer));
    }

    pub fn open(&self, method: HttpMethod, url: &str, asynchronous: bool) -> Result<(), AjaxError> {
        {
            let mut state = self.inner.state.lock();
            if state.sent && state.ready_state != ReadyState::Done {
                return Err(AjaxError::InvalidState(
                    "cannot reopen a transport while its exchange is in flight".to_string(),
                ));
            }
            state.opened = Some(Opened {
                method,
                url: url.to_string(),
                asynchronous,
            });
            state.request_headers.clear();
            state.sent = false;
            state.request = None;
            state.status = 0;
            state.response_headers.clear();
            state.response_body.clear();
            state.error = None;
        }
        self.transition(ReadyState::Opened);
        Ok(())
    }

    pub fn set_request_header(&self, name: &str, value: &str) -> Result<(), AjaxError> {
        let mut state = self.inner.state.lock();
        if state.ready_state != ReadyState::Opened || state.sent {
            return Err(AjaxError::InvalidState(
                "request headers can only be set after open and before send".to_string(),
            ));
        }
        state.request_headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    /// Dispatch the opened request with an optional body.
    pub fn send(&self, body: Option<String>) -> Result<(), AjaxError> {
        let (request, asynchronous) = {
            let mut state = self.inner.state.lock();
            if state.ready_state != ReadyState::Opened || state.sent {
                return Err(AjaxError::InvalidState(
                    "send requires an opened transport that has not been sent".to_string(),
                ));
            }
            let Some(opened) = state.opened.clone() else {
                return Err(AjaxError::InvalidState("transport was never opened".to_string()));
            };
            let request = HttpRequest {
                method: opened.method,
                url: opened.url,
                headers: state.request_headers.clone(),
                body,
            };
            state.sent = true;
            state.request = Some(request.clone());
            (request, opened.asynchronous)
        };

        debug!(
            transport = %self.inner.identifier,
            method = %request.method,
            url = %request.url,
            asynchronous,
            "sending request"
        );

        if !asynchronous {
            let result = self.inner.exchange.exchange(&request);
            self.finish(result);
            return Ok(());
        }

        let handle = self.clone();
        let spawned = thread::Builder::new()
            .name("ajax-transport".to_string())
            .spawn(move || {
                let result = handle.inner.exchange.exchange(&request);
                handle.finish(result);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn transport worker");
            self.finish(Err(ExchangeError::new(format!("failed to start exchange: {e}"))));
        }
        Ok(())
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().ready_state
    }

    /// HTTP status, or 0 before headers arrive and after connection failures.
    pub fn status(&self) -> u16 {
        self.inner.state.lock().status
    }

    pub fn response_text(&self) -> String {
        self.inner.state.lock().response_body.clone()
    }

    pub fn response_headers(&self) -> Vec<(String, String)> {
        self.inner.state.lock().response_headers.clone()
    }

    pub fn response_header(&self, name: &str) -> Option<String> {
        let state = self.inner.state.lock();
        find_header(&state.response_headers, name).map(str::to_string)
    }

    /// The request as it was handed to the mechanism, once sent.
    pub fn request(&self) -> Option<HttpRequest> {
        self.inner.state.lock().request.clone()
    }

    /// Why the exchange failed before producing a response, if it did.
    pub fn error(&self) -> Option<String> {
        self.inner.state.lock().error.clone()
    }

    fn finish(&self, result: Result<HttpResponse, ExchangeError>) {
        match result {
            Ok(response) => {
                {
                    let mut state = self.inner.state.lock();
                    state.status = response.status;
                    state.response_headers = response.headers;
                }
                self.transition(ReadyState::HeadersReceived);
                self.transition(ReadyState::Loading);
                self.inner.state.lock().response_body = response.body;
            }
            Err(e) => {
                debug!(transport = %self.inner.identifier, error = %e, "exchange failed");
                let mut state = self.inner.state.lock();
                state.status = 0;
                state.error = Some(e.to_string());
            }
        }
        self.transition(ReadyState::Done);
    }

    fn transition(&self, next: ReadyState) {
        let observer = {
            let mut state = self.inner.state.lock();
            state.ready_state = next;
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer(self);
        }
    }
}
