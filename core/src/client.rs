//! Request orchestration: options in, live transport out.
//!
//! # Design
//! `build_request` is the pure half. It validates the method, folds GET
//! data into the URL and turns POST data into a form body plus the
//! form-encoded content type, producing an `HttpRequest` without any I/O.
//! `Ajax::send_request` then drives a transport through the same steps a
//! browser request object takes: create, attach completion, open, set
//! header, send.
//!
//! The returned handle is live. For an async request it is usually still
//! in flight; for a sync request it is already `Done` and the matching
//! callback has run.

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use serde_json::Value;

use crate::dispatch::{attach_completion, Callback};
use crate::error::AjaxError;
use crate::factory::{TransportEnvironment, TransportFactory};
use crate::http::{HttpMethod, HttpRequest};
use crate::params::{add_query_param, form_encode, json_type, ParamValue, QueryParams};
use crate::transport::Transport;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;";

/// Data attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    /// Query pairs for GET, form fields for POST.
    Map(Vec<(String, ParamValue)>),
    /// Appended to the URL as one escaped token for GET, sent verbatim as
    /// the body for POST.
    Raw(String),
}

impl RequestData {
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        RequestData::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn raw(data: impl Into<String>) -> Self {
        RequestData::Raw(data.into())
    }

    fn is_empty_raw(&self) -> bool {
        matches!(self, RequestData::Raw(s) if s.is_empty())
    }

    fn into_query(self) -> QueryParams {
        match self {
            RequestData::Map(pairs) => QueryParams::Map(pairs),
            RequestData::Raw(fragment) => QueryParams::RawFragment(fragment),
        }
    }

    fn into_body(self) -> String {
        match self {
            RequestData::Map(pairs) => form_encode(&pairs),
            RequestData::Raw(body) => body,
        }
    }
}

/// Per-request settings.
pub struct RequestOptions {
    pub asynchronous: bool,
    pub data: Option<RequestData>,
    pub method: String,
    success: Option<Callback>,
    failure: Option<Callback>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            data: None,
            method: "GET".to_string(),
            success: None,
            failure: None,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("asynchronous", &self.asynchronous)
            .field("data", &self.data)
            .field("method", &self.method)
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct JsonOptions {
    #[serde(rename = "async", default)]
    asynchronous: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    method: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn data(mut self, data: RequestData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Transport) + Send + 'static,
    {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Transport) + Send + 'static,
    {
        self.failure = Some(Box::new(callback));
        self
    }

    /// Read `async`, `data` and `method` from a JSON options object.
    ///
    /// `async` is off only for a literal `false`. `data` of `null`, `false`,
    /// `0` or `""` means no data; an object becomes `RequestData::Map` and a
    /// string `RequestData::Raw`. Callbacks are attached afterwards with
    /// `on_success` / `on_failure`.
    pub fn from_json(options: &Value) -> Result<Self, AjaxError> {
        let parsed: JsonOptions = match options {
            Value::Null => return Ok(Self::default()),
            Value::Object(_) => serde_json::from_value(options.clone())
                .map_err(|e| AjaxError::invalid_argument(format!("malformed options: {e}")))?,
            other => {
                return Err(AjaxError::invalid_argument(format!(
                    "options must be an object, got {}",
                    json_type(other)
                )))
            }
        };

        let asynchronous = !matches!(parsed.asynchronous, Some(Value::Bool(false)));
        let method = match parsed.method {
            None | Some(Value::Null) => "GET".to_string(),
            Some(Value::String(method)) => method,
            Some(other) => {
                return Err(AjaxError::invalid_argument(format!(
                    "method must be a string, got {}",
                    json_type(&other)
                )))
            }
        };
        let data = match parsed.data {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            Some(Value::String(raw)) => Some(RequestData::Raw(raw)),
            Some(Value::Object(map)) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (name, value) in &map {
                    pairs.push((name.clone(), ParamValue::from_json(value)?));
                }
                Some(RequestData::Map(pairs))
            }
            Some(other) => {
                return Err(AjaxError::invalid_argument(format!(
                    "data must be an object or a string, got {}",
                    json_type(&other)
                )))
            }
        };
        Ok(Self {
            asynchronous,
            data,
            method,
            ..Self::default()
        })
    }
}

/// Resolve `url` and `options` into the request that will go on the wire.
pub fn build_request(url: &str, options: &RequestOptions) -> Result<HttpRequest, AjaxError> {
    let method = HttpMethod::parse(&options.method)?;
    let data = options.data.clone().filter(|d| !d.is_empty_raw());

    Ok(match method {
        HttpMethod::Get => HttpRequest {
            method,
            url: match data {
                Some(data) => add_query_param(url, &data.into_query()),
                None => url.to_string(),
            },
            headers: Vec::new(),
            body: None,
        },
        HttpMethod::Post => HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: data.map(RequestData::into_body),
        },
    })
}

/// Sends requests through transports from one `TransportFactory`.
#[derive(Clone, Default)]
pub struct Ajax {
    factory: TransportFactory,
}

static DEFAULT_CLIENT: LazyLock<Ajax> = LazyLock::new(Ajax::default);

impl Ajax {
    /// Client over `environment`, sharing the process-wide strategy cache.
    pub fn new(environment: Arc<dyn TransportEnvironment>) -> Self {
        Self::with_factory(TransportFactory::new(environment))
    }

    pub fn with_factory(factory: TransportFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &TransportFactory {
        &self.factory
    }

    pub fn send_request(&self, url: &str, mut options: RequestOptions) -> Result<Transport, AjaxError> {
        let request = build_request(url, &options)?;
        let asynchronous = options.asynchronous;
        let on_success = options.success.take().unwrap_or_else(noop);
        let on_failure = options.failure.take().unwrap_or_else(noop);

        let transport = self.factory.create_transport()?;
        attach_completion(&transport, on_success, on_failure);
        transport.open(request.method, &request.url, asynchronous)?;
        for (name, value) in &request.headers {
            transport.set_request_header(name, value)?;
        }
        transport.send(request.body)?;
        Ok(transport)
    }

    /// `send_request` for an untyped URL argument. Anything but a JSON
    /// string is rejected.
    pub fn send_request_value(&self, url: &Value, options: RequestOptions) -> Result<Transport, AjaxError> {
        match url {
            Value::String(url) => self.send_request(url, options),
            other => Err(AjaxError::invalid_argument(format!(
                "url must be a string, got {}",
                json_type(other)
            ))),
        }
    }
}

fn noop() -> Callback {
    Box::new(|_: &Transport| {})
}

/// Send through the process-wide client: native `ureq` mechanism and the
/// global strategy cache.
pub fn send_request(url: &str, options: RequestOptions) -> Result<Transport, AjaxError> {
    DEFAULT_CLIENT.send_request(url, options)
}
