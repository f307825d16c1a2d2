//! Minimal client-side HTTP request helper.
//!
//! # Overview
//! Builds query strings from several argument shapes, picks a transport
//! mechanism for the host, wires success/failure callbacks and dispatches
//! GET/POST requests. `send_request` is the entry point; it returns the live
//! transport handle, which is later passed untouched to exactly one of the
//! callbacks.
//!
//! # Design
//! - `params` turns a map, a name/value pair or a raw fragment into a query
//!   string, each key and value escaped like `encodeURIComponent`.
//! - `factory` prefers the host's native mechanism and otherwise probes the
//!   legacy identifiers, caching the one that works in a write-once
//!   `StrategyCache`.
//! - `dispatch` classifies the final status (`2xx` or `304` succeed).
//! - `client` decides where request data goes: the URL for GET, the body
//!   for POST together with the form-encoded content type.
//! - Bad arguments and a missing transport are `AjaxError`s. Bad statuses
//!   and connection failures are ordinary outcomes for the `failure`
//!   callback.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod http;
pub mod native;
pub mod params;
pub mod transport;

pub use client::{build_request, send_request, Ajax, RequestData, RequestOptions, FORM_CONTENT_TYPE};
pub use dispatch::{attach_completion, Callback, Outcome};
pub use error::{AjaxError, ExchangeError};
pub use factory::{StrategyCache, TransportEnvironment, TransportFactory, LEGACY_TRANSPORTS, NATIVE_TRANSPORT};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use native::{NativeEnvironment, UreqExchange};
pub use params::{add_query_param, add_query_param_value, encode_component, form_encode, ParamValue, QueryParams};
pub use transport::{Exchange, ReadyState, Transport};
