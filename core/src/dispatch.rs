//! Completion classification.
//!
//! `attach_completion` registers an observer that ignores every state but
//! `Done`. At `Done` the status is classified and exactly one of the two
//! callbacks runs, once. Both callbacks live in a single slot that is
//! emptied on first use, so neither can ever run a second time.

use parking_lot::Mutex;
use tracing::debug;

use crate::transport::{ReadyState, Transport};

/// Caller-supplied completion handler. Receives the finished handle.
pub type Callback = Box<dyn FnOnce(&Transport) + Send + 'static>;

/// How a completed exchange is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// `[200, 300)` and `304` succeed; everything else, including status 0
    /// from a failed connection, fails.
    pub fn classify(status: u16) -> Self {
        if (200..300).contains(&status) || status == 304 {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

pub fn attach_completion(transport: &Transport, on_success: Callback, on_failure: Callback) {
    let pending = Mutex::new(Some((on_success, on_failure)));
    transport.on_ready_state_change(move |t| {
        if t.ready_state() != ReadyState::Done {
            return;
        }
        let Some((on_success, on_failure)) = pending.lock().take() else {
            return;
        };
        let status = t.status();
        let outcome = Outcome::classify(status);
        debug!(status, ?outcome, "request completed");
        match outcome {
            Outcome::Success => on_success(t),
            Outcome::Failure => on_failure(t),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::{CannedExchange, RefusingExchange};

    #[derive(Default)]
    struct Calls {
        success: Mutex<u32>,
        failure: Mutex<u32>,
    }

    fn run(transport: &Transport) -> Arc<Calls> {
        let calls = Arc::new(Calls::default());
        let s = calls.clone();
        let f = calls.clone();
        attach_completion(
            transport,
            Box::new(move |_: &Transport| *s.success.lock() += 1),
            Box::new(move |_: &Transport| *f.failure.lock() += 1),
        );
        transport.open(HttpMethod::Get, "http://x", false).unwrap();
        transport.send(None).unwrap();
        calls
    }

    #[test]
    fn classify_ranges() {
        assert_eq!(Outcome::classify(200), Outcome::Success);
        assert_eq!(Outcome::classify(204), Outcome::Success);
        assert_eq!(Outcome::classify(299), Outcome::Success);
        assert_eq!(Outcome::classify(304), Outcome::Success);
        assert_eq!(Outcome::classify(0), Outcome::Failure);
        assert_eq!(Outcome::classify(199), Outcome::Failure);
        assert_eq!(Outcome::classify(300), Outcome::Failure);
        assert_eq!(Outcome::classify(404), Outcome::Failure);
        assert_eq!(Outcome::classify(500), Outcome::Failure);
    }

    #[test]
    fn not_modified_fires_success_once() {
        let calls = run(&Transport::new("test", CannedExchange::new(304, "")));
        assert_eq!(*calls.success.lock(), 1);
        assert_eq!(*calls.failure.lock(), 0);
    }

    #[test]
    fn not_found_fires_failure_once() {
        let calls = run(&Transport::new("test", CannedExchange::new(404, "")));
        assert_eq!(*calls.success.lock(), 0);
        assert_eq!(*calls.failure.lock(), 1);
    }

    #[test]
    fn connection_failure_fires_failure() {
        let calls = run(&Transport::new("test", Arc::new(RefusingExchange)));
        assert_eq!(*calls.success.lock(), 0);
        assert_eq!(*calls.failure.lock(), 1);
    }

    #[test]
    fn nothing_fires_before_done() {
        let transport = Transport::new("test", CannedExchange::new(200, ""));
        let calls = Arc::new(Calls::default());
        let s = calls.clone();
        attach_completion(
            &transport,
            Box::new(move |_: &Transport| *s.success.lock() += 1),
            Box::new(|_: &Transport| {}),
        );
        transport.open(HttpMethod::Get, "http://x", false).unwrap();
        assert_eq!(*calls.success.lock(), 0);
    }

    #[test]
    fn reopening_does_not_fire_again() {
        let transport = Transport::new("test", CannedExchange::new(200, ""));
        let calls = run(&transport);
        transport.open(HttpMethod::Get, "http://x", false).unwrap();
        transport.send(None).unwrap();
        assert_eq!(*calls.success.lock(), 1);
    }

    #[test]
    fn callback_receives_the_handle() {
        let transport = Transport::new("test", CannedExchange::new(200, "payload"));
        let body = Arc::new(Mutex::new(String::new()));
        let sink = body.clone();
        attach_completion(
            &transport,
            Box::new(move |t: &Transport| *sink.lock() = t.response_text()),
            Box::new(|_: &Transport| {}),
        );
        transport.open(HttpMethod::Get, "http://x", false).unwrap();
        transport.send(None).unwrap();
        assert_eq!(*body.lock(), "payload");
    }
}
