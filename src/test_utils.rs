//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use crate::transport::{RequestOptions, Response, Transport, TransportError};

/// One request observed by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub options: RequestOptions,
    pub paged: bool,
}

/// Transport that replays queued responses and records every call.
#[derive(Default)]
pub struct MockTransport {
    responses: RefCell<VecDeque<Result<Response, String>>>,
    calls: RefCell<Vec<RecordedCall>>,
    session_token: RefCell<Option<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status_code: u16, data: Value) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(Ok(Response::new(status_code, data)));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses.borrow_mut().push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn session_token(&self) -> Option<String> {
        self.session_token.borrow().clone()
    }

    fn next(&self, path: &str, options: &RequestOptions, paged: bool) -> Result<Response, TransportError> {
        self.calls.borrow_mut().push(RecordedCall {
            path: path.to_string(),
            options: options.clone(),
            paged,
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Other(message)),
            None => Err(TransportError::Other(format!("no response queued for {}", path))),
        }
    }
}

impl Transport for MockTransport {
    fn request(&self, path: &str, options: &RequestOptions) -> Result<Response, TransportError> {
        self.next(path, options, false)
    }

    fn paged_request(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Response, TransportError> {
        self.next(path, options, true)
    }

    fn authorize(&self, session_token: Option<&str>) {
        *self.session_token.borrow_mut() = session_token.map(str::to_string);
    }
}
