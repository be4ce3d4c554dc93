// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only view of an inbound request.
//!
//! The verifier never owns requests. Hosts hand it anything implementing
//! [`SignedRequest`]; implementations are provided for axum/`http` requests
//! and request parts, plus [`RequestView`] for hosts on other stacks.

use axum::http::{request::Parts, HeaderMap, Request, Uri};

/// Request target and header multimap of an inbound request.
pub trait SignedRequest {
    /// Path and query exactly as received (no scheme, host or fragment).
    fn request_target(&self) -> &str;

    /// Every header value paired with its name, one entry per value.
    fn header_entries(&self) -> Vec<(&str, &[u8])>;

    /// Values of `name`, compared case-insensitively, in arrival order.
    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.header_entries()
            .into_iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .collect()
    }

    /// First value of `name`, if any.
    fn first_header(&self, name: &str) -> Option<&[u8]> {
        self.header_values(name).into_iter().next()
    }
}

fn target_of(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

fn entries_of(headers: &HeaderMap) -> Vec<(&str, &[u8])> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_bytes()))
        .collect()
}

impl<B> SignedRequest for Request<B> {
    fn request_target(&self) -> &str {
        target_of(self.uri())
    }

    fn header_entries(&self) -> Vec<(&str, &[u8])> {
        entries_of(self.headers())
    }

    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.headers()
            .get_all(name)
            .iter()
            .map(|v| v.as_bytes())
            .collect()
    }
}

impl SignedRequest for Parts {
    fn request_target(&self) -> &str {
        target_of(&self.uri)
    }

    fn header_entries(&self) -> Vec<(&str, &[u8])> {
        entries_of(&self.headers)
    }

    fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.headers
            .get_all(name)
            .iter()
            .map(|v| v.as_bytes())
            .collect()
    }
}

/// Owned request view for hosts that do not use the `http` types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestView {
    target: String,
    headers: Vec<(String, Vec<u8>)>,
}

impl RequestView {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            headers: Vec::new(),
        }
    }

    /// Append a header value. Repeating a name adds another value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl SignedRequest for RequestView {
    fn request_target(&self) -> &str {
        &self.target
    }

    fn header_entries(&self) -> Vec<(&str, &[u8])> {
        self.headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_slice()))
            .collect()
    }
}
