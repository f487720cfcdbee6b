//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (exact match, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//! - Turn route patterns into the table's request and URI matchers
//!
//! # Pattern Syntax
//! ```text
//! /api                → path prefix
//! example.com         → host
//! example.com/api     → host AND path prefix
//! ```
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - Most specific rule wins: host rules before host-less ones, then longest prefix
//! - No regex to guarantee O(n) matching

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Uri};

use crate::controller::ControllerTable;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if a request for `host` and `path` matches this condition.
    fn matches_parts(&self, host: Option<&str>, path: &str) -> bool;

    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matches_parts(request_host(req), req.uri().path())
    }
}

/// Host of a request: the Host header, else the URI authority. Any port is dropped.
fn request_host(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .map(strip_port)
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_inclusive(']').next().unwrap_or(host);
    }
    host.split(':').next().unwrap_or(host)
}

/// Matches the host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches_parts(&self, host: Option<&str>, _path: &str) -> bool {
        host.is_some_and(|h| h.eq_ignore_ascii_case(&self.expected_host))
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches_parts(&self, _host: Option<&str>, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches_parts(&self, host: Option<&str>, path: &str) -> bool {
        self.matchers.iter().all(|m| m.matches_parts(host, path))
    }
}

#[derive(Debug)]
struct Rule {
    name: String,
    matcher: Box<dyn Matcher>,
    // (has host, prefix length): larger is more specific.
    specificity: (bool, usize),
}

/// Compile a route pattern into a matcher. Empty patterns compile to nothing.
fn compile(pattern: &str) -> Option<(Box<dyn Matcher>, (bool, usize))> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }
    if pattern.starts_with('/') {
        return Some((Box::new(PathPrefixMatcher::new(pattern)), (false, pattern.len())));
    }
    match pattern.find('/') {
        None => Some((Box::new(HostMatcher::new(pattern)), (true, 0))),
        Some(i) => {
            let (host, path) = pattern.split_at(i);
            let matcher = AndMatcher::new(vec![
                Box::new(HostMatcher::new(host)),
                Box::new(PathPrefixMatcher::new(path)),
            ]);
            Some((Box::new(matcher), (true, path.len())))
        }
    }
}

/// Resolves requests to route names from route patterns.
///
/// Results follow the table matcher contract: a route name when a rule matches,
/// `None` for bypassed paths and `Some("")` for everything else.
#[derive(Debug, Default)]
pub struct RouteMatcher {
    rules: Vec<Rule>,
    bypass: Vec<PathPrefixMatcher>,
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for `pattern`. Returns false for an empty pattern.
    pub fn add_route(&mut self, name: impl Into<String>, pattern: &str) -> bool {
        let Some((matcher, specificity)) = compile(pattern) else {
            return false;
        };
        let rule = Rule {
            name: name.into(),
            matcher,
            specificity,
        };
        // Stable insert keeps declaration order among equally specific rules.
        let at = self
            .rules
            .iter()
            .position(|r| r.specificity < rule.specificity)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
        true
    }

    /// Paths under `prefix` get no policy at all.
    pub fn add_bypass(&mut self, prefix: impl Into<String>) {
        self.bypass.push(PathPrefixMatcher::new(prefix));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn resolve(&self, host: Option<&str>, path: &str) -> Option<String> {
        if self.bypass.iter().any(|b| b.matches_parts(host, path)) {
            return None;
        }
        let name = self
            .rules
            .iter()
            .find(|r| r.matcher.matches_parts(host, path))
            .map(|r| r.name.clone())
            .unwrap_or_default();
        Some(name)
    }

    pub fn match_request(&self, req: &Request<Body>) -> Option<String> {
        self.resolve(request_host(req), req.uri().path())
    }

    /// Match an absolute or origin-form URI. The method does not take part in matching.
    pub fn match_uri(&self, uri: &str, _method: &str) -> Option<String> {
        match uri.parse::<Uri>() {
            Ok(parsed) => self.resolve(parsed.host(), parsed.path()),
            Err(e) => {
                tracing::debug!(uri = %uri, error = %e, "Unparseable URI, matching raw path");
                self.resolve(None, uri)
            }
        }
    }

    /// Install as both the request and the URI matcher of `table`.
    pub fn install(self, table: &ControllerTable) {
        let matcher = Arc::new(self);
        let http = matcher.clone();
        table.set_http_matcher(move |req: &Request<Body>| http.match_request(req));
        table.set_uri_matcher(move |uri: &str, method: &str| matcher.match_uri(uri, method));
    }
}
