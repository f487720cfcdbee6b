//! Outbound URL rewriting.
//!
//! A pattern pins as much of the outbound URL as the operator wants; whatever it
//! leaves out is taken from the inbound URL.
//!
//! ```text
//! pattern                           inbound https://localhost:8080/base/res?first=false
//! http:                           → http://localhost:8080/base/res?first=false
//! http://google.com               → http://google.com/base/res?first=false
//! http://google.com/search        → http://google.com/search?first=false
//! http://google.com/search?q=test → http://google.com/search?q=test
//! ```

use std::fmt;

use url::Url;

use crate::controller::core::Owner;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub pattern: String,
}

impl ProxyConfig {
    pub fn new(enabled: bool, pattern: impl Into<String>) -> Self {
        Self {
            enabled,
            pattern: pattern.into(),
        }
    }
}

/// The parts a pattern specifies. Absent parts come from the inbound URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UrlPattern {
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    query: Option<String>,
}

impl UrlPattern {
    fn parse(pattern: &str) -> Self {
        let mut parsed = UrlPattern::default();
        let pattern = pattern.split('#').next().unwrap_or_default();

        let mut rest = match pattern.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => {
                parsed.scheme = Some(scheme.to_ascii_lowercase());
                rest
            }
            _ => pattern,
        };

        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(|c: char| c == '/' || c == '?').unwrap_or(after.len());
            let (authority, remaining) = after.split_at(end);
            let (host, port) = split_authority(authority);
            if !host.is_empty() {
                parsed.host = Some(host.to_string());
                parsed.port = port;
            }
            rest = remaining;
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        if !path.is_empty() {
            parsed.path = Some(path.to_string());
        }
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            parsed.query = Some(query.to_string());
        }
        parsed
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Split `host[:port]`, keeping IPv6 brackets on the host.
fn split_authority(authority: &str) -> (&str, Option<u16>) {
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    let port_sep = if authority.starts_with('[') {
        authority
            .find(']')
            .and_then(|end| authority[end..].find(':').map(|i| end + i))
    } else {
        authority.rfind(':')
    };
    match port_sep {
        Some(i) => (&authority[..i], authority[i + 1..].parse().ok()),
        None => (authority, None),
    }
}

pub struct Proxy {
    owner: Owner,
    config: ProxyConfig,
    parsed: UrlPattern,
}

impl Proxy {
    pub(crate) fn new(owner: Owner, config: ProxyConfig) -> Self {
        Self {
            parsed: UrlPattern::parse(&config.pattern),
            owner,
            config,
        }
    }

    pub(crate) fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn pattern(&self) -> &str {
        &self.config.pattern
    }

    pub fn enable(&self) {
        if self.config.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_proxy_enabled(&self.owner, true);
        }
    }

    pub fn disable(&self) {
        if !self.config.enabled {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_proxy_enabled(&self.owner, false);
        }
    }

    pub fn set_pattern(&self, pattern: &str) {
        if self.config.pattern == pattern {
            return;
        }
        if let Some(table) = self.owner.table() {
            table.set_proxy_pattern(&self.owner, pattern);
        }
    }

    /// Merge the pattern into `inbound`, most specific part wins.
    pub fn build_url(&self, inbound: &Url) -> Url {
        let mut url = inbound.clone();
        let pattern = &self.parsed;

        if let Some(scheme) = &pattern.scheme {
            if url.set_scheme(scheme).is_err() {
                tracing::warn!(
                    route = %self.owner.name(),
                    pattern = %self.config.pattern,
                    scheme = %scheme,
                    "Proxy scheme cannot be applied, keeping inbound scheme"
                );
            }
        }
        if let Some(host) = &pattern.host {
            match url.set_host(Some(host)) {
                Ok(()) => {
                    if url.set_port(pattern.port).is_err() {
                        tracing::warn!(route = %self.owner.name(), "Proxy port cannot be applied");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        route = %self.owner.name(),
                        pattern = %self.config.pattern,
                        error = %e,
                        "Proxy host cannot be applied, keeping inbound host"
                    );
                }
            }
        }
        if let Some(path) = &pattern.path {
            url.set_path(path);
        }
        if let Some(query) = &pattern.query {
            url.set_query(Some(query));
        }
        url
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("name", &self.owner.name())
            .field("config", &self.config)
            .finish()
    }
}
