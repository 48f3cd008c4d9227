//! Network endpoints (host + port) and the parsers that produce them
//!
//! Endpoints come from two places:
//! - Mesos process ids such as `master@10.0.0.2:5050`
//! - framework web UI URLs such as `http://10.0.0.5:9090/ui`
//!
//! Equality is structural over both fields, so a change of host or of port
//! alone counts as a different endpoint.

use std::fmt;

use url::Url;

use crate::error::{BeaconError, Result};

/// A reachable service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a libprocess pid (`<id>@<host>:<port>`).
    ///
    /// A bare `host:port` is accepted as well.
    pub fn from_pid(pid: &str) -> Result<Self> {
        let address = match pid.split_once('@') {
            Some((_, address)) => address,
            None => pid,
        };
        parse_host_port(address).map_err(|reason| BeaconError::malformed(pid, reason))
    }

    /// Derive an endpoint from a URL that carries an explicit port.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| BeaconError::malformed(raw, e))?;

        let host = match url.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => return Err(BeaconError::malformed(raw, "missing host")),
        };
        if host.is_empty() {
            return Err(BeaconError::malformed(raw, "missing host"));
        }

        // Url drops a port equal to the scheme default, so fall back to the
        // authority text to tell "http://h:80" from "http://h".
        let port = url
            .port()
            .or_else(|| explicit_port(raw))
            .ok_or_else(|| BeaconError::malformed(raw, "missing port"))?;

        Ok(Self { host, port })
    }

    /// Base URL for plain HTTP requests to this endpoint
    pub fn http_base(&self) -> String {
        format!("http://{}", self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_host_port(address: &str) -> std::result::Result<Endpoint, String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| "missing port".to_string())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {}", port, e))?;
    Ok(Endpoint::new(host, port))
}

/// Port written out in the authority section of `raw`, if any
fn explicit_port(raw: &str) -> Option<u16> {
    let rest = raw.split_once("://").map(|(_, rest)| rest)?;
    let authority = rest
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);
    let (host, port) = authority.rsplit_once(':')?;
    if host.ends_with(']') || !host.contains(':') {
        port.parse().ok()
    } else {
        None
    }
}
