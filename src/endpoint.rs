//! Worker server addresses.
//!
//! The client reads its servers once at startup from a plain text list with one `host:port`
//! per line. The list is never modified afterwards.
use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use log::warn;
use thiserror::Error;

/// Upper bound on the number of servers read from a list.
pub const MAX_ENDPOINTS: usize = 100;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("failed to read server list: {0}")]
    Io(#[from] io::Error),
    #[error("invalid endpoint '{line}': {reason}")]
    Invalid { line: String, reason: String },
    #[error("no valid servers found in server list")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let invalid = |reason: &str| EndpointError::Invalid {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = line
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        // IPv6 literals are written `[addr]:port`.
        let host = host.trim();
        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?,
            None => host,
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| invalid("port should be an integer between 1 and 65535"))?;
        if port == 0 {
            return Err(invalid("port should be an integer between 1 and 65535"));
        }

        Ok(Self::new(host, port))
    }
}

/// Read endpoints from a newline-delimited list.
///
/// Blank lines and `#` comments are ignored. Malformed lines are skipped with a warning,
/// and anything past [`MAX_ENDPOINTS`] is dropped. An empty result is an error.
pub fn read_endpoints<R: BufRead>(reader: R) -> Result<Vec<ServerEndpoint>, EndpointError> {
    let mut endpoints = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if endpoints.len() == MAX_ENDPOINTS {
            warn!("server list holds more than {MAX_ENDPOINTS} servers; ignoring the rest");
            break;
        }

        match line.parse::<ServerEndpoint>() {
            Ok(endpoint) => endpoints.push(endpoint),
            Err(e) => warn!("skipping server: {e}"),
        }
    }

    if endpoints.is_empty() {
        return Err(EndpointError::Empty);
    }
    Ok(endpoints)
}

pub fn load_endpoints(path: impl AsRef<Path>) -> Result<Vec<ServerEndpoint>, EndpointError> {
    let file = File::open(path)?;
    read_endpoints(BufReader::new(file))
}
