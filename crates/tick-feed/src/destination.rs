//! Destination addresses.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{EmitError, EmitResult};

/// A (host, port) pair receiving the emitted stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Destination {
    host: String,
    port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to a socket address, preferring the first result.
    pub fn resolve(&self) -> EmitResult<SocketAddr> {
        if self.host.is_empty() {
            return Err(EmitError::invalid("destination host is empty"));
        }
        if self.port == 0 {
            return Err(EmitError::invalid(format!("destination {self} has port 0")));
        }

        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        (host, self.port)
            .to_socket_addrs()
            .map_err(|e| EmitError::invalid(format!("cannot resolve {self}: {e}")))?
            .next()
            .ok_or_else(|| EmitError::invalid(format!("{self} resolved to no addresses")))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for Destination {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl FromStr for Destination {
    type Err = EmitError;

    /// Parse `host:port`, with IPv6 hosts in brackets (`[::1]:5001`).
    fn from_str(s: &str) -> EmitResult<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EmitError::invalid(format!("destination `{s}` is not host:port")))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| EmitError::invalid(format!("destination `{s}` has bad port: {e}")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(EmitError::invalid(format!("destination `{s}` has no host")));
        }
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_parse_and_resolve_v4() {
        let dest: Destination = "127.0.0.1:5001".parse().unwrap();
        assert_eq!(dest.host(), "127.0.0.1");
        assert_eq!(dest.port(), 5001);
        assert_eq!(
            dest.resolve().unwrap(),
            SocketAddr::from((Ipv4Addr::LOCALHOST, 5001))
        );
    }

    #[test]
    fn test_parse_bracketed_v6() {
        let dest: Destination = "[::1]:6000".parse().unwrap();
        assert_eq!(dest.host(), "::1");
        assert_eq!(dest.to_string(), "[::1]:6000");
        assert_eq!(
            dest.resolve().unwrap(),
            SocketAddr::from((Ipv6Addr::LOCALHOST, 6000))
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("localhost".parse::<Destination>().is_err());
        assert!(":5001".parse::<Destination>().is_err());
        assert!("host:notaport".parse::<Destination>().is_err());
        assert!(matches!(
            Destination::new("127.0.0.1", 0).resolve(),
            Err(EmitError::InvalidConfiguration(_))
        ));
    }
}
