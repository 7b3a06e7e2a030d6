//! Host and port pairs exchanged between daemons and the controller.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loopback interface every daemon binds to.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// A host name or literal address paired with a TCP port.
///
/// Port zero means "unset" before a daemon reports readiness, and "pick any
/// free port" when passed as a bind address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostPort {
    /// Host name or literal IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl HostPort {
    /// Builds a host/port pair.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds a loopback address with the given port.
    #[must_use]
    pub fn loopback(port: u16) -> Self {
        Self::new(LOOPBACK_HOST, port)
    }

    /// Loopback address with an ephemeral port.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::loopback(0)
    }

    /// Returns `true` when the port has not been assigned yet.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.port == 0
    }

    /// Resolves the pair to the first concrete socket address.
    ///
    /// # Errors
    ///
    /// Returns an IO error when resolution fails or yields no addresses.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no addresses resolved for {self}"),
                )
            })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for HostPort {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

/// Errors raised while parsing a `host:port` string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostPortParseError {
    /// The input had no `:` separator.
    #[error("address '{input}' is missing a ':port' suffix")]
    MissingPort {
        /// Rejected input.
        input: String,
    },
    /// The host part was empty.
    #[error("address '{input}' has an empty host")]
    EmptyHost {
        /// Rejected input.
        input: String,
    },
    /// The port was not a valid `u16`.
    #[error("address '{input}' has an invalid port")]
    InvalidPort {
        /// Rejected input.
        input: String,
    },
}

impl FromStr for HostPort {
    type Err = HostPortParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| HostPortParseError::MissingPort {
                input: input.to_owned(),
            })?;
        if host.is_empty() {
            return Err(HostPortParseError::EmptyHost {
                input: input.to_owned(),
            });
        }
        let parsed = port
            .parse::<u16>()
            .map_err(|_| HostPortParseError::InvalidPort {
                input: input.to_owned(),
            })?;
        Ok(Self::new(host, parsed))
    }
}

/// Joins addresses into the comma-separated form daemons accept.
#[must_use]
pub fn join(addresses: &[HostPort]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
