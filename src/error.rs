//! Error types for encoding, decoding, transport and resolution.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::dns::{QueryType, ResponseCode};

/// Failure to serialise a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("label '{label}' is {len} bytes, the limit is 63")]
    LabelTooLong { label: String, len: usize },

    #[error("empty label in domain name '{name}'")]
    EmptyLabel { name: String },

    #[error("record data is {len} bytes, more than a 16-bit length can describe")]
    DataTooLong { len: usize },
}

/// Failure to parse a response buffer.
///
/// Offsets are absolute positions in the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message truncated at offset {offset}: {needed} more bytes needed")]
    TruncatedMessage { offset: usize, needed: usize },

    #[error("compression pointer at offset {offset} targets {target}, outside the message")]
    InvalidCompressionPointer { offset: usize, target: usize },

    #[error("compression pointer loop detected at offset {offset}")]
    PointerLoop { offset: usize },

    #[error("reserved label type {byte:#04x} at offset {offset}")]
    InvalidLabelType { offset: usize, byte: u8 },
}

/// Failure reported by a [`crate::transport::Transport`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no response from {server} within {timeout:?}")]
    Timeout { server: SocketAddr, timeout: Duration },

    #[error("network error talking to {server}: {source}")]
    Network {
        server: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Failure of a single query or of a whole iterative walk.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to encode query: {0}")]
    Encoding(#[from] EncodeError),

    #[error("malformed response from {server}: {source}")]
    Malformed {
        server: SocketAddr,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("response from {server} has id {received}, expected {expected}")]
    IdMismatch {
        server: SocketAddr,
        expected: u16,
        received: u16,
    },

    #[error("{server} answered {code}")]
    ServerError { server: IpAddr, code: ResponseCode },

    #[error("no path to answer for {name}: {server} gave no answer, glue or delegation")]
    DeadEnd { server: IpAddr, name: String },

    #[error("gave up on {name} after {limit} hops, last server {last_server}")]
    HopLimitExceeded {
        name: String,
        last_server: IpAddr,
        limit: usize,
    },

    #[error("delegation chain for {name} nested {depth} levels deep")]
    DelegationTooDeep { name: String, depth: usize },

    #[error("{0} records do not carry an address")]
    NotAnAddressType(QueryType),
}

impl ResolveError {
    /// Whether the failed hop may be attempted again against the same server.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::Transport(_)
                | ResolveError::Malformed { .. }
                | ResolveError::IdMismatch { .. }
        )
    }
}

/// Failure to load or validate configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_by_kind() {
        let server: SocketAddr = "192.0.2.1:53".parse().unwrap();

        let timeout = ResolveError::from(TransportError::Timeout {
            server,
            timeout: Duration::from_secs(1),
        });
        assert!(timeout.is_retryable());

        let malformed = ResolveError::Malformed {
            server,
            source: DecodeError::PointerLoop { offset: 12 },
        };
        assert!(malformed.is_retryable());

        let encoding = ResolveError::from(EncodeError::EmptyLabel {
            name: "a..b".to_string(),
        });
        assert!(!encoding.is_retryable());

        let dead_end = ResolveError::DeadEnd {
            server: server.ip(),
            name: "example.com".to_string(),
        };
        assert!(!dead_end.is_retryable());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ResolveError::HopLimitExceeded {
            name: "loop.test".to_string(),
            last_server: "192.0.2.9".parse().unwrap(),
            limit: 16,
        };
        let message = err.to_string();
        assert!(message.contains("loop.test"));
        assert!(message.contains("192.0.2.9"));
        assert!(message.contains("16"));
    }
}
