//! Iterative DNS resolution over UDP.
//!
//! Queries are encoded and responses decoded by hand following RFC 1035,
//! and names are resolved by walking the delegation tree down from a root
//! nameserver instead of asking a recursive resolver.
//!
//! - [`dns`]: message model
//! - [`encoder`] / [`decoder`]: wire format, including name compression
//! - [`transport`]: the datagram exchange the resolver depends on
//! - [`resolver`]: single queries and the iterative walk

pub mod config;
pub mod decoder;
pub mod dns;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod transport;

pub use config::ResolverConfig;
pub use dns::{DnsMessage, QueryType};
pub use error::{DecodeError, EncodeError, ResolveError, TransportError};
pub use resolver::{Resolver, Step};
