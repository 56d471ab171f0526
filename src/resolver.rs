//! Iterative DNS resolution.
//!
//! The resolver never asks a server to recurse on its behalf. It starts at a
//! root nameserver and follows referrals down the delegation tree itself:
//!
//! 1. Send the question to the current server.
//! 2. [`classify`] the response into a [`Step`].
//! 3. Stop on an answer, move to the glue address of a referral, or resolve
//!    the referred nameserver's own name first when no glue came along.
//!
//! Every walk is bounded by `max_hops` servers and nested nameserver lookups
//! by `max_depth`, so a misbehaving delegation chain ends in an error instead
//! of a loop.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dns_walker::config::ResolverConfig;
//! use dns_walker::resolver::Resolver;
//!
//! let mut resolver = Resolver::from_config(ResolverConfig::default());
//! let addr = resolver.lookup("www.example.com")?;
//! println!("www.example.com is at {}", addr);
//! # Ok::<(), dns_walker::error::ResolveError>(())
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::dns::{DnsMessage, QueryType, ResponseCode};
use crate::encoder::build_query;
use crate::error::ResolveError;
use crate::transport::{Transport, UdpTransport};

/// What a response tells the walk to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The answer section holds an address of the requested type.
    Answer(IpAddr),
    /// A referral with a glue address for the next server.
    Glue(Ipv4Addr),
    /// A referral naming a nameserver whose address must be resolved first.
    Delegate(String),
    /// Nothing to follow.
    DeadEnd,
}

/// Decides the next step of a walk from one response.
///
/// An answer wins over glue, and glue over a bare nameserver name.
pub fn classify(response: &DnsMessage, qtype: QueryType) -> Step {
    if let Some(addr) = response.answer_address(qtype) {
        Step::Answer(addr)
    } else if let Some(glue) = response.glue_address() {
        Step::Glue(glue)
    } else if let Some(ns) = response.delegate_name() {
        Step::Delegate(ns.to_string())
    } else {
        Step::DeadEnd
    }
}

/// Synchronous iterative resolver over a [`Transport`].
pub struct Resolver<T> {
    transport: T,
    config: ResolverConfig,
    ids: fastrand::Rng,
}

impl Resolver<UdpTransport> {
    /// Resolver over real UDP sockets.
    pub fn from_config(config: ResolverConfig) -> Self {
        Self::new(UdpTransport::new(), config)
    }
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T, config: ResolverConfig) -> Self {
        Self::with_rng(transport, config, fastrand::Rng::new())
    }

    /// Uses `ids` as the source of query identifiers.
    ///
    /// The ids only pair responses with queries; a seeded generator makes
    /// them reproducible.
    pub fn with_rng(transport: T, config: ResolverConfig, ids: fastrand::Rng) -> Self {
        Resolver {
            transport,
            config,
            ids,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Performs one query against `server` and returns the parsed response.
    ///
    /// Referrals are not interpreted. Timeouts, network errors, malformed
    /// responses and id mismatches are retried against the same server up to
    /// `retries` more times; encoding errors fail immediately.
    pub fn send_query(
        &mut self,
        server: IpAddr,
        name: &str,
        qtype: QueryType,
        flags: u16,
    ) -> Result<DnsMessage, ResolveError> {
        let server = SocketAddr::new(server, self.config.port);
        let attempts = self.config.retries.saturating_add(1);

        let mut attempt = 1;
        loop {
            match self.exchange(server, name, qtype, flags) {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(server = %server, domain = name, attempt, error = %e, "Query failed, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn exchange(
        &mut self,
        server: SocketAddr,
        name: &str,
        qtype: QueryType,
        flags: u16,
    ) -> Result<DnsMessage, ResolveError> {
        let id = self.ids.u16(..);
        let query = build_query(name, qtype, flags, id)?;

        let bytes = self
            .transport
            .send_and_receive(server, &query, self.config.timeout())?;
        let response = DnsMessage::from_bytes(&bytes)
            .map_err(|source| ResolveError::Malformed { server, source })?;

        if response.header.id != id {
            return Err(ResolveError::IdMismatch {
                server,
                expected: id,
                received: response.header.id,
            });
        }
        if response.header.is_truncated() {
            warn!(server = %server, domain = name, "Response truncated, using what arrived");
        }

        Ok(response)
    }

    /// Resolves `name` by walking down from the `root` nameserver.
    ///
    /// Only address types (A, AAAA) can be resolved this way.
    pub fn resolve(
        &mut self,
        name: &str,
        qtype: QueryType,
        root: Ipv4Addr,
    ) -> Result<IpAddr, ResolveError> {
        if !qtype.is_address() {
            return Err(ResolveError::NotAnAddressType(qtype));
        }
        self.walk(name, qtype, IpAddr::V4(root), 0)
    }

    /// Resolves the A record of `name` from the configured root hint.
    pub fn lookup(&mut self, name: &str) -> Result<IpAddr, ResolveError> {
        let root = self.config.root_hint;
        self.resolve(name, QueryType::A, root)
    }

    fn walk(
        &mut self,
        name: &str,
        qtype: QueryType,
        root: IpAddr,
        depth: usize,
    ) -> Result<IpAddr, ResolveError> {
        if depth > self.config.max_depth {
            return Err(ResolveError::DelegationTooDeep {
                name: name.to_string(),
                depth,
            });
        }

        let mut server = root;
        let mut last_queried = root;
        for hop in 1..=self.config.max_hops {
            last_queried = server;
            debug!(domain = name, %qtype, server = %server, hop, depth, "Querying");

            // RD stays clear: each server is asked only what it knows itself.
            let response = self.send_query(server, name, qtype, 0)?;

            let code = response.header.response_code();
            if code != ResponseCode::NoError {
                return Err(ResolveError::ServerError { server, code });
            }

            match classify(&response, qtype) {
                Step::Answer(addr) => {
                    info!(domain = name, %qtype, address = %addr, hops = hop, "Resolved");
                    return Ok(addr);
                }
                Step::Glue(next) => {
                    debug!(domain = name, from = %server, to = %next, "Following referral with glue");
                    server = IpAddr::V4(next);
                }
                Step::Delegate(ns) => {
                    debug!(domain = name, nameserver = %ns, "Referral without glue, resolving nameserver");
                    server = self.walk(&ns, QueryType::A, root, depth + 1)?;
                }
                Step::DeadEnd => {
                    return Err(ResolveError::DeadEnd {
                        server,
                        name: name.to_string(),
                    });
                }
            }
        }

        Err(ResolveError::HopLimitExceeded {
            name: name.to_string(),
            last_server: last_queried,
            limit: self.config.max_hops,
        })
    }
}
