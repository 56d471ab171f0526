//! DNS message model.
//!
//! Plain data structures for the pieces of an RFC 1035 message: the 12-byte
//! header, the question section and the three resource record sections. The
//! wire encoding lives in [`crate::encoder`] and the parser in
//! [`crate::decoder`]; this module only holds the data and the lookups the
//! resolver needs to interpret a response.
//!
//! # Examples
//!
//! ```rust
//! use dns_walker::dns::{QueryType, DnsHeader, ResponseCode};
//! use std::str::FromStr;
//!
//! let query_type = QueryType::from_str("ns").unwrap();
//! assert_eq!(query_type.code(), 2);
//!
//! let mut header = DnsHeader::new();
//! header.flags = 0x8183;
//! assert_eq!(header.response_code(), ResponseCode::NameError);
//! ```

use core::fmt;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

/// Class code for the Internet (IN) class.
pub const CLASS_IN: u16 = 1;

/// Recursion Desired bit of the header flags (RFC 1035 section 4.1.1).
pub const RECURSION_DESIRED: u16 = 1 << 8;

/// Truncation bit of the header flags.
pub const TRUNCATED: u16 = 1 << 9;

/// Query/Response bit of the header flags.
pub const QR_RESPONSE: u16 = 1 << 15;

/// The type of a DNS record or query.
///
/// Codes without a dedicated variant are kept as [`QueryType::Unknown`] so that
/// a decoded record never loses its type.
///
/// ```rust
/// use dns_walker::dns::QueryType;
///
/// assert_eq!(QueryType::from(28), QueryType::AAAA);
/// assert_eq!(QueryType::from(65), QueryType::Unknown(65));
/// assert_eq!(QueryType::Unknown(65).code(), 65);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// IPv4 address record (RFC 1035).
    A,
    /// Authoritative name server (RFC 1035).
    NS,
    /// Canonical name record (RFC 1035).
    CNAME,
    /// Start of a zone of authority (RFC 1035).
    SOA,
    /// Mail exchange record (RFC 1035).
    MX,
    /// Text record (RFC 1035).
    TXT,
    /// IPv6 address record (RFC 3596).
    AAAA,
    /// Any other type code.
    Unknown(u16),
}

impl QueryType {
    /// Numeric type code as carried on the wire.
    pub fn code(self) -> u16 {
        match self {
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::SOA => 6,
            QueryType::MX => 15,
            QueryType::TXT => 16,
            QueryType::AAAA => 28,
            QueryType::Unknown(code) => code,
        }
    }

    /// Whether records of this type carry a host address.
    pub fn is_address(self) -> bool {
        matches!(self, QueryType::A | QueryType::AAAA)
    }
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        match value {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            6 => QueryType::SOA,
            15 => QueryType::MX,
            16 => QueryType::TXT,
            28 => QueryType::AAAA,
            other => QueryType::Unknown(other),
        }
    }
}

impl FromStr for QueryType {
    type Err = String;

    /// Parses a record type name, case-insensitively.
    ///
    /// ```rust
    /// use dns_walker::dns::QueryType;
    /// use std::str::FromStr;
    ///
    /// assert_eq!(QueryType::from_str("aaaa").unwrap(), QueryType::AAAA);
    /// assert!(QueryType::from_str("BOGUS").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(QueryType::A),
            "NS" => Ok(QueryType::NS),
            "CNAME" => Ok(QueryType::CNAME),
            "SOA" => Ok(QueryType::SOA),
            "MX" => Ok(QueryType::MX),
            "TXT" => Ok(QueryType::TXT),
            "AAAA" => Ok(QueryType::AAAA),
            _ => Err(format!("Unknown query type: {}", s)),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::A => write!(f, "A"),
            QueryType::NS => write!(f, "NS"),
            QueryType::CNAME => write!(f, "CNAME"),
            QueryType::SOA => write!(f, "SOA"),
            QueryType::MX => write!(f, "MX"),
            QueryType::TXT => write!(f, "TXT"),
            QueryType::AAAA => write!(f, "AAAA"),
            QueryType::Unknown(code) => write!(f, "TYPE{}", code),
        }
    }
}

/// The 12-byte header of a DNS message.
///
/// The section counts must match the number of entries actually present in
/// the message; the decoder enforces this by reading exactly that many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnsHeader {
    /// Identifier used to match a response with its query.
    pub id: u16,
    /// QR, Opcode, AA, TC, RD, RA and RCODE bits.
    pub flags: u16,
    /// Number of entries in the question section.
    pub question_count: u16,
    /// Number of resource records in the answer section.
    pub answer_count: u16,
    /// Number of name server records in the authority section.
    pub authority_count: u16,
    /// Number of resource records in the additional section.
    pub additional_count: u16,
}

/// The 4-bit response code (RCODE) carried in the low bits of the flags.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseCode {
    /// No error condition (RCODE = 0).
    NoError = 0,
    /// The server could not interpret the query (RCODE = 1).
    FormatError = 1,
    /// The server failed internally (RCODE = 2).
    ServerFailure = 2,
    /// The queried name does not exist, NXDOMAIN (RCODE = 3).
    NameError = 3,
    /// The server does not support this kind of query (RCODE = 4).
    NotImplemented = 4,
    /// The server refused for policy reasons (RCODE = 5).
    Refused = 5,
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormatError => "FORMERR",
            ResponseCode::ServerFailure => "SERVFAIL",
            ResponseCode::NameError => "NXDOMAIN",
            ResponseCode::NotImplemented => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
        };
        f.write_str(name)
    }
}

impl DnsHeader {
    /// Creates a header with every field zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query header: one question, no records.
    pub fn query(id: u16, flags: u16) -> Self {
        DnsHeader {
            id,
            flags,
            question_count: 1,
            ..Self::default()
        }
    }

    /// Extracts the response code from the flags.
    ///
    /// Codes outside the RFC 1035 range are reported as
    /// [`ResponseCode::ServerFailure`].
    pub fn response_code(&self) -> ResponseCode {
        match self.flags & 0x000F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            _ => ResponseCode::ServerFailure,
        }
    }

    pub fn is_response(&self) -> bool {
        self.flags & QR_RESPONSE != 0
    }

    pub fn is_truncated(&self) -> bool {
        self.flags & TRUNCATED != 0
    }
}

/// An entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    /// The queried name in dotted form, without a trailing dot.
    pub name: String,
    pub qtype: QueryType,
    /// Query class, normally [`CLASS_IN`].
    pub qclass: u16,
}

impl DnsQuestion {
    pub fn new(name: impl Into<String>, qtype: QueryType) -> Self {
        DnsQuestion {
            name: name.into(),
            qtype,
            qclass: CLASS_IN,
        }
    }
}

/// A resource record from the answer, authority or additional section.
///
/// The on-wire data length is consumed while decoding but not kept: the
/// payload shape follows from the record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// The owner name of this record.
    pub name: String,
    pub rtype: QueryType,
    pub rclass: u16,
    /// Time-to-live in seconds.
    pub ttl: u32,
    pub data: RData,
}

/// The payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    /// IPv4 address, always 4 bytes on the wire.
    A(Ipv4Addr),
    /// Name of an authoritative name server.
    NS(String),
    /// Canonical name the owner is an alias for.
    CNAME(String),
    /// IPv6 address, always 16 bytes on the wire.
    AAAA(Ipv6Addr),
    /// Raw bytes of any other type, as long as the record declared.
    Other {
        /// The numeric DNS record type code.
        rtype: u16,
        data: Vec<u8>,
    },
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<30} {:<10} {:<10} {}",
            self.name, self.ttl, self.rtype, self.data
        )
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::NS(name) => write!(f, "{}", name),
            RData::CNAME(name) => write!(f, "{}", name),
            RData::AAAA(addr) => write!(f, "{}", addr),
            RData::Other { rtype, data } => {
                write!(f, "TYPE{} ({} bytes)", rtype, data.len())
            }
        }
    }
}

impl ResourceRecord {
    /// Returns the host address carried by an A or AAAA record.
    pub fn address(&self) -> Option<IpAddr> {
        match self.data {
            RData::A(addr) => Some(IpAddr::V4(addr)),
            RData::AAAA(addr) => Some(IpAddr::V6(addr)),
            _ => None,
        }
    }

    pub fn ipv4_address(&self) -> Option<Ipv4Addr> {
        match self.data {
            RData::A(addr) => Some(addr),
            _ => None,
        }
    }

    /// Returns the name server named by an NS record.
    pub fn nameserver(&self) -> Option<&str> {
        match &self.data {
            RData::NS(name) => Some(name),
            _ => None,
        }
    }
}

/// A complete DNS message: header plus the four sections.
///
/// The message owns everything it contains and is rebuilt for every response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl DnsMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// First address from the answer section whose type matches `qtype`.
    ///
    /// ```rust
    /// use dns_walker::dns::{DnsMessage, QueryType, RData, ResourceRecord, CLASS_IN};
    /// use std::net::{IpAddr, Ipv4Addr};
    ///
    /// let mut message = DnsMessage::new();
    /// message.answers.push(ResourceRecord {
    ///     name: "example.com".to_string(),
    ///     rtype: QueryType::A,
    ///     rclass: CLASS_IN,
    ///     ttl: 300,
    ///     data: RData::A(Ipv4Addr::new(93, 184, 216, 34)),
    /// });
    ///
    /// assert_eq!(
    ///     message.answer_address(QueryType::A),
    ///     Some(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)))
    /// );
    /// assert_eq!(message.answer_address(QueryType::AAAA), None);
    /// ```
    pub fn answer_address(&self, qtype: QueryType) -> Option<IpAddr> {
        self.answers
            .iter()
            .filter(|record| record.rtype == qtype)
            .find_map(ResourceRecord::address)
    }

    /// First IPv4 glue address from the additional section.
    pub fn glue_address(&self) -> Option<Ipv4Addr> {
        self.additionals
            .iter()
            .find_map(ResourceRecord::ipv4_address)
    }

    /// First name server named in the authority section.
    pub fn delegate_name(&self) -> Option<&str> {
        self.authorities
            .iter()
            .find_map(ResourceRecord::nameserver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, data: RData) -> ResourceRecord {
        let rtype = match data {
            RData::A(_) => QueryType::A,
            RData::NS(_) => QueryType::NS,
            RData::CNAME(_) => QueryType::CNAME,
            RData::AAAA(_) => QueryType::AAAA,
            RData::Other { rtype, .. } => QueryType::from(rtype),
        };
        ResourceRecord {
            name: name.to_string(),
            rtype,
            rclass: CLASS_IN,
            ttl: 3600,
            data,
        }
    }

    #[test]
    fn test_query_type_codes_round_trip() {
        for code in [1u16, 2, 5, 6, 15, 16, 28, 99] {
            assert_eq!(QueryType::from(code).code(), code);
        }
        assert_eq!(QueryType::Unknown(99).to_string(), "TYPE99");
    }

    #[test]
    fn test_response_code_from_flags() {
        let mut header = DnsHeader::new();
        header.flags = 0x8180;
        assert_eq!(header.response_code(), ResponseCode::NoError);
        assert!(header.is_response());
        assert!(!header.is_truncated());

        header.flags = 0x8205;
        assert_eq!(header.response_code(), ResponseCode::Refused);
        assert!(header.is_truncated());

        header.flags = 0x000B;
        assert_eq!(header.response_code(), ResponseCode::ServerFailure);
    }

    #[test]
    fn test_query_header_has_one_question() {
        let header = DnsHeader::query(0xBEEF, RECURSION_DESIRED);
        assert_eq!(header.id, 0xBEEF);
        assert_eq!(header.flags, 0x0100);
        assert_eq!(header.question_count, 1);
        assert_eq!(header.answer_count, 0);
        assert_eq!(header.authority_count, 0);
        assert_eq!(header.additional_count, 0);
    }

    #[test]
    fn test_answer_address_matches_requested_type() {
        let mut message = DnsMessage::new();
        message.answers.push(record(
            "example.com",
            RData::CNAME("web.example.com".to_string()),
        ));
        message.answers.push(record(
            "web.example.com",
            RData::AAAA("2001:db8::1".parse().unwrap()),
        ));
        message
            .answers
            .push(record("web.example.com", RData::A(Ipv4Addr::new(192, 0, 2, 7))));

        assert_eq!(
            message.answer_address(QueryType::A),
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)))
        );
        assert_eq!(
            message.answer_address(QueryType::AAAA),
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(message.answer_address(QueryType::MX), None);
    }

    #[test]
    fn test_referral_helpers() {
        let mut message = DnsMessage::new();
        assert_eq!(message.glue_address(), None);
        assert_eq!(message.delegate_name(), None);

        message
            .authorities
            .push(record("com", RData::NS("a.gtld-servers.net".to_string())));
        message.additionals.push(record(
            "a.gtld-servers.net",
            RData::AAAA("2001:503:a83e::2:30".parse().unwrap()),
        ));
        message.additionals.push(record(
            "a.gtld-servers.net",
            RData::A(Ipv4Addr::new(192, 5, 6, 30)),
        ));

        assert_eq!(message.glue_address(), Some(Ipv4Addr::new(192, 5, 6, 30)));
        assert_eq!(message.delegate_name(), Some("a.gtld-servers.net"));
    }
}
