//! Wire-format serialisation.
//!
//! Queries are always self-contained, so names are written without
//! compression. Besides queries, whole messages with resource records can be
//! packed, which is what a stub nameserver needs to answer them.

use crate::dns::{CLASS_IN, DnsHeader, DnsMessage, DnsQuestion, QueryType, RData, ResourceRecord};
use crate::error::EncodeError;

/// Longest label a single length byte may announce.
pub const MAX_LABEL_LENGTH: usize = 63;

impl DnsHeader {
    /// Appends the 12 header bytes, big-endian, in RFC 1035 field order.
    ///
    /// ```rust
    /// use dns_walker::dns::DnsHeader;
    ///
    /// let header = DnsHeader::query(0x1234, 0);
    /// let mut buffer = Vec::new();
    /// header.pack(&mut buffer);
    /// assert_eq!(buffer, [0x12, 0x34, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    /// ```
    pub fn pack(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.id.to_be_bytes());
        buffer.extend_from_slice(&self.flags.to_be_bytes());
        buffer.extend_from_slice(&self.question_count.to_be_bytes());
        buffer.extend_from_slice(&self.answer_count.to_be_bytes());
        buffer.extend_from_slice(&self.authority_count.to_be_bytes());
        buffer.extend_from_slice(&self.additional_count.to_be_bytes());
    }
}

impl DnsQuestion {
    /// Appends the encoded name followed by type and class.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), EncodeError> {
        pack_domain_name(buffer, &self.name)?;
        buffer.extend_from_slice(&self.qtype.code().to_be_bytes());
        buffer.extend_from_slice(&self.qclass.to_be_bytes());
        Ok(())
    }
}

impl ResourceRecord {
    /// Appends the record, computing the data length from the payload.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), EncodeError> {
        pack_domain_name(buffer, &self.name)?;
        buffer.extend_from_slice(&self.rtype.code().to_be_bytes());
        buffer.extend_from_slice(&self.rclass.to_be_bytes());
        buffer.extend_from_slice(&self.ttl.to_be_bytes());

        let mut data = Vec::new();
        match &self.data {
            RData::A(addr) => data.extend_from_slice(&addr.octets()),
            RData::AAAA(addr) => data.extend_from_slice(&addr.octets()),
            RData::NS(name) | RData::CNAME(name) => pack_domain_name(&mut data, name)?,
            RData::Other { data: raw, .. } => data.extend_from_slice(raw),
        }
        let len = u16::try_from(data.len())
            .map_err(|_| EncodeError::DataTooLong { len: data.len() })?;

        buffer.extend_from_slice(&len.to_be_bytes());
        buffer.extend_from_slice(&data);
        Ok(())
    }
}

impl DnsMessage {
    /// Appends the whole message.
    ///
    /// The section counts written are the ones stored in the header, so a
    /// caller can deliberately produce a header that disagrees with its
    /// sections.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.header.pack(buffer);
        for question in &self.questions {
            question.pack(buffer)?;
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            record.pack(buffer)?;
        }
        Ok(())
    }
}

/// Encodes a dotted domain name as length-prefixed labels ending in a zero byte.
///
/// One trailing dot is accepted, and both `""` and `"."` encode the root name.
///
/// ```rust
/// use dns_walker::encoder::encode_name;
///
/// let encoded = encode_name("www.example.com").unwrap();
/// assert_eq!(encoded[0], 3);
/// assert_eq!(*encoded.last().unwrap(), 0);
/// assert_eq!(encode_name(".").unwrap(), [0]);
/// ```
pub fn encode_name(domain: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(domain.len() + 2);
    pack_domain_name(&mut buffer, domain)?;
    Ok(buffer)
}

pub fn pack_domain_name(buffer: &mut Vec<u8>, domain: &str) -> Result<(), EncodeError> {
    let trimmed = domain.strip_suffix('.').unwrap_or(domain);
    if trimmed.is_empty() {
        buffer.push(0);
        return Ok(());
    }

    for label in trimmed.split('.') {
        let len = label.len();
        if len == 0 {
            return Err(EncodeError::EmptyLabel {
                name: domain.to_string(),
            });
        }
        if len > MAX_LABEL_LENGTH {
            return Err(EncodeError::LabelTooLong {
                label: label.to_string(),
                len,
            });
        }

        buffer.push(len as u8);
        buffer.extend_from_slice(label.as_bytes());
    }

    buffer.push(0);
    Ok(())
}

/// Builds a complete query message for one question of class IN.
///
/// `flags` is written as given: a standalone lookup passes
/// [`crate::dns::RECURSION_DESIRED`], the iterative walk passes `0`.
pub fn build_query(
    domain: &str,
    qtype: QueryType,
    flags: u16,
    id: u16,
) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(12 + domain.len() + 6);
    DnsHeader::query(id, flags).pack(&mut buffer);
    DnsQuestion {
        name: domain.to_string(),
        qtype,
        qclass: CLASS_IN,
    }
    .pack(&mut buffer)?;
    Ok(buffer)
}

/// Serialises a whole message into a fresh buffer.
pub fn encode_message(message: &DnsMessage) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(512);
    message.pack(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::RECURSION_DESIRED;
    use std::net::Ipv4Addr;

    #[test]
    fn test_pack_domain_name() {
        let encoded = encode_name("www.example.com").unwrap();
        assert_eq!(
            encoded,
            vec![
                0x03, 0x77, 0x77, 0x77, 0x07, 0x65, 0x78, 0x61, 0x6D, 0x70, 0x6C, 0x65, 0x03,
                0x63, 0x6F, 0x6D, 0x00
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_ignored() {
        assert_eq!(
            encode_name("example.com.").unwrap(),
            encode_name("example.com").unwrap()
        );
        assert_eq!(encode_name("").unwrap(), vec![0]);
    }

    #[test]
    fn test_label_too_long() {
        let label = "a".repeat(64);
        let err = encode_name(&format!("{}.com", label)).unwrap_err();
        assert_eq!(err, EncodeError::LabelTooLong { label, len: 64 });

        let max = "b".repeat(63);
        let encoded = encode_name(&max).unwrap();
        assert_eq!(encoded[0], 63);
        assert_eq!(encoded.len(), 65);
    }

    #[test]
    fn test_empty_interior_label() {
        assert!(matches!(
            encode_name("a..b"),
            Err(EncodeError::EmptyLabel { .. })
        ));
        assert!(matches!(
            encode_name(".com"),
            Err(EncodeError::EmptyLabel { .. })
        ));
    }

    #[test]
    fn test_build_query_layout() {
        let query = build_query("example.com", QueryType::A, RECURSION_DESIRED, 0x8298).unwrap();

        assert_eq!(&query[..12], &[0x82, 0x98, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&query[12..25], &encode_name("example.com").unwrap()[..]);
        assert_eq!(&query[25..], &[0, 1, 0, 1]);
    }

    #[test]
    fn test_build_query_without_recursion() {
        let query = build_query("example.com", QueryType::NS, 0, 7).unwrap();
        assert_eq!(&query[2..4], &[0, 0]);
        assert_eq!(&query[query.len() - 4..], &[0, 2, 0, 1]);
    }

    #[test]
    fn test_build_query_rejects_bad_name() {
        let name = format!("{}.org", "x".repeat(70));
        assert!(build_query(&name, QueryType::A, 0, 1).is_err());
    }

    #[test]
    fn test_pack_record_data_length() {
        let record = ResourceRecord {
            name: "ns1.example.com".to_string(),
            rtype: QueryType::A,
            rclass: CLASS_IN,
            ttl: 60,
            data: RData::A(Ipv4Addr::new(192, 0, 2, 53)),
        };
        let mut buffer = Vec::new();
        record.pack(&mut buffer).unwrap();

        let name_len = encode_name("ns1.example.com").unwrap().len();
        let fixed = &buffer[name_len..];
        assert_eq!(&fixed[..4], &[0, 1, 0, 1]);
        assert_eq!(&fixed[4..8], &60u32.to_be_bytes());
        assert_eq!(&fixed[8..10], &[0, 4]);
        assert_eq!(&fixed[10..], &[192, 0, 2, 53]);
    }

    #[test]
    fn test_pack_ns_record_uses_name_length() {
        let record = ResourceRecord {
            name: "com".to_string(),
            rtype: QueryType::NS,
            rclass: CLASS_IN,
            ttl: 172800,
            data: RData::NS("a.gtld-servers.net".to_string()),
        };
        let mut buffer = Vec::new();
        record.pack(&mut buffer).unwrap();

        let rdata = encode_name("a.gtld-servers.net").unwrap();
        let len_at = buffer.len() - rdata.len() - 2;
        assert_eq!(
            u16::from_be_bytes([buffer[len_at], buffer[len_at + 1]]) as usize,
            rdata.len()
        );
        assert!(buffer.ends_with(&rdata));
    }
}
