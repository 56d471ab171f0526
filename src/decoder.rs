//! Wire-format parsing.
//!
//! Every function here works on an immutable message buffer and an absolute
//! position, and hands back the position just past what it consumed. Name
//! decompression follows pointers by recursing on the same buffer, so no
//! cursor state is shared between the levels of a pointer chain.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::dns::{DnsHeader, DnsMessage, DnsQuestion, QueryType, RData, ResourceRecord};
use crate::error::DecodeError;

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 12;

/// Upper bound on compression pointers followed while decoding one name.
///
/// Well-formed messages need a handful at most; anything beyond this is a
/// cycle or an attempt to exhaust the stack.
pub const MAX_POINTER_JUMPS: usize = 16;

const POINTER_MASK: u8 = 0b1100_0000;

fn take(buf: &[u8], pos: usize, len: usize) -> Result<&[u8], DecodeError> {
    let end = pos.saturating_add(len);
    if end > buf.len() {
        return Err(DecodeError::TruncatedMessage {
            offset: pos,
            needed: end - buf.len(),
        });
    }
    Ok(&buf[pos..end])
}

fn read_u8(buf: &[u8], pos: usize) -> Result<u8, DecodeError> {
    Ok(take(buf, pos, 1)?[0])
}

fn read_u16(buf: &[u8], pos: usize) -> Result<u16, DecodeError> {
    let bytes = take(buf, pos, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32, DecodeError> {
    let bytes = take(buf, pos, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decodes a possibly compressed domain name starting at `pos`.
///
/// Returns the dotted name and the position right after the name as it
/// appears at `pos`: after the terminating zero byte, or after the two-byte
/// pointer that ended it.
///
/// ```rust
/// use dns_walker::decoder::unpack_domain_name;
///
/// let data = [
///     7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
///     3, b'w', b'w', b'w', 0xc0, 0x00,
/// ];
/// let (name, next) = unpack_domain_name(&data, 13).unwrap();
/// assert_eq!(name, "www.example.com");
/// assert_eq!(next, data.len());
/// ```
pub fn unpack_domain_name(buf: &[u8], pos: usize) -> Result<(String, usize), DecodeError> {
    let mut labels = Vec::new();
    let next = collect_labels(buf, pos, 0, &mut labels)?;
    Ok((labels.join("."), next))
}

fn collect_labels(
    buf: &[u8],
    mut pos: usize,
    jumps: usize,
    labels: &mut Vec<String>,
) -> Result<usize, DecodeError> {
    loop {
        let len = read_u8(buf, pos)?;

        match len & POINTER_MASK {
            POINTER_MASK => {
                let low = read_u8(buf, pos + 1)?;
                let target = (usize::from(len & !POINTER_MASK) << 8) | usize::from(low);
                if target >= buf.len() {
                    return Err(DecodeError::InvalidCompressionPointer {
                        offset: pos,
                        target,
                    });
                }
                if jumps >= MAX_POINTER_JUMPS {
                    return Err(DecodeError::PointerLoop { offset: pos });
                }

                // A pointer always ends the name it appears in.
                collect_labels(buf, target, jumps + 1, labels)?;
                return Ok(pos + 2);
            }
            0 => {
                if len == 0 {
                    return Ok(pos + 1);
                }
                let label = take(buf, pos + 1, usize::from(len))?;
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += 1 + usize::from(len);
            }
            _ => {
                return Err(DecodeError::InvalidLabelType {
                    offset: pos,
                    byte: len,
                });
            }
        }
    }
}

/// Parses the 12-byte header at `pos`.
pub fn parse_header(buf: &[u8], pos: usize) -> Result<(DnsHeader, usize), DecodeError> {
    take(buf, pos, HEADER_LEN)?;

    let header = DnsHeader {
        id: read_u16(buf, pos)?,
        flags: read_u16(buf, pos + 2)?,
        question_count: read_u16(buf, pos + 4)?,
        answer_count: read_u16(buf, pos + 6)?,
        authority_count: read_u16(buf, pos + 8)?,
        additional_count: read_u16(buf, pos + 10)?,
    };
    Ok((header, pos + HEADER_LEN))
}

/// Parses one question-section entry at `pos`.
pub fn parse_question(buf: &[u8], pos: usize) -> Result<(DnsQuestion, usize), DecodeError> {
    let (name, pos) = unpack_domain_name(buf, pos)?;
    let qtype = QueryType::from(read_u16(buf, pos)?);
    let qclass = read_u16(buf, pos + 2)?;

    Ok((DnsQuestion { name, qtype, qclass }, pos + 4))
}

/// Parses one resource record at `pos`.
///
/// The 16-bit data length is read past but does not size the payload for
/// A, AAAA, NS and CNAME records; those shapes are fixed by their type. Any
/// other type keeps exactly the declared number of raw bytes.
pub fn parse_record(buf: &[u8], pos: usize) -> Result<(ResourceRecord, usize), DecodeError> {
    let (name, pos) = unpack_domain_name(buf, pos)?;

    let rtype = QueryType::from(read_u16(buf, pos)?);
    let rclass = read_u16(buf, pos + 2)?;
    let ttl = read_u32(buf, pos + 4)?;
    let data_len = usize::from(read_u16(buf, pos + 8)?);
    let pos = pos + 10;

    let (data, next) = match rtype {
        QueryType::A => {
            let octets = take(buf, pos, 4)?;
            let addr = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
            (RData::A(addr), pos + 4)
        }
        QueryType::AAAA => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(take(buf, pos, 16)?);
            (RData::AAAA(Ipv6Addr::from(octets)), pos + 16)
        }
        QueryType::NS => {
            let (host, next) = unpack_domain_name(buf, pos)?;
            (RData::NS(host), next)
        }
        QueryType::CNAME => {
            let (host, next) = unpack_domain_name(buf, pos)?;
            (RData::CNAME(host), next)
        }
        other => {
            let raw = take(buf, pos, data_len)?;
            let data = RData::Other {
                rtype: other.code(),
                data: raw.to_vec(),
            };
            (data, pos + data_len)
        }
    };

    let record = ResourceRecord {
        name,
        rtype,
        rclass,
        ttl,
        data,
    };
    Ok((record, next))
}

fn parse_records(
    buf: &[u8],
    mut pos: usize,
    count: u16,
) -> Result<(Vec<ResourceRecord>, usize), DecodeError> {
    let mut records = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let (record, next) = parse_record(buf, pos)?;
        records.push(record);
        pos = next;
    }
    Ok((records, pos))
}

impl DnsMessage {
    /// Parses a complete message.
    ///
    /// Exactly as many entries as the header announces are read, section by
    /// section; the first failure aborts the whole parse. Bytes after the
    /// last record are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (header, mut pos) = parse_header(bytes, 0)?;

        let mut questions = Vec::with_capacity(usize::from(header.question_count));
        for _ in 0..header.question_count {
            let (question, next) = parse_question(bytes, pos)?;
            questions.push(question);
            pos = next;
        }

        let (answers, pos) = parse_records(bytes, pos, header.answer_count)?;
        let (authorities, pos) = parse_records(bytes, pos, header.authority_count)?;
        let (additionals, _) = parse_records(bytes, pos, header.additional_count)?;

        Ok(DnsMessage {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

/// Parses a complete message; see [`DnsMessage::from_bytes`].
pub fn decode_message(bytes: &[u8]) -> Result<DnsMessage, DecodeError> {
    DnsMessage::from_bytes(bytes)
}
