//! # Frame Serialization
//!
//! Header followed by the raw payload, nothing else. Decoding validates the
//! length twice: the datagram must hold a full header, and then exactly
//! `data_size` payload bytes.

use super::header::{PacketHeader, HEADER_SIZE};
use super::packet::{wire_len, Packet};
use crate::error::{TransportError, TransportResult};

/// Encodes a packet into a fresh buffer.
///
/// `data_size` is always written from the actual payload length.
#[must_use]
pub fn serialize(packet: &Packet) -> Vec<u8> {
    let mut buf = Vec::with_capacity(packet.wire_size());
    let header = PacketHeader {
        data_size: wire_len(packet.data.len()),
        ..packet.header
    };
    header.write_to(&mut buf);
    buf.extend_from_slice(&packet.data);
    buf
}

/// Decodes a datagram into a packet owning a copy of the payload.
///
/// # Errors
///
/// - [`TransportError::MalformedPacket`] if `bytes` is shorter than the header.
/// - [`TransportError::SizeMismatch`] if the payload length differs from `data_size`.
pub fn deserialize(bytes: &[u8]) -> TransportResult<Packet> {
    let header = PacketHeader::read_from(bytes).ok_or(TransportError::MalformedPacket {
        len: bytes.len(),
        header: HEADER_SIZE,
    })?;

    let body = &bytes[HEADER_SIZE..];
    let declared = header.data_size as usize;
    if body.len() != declared {
        return Err(TransportError::SizeMismatch {
            declared,
            actual: body.len(),
        });
    }

    Ok(Packet {
        header,
        data: body.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Endpoint;

    fn sample() -> Packet {
        let mut packet = Packet::data(4, b"player state".to_vec());
        packet.header.seqid = 17;
        packet.header.auth = 0xDEAD_BEEF;
        packet.header.endpoint = Endpoint::new([1, 2, 3, 4], 5000);
        packet
    }

    #[test]
    fn test_roundtrip() {
        let packet = sample();
        let bytes = serialize(&packet);
        assert_eq!(bytes.len(), HEADER_SIZE + 12);
        assert_eq!(deserialize(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_empty_payload() {
        let packet = Packet::ack_request(3, 0, Endpoint::UNSPECIFIED);
        let bytes = serialize(&packet);
        assert_eq!(bytes.len(), HEADER_SIZE);
        let decoded = deserialize(&bytes).unwrap();
        assert!(decoded.data.is_empty());
        assert_eq!(decoded.header.ack, 3);
    }

    #[test]
    fn test_undersized() {
        for len in 0..HEADER_SIZE {
            let err = deserialize(&vec![0xFF; len]).unwrap_err();
            assert_eq!(
                err,
                TransportError::MalformedPacket {
                    len,
                    header: HEADER_SIZE
                }
            );
        }
    }

    #[test]
    fn test_truncated_and_extended() {
        let bytes = serialize(&sample());

        let err = deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(
            err,
            TransportError::SizeMismatch {
                declared: 12,
                actual: 11
            }
        );

        let mut extended = bytes.clone();
        extended.push(0);
        let err = deserialize(&extended).unwrap_err();
        assert_eq!(
            err,
            TransportError::SizeMismatch {
                declared: 12,
                actual: 13
            }
        );
    }

    #[test]
    fn test_stale_data_size_is_rewritten() {
        let mut packet = sample();
        packet.header.data_size = 999;
        let decoded = deserialize(&serialize(&packet)).unwrap();
        assert_eq!(decoded.header.data_size, 12);
    }

    #[test]
    fn test_decoded_buffer_is_independent() {
        let mut bytes = serialize(&sample());
        let decoded = deserialize(&bytes).unwrap();
        bytes[HEADER_SIZE] = b'X';
        assert_eq!(decoded.data[0], b'p');
    }
}
