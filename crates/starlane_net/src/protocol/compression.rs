//! # Payload Compression
//!
//! Optional per-packet compression with a raw byte-stream block compressor.
//!
//! ## Policy
//!
//! 1. Only payloads strictly larger than the threshold are tried.
//! 2. The compressed form is kept only if it is smaller than the original,
//!    so compression never grows a datagram.
//! 3. A kept compressed payload records its original length in
//!    `original_size`; 0 means "sent as-is".

use super::packet::{wire_len, Packet};
use crate::error::{TransportError, TransportResult};

/// Payloads must exceed this many bytes before compression is attempted.
pub const COMPRESSION_THRESHOLD: usize = 32;

/// Largest `original_size` accepted on receive (1 MiB).
pub const MAX_DECOMPRESSED_SIZE: usize = 1 << 20;

/// Compresses `bytes` if that makes them smaller.
///
/// Returns the bytes to send and whether they are compressed.
#[must_use]
pub fn compress_if_smaller(bytes: &[u8], threshold: usize) -> (Vec<u8>, bool) {
    if bytes.len() <= threshold {
        return (bytes.to_vec(), false);
    }

    let compressed = lz4_flex::block::compress(bytes);
    if compressed.len() < bytes.len() {
        (compressed, true)
    } else {
        (bytes.to_vec(), false)
    }
}

/// Restores a compressed payload to exactly `original_size` bytes.
///
/// # Errors
///
/// [`TransportError::DecompressionFailed`] if the size is out of range, the
/// stream is corrupt, or it decodes to a different length.
pub fn decompress(bytes: &[u8], original_size: usize) -> TransportResult<Vec<u8>> {
    if original_size > MAX_DECOMPRESSED_SIZE {
        return Err(TransportError::DecompressionFailed(format!(
            "declared size {original_size} exceeds {MAX_DECOMPRESSED_SIZE}"
        )));
    }

    let restored = lz4_flex::block::decompress(bytes, original_size)
        .map_err(|e| TransportError::DecompressionFailed(e.to_string()))?;

    if restored.len() != original_size {
        return Err(TransportError::DecompressionFailed(format!(
            "expected {original_size} bytes, got {}",
            restored.len()
        )));
    }
    Ok(restored)
}

/// Applies the send-side policy to a packet's payload in place.
///
/// Returns true if the payload was replaced by its compressed form.
pub fn compress_packet(packet: &mut Packet, threshold: usize) -> bool {
    let (bytes, compressed) = compress_if_smaller(&packet.data, threshold);
    if compressed {
        packet.header.original_size = wire_len(packet.data.len());
        packet.set_payload(bytes);
    } else {
        packet.header.original_size = 0;
    }
    compressed
}

/// Undoes [`compress_packet`] on a received packet.
///
/// Afterwards `data_size` is the logical length and `original_size` is 0.
/// On error the packet is left untouched and must be dropped.
pub fn decompress_packet(packet: &mut Packet) -> TransportResult<()> {
    if packet.header.original_size == 0 {
        return Ok(());
    }

    let restored = decompress(&packet.data, packet.header.original_size as usize)?;
    packet.set_payload(restored);
    packet.header.original_size = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payload_untouched() {
        let data = [7u8; COMPRESSION_THRESHOLD];
        let (out, compressed) = compress_if_smaller(&data, COMPRESSION_THRESHOLD);
        assert!(!compressed);
        assert_eq!(out, data);
    }

    #[test]
    fn test_repetitive_payload_shrinks() {
        let data = vec![b'a'; 1000];
        let (out, compressed) = compress_if_smaller(&data, COMPRESSION_THRESHOLD);
        assert!(compressed);
        assert!(out.len() < data.len());
        assert_eq!(decompress(&out, data.len()).unwrap(), data);
    }

    #[test]
    fn test_incompressible_payload_kept() {
        // Every byte value once: nothing for the compressor to reuse
        let data: Vec<u8> = (0..=255u8).collect();
        let (out, compressed) = compress_if_smaller(&data, COMPRESSION_THRESHOLD);
        assert!(!compressed);
        assert_eq!(out, data);
    }

    #[test]
    fn test_packet_roundtrip() {
        let mut packet = Packet::data(3, vec![0u8; 500]);
        assert!(compress_packet(&mut packet, COMPRESSION_THRESHOLD));
        assert_eq!(packet.header.original_size, 500);
        assert!(packet.header.data_size < 500);
        assert_eq!(packet.header.data_size as usize, packet.data.len());

        decompress_packet(&mut packet).unwrap();
        assert_eq!(packet.data, vec![0u8; 500]);
        assert_eq!(packet.header.data_size, 500);
        assert_eq!(packet.header.original_size, 0);
    }

    #[test]
    fn test_uncompressed_packet_passes_through() {
        let mut packet = Packet::data(3, b"short".to_vec());
        assert!(!compress_packet(&mut packet, COMPRESSION_THRESHOLD));
        assert_eq!(packet.header.original_size, 0);
        decompress_packet(&mut packet).unwrap();
        assert_eq!(packet.data, b"short");
    }

    #[test]
    fn test_corrupt_stream_rejected() {
        let mut packet = Packet::data(3, vec![0xFF; 40]);
        packet.header.original_size = 4000;
        let before = packet.clone();
        assert!(matches!(
            decompress_packet(&mut packet),
            Err(TransportError::DecompressionFailed(_))
        ));
        assert_eq!(packet, before);
    }

    #[test]
    fn test_wrong_declared_size_rejected() {
        let data = vec![b'z'; 300];
        let (out, _) = compress_if_smaller(&data, COMPRESSION_THRESHOLD);
        assert!(decompress(&out, 200).is_err());
        assert!(decompress(&out, 400).is_err());
    }

    #[test]
    fn test_oversized_declaration_rejected() {
        assert!(matches!(
            decompress(&[0u8; 4], MAX_DECOMPRESSED_SIZE + 1),
            Err(TransportError::DecompressionFailed(_))
        ));
    }
}
