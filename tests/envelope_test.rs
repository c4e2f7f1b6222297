use scspdec::envelope::{decode_to_vec, Endian};
use scspdec::errors::Error;

fn block(uncompressed: u32, compressed: u32, payload: &[u8], endian: Endian) -> Vec<u8> {
    let mut out = Vec::new();

    match endian {
        Endian::Little => {
            out.extend_from_slice(&uncompressed.to_le_bytes());
            out.extend_from_slice(&compressed.to_le_bytes());
        }
        Endian::Big => {
            out.extend_from_slice(&uncompressed.to_be_bytes());
            out.extend_from_slice(&compressed.to_be_bytes());
        }
    }

    out.extend_from_slice(payload);
    out
}

#[test]
fn empty_stream_is_truncated() {
    match decode_to_vec(&[], Endian::Little) {
        Err(Error::TruncatedStream { block, .. }) => assert_eq!(block, 0),
        other => panic!("expected TruncatedStream, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn partial_header_is_truncated() {
    match decode_to_vec(&[1, 2, 3, 4], Endian::Little) {
        Err(Error::TruncatedStream { needed, got, .. }) => {
            assert_eq!(needed, 8);
            assert_eq!(got, 4);
        }
        other => panic!("expected TruncatedStream, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn zero_block_expands_to_zeros() {
    let stream = block(16, 0, &[], Endian::Little);
    let out = decode_to_vec(&stream, Endian::Little).unwrap();

    assert_eq!(out, vec![0u8; 16]);
}

#[test]
fn compressed_block_round_trips() {
    let data = b"the quick brown fox jumps over the lazy dog, twice over";
    let payload = lz4_flex::block::compress(data);
    let stream = block(data.len() as u32, payload.len() as u32, &payload, Endian::Little);

    let out = decode_to_vec(&stream, Endian::Little).unwrap();

    assert_eq!(out, data);
}

#[test]
fn blocks_concatenate_in_order() {
    let data = b"scsp image bytes";
    let payload = lz4_flex::block::compress(data);

    let mut stream = block(4, 0, &[], Endian::Little);
    stream.extend(block(
        data.len() as u32,
        payload.len() as u32,
        &payload,
        Endian::Little,
    ));

    let out = decode_to_vec(&stream, Endian::Little).unwrap();

    assert_eq!(&out[..4], &[0, 0, 0, 0]);
    assert_eq!(&out[4..], data);
}

#[test]
fn short_payload_is_truncated() {
    let data = b"some payload data";
    let payload = lz4_flex::block::compress(data);
    let mut stream = block(
        data.len() as u32,
        payload.len() as u32,
        &payload,
        Endian::Little,
    );

    stream.truncate(stream.len() - 3);

    match decode_to_vec(&stream, Endian::Little) {
        Err(Error::TruncatedStream { needed, got, .. }) => {
            assert_eq!(needed, payload.len());
            assert_eq!(got, payload.len() - 3);
        }
        other => panic!("expected TruncatedStream, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn size_mismatch_is_not_fatal() {
    let data = b"eight by";
    let payload = lz4_flex::block::compress(data);

    // Declare more than the block actually holds; the output is
    // whatever the codec produced.
    let stream = block(
        data.len() as u32 + 4,
        payload.len() as u32,
        &payload,
        Endian::Little,
    );

    let out = decode_to_vec(&stream, Endian::Little).unwrap();

    assert_eq!(out, data);
}

#[test]
fn big_endian_headers_decode() {
    let stream = block(8, 0, &[], Endian::Big);
    let out = decode_to_vec(&stream, Endian::Big).unwrap();

    assert_eq!(out, vec![0u8; 8]);
}
