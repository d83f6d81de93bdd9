//! Tests for block encoding
//!
//! These tests verify:
//! - Encode → decode reproduces records in order
//! - Ordering enforcement
//! - First-record admission and capacity rejection
//! - Byte layout of records and trailer
//! - Corruption detection

use bytes::Bytes;
use layerkv::storage::{Admission, Block, BlockBuilder, BLOCK_SIZE_TARGET};
use layerkv::LayerError;

// =============================================================================
// Helper Functions
// =============================================================================

fn decode(builder: BlockBuilder) -> Block {
    Block::decode(builder.close()).unwrap()
}

// =============================================================================
// BlockBuilder Tests
// =============================================================================

#[test]
fn test_empty_block_is_just_trailer() {
    let builder = BlockBuilder::new();
    let bytes = builder.close();

    assert_eq!(bytes.as_ref(), &[0u8, 0, 0, 0]);
    assert!(Block::decode(bytes).unwrap().is_empty());
}

#[test]
fn test_build_and_read() {
    let mut builder = BlockBuilder::new();
    for (key, fill) in [("key1", "1"), ("key2", "2"), ("key3", "3")] {
        let value = fill.repeat(1000);
        assert_eq!(
            builder.add(key.as_bytes(), value.as_bytes()).unwrap(),
            Admission::Accepted
        );
    }

    let block = decode(builder);

    assert_eq!(block.len(), 3);
    assert_eq!(block.get(b"key1").unwrap().as_ref(), "1".repeat(1000).as_bytes());
    assert_eq!(block.get(b"key3").unwrap().as_ref(), "3".repeat(1000).as_bytes());
    assert!(block.get(b"key4").is_none());
}

#[test]
fn test_decode_preserves_order_and_values() {
    let records: Vec<(String, Vec<u8>)> = (0..50)
        .map(|i| (format!("k{:04}", i), vec![i as u8; i * 3]))
        .collect();

    let mut builder = BlockBuilder::new();
    for (key, value) in &records {
        assert!(builder.add(key.as_bytes(), value).unwrap().is_accepted());
    }
    let block = decode(builder);

    let decoded: Vec<(Vec<u8>, Vec<u8>)> = block
        .entries()
        .iter()
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .collect();
    let expected: Vec<(Vec<u8>, Vec<u8>)> = records
        .into_iter()
        .map(|(k, v)| (k.into_bytes(), v))
        .collect();
    assert_eq!(decoded, expected);
}

#[test]
fn test_empty_key_and_value() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(b"", b"").unwrap().is_accepted());
    assert!(builder.add(b"a", b"").unwrap().is_accepted());

    let block = decode(builder);
    assert_eq!(block.get(b"").unwrap().len(), 0);
    assert_eq!(block.get(b"a").unwrap().len(), 0);
}

#[test]
fn test_record_layout_is_big_endian() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(b"ab", b"").unwrap().is_accepted());
    let bytes = builder.close();

    // shared = 0, key_len = 2, val_len = 1 (snappy of "" is a single 0x00)
    assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
    assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
    assert_eq!(&bytes[8..12], &[0, 0, 0, 1]);
    assert_eq!(&bytes[12..14], b"ab");
    assert_eq!(bytes[14], 0);
    assert_eq!(&bytes[15..], &[0, 0, 0, 0]);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_rejects_out_of_order_key() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(b"b", b"b").unwrap().is_accepted());

    let result = builder.add(b"a", b"a");
    assert!(matches!(result, Err(LayerError::OrderingViolation(_))));
}

#[test]
fn test_rejects_repeated_key() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(b"a", b"1").unwrap().is_accepted());

    let result = builder.add(b"a", b"2");
    assert!(matches!(result, Err(LayerError::OrderingViolation(_))));
    assert_eq!(builder.len(), 1);
}

#[test]
fn test_ordering_is_bytewise() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(&[0x7f], b"x").unwrap().is_accepted());
    assert!(builder.add(&[0x80], b"y").unwrap().is_accepted());
    assert!(builder.add(&[0xff, 0x00], b"z").unwrap().is_accepted());
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_accepts_oversized_first_record() {
    let mut builder = BlockBuilder::new();
    let value = vec![b'a'; BLOCK_SIZE_TARGET + 1];

    assert_eq!(builder.add(b"key", &value).unwrap(), Admission::Accepted);
    assert_eq!(decode(builder).get(b"key").unwrap().len(), BLOCK_SIZE_TARGET + 1);
}

#[test]
fn test_rejects_overflow() {
    let mut builder = BlockBuilder::new();
    assert_eq!(builder.add(b"a", b"a").unwrap(), Admission::Accepted);

    let big = vec![b'b'; BLOCK_SIZE_TARGET + 1];
    assert_eq!(builder.add(b"b", &big).unwrap(), Admission::Full);
}

#[test]
fn test_full_leaves_state_unchanged() {
    let mut builder = BlockBuilder::with_target(64);
    assert!(builder.add(b"a", &[1u8; 10]).unwrap().is_accepted());
    let len_before = builder.byte_len();

    assert_eq!(builder.add(b"c", &[2u8; 100]).unwrap(), Admission::Full);
    assert_eq!(builder.byte_len(), len_before);
    assert_eq!(builder.len(), 1);

    // The rejected key did not become the ordering watermark
    assert!(builder.add(b"b", &[3u8; 4]).unwrap().is_accepted());

    let block = decode(builder);
    let keys: Vec<&[u8]> = block.entries().iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(keys, vec![&b"a"[..], &b"b"[..]]);
}

#[test]
fn test_lower_bound() {
    let mut builder = BlockBuilder::new();
    for key in ["b", "d", "f"] {
        assert!(builder.add(key.as_bytes(), b"v").unwrap().is_accepted());
    }
    let block = decode(builder);

    assert_eq!(block.lower_bound(b"a"), 0);
    assert_eq!(block.lower_bound(b"b"), 0);
    assert_eq!(block.lower_bound(b"c"), 1);
    assert_eq!(block.lower_bound(b"f"), 2);
    assert_eq!(block.lower_bound(b"g"), 3);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_decode_rejects_buffer_smaller_than_trailer() {
    let result = Block::decode(Bytes::from_static(&[0, 0]));
    assert!(matches!(result, Err(LayerError::CorruptTable(_))));
}

#[test]
fn test_decode_rejects_truncated_record() {
    let mut builder = BlockBuilder::new();
    assert!(builder.add(b"key", b"value").unwrap().is_accepted());
    let bytes = builder.close();

    // Cut into the record body but keep a 4-byte tail to act as trailer
    let truncated = Bytes::copy_from_slice(&bytes[..bytes.len() - 6]);
    let result = Block::decode(truncated);
    assert!(matches!(result, Err(LayerError::CorruptTable(_))));
}

#[test]
fn test_decode_rejects_bad_compressed_value() {
    // shared 0, key_len 1, val_len 2, key "k", invalid snappy payload, trailer
    let raw: Vec<u8> = vec![
        0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, b'k', 0xff, 0xff, 0, 0, 0, 0,
    ];
    let result = Block::decode(Bytes::from(raw));
    assert!(matches!(result, Err(LayerError::CorruptTable(_))));
}
