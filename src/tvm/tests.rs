//! Integration tests across TVM modules

use crate::tvm::*;
use std::sync::Arc;

/// Helper function to create a cell holding a single uint
fn uint_cell(value: u64, bits: usize) -> Arc<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(value, bits).unwrap();
    builder.build().unwrap()
}

/// Builds a small message graph with a shared subtree
fn sample_message() -> Arc<Cell> {
    let code = uint_cell(0xC0DE, 16);
    let data = {
        let mut builder = CellBuilder::new();
        builder.store_u32(7).unwrap().store_ref(code.clone()).unwrap();
        builder.build().unwrap()
    };
    let state_init = create_state_init(Some(code), Some(data)).unwrap();

    let dest = Address::new(0, [0x42; 32]);
    let mut header = InternalMessageHeader::new(dest, 1_000_000_000);
    header.created_lt = 77;
    let header = create_internal_message_header(&header).unwrap();

    let body = uint_cell(0xDEADBEEF, 32);
    create_common_msg_info(&header, Some(&state_init), Some(&body)).unwrap()
}

/// Collects the hashes of every reachable cell in DFS pre-order
async fn all_hashes(cell: &Arc<Cell>) -> Vec<[u8; 32]> {
    let mut out = Vec::new();
    let mut stack = vec![cell.clone()];
    while let Some(cell) = stack.pop() {
        out.push(cell.hash().await);
        for child in cell.references().iter().rev() {
            stack.push(child.clone());
        }
    }
    out
}

/// Round trip keeps the hash of every reachable cell
#[tokio::test]
async fn test_message_roundtrip_preserves_all_hashes() {
    let msg = sample_message();
    let expected = all_hashes(&msg).await;

    for has_crc32c in [false, true] {
        let boc = serialize_boc(&msg, has_crc32c).unwrap();
        let parsed = deserialize_boc(&boc).unwrap();
        assert_eq!(all_hashes(&parsed).await, expected);
    }
}

/// Re-serializing a parsed BoC reproduces the same bytes
#[test]
fn test_serialization_is_stable() {
    let msg = sample_message();
    let boc = serialize_boc(&msg, true).unwrap();
    let again = serialize_boc(&deserialize_boc(&boc).unwrap(), true).unwrap();
    assert_eq!(boc, again);
}

/// Hash does not depend on which subtree is hashed first
#[tokio::test]
async fn test_hash_independent_of_evaluation_order() {
    let first = sample_message();
    let second = sample_message();

    // warm up a leaf of the second graph only
    let leaf = second.reference(1).unwrap().reference(0).unwrap().clone();
    leaf.hash().await;

    assert_eq!(first.hash().await, second.hash().await);
    assert_eq!(first.depth().await, second.depth().await);
}

/// Parsed cells are finalized and reject mutation once hashed
#[tokio::test]
async fn test_parsed_cells_reject_mutation() {
    let boc = serialize_boc(&uint_cell(1, 8), false).unwrap();
    let parsed = deserialize_boc(&boc).unwrap();
    parsed.hash().await;

    let mut owned = Arc::try_unwrap(parsed).unwrap();
    assert_eq!(
        owned.bits_mut().unwrap_err(),
        TvmError::MutationAfterFinalize
    );
}

/// Read back a message header through a slice
#[test]
fn test_slice_reads_back_message() {
    let msg = sample_message();
    let mut slice = Slice::new(msg);

    assert!(!slice.load_bit().unwrap());
    slice.skip_bits(3).unwrap();
    assert_eq!(slice.load_address().unwrap(), None);
    assert_eq!(
        slice.load_address().unwrap(),
        Some(Address::new(0, [0x42; 32]))
    );
    assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
    assert!(!slice.load_bit().unwrap());
    assert_eq!(slice.load_coins().unwrap(), 0);
    assert_eq!(slice.load_coins().unwrap(), 0);
    assert_eq!(slice.load_u64().unwrap(), 77);
    assert_eq!(slice.load_u32().unwrap(), 0);

    // state init present and inlined
    assert!(slice.load_bit().unwrap());
    assert!(!slice.load_bit().unwrap());
    assert_eq!(slice.load_uint(5).unwrap(), 0b00110);
    let code = slice.load_reference().unwrap();
    assert_eq!(Slice::new(code).load_uint(16).unwrap(), 0xC0DE);
    slice.load_reference().unwrap();

    // body inlined
    assert!(!slice.load_bit().unwrap());
    assert_eq!(slice.load_u32().unwrap(), 0xDEADBEEF);
    assert!(slice.is_empty());
}

/// Exactly 1023 bits survive a round trip
#[test]
fn test_full_cell_roundtrip() {
    let mut builder = CellBuilder::new();
    builder
        .store_bits((0..MAX_CELL_BITS).map(|i| i % 3 == 0))
        .unwrap();
    assert!(builder.store_bit(true).is_err());
    let cell = builder.build().unwrap();

    let parsed = base64_to_boc(&boc_to_base64(&cell, true).unwrap()).unwrap();
    assert_eq!(parsed.bits(), cell.bits());
}

/// A deep chain keeps its depth through the BoC
#[tokio::test]
async fn test_deep_chain_depth() {
    let mut cell = uint_cell(0, 1);
    for i in 1..200u64 {
        let mut builder = CellBuilder::new();
        builder.store_u64(i).unwrap().store_ref(cell).unwrap();
        cell = builder.build().unwrap();
    }

    let parsed = deserialize_boc(&serialize_boc(&cell, false).unwrap()).unwrap();
    assert_eq!(parsed.depth().await, 199);
    assert_eq!(parsed.hash().await, cell.hash().await);
}
