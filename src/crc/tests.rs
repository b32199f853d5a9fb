//! Tests for CRC module

use super::*;

#[test]
fn test_crc16_check_value() {
    // Standard check input for CRC catalogues
    assert_eq!(CRC16.checksum(b"123456789"), 0x31C3);
}

#[test]
fn test_crc16_empty_data() {
    assert_eq!(CRC16.checksum(b""), 0x0000);
}

#[test]
fn test_crc16_deterministic() {
    let data = b"test data";
    assert_eq!(CRC16.checksum(data), CRC16.checksum(data));
}

#[test]
fn test_crc16_order_matters() {
    assert_ne!(CRC16.checksum(b"abc"), CRC16.checksum(b"bca"));
}

#[test]
fn test_crc16_detects_single_bit_flip() {
    let data: Vec<u8> = (0..34).collect();
    let reference = CRC16.checksum(&data);

    for byte in 0..data.len() {
        for bit in 0..8 {
            let mut flipped = data.clone();
            flipped[byte] ^= 1 << bit;
            assert_ne!(CRC16.checksum(&flipped), reference, "byte {byte} bit {bit}");
        }
    }
}

#[test]
fn test_crc32c_check_value() {
    assert_eq!(CRC32C.checksum(b"123456789"), 0xE3069283);
}

#[test]
fn test_crc32c_empty_data() {
    assert_eq!(CRC32C.checksum(b""), 0x0000_0000);
}

#[test]
fn test_crc32c_digest_update() {
    let mut digest = CRC32C.digest();
    digest.update(b"hello");
    digest.update(b" world");

    assert_eq!(digest.finalize(), CRC32C.checksum(b"hello world"));
}

#[test]
fn test_crc32c_differs_from_crc16() {
    let data = b"test";
    assert_ne!(CRC16.checksum(data) as u32, CRC32C.checksum(data));
}
