//! TON Address implementation
//!
//! An address is a workchain id plus a 32-byte account hash. It has two
//! textual forms: raw `workchain:hex` and the user-friendly base64 form
//! `{tag, workchain, hash[32], crc16[2]}`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::crc::CRC16;
use crate::tvm::error::{Result, TvmError};

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TEST_ONLY_FLAG: u8 = 0x80;

/// Length of the decoded user-friendly form
const FRIENDLY_LEN: usize = 36;

/// Represents a TON blockchain address
///
/// Equality and hashing only consider the workchain and hash part; the
/// bounceable and test-only flags are presentation hints.
#[derive(Debug, Clone, Copy)]
pub struct Address {
    /// Workchain ID (-1 for masterchain, 0 for basechain)
    pub workchain: i8,
    /// 32-byte hash part of the address
    pub hash_part: [u8; 32],
    /// Whether the address is bounceable
    pub is_bounceable: bool,
    /// Whether this is a test-only address
    pub is_test_only: bool,
}

impl Address {
    /// Creates a bounceable, non-test address
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
            is_bounceable: true,
            is_test_only: false,
        }
    }

    /// Parses address from raw format: "workchain:hash"
    pub fn from_raw(address: &str) -> Result<Self> {
        let (workchain, hash_hex) = address
            .split_once(':')
            .ok_or_else(|| TvmError::InvalidAddress("missing ':' separator".to_string()))?;

        let workchain = workchain
            .parse::<i8>()
            .map_err(|e| TvmError::InvalidAddress(format!("bad workchain {:?}: {}", workchain, e)))?;

        if hash_hex.len() != 64 {
            return Err(TvmError::InvalidAddress(format!(
                "hash part must be 64 hex characters, got {}",
                hash_hex.len()
            )));
        }

        let mut hash_part = [0u8; 32];
        hex::decode_to_slice(hash_hex, &mut hash_part)
            .map_err(|e| TvmError::InvalidAddress(format!("bad hash part: {}", e)))?;

        Ok(Self::new(workchain, hash_part))
    }

    /// Parses address from base64 user-friendly format (url-safe or standard)
    pub fn from_friendly(address: &str) -> Result<Self> {
        let decoded = URL_SAFE
            .decode(address)
            .or_else(|_| STANDARD.decode(address))
            .map_err(|e| TvmError::InvalidAddress(format!("bad base64: {}", e)))?;

        Self::from_friendly_bytes(&decoded)
    }

    /// Parses the decoded 36-byte user-friendly form
    pub fn from_friendly_bytes(decoded: &[u8]) -> Result<Self> {
        if decoded.len() != FRIENDLY_LEN {
            return Err(TvmError::InvalidAddress(format!(
                "user-friendly form must be {} bytes, got {}",
                FRIENDLY_LEN,
                decoded.len()
            )));
        }

        let expected = u16::from_be_bytes([decoded[34], decoded[35]]);
        let actual = CRC16.checksum(&decoded[..34]);
        if expected != actual {
            return Err(TvmError::ChecksumMismatch {
                expected: expected as u32,
                actual: actual as u32,
            });
        }

        let mut tag = decoded[0];
        let is_test_only = tag & TEST_ONLY_FLAG != 0;
        tag &= !TEST_ONLY_FLAG;

        let is_bounceable = match tag {
            BOUNCEABLE_TAG => true,
            NON_BOUNCEABLE_TAG => false,
            _ => {
                return Err(TvmError::InvalidAddress(format!(
                    "invalid tag 0x{:02x}",
                    decoded[0]
                )));
            }
        };

        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&decoded[2..34]);

        Ok(Self {
            workchain: decoded[1] as i8,
            hash_part,
            is_bounceable,
            is_test_only,
        })
    }

    /// Converts to raw format (workchain:hash)
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    /// Encodes the 36-byte user-friendly form
    pub fn to_friendly_bytes(&self, bounceable: bool, test_only: bool) -> [u8; FRIENDLY_LEN] {
        let mut tag = if bounceable {
            BOUNCEABLE_TAG
        } else {
            NON_BOUNCEABLE_TAG
        };
        if test_only {
            tag |= TEST_ONLY_FLAG;
        }

        let mut data = [0u8; FRIENDLY_LEN];
        data[0] = tag;
        data[1] = self.workchain as u8;
        data[2..34].copy_from_slice(&self.hash_part);
        let crc = CRC16.checksum(&data[..34]);
        data[34..].copy_from_slice(&crc.to_be_bytes());
        data
    }

    /// Converts to the base64 user-friendly form
    pub fn to_friendly(&self, bounceable: bool, test_only: bool, url_safe: bool) -> String {
        let data = self.to_friendly_bytes(bounceable, test_only);
        if url_safe {
            URL_SAFE.encode(data)
        } else {
            STANDARD.encode(data)
        }
    }

    /// Url-safe user-friendly form using the address' own flags
    pub fn to_base64(&self) -> String {
        self.to_friendly(self.is_bounceable, self.is_test_only, true)
    }

    pub fn with_bounceable(mut self, bounceable: bool) -> Self {
        self.is_bounceable = bounceable;
        self
    }

    pub fn with_test_only(mut self, test_only: bool) -> Self {
        self.is_test_only = test_only;
        self
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash_part == other.hash_part
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash_part.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Accepts either the raw or the user-friendly form
impl FromStr for Address {
    type Err = TvmError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains(':') {
            Self::from_raw(s)
        } else {
            Self::from_friendly(s)
        }
    }
}
