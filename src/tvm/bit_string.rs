//! Fixed-capacity bit buffer
//!
//! A `BitString` holds up to 1023 bits, written MSB-first. It carries two
//! independent cursors: the write cursor (`len`) and a read cursor used when
//! a parsed cell is inspected.

use std::fmt;

use crate::tvm::address::Address;
use crate::tvm::error::{Result, TvmError};

/// Maximum number of bits a cell can store
pub const MAX_CELL_BITS: usize = 1023;

const STORAGE_BYTES: usize = MAX_CELL_BITS.div_ceil(8);

/// Bit length of a standard `addr_std` with no anycast
pub(crate) const STD_ADDRESS_BITS: usize = 2 + 1 + 8 + 256;

#[derive(Clone)]
pub struct BitString {
    data: [u8; STORAGE_BYTES],
    len: usize,
    read_pos: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self {
            data: [0; STORAGE_BYTES],
            len: 0,
            read_pos: 0,
        }
    }

    /// Creates a bit string from the first `bit_len` bits of `bytes`.
    ///
    /// Bits past `bit_len` in the last byte are cleared.
    pub fn from_bytes(bytes: &[u8], bit_len: usize) -> Result<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(TvmError::Overflow(format!(
                "bit length {} exceeds maximum {}",
                bit_len, MAX_CELL_BITS
            )));
        }
        if bytes.len() < bit_len.div_ceil(8) {
            return Err(TvmError::Underflow(format!(
                "{} bytes are insufficient for {} bits",
                bytes.len(),
                bit_len
            )));
        }

        let mut result = Self::new();
        let full_bytes = bit_len / 8;
        result.data[..full_bytes].copy_from_slice(&bytes[..full_bytes]);

        let tail_bits = bit_len % 8;
        if tail_bits != 0 {
            result.data[full_bytes] = bytes[full_bytes] & (0xFFu8 << (8 - tail_bits));
        }
        result.len = bit_len;

        Ok(result)
    }

    /// Number of bits written
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits that can still be written
    pub fn free_bits(&self) -> usize {
        MAX_CELL_BITS - self.len
    }

    /// Current read cursor position
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Number of bits left to read
    pub fn remaining_bits(&self) -> usize {
        self.len - self.read_pos
    }

    pub fn reset_read(&mut self) {
        self.read_pos = 0;
    }

    /// Bytes holding the written bits, unused tail bits are zero
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len.div_ceil(8)]
    }

    /// Returns the bit at `index`
    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.len {
            return Err(TvmError::Underflow(format!(
                "bit index {} out of range for length {}",
                index, self.len
            )));
        }
        Ok(self.bit_at(index))
    }

    /// Serialized payload: data bytes with the completion tag appended
    /// when the length is not a multiple of 8.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        let mut result = self.as_bytes().to_vec();
        if self.len % 8 != 0 {
            result[self.len / 8] |= 1 << (7 - self.len % 8);
        }
        result
    }

    fn bit_at(&self, index: usize) -> bool {
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    fn push_unchecked(&mut self, bit: bool) {
        if bit {
            self.data[self.len / 8] |= 1 << (7 - self.len % 8);
        }
        self.len += 1;
    }

    fn ensure_free(&self, bits: usize) -> Result<()> {
        if bits > self.free_bits() {
            return Err(TvmError::Overflow(format!(
                "cannot write {} bits, only {} available",
                bits,
                self.free_bits()
            )));
        }
        Ok(())
    }

    fn ensure_readable(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(TvmError::Underflow(format!(
                "cannot read {} bits, only {} remaining",
                bits,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.ensure_free(1)?;
        self.push_unchecked(bit);
        Ok(())
    }

    /// Writes all bits or none of them
    pub fn write_bits<I>(&mut self, bits: I) -> Result<()>
    where
        I: IntoIterator<Item = bool>,
    {
        let bits: Vec<bool> = bits.into_iter().collect();
        self.ensure_free(bits.len())?;
        for bit in bits {
            self.push_unchecked(bit);
        }
        Ok(())
    }

    /// Writes `value` as a `bit_len`-bit big-endian unsigned integer
    pub fn write_uint(&mut self, value: u64, bit_len: usize) -> Result<()> {
        if bit_len > 64 {
            return Err(TvmError::Overflow(format!(
                "uint width {} exceeds 64 bits",
                bit_len
            )));
        }
        if bit_len < 64 && value >> bit_len != 0 {
            return Err(TvmError::Overflow(format!(
                "value {} does not fit in {} bits",
                value, bit_len
            )));
        }
        self.ensure_free(bit_len)?;

        for i in (0..bit_len).rev() {
            self.push_unchecked((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes `value` as a `bit_len`-bit two's-complement integer
    pub fn write_int(&mut self, value: i64, bit_len: usize) -> Result<()> {
        if bit_len > 64 {
            return Err(TvmError::Overflow(format!(
                "int width {} exceeds 64 bits",
                bit_len
            )));
        }
        if bit_len == 0 {
            if value != 0 {
                return Err(TvmError::Overflow(format!(
                    "value {} does not fit in 0 bits",
                    value
                )));
            }
            return Ok(());
        }
        if bit_len < 64 {
            let min = -(1i64 << (bit_len - 1));
            let max = (1i64 << (bit_len - 1)) - 1;
            if value < min || value > max {
                return Err(TvmError::Overflow(format!(
                    "value {} does not fit in {} signed bits",
                    value, bit_len
                )));
            }
        }

        let mask = if bit_len == 64 {
            u64::MAX
        } else {
            (1u64 << bit_len) - 1
        };
        self.write_uint(value as u64 & mask, bit_len)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_uint(value as u64, 8)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_free(bytes.len() * 8)?;
        for &byte in bytes {
            for i in (0..8).rev() {
                self.push_unchecked((byte >> i) & 1 == 1);
            }
        }
        Ok(())
    }

    /// Appends every written bit of `other`
    pub fn write_bit_string(&mut self, other: &BitString) -> Result<()> {
        self.ensure_free(other.len)?;
        for i in 0..other.len {
            self.push_unchecked(other.bit_at(i));
        }
        Ok(())
    }

    /// Writes an amount as `VarUInteger 16`: a 4-bit byte length followed
    /// by the big-endian bytes without leading zeros.
    pub fn write_coins(&mut self, amount: u128) -> Result<()> {
        let byte_len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        if byte_len > 15 {
            return Err(TvmError::Overflow(format!(
                "coin amount {} needs {} bytes, at most 15 are allowed",
                amount, byte_len
            )));
        }
        self.ensure_free(4 + byte_len * 8)?;

        self.write_uint(byte_len as u64, 4)?;
        self.write_bytes(&amount.to_be_bytes()[16 - byte_len..])
    }

    /// Writes `addr_none$00` or `addr_std$10` with no anycast
    pub fn write_address(&mut self, address: Option<&Address>) -> Result<()> {
        match address {
            None => self.write_uint(0b00, 2),
            Some(addr) => {
                self.ensure_free(STD_ADDRESS_BITS)?;
                self.write_uint(0b10, 2)?;
                self.write_bit(false)?;
                self.write_int(addr.workchain as i64, 8)?;
                self.write_bytes(&addr.hash_part)
            }
        }
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        self.ensure_readable(1)?;
        let bit = self.bit_at(self.read_pos);
        self.read_pos += 1;
        Ok(bit)
    }

    pub fn read_bits(&mut self, n: usize) -> Result<Vec<bool>> {
        self.ensure_readable(n)?;
        let bits = (self.read_pos..self.read_pos + n)
            .map(|i| self.bit_at(i))
            .collect();
        self.read_pos += n;
        Ok(bits)
    }

    pub fn read_uint(&mut self, bit_len: usize) -> Result<u64> {
        if bit_len > 64 {
            return Err(TvmError::Underflow(format!(
                "cannot load {} bits into u64",
                bit_len
            )));
        }
        self.ensure_readable(bit_len)?;

        let mut result = 0u64;
        for _ in 0..bit_len {
            result = (result << 1) | self.bit_at(self.read_pos) as u64;
            self.read_pos += 1;
        }
        Ok(result)
    }

    pub fn read_int(&mut self, bit_len: usize) -> Result<i64> {
        if bit_len == 0 {
            return Ok(0);
        }
        let unsigned = self.read_uint(bit_len)?;
        if bit_len == 64 {
            return Ok(unsigned as i64);
        }

        let sign_bit = 1u64 << (bit_len - 1);
        if unsigned & sign_bit != 0 {
            Ok((unsigned | (!0u64 << bit_len)) as i64)
        } else {
            Ok(unsigned as i64)
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_uint(8)? as u8)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure_readable(n * 8)?;
        (0..n).map(|_| self.read_u8()).collect()
    }

    pub fn read_coins(&mut self) -> Result<u128> {
        let byte_len = self.read_uint(4)? as usize;
        let bytes = self.read_bytes(byte_len)?;
        Ok(bytes
            .iter()
            .fold(0u128, |acc, &byte| (acc << 8) | byte as u128))
    }

    pub fn read_address(&mut self) -> Result<Option<Address>> {
        match self.read_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.read_bit()? {
                    return Err(TvmError::InvalidAddress(
                        "anycast addresses are not supported".to_string(),
                    ));
                }
                let workchain = self.read_int(8)? as i8;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&self.read_bytes(32)?);
                Ok(Some(Address::new(workchain, hash_part)))
            }
            tag => Err(TvmError::InvalidAddress(format!(
                "unsupported address tag {:02b}",
                tag
            ))),
        }
    }
}

impl Default for BitString {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BitString {}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitString")
            .field("len", &self.len)
            .field("data", &hex::encode(self.as_bytes()))
            .finish()
    }
}

/// Fift-style hex dump, `_` marks a trailing completion tag
impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nibbles = self.len.div_ceil(4);
        let mut bytes = self.as_bytes().to_vec();
        let partial = self.len % 4 != 0;
        if partial {
            bytes[self.len / 8] |= 1 << (7 - self.len % 8);
        }
        let hex = hex::encode_upper(&bytes);
        write!(f, "x{{{}{}}}", &hex[..nibbles], if partial { "_" } else { "" })
    }
}
