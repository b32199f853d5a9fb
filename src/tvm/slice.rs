//! Slice implementation for reading data from cells
//!
//! A Slice reads a cell sequentially. It owns a copy of the cell's bit string
//! (whose read cursor it advances) and tracks a reference cursor.

use std::sync::Arc;

use crate::tvm::address::Address;
use crate::tvm::bit_string::BitString;
use crate::tvm::cell::Cell;
use crate::tvm::error::{Result, TvmError};

#[derive(Debug, Clone)]
pub struct Slice {
    cell: Arc<Cell>,
    bits: BitString,
    ref_pos: usize,
}

impl Slice {
    /// Creates a new slice from a cell
    pub fn new(cell: Arc<Cell>) -> Self {
        let mut bits = cell.bits().clone();
        bits.reset_read();
        Self {
            cell,
            bits,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.bits.remaining_bits()
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count() - self.ref_pos
    }

    /// True when neither bits nor references are left
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        self.bits.read_bit()
    }

    pub fn load_bits(&mut self, n: usize) -> Result<Vec<bool>> {
        self.bits.read_bits(n)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u64> {
        self.bits.read_uint(bits)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i64> {
        self.bits.read_int(bits)
    }

    pub fn load_u8(&mut self) -> Result<u8> {
        self.bits.read_u8()
    }

    pub fn load_u32(&mut self) -> Result<u32> {
        Ok(self.bits.read_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> Result<u64> {
        self.bits.read_uint(64)
    }

    pub fn load_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.bits.read_bytes(n)
    }

    /// Loads coins (VarUInteger 16)
    pub fn load_coins(&mut self) -> Result<u128> {
        self.bits.read_coins()
    }

    pub fn load_address(&mut self) -> Result<Option<Address>> {
        self.bits.read_address()
    }

    /// Loads a reference to another cell
    pub fn load_reference(&mut self) -> Result<Arc<Cell>> {
        let reference = self
            .cell
            .reference(self.ref_pos)
            .cloned()
            .ok_or_else(|| TvmError::Underflow("no more references to read".to_string()))?;
        self.ref_pos += 1;
        Ok(reference)
    }

    /// Loads a `Maybe ^Cell`
    pub fn load_maybe_ref(&mut self) -> Result<Option<Arc<Cell>>> {
        if self.load_bit()? {
            Ok(Some(self.load_reference()?))
        } else {
            Ok(None)
        }
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.bits.read_bits(n).map(|_| ())
    }

    /// Gets the underlying cell
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    pub fn bit_position(&self) -> usize {
        self.bits.read_position()
    }

    pub fn ref_position(&self) -> usize {
        self.ref_pos
    }

    /// Resets the slice to the beginning
    pub fn reset(&mut self) {
        self.bits.reset_read();
        self.ref_pos = 0;
    }
}

impl From<Arc<Cell>> for Slice {
    fn from(cell: Arc<Cell>) -> Self {
        Self::new(cell)
    }
}
