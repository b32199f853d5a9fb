//! Builder for constructing cells
//!
//! `CellBuilder` is the unfinalized side of a cell: it accumulates bits and
//! references and `build()` consumes it, producing an immutable shared
//! `Arc<Cell>`.
//!
//! # Examples
//!
//! ```rust
//! use tonkit_rs::tvm::{Address, CellBuilder};
//!
//! let mut builder = CellBuilder::new();
//! let addr = Address::new(0, [0u8; 32]);
//! builder.store_address(Some(&addr)).unwrap();
//! builder.store_coins(1_000_000_000).unwrap();
//!
//! let cell = builder.build().unwrap();
//! assert_eq!(cell.bit_len(), 267 + 4 + 32);
//! ```

use std::sync::Arc;

use crate::tvm::address::Address;
use crate::tvm::bit_string::{BitString, MAX_CELL_BITS};
use crate::tvm::cell::{Cell, MAX_CELL_REFS};
use crate::tvm::error::{Result, TvmError};

pub struct CellBuilder {
    bits: BitString,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates a new cell builder
    pub fn new() -> Self {
        Self {
            bits: BitString::new(),
            references: Vec::new(),
        }
    }

    /// Returns the number of bits used
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Returns the number of available bits
    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS - self.bits.len()
    }

    /// Returns the number of references
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Returns the number of available references
    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.bits.write_bit(bit)?;
        Ok(self)
    }

    pub fn store_bits<I>(&mut self, bits: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = bool>,
    {
        self.bits.write_bits(bits)?;
        Ok(self)
    }

    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self> {
        self.bits.write_uint(value, bits)?;
        Ok(self)
    }

    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self> {
        self.bits.write_int(value, bits)?;
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> Result<&mut Self> {
        self.bits.write_u8(value)?;
        Ok(self)
    }

    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_uint(value, 64)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.bits.write_bytes(bytes)?;
        Ok(self)
    }

    pub fn store_bit_string(&mut self, bits: &BitString) -> Result<&mut Self> {
        self.bits.write_bit_string(bits)?;
        Ok(self)
    }

    /// Stores coins (VarUInteger 16)
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self> {
        self.bits.write_coins(amount)?;
        Ok(self)
    }

    /// Stores `addr_none` or a standard address
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self> {
        self.bits.write_address(address)?;
        Ok(self)
    }

    /// Stores a reference to another cell
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(TvmError::Overflow(format!(
                "cannot add reference: maximum {} references allowed",
                MAX_CELL_REFS
            )));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Stores an optional reference (Maybe ^Cell)
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> Result<&mut Self> {
        match cell {
            Some(c) => {
                if self.available_refs() == 0 {
                    return Err(TvmError::Overflow("no reference slot left".to_string()));
                }
                self.store_bit(true)?;
                self.store_ref(c)
            }
            None => self.store_bit(false),
        }
    }

    /// Appends the bits and references of another cell
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self> {
        if self.ref_count() + cell.reference_count() > MAX_CELL_REFS {
            return Err(TvmError::Overflow("builder refs overflow".to_string()));
        }
        self.store_bit_string(cell.bits())?;
        self.references.extend(cell.references().iter().cloned());
        Ok(self)
    }

    /// Builds the cell
    pub fn build(self) -> Result<Arc<Cell>> {
        Ok(Arc::new(Cell::with_parts(self.bits, self.references)?))
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}
