//! Cell implementation for TON blockchain
//!
//! A cell is a fundamental data structure in TON that can store up to 1023 bits
//! of data and maintain up to 4 references to other cells. Cells form a DAG:
//! a child is shared through `Arc` and may have several parents.
//!
//! The representation hash and depth are computed once per cell, bottom-up,
//! and memoized. Concurrent callers asking for the hash of the same cell
//! share a single computation.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

use crate::tvm::bit_string::BitString;
use crate::tvm::error::{Result, TvmError};

/// Maximum number of references a cell can have
pub const MAX_CELL_REFS: usize = 4;

/// Cell level range (0-3)
pub const MAX_CELL_LEVEL: u8 = 3;

/// Deepest reference chain accepted from a BoC
pub const MAX_CELL_DEPTH: u16 = 1024;

/// Representation hash and depth of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRepr {
    pub hash: [u8; 32],
    pub depth: u16,
}

/// Represents a cell in the TON blockchain
pub struct Cell {
    bits: BitString,
    references: Vec<Arc<Cell>>,
    /// Exotic cells are tagged but not interpreted
    is_exotic: bool,
    level: u8,
    repr: OnceCell<CellRepr>,
    /// Set once the cell has been written into a BoC
    sealed: AtomicBool,
}

impl Cell {
    /// Creates a new empty ordinary cell
    pub fn new() -> Self {
        Self {
            bits: BitString::new(),
            references: Vec::new(),
            is_exotic: false,
            level: 0,
            repr: OnceCell::new(),
            sealed: AtomicBool::new(false),
        }
    }

    /// Creates an ordinary cell from its parts
    pub fn with_parts(bits: BitString, references: Vec<Arc<Cell>>) -> Result<Self> {
        let mut cell = Self::new();
        cell.bits = bits;
        for reference in references {
            cell.add_reference(reference)?;
        }
        Ok(cell)
    }

    /// Creates an exotic cell; the level is taken as given
    pub fn exotic(bits: BitString, references: Vec<Arc<Cell>>, level: u8) -> Result<Self> {
        if level > MAX_CELL_LEVEL {
            return Err(TvmError::Overflow(format!(
                "cell level {} exceeds {}",
                level, MAX_CELL_LEVEL
            )));
        }
        let mut cell = Self::with_parts(bits, references)?;
        cell.is_exotic = true;
        cell.level = level;
        Ok(cell)
    }

    /// Returns the cell's data
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Mutable access to the data of a cell that has not been finalized
    pub fn bits_mut(&mut self) -> Result<&mut BitString> {
        self.ensure_mutable()?;
        Ok(&mut self.bits)
    }

    /// Adds a reference to another cell
    pub fn add_reference(&mut self, cell: Arc<Cell>) -> Result<()> {
        self.ensure_mutable()?;
        if self.references.len() >= MAX_CELL_REFS {
            return Err(TvmError::Overflow(format!(
                "cell already has maximum number of references ({})",
                MAX_CELL_REFS
            )));
        }
        self.references.push(cell);
        self.update_level();
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(TvmError::MutationAfterFinalize);
        }
        Ok(())
    }

    /// Whether the hash has been observed or the cell has been serialized
    pub fn is_finalized(&self) -> bool {
        self.repr.initialized() || self.sealed.load(Ordering::Acquire)
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns the number of bits in the cell
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Returns the cell's references
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Returns the number of references
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Gets a reference by index
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    pub fn is_exotic(&self) -> bool {
        self.is_exotic
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    fn update_level(&mut self) {
        if self.is_exotic {
            return;
        }
        // Ordinary cells inherit the maximum level of their references
        self.level = self.references.iter().map(|r| r.level()).max().unwrap_or(0);
    }

    /// Computes the cell's descriptor bytes
    pub fn descriptors(&self) -> [u8; 2] {
        // d1 = r + 8*s + 32*l
        let d1 = self.references.len() as u8 + if self.is_exotic { 8 } else { 0 } + self.level * 32;
        // d2 = floor(b/8) + ceil(b/8)
        let bit_len = self.bits.len();
        let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
        [d1, d2]
    }

    /// Returns the memoized hash and depth, computing them on first use.
    ///
    /// Descendants without a repr are resolved first, in post-order, with an
    /// explicit stack so the chain length does not consume the call stack.
    /// Callers racing on the same cell await one shared computation.
    pub async fn repr(&self) -> CellRepr {
        loop {
            if let Some(repr) = self.repr.get() {
                return *repr;
            }
            for cell in self.pending_post_order() {
                // a child is always initialized before its parent is reached
                let _ = cell
                    .repr
                    .get_or_try_init(|| async { cell.repr_from_children().ok_or(()) })
                    .await;
            }
        }
    }

    /// Cells reachable from `self` whose repr is missing, children first
    fn pending_post_order(&self) -> Vec<&Cell> {
        let mut order = Vec::new();
        let mut visited = HashSet::from([self as *const Cell]);
        let mut stack: Vec<(&Cell, usize)> = vec![(self, 0)];

        while let Some(top) = stack.last_mut() {
            let cell = top.0;
            match cell.references.get(top.1) {
                Some(child) => {
                    top.1 += 1;
                    if child.repr.initialized() || !visited.insert(Arc::as_ptr(child)) {
                        continue;
                    }
                    stack.push((child.as_ref(), 0));
                }
                None => {
                    order.push(cell);
                    stack.pop();
                }
            }
        }
        order
    }

    fn repr_from_children(&self) -> Option<CellRepr> {
        let children = self
            .references
            .iter()
            .map(|r| r.cached_repr())
            .collect::<Option<Vec<_>>>()?;
        Some(self.compute_repr(&children))
    }

    /// Representation hash of the cell
    pub async fn hash(&self) -> [u8; 32] {
        self.repr().await.hash
    }

    /// 0 for a leaf, otherwise 1 + the deepest child
    pub async fn depth(&self) -> u16 {
        self.repr().await.depth
    }

    /// Memoized repr if it has been computed already
    pub fn cached_repr(&self) -> Option<CellRepr> {
        self.repr.get().copied()
    }

    fn compute_repr(&self, children: &[CellRepr]) -> CellRepr {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptors());
        hasher.update(self.bits.to_padded_bytes());
        for child in children {
            hasher.update(child.depth.to_be_bytes());
        }
        for child in children {
            hasher.update(child.hash);
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());

        let depth = children
            .iter()
            .map(|c| c.depth.saturating_add(1))
            .max()
            .unwrap_or(0);

        CellRepr { hash, depth }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Cell {
    fn drop(&mut self) {
        // unlink uniquely owned descendants one by one instead of recursively
        let mut stack = std::mem::take(&mut self.references);
        while let Some(child) = stack.pop() {
            if let Ok(mut cell) = Arc::try_unwrap(child) {
                stack.append(&mut cell.references);
            }
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bits)
            .field("references", &self.references)
            .field("is_exotic", &self.is_exotic)
            .field("level", &self.level)
            .finish()
    }
}
