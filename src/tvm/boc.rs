//! Bag of Cells (BoC) serialization and deserialization
//!
//! BoC is the exchange format for cell graphs. Distinct cells (by `Arc`
//! identity) are numbered so that every cell's index is lower than the
//! indices of the cells it references, which lets the parser rebuild the
//! graph from the highest index down.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashMap;
use std::sync::Arc;

use crate::crc::CRC32C;
use crate::tvm::bit_string::BitString;
use crate::tvm::cell::{Cell, MAX_CELL_DEPTH, MAX_CELL_LEVEL, MAX_CELL_REFS};
use crate::tvm::error::{Result, TvmError, malformed};

/// BoC magic number for standard format
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for indexed format
pub const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for indexed format with CRC32C
pub const BOC_INDEXED_CRC32C_MAGIC: u32 = 0xacc3a728;

const HAS_INDEX_FLAG: u8 = 0b1000_0000;
const HAS_CRC32C_FLAG: u8 = 0b0100_0000;
const HAS_CACHE_BITS_FLAG: u8 = 0b0010_0000;
const SIZE_MASK: u8 = 0b0000_0111;

/// Optional sections of a generic BoC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BocOptions {
    /// Emit the per-cell offset index
    pub has_index: bool,
    /// Append a CRC32C trailer
    pub has_crc32c: bool,
}

/// Serializes a cell and its references into a Bag of Cells (BoC) format
pub fn serialize_boc(root: &Arc<Cell>, has_crc32c: bool) -> Result<Vec<u8>> {
    let options = BocOptions {
        has_index: false,
        has_crc32c,
    };
    serialize_boc_roots(std::slice::from_ref(root), options)
}

/// Serializes several roots sharing one cell table
pub fn serialize_boc_roots(roots: &[Arc<Cell>], options: BocOptions) -> Result<Vec<u8>> {
    if roots.is_empty() {
        return Err(malformed!("cannot serialize a BoC without roots"));
    }

    let mut collector = CellCollector::default();
    let root_rev_indices: Vec<usize> = roots.iter().map(|root| collector.visit(root)).collect();

    let cell_count = collector.cells.len();
    let size_bytes = bytes_needed(cell_count as u64);
    if size_bytes > 4 {
        return Err(TvmError::Overflow(format!(
            "{} cells do not fit in a BoC",
            cell_count
        )));
    }
    let index_of = |rev_index: usize| (cell_count - 1 - rev_index) as u64;

    let mut cells_data = Vec::new();
    let mut end_offsets = Vec::with_capacity(cell_count);
    for cell in collector.cells.iter().rev() {
        cells_data.extend_from_slice(&cell.descriptors());
        cells_data.extend_from_slice(&cell.bits().to_padded_bytes());
        for child in cell.references() {
            let rev_index = collector.indices[&Arc::as_ptr(child)];
            write_uint(&mut cells_data, index_of(rev_index), size_bytes);
        }
        end_offsets.push(cells_data.len() as u64);
    }

    let offset_bytes = bytes_needed(cells_data.len() as u64);

    // 4 bytes - magic
    // 1 byte - flags and size
    // 1 byte - offset size
    // {size_bytes} - cell count, root count, absent count
    // {offset_bytes} - total cells size
    // root_count * {size_bytes} - root indices
    // [cell_count * {offset_bytes} - index]
    // cells
    // [4 bytes - CRC32C]
    let mut result = Vec::with_capacity(
        6 + size_bytes * (3 + roots.len())
            + offset_bytes * (1 + cell_count * options.has_index as usize)
            + cells_data.len()
            + 4 * options.has_crc32c as usize,
    );

    result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

    let mut flags = size_bytes as u8;
    if options.has_index {
        flags |= HAS_INDEX_FLAG;
    }
    if options.has_crc32c {
        flags |= HAS_CRC32C_FLAG;
    }
    result.push(flags);
    result.push(offset_bytes as u8);

    write_uint(&mut result, cell_count as u64, size_bytes);
    write_uint(&mut result, roots.len() as u64, size_bytes);
    write_uint(&mut result, 0, size_bytes);
    write_uint(&mut result, cells_data.len() as u64, offset_bytes);

    for &rev_index in &root_rev_indices {
        write_uint(&mut result, index_of(rev_index), size_bytes);
    }

    if options.has_index {
        for &offset in &end_offsets {
            write_uint(&mut result, offset, offset_bytes);
        }
    }

    result.extend_from_slice(&cells_data);

    if options.has_crc32c {
        let crc = CRC32C.checksum(&result);
        result.extend_from_slice(&crc.to_le_bytes());
    }

    for cell in &collector.cells {
        cell.seal();
    }

    log::debug!(
        "Serialized BoC: {} roots, {} cells, {} bytes",
        roots.len(),
        cell_count,
        result.len()
    );

    Ok(result)
}

/// Post-order traversal keyed by `Arc` identity
#[derive(Default)]
struct CellCollector<'a> {
    indices: HashMap<*const Cell, usize>,
    cells: Vec<&'a Arc<Cell>>,
}

impl<'a> CellCollector<'a> {
    /// Numbers `root` and every cell below it, children before parents
    fn visit(&mut self, root: &'a Arc<Cell>) -> usize {
        if let Some(&rev_index) = self.indices.get(&Arc::as_ptr(root)) {
            return rev_index;
        }

        let mut stack: Vec<(&'a Arc<Cell>, usize)> = vec![(root, 0)];
        while let Some(top) = stack.last_mut() {
            let cell = top.0;
            match cell.references().get(top.1) {
                Some(child) => {
                    top.1 += 1;
                    if !self.indices.contains_key(&Arc::as_ptr(child)) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    stack.pop();
                    self.indices.insert(Arc::as_ptr(cell), self.cells.len());
                    self.cells.push(cell);
                }
            }
        }

        // the root is always numbered last
        self.cells.len() - 1
    }
}

/// Deserializes a Bag of Cells (BoC) with exactly one root
pub fn deserialize_boc(data: &[u8]) -> Result<Arc<Cell>> {
    let mut roots = deserialize_boc_roots(data)?;
    if roots.len() != 1 {
        return Err(malformed!("expected a single root, found {}", roots.len()));
    }
    Ok(roots.remove(0))
}

/// Deserializes a Bag of Cells (BoC) into its root cells
///
/// Nothing is constructed until the whole input has been validated.
pub fn deserialize_boc_roots(data: &[u8]) -> Result<Vec<Arc<Cell>>> {
    if data.len() < 6 {
        return Err(malformed!("BoC data too short: {} bytes", data.len()));
    }

    let magic = BigEndian::read_u32(&data[..4]);
    let flags = data[4];
    let (has_index, has_crc32c, size_bytes) = match magic {
        BOC_GENERIC_MAGIC => {
            let has_index = flags & HAS_INDEX_FLAG != 0;
            if flags & HAS_CACHE_BITS_FLAG != 0 && !has_index {
                return Err(malformed!("cache bits are set without an index"));
            }
            (
                has_index,
                flags & HAS_CRC32C_FLAG != 0,
                (flags & SIZE_MASK) as usize,
            )
        }
        BOC_INDEXED_MAGIC => (true, false, flags as usize),
        BOC_INDEXED_CRC32C_MAGIC => (true, true, flags as usize),
        _ => return Err(malformed!("invalid BoC magic number: 0x{:08x}", magic)),
    };

    let body = if has_crc32c {
        if data.len() < 10 {
            return Err(malformed!("BoC data too short for CRC32C"));
        }
        let (body, trailer) = data.split_at(data.len() - 4);
        let expected = LittleEndian::read_u32(trailer);
        let actual = CRC32C.checksum(body);
        if expected != actual {
            return Err(TvmError::ChecksumMismatch { expected, actual });
        }
        body
    } else {
        data
    };

    if !(1..=4).contains(&size_bytes) {
        return Err(malformed!("invalid size bytes: {}", size_bytes));
    }
    let offset_bytes = body[5] as usize;
    if !(1..=8).contains(&offset_bytes) {
        return Err(malformed!("invalid offset bytes: {}", offset_bytes));
    }

    let mut reader = BocReader::new(body);
    reader.take(6)?;

    let cell_count = reader.read_uint(size_bytes)?;
    let root_count = reader.read_uint(size_bytes)?;
    let absent_count = reader.read_uint(size_bytes)?;
    let cells_size = reader.read_uint(offset_bytes)?;

    if root_count == 0 {
        return Err(malformed!("BoC has no roots"));
    }
    if root_count.saturating_add(absent_count) > cell_count {
        return Err(malformed!(
            "{} roots and {} absent cells exceed {} cells",
            root_count,
            absent_count,
            cell_count
        ));
    }
    if absent_count > 0 {
        return Err(malformed!("absent cells are not supported"));
    }
    // every cell takes at least its two descriptor bytes
    if cell_count.saturating_mul(2) > body.len() {
        return Err(malformed!("cell count {} exceeds data size", cell_count));
    }

    let root_indices = if magic == BOC_GENERIC_MAGIC {
        (0..root_count)
            .map(|_| reader.read_uint(size_bytes))
            .collect::<Result<Vec<_>>>()?
    } else {
        if root_count != 1 {
            return Err(malformed!("indexed BoC must have exactly one root"));
        }
        vec![0]
    };
    if let Some(&bad) = root_indices.iter().find(|&&index| index >= cell_count) {
        return Err(malformed!("root index {} out of bounds", bad));
    }

    if has_index {
        reader.take(cell_count * offset_bytes)?;
    }

    let cells_data = reader.take(cells_size)?;
    if reader.remaining() != 0 {
        return Err(malformed!(
            "{} unexpected bytes after cell data",
            reader.remaining()
        ));
    }

    let raw_cells = parse_raw_cells(cells_data, cell_count, size_bytes)?;
    check_depth_and_level(&raw_cells)?;

    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (index, raw) in raw_cells.into_iter().enumerate().rev() {
        let references = raw
            .references
            .iter()
            .map(|&child| {
                built[child]
                    .clone()
                    .ok_or_else(|| malformed!("cell {} is not constructed yet", child))
            })
            .collect::<Result<Vec<_>>>()?;

        let cell = if raw.is_exotic {
            Cell::exotic(raw.bits, references, raw.level)?
        } else {
            Cell::with_parts(raw.bits, references)?
        };
        built[index] = Some(Arc::new(cell));
    }

    log::debug!(
        "Deserialized BoC: {} roots, {} cells, {} bytes",
        root_indices.len(),
        cell_count,
        data.len()
    );

    root_indices
        .iter()
        .map(|&index| {
            built[index]
                .clone()
                .ok_or_else(|| malformed!("root {} is not constructed", index))
        })
        .collect()
}

/// Bounds the depth of every cell and checks the level bits of ordinary cells
///
/// Children always have higher indices, so walking down from the last cell
/// sees every child before its parents.
fn check_depth_and_level(cells: &[RawCell]) -> Result<()> {
    let mut depths = vec![0u16; cells.len()];
    for (index, raw) in cells.iter().enumerate().rev() {
        let depth = raw
            .references
            .iter()
            .map(|&child| depths[child] + 1)
            .max()
            .unwrap_or(0);
        if depth > MAX_CELL_DEPTH {
            return Err(malformed!(
                "cell {} is deeper than {} levels",
                index,
                MAX_CELL_DEPTH
            ));
        }
        depths[index] = depth;

        if !raw.is_exotic {
            let level = raw
                .references
                .iter()
                .map(|&child| cells[child].level)
                .max()
                .unwrap_or(0);
            if raw.level != level {
                return Err(malformed!(
                    "ordinary cell {} declares level {}, its references give {}",
                    index,
                    raw.level,
                    level
                ));
            }
        }
    }
    Ok(())
}

struct RawCell {
    bits: BitString,
    references: Vec<usize>,
    is_exotic: bool,
    level: u8,
}

fn parse_raw_cells(data: &[u8], cell_count: usize, ref_size: usize) -> Result<Vec<RawCell>> {
    let mut reader = BocReader::new(data);
    let mut cells = Vec::with_capacity(cell_count);

    for index in 0..cell_count {
        let d1 = reader.read_u8()?;
        let d2 = reader.read_u8()?;

        let ref_count = (d1 & 0b111) as usize;
        if ref_count > MAX_CELL_REFS {
            return Err(malformed!("cell {} has {} references", index, ref_count));
        }
        if d1 & 0b1_0000 != 0 {
            return Err(malformed!("cell {} carries stored hashes, unsupported", index));
        }
        let is_exotic = d1 & 0b1000 != 0;
        let level = d1 >> 5;
        if level > MAX_CELL_LEVEL {
            return Err(malformed!("cell {} has level {}", index, level));
        }

        let data_len = (d2 as usize).div_ceil(2);
        let payload = reader.take(data_len)?;
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            // the last set bit is the completion tag
            let last = payload[data_len - 1];
            if last == 0 {
                return Err(malformed!("cell {} lacks a completion tag", index));
            }
            // an odd d2 promises a partial last byte
            if last == 0x80 {
                return Err(malformed!("cell {} has a non-canonical completion tag", index));
            }
            data_len * 8 - last.trailing_zeros() as usize - 1
        };
        let bits = BitString::from_bytes(payload, bit_len)
            .map_err(|e| malformed!("cell {}: {}", index, e))?;

        let mut references = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let child = reader.read_uint(ref_size)?;
            if child <= index || child >= cell_count {
                return Err(malformed!(
                    "cell {} references invalid index {}",
                    index,
                    child
                ));
            }
            references.push(child);
        }

        log::trace!(
            "BoC cell {}: {} bits, refs {:?}, exotic {}",
            index,
            bit_len,
            references,
            is_exotic
        );

        cells.push(RawCell {
            bits,
            references,
            is_exotic,
            level,
        });
    }

    if reader.remaining() != 0 {
        return Err(malformed!(
            "cell data has {} unused bytes",
            reader.remaining()
        ));
    }

    Ok(cells)
}

struct BocReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BocReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(malformed!(
                "unexpected end of data: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            ));
        }
        let chunk = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(chunk)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_uint(&mut self, size: usize) -> Result<usize> {
        let chunk = self.take(size)?;
        usize::try_from(BigEndian::read_uint(chunk, size))
            .map_err(|_| malformed!("value does not fit in usize"))
    }
}

fn bytes_needed(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).div_ceil(8).max(1)
}

fn write_uint(buf: &mut Vec<u8>, value: u64, size: usize) {
    let mut tmp = [0u8; 8];
    BigEndian::write_uint(&mut tmp, value, size);
    buf.extend_from_slice(&tmp[..size]);
}

/// Converts a hex string to a BoC
pub fn hex_to_boc(hex: &str) -> Result<Arc<Cell>> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(&hex).map_err(|e| malformed!("failed to decode hex: {}", e))?;
    deserialize_boc(&bytes)
}

/// Converts a BoC to a hex string
pub fn boc_to_hex(cell: &Arc<Cell>, has_crc32c: bool) -> Result<String> {
    Ok(hex::encode(serialize_boc(cell, has_crc32c)?))
}

/// Converts a BoC to base64
pub fn boc_to_base64(cell: &Arc<Cell>, has_crc32c: bool) -> Result<String> {
    Ok(STANDARD.encode(serialize_boc(cell, has_crc32c)?))
}

/// Converts a base64 string to a BoC
pub fn base64_to_boc(b64: &str) -> Result<Arc<Cell>> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|e| malformed!("failed to decode base64: {}", e))?;
    deserialize_boc(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvm::builder::CellBuilder;
    use tokio_test::block_on;

    fn cell_with(value: u32, refs: &[Arc<Cell>]) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(value).unwrap();
        for r in refs {
            builder.store_ref(r.clone()).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_empty_cell_vector() {
        let cell = CellBuilder::new().build().unwrap();

        assert_eq!(
            hex::encode(serialize_boc(&cell, false).unwrap()),
            "b5ee9c72010101010002000000"
        );
        assert_eq!(boc_to_base64(&cell, true).unwrap(), "te6cckEBAQEAAgAAAEysuc0=");
    }

    #[test]
    fn test_known_boc_parses() {
        let cell = base64_to_boc("te6cckEBAQEAAgAAAEysuc0=").unwrap();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
    }

    #[test]
    fn test_serialize_deserialize_simple() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap().store_uint(0b1, 1).unwrap();
        let cell = builder.build().unwrap();

        let boc = serialize_boc(&cell, false).unwrap();
        let deserialized = deserialize_boc(&boc).unwrap();

        assert_eq!(deserialized.bit_len(), 33);
        assert_eq!(block_on(cell.hash()), block_on(deserialized.hash()));
    }

    #[test]
    fn test_shared_cells_are_deduplicated() {
        let shared = cell_with(7, &[]);
        let left = cell_with(1, &[shared.clone()]);
        let right = cell_with(2, &[shared.clone()]);
        let root = cell_with(0, &[left, right, shared]);

        let boc = serialize_boc(&root, false).unwrap();
        // magic, flags, offset size, then cell count
        assert_eq!(boc[6], 4);

        let parsed = deserialize_boc(&boc).unwrap();
        let a = parsed.reference(0).unwrap().reference(0).unwrap();
        let b = parsed.reference(1).unwrap().reference(0).unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(block_on(root.hash()), block_on(parsed.hash()));
    }

    #[test]
    fn test_parent_index_below_children() {
        let leaf = cell_with(3, &[]);
        let mid = cell_with(2, &[leaf.clone()]);
        let root = cell_with(1, &[mid, leaf]);

        let boc = serialize_boc(&root, false).unwrap();
        // header: magic(4) flags(1) offset(1) counts(3) size(1) root(1)
        assert_eq!(boc[10], 0, "root comes first");

        // root: d1 d2 data(4) ref ref
        let root_cell = &boc[11..19];
        assert_eq!(root_cell[0], 2);
        assert_eq!(&root_cell[6..], &[1, 2]);
    }

    #[test]
    fn test_boc_crc_options() {
        let cell = cell_with(0xDEADBEEF, &[cell_with(1, &[])]);

        let plain = serialize_boc(&cell, false).unwrap();
        let with_crc = serialize_boc(&cell, true).unwrap();
        assert_eq!(with_crc.len(), plain.len() + 4);

        let a = deserialize_boc(&plain).unwrap();
        let b = deserialize_boc(&with_crc).unwrap();
        assert_eq!(block_on(a.hash()), block_on(b.hash()));
    }

    #[test]
    fn test_crc_mismatch() {
        let cell = cell_with(0xCAFEBABE, &[]);
        let mut boc = serialize_boc(&cell, true).unwrap();
        let last_data = boc.len() - 5;
        boc[last_data] ^= 0x01;

        assert!(matches!(
            deserialize_boc(&boc),
            Err(TvmError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_index_section_roundtrip() {
        let cell = cell_with(5, &[cell_with(6, &[]), cell_with(7, &[])]);
        let options = BocOptions {
            has_index: true,
            has_crc32c: true,
        };
        let boc = serialize_boc_roots(&[cell.clone()], options).unwrap();
        assert_eq!(boc[4], HAS_INDEX_FLAG | HAS_CRC32C_FLAG | 1);

        let parsed = deserialize_boc(&boc).unwrap();
        assert_eq!(block_on(parsed.hash()), block_on(cell.hash()));
    }

    #[test]
    fn test_multiple_roots() {
        let shared = cell_with(9, &[]);
        let a = cell_with(1, &[shared.clone()]);
        let b = cell_with(2, &[shared]);

        let boc = serialize_boc_roots(&[a.clone(), b.clone()], BocOptions::default()).unwrap();
        let roots = deserialize_boc_roots(&boc).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(block_on(roots[0].hash()), block_on(a.hash()));
        assert_eq!(block_on(roots[1].hash()), block_on(b.hash()));

        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));
    }

    #[test]
    fn test_serialization_seals_cells() {
        let cell = cell_with(1, &[]);
        serialize_boc(&cell, false).unwrap();
        assert!(cell.is_finalized());
    }

    #[test]
    fn test_bad_magic() {
        let mut boc = serialize_boc(&cell_with(1, &[]), false).unwrap();
        boc[0] = 0x00;
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));
    }

    #[test]
    fn test_truncated_boc() {
        let boc = serialize_boc(&cell_with(1, &[cell_with(2, &[])]), false).unwrap();
        for len in 0..boc.len() {
            assert!(
                matches!(deserialize_boc(&boc[..len]), Err(TvmError::MalformedBoc(_))),
                "prefix of {} bytes",
                len
            );
        }
    }

    #[test]
    fn test_reference_out_of_bounds() {
        // two cells: root references index 2, which does not exist
        let boc = hex::decode("b5ee9c72010102010005000100020000").unwrap();
        assert!(matches!(
            deserialize_boc_roots(&boc),
            Err(TvmError::MalformedBoc(_))
        ));
    }

    #[test]
    fn test_self_and_backward_references() {
        // root(0) references itself
        let self_ref = hex::decode("b5ee9c7201010101000300010000").unwrap();
        assert!(matches!(
            deserialize_boc(&self_ref),
            Err(TvmError::MalformedBoc(_))
        ));

        // cell 1 references cell 0
        let backward = hex::decode("b5ee9c72010102010005000000010000").unwrap();
        assert!(matches!(
            deserialize_boc(&backward),
            Err(TvmError::MalformedBoc(_))
        ));
    }

    fn chain(len: usize) -> Arc<Cell> {
        let mut cell = cell_with(0, &[]);
        for i in 1..len {
            cell = cell_with(i as u32, &[cell]);
        }
        cell
    }

    #[test]
    fn test_chain_at_max_depth() {
        let root = chain(MAX_CELL_DEPTH as usize + 1);
        let boc = serialize_boc(&root, true).unwrap();

        let parsed = deserialize_boc(&boc).unwrap();
        assert_eq!(block_on(parsed.depth()), MAX_CELL_DEPTH);
        assert_eq!(block_on(parsed.hash()), block_on(root.hash()));
    }

    #[test]
    fn test_chain_over_max_depth_rejected() {
        let root = chain(MAX_CELL_DEPTH as usize + 2);
        let boc = serialize_boc(&root, false).unwrap();
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));
    }

    #[test]
    fn test_long_chain_serializes() {
        let root = chain(70_000);
        let boc = serialize_boc(&root, false).unwrap();
        // magic, flags (size bytes 3), offset size, then cell count
        assert_eq!(boc[4] & SIZE_MASK, 3);
        assert_eq!(BigEndian::read_uint(&boc[6..9], 3), 70_000);
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        // exotic cell with level bits 7
        let boc = hex::decode("b5ee9c7201010101000300e80201").unwrap();
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));
    }

    #[test]
    fn test_ordinary_level_must_match_references() {
        // ordinary leaf declaring level 1
        let boc = hex::decode("b5ee9c7201010101000300200201").unwrap();
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));

        // the same leaf with level 0 is fine
        let boc = hex::decode("b5ee9c7201010101000300000201").unwrap();
        assert_eq!(deserialize_boc(&boc).unwrap().level(), 0);
    }

    #[test]
    fn test_exotic_level_kept() {
        let boc = hex::decode("b5ee9c7201010101000300280201").unwrap();
        let cell = deserialize_boc(&boc).unwrap();
        assert!(cell.is_exotic());
        assert_eq!(cell.level(), 1);
        assert_eq!(serialize_boc(&cell, false).unwrap(), boc);
    }

    #[test]
    fn test_completion_tag_in_top_bit_rejected() {
        // odd d2 with a lone tag byte would hide an empty cell
        let boc = hex::decode("b5ee9c7201010101000300000180").unwrap();
        assert!(matches!(deserialize_boc(&boc), Err(TvmError::MalformedBoc(_))));

        // 0x40 is one zero bit plus the tag
        let boc = hex::decode("b5ee9c7201010101000300000140").unwrap();
        assert_eq!(deserialize_boc(&boc).unwrap().bit_len(), 1);
    }

    #[test]
    fn test_hex_conversion() {
        let cell = cell_with(0xFF, &[]);
        let hex = boc_to_hex(&cell, false).unwrap();
        let decoded = hex_to_boc(&hex).unwrap();
        assert_eq!(block_on(cell.hash()), block_on(decoded.hash()));
    }

    #[test]
    fn test_bytes_needed() {
        assert_eq!(bytes_needed(0), 1);
        assert_eq!(bytes_needed(255), 1);
        assert_eq!(bytes_needed(256), 2);
        assert_eq!(bytes_needed(1 << 24), 4);
    }
}
