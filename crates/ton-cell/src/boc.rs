//! Bag of Cells (BoC) serialization format.
//!
//! Only the generic `serialized_boc` layout (magic `b5ee9c72`) is handled.
//! Cells are written parents first, so every reference points to a higher
//! index, which is also what compilers emit for contract code.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::trace;

use crate::{BOC_GENERIC_MAGIC, Cell, CellError, CellResult, MAX_CELL_BITS, MAX_CELL_REFS, crc32c};

const FLAG_HAS_INDEX: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const FLAG_SIZE_MASK: u8 = 0x07;

/// d1 bits: exotic flag and stored-hashes flag.
const D1_EXOTIC: u8 = 0x08;
const D1_WITH_HASHES: u8 = 0x10;

/// Bag of Cells: a serialized DAG of cells with one or more roots.
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

/// A cell as read from the wire, before its references are resolved.
struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

impl BagOfCells {
    /// Create a new BoC with the given root cells.
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    /// Create a BoC with a single root cell.
    pub fn from_root(root: Cell) -> Self {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    /// All root cells.
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// The only root cell. Errors if there is not exactly one.
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        match self.roots.as_slice() {
            [root] => Ok(root),
            roots => Err(CellError::NotSingleRoot(roots.len())),
        }
    }

    /// Number of root cells.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Serialize with a trailing CRC32-C.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        self.serialize_with_crc(true)
    }

    /// Serialize, optionally appending the CRC32-C checksum.
    pub fn serialize_with_crc(&self, with_crc: bool) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        let cells = self.collect_cells();
        let index: HashMap<[u8; 32], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let size_bytes = bytes_needed(cells.len());

        let mut body = Vec::new();
        for cell in &cells {
            let (d1, d2) = cell.descriptors();
            body.push(d1);
            body.push(d2);
            body.extend_from_slice(&cell.data_with_completion_tag());
            for reference in cell.references() {
                let idx = index
                    .get(&reference.hash())
                    .ok_or_else(|| CellError::InvalidBoc("Reference not found".to_string()))?;
                write_uint(&mut body, *idx as u64, size_bytes);
            }
        }

        let off_bytes = bytes_needed(body.len());

        let mut result = Vec::with_capacity(body.len() + 32);
        result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
        result.push(if with_crc { FLAG_HAS_CRC } else { 0 } | size_bytes as u8);
        result.push(off_bytes as u8);
        write_uint(&mut result, cells.len() as u64, size_bytes);
        write_uint(&mut result, self.roots.len() as u64, size_bytes);
        write_uint(&mut result, 0, size_bytes);
        write_uint(&mut result, body.len() as u64, off_bytes);
        for root in &self.roots {
            let idx = index
                .get(&root.hash())
                .ok_or_else(|| CellError::InvalidBoc("Root not found".to_string()))?;
            write_uint(&mut result, *idx as u64, size_bytes);
        }
        result.extend_from_slice(&body);

        if with_crc {
            let crc = crc32c(&result);
            result.extend_from_slice(&crc.to_le_bytes());
        }

        trace!(cells = cells.len(), bytes = result.len(), "serialized BoC");
        Ok(result)
    }

    /// Serialize to a standard base64 string.
    pub fn serialize_to_base64(&self) -> CellResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Serialize to a lowercase hex string.
    pub fn serialize_to_hex(&self) -> CellResult<String> {
        Ok(hex::encode(self.serialize()?))
    }

    /// Deserialize from bytes.
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        let mut reader = Reader { data, offset: 0 };

        let magic = reader.read_uint(4)? as u32;
        if magic != BOC_GENERIC_MAGIC {
            return Err(CellError::InvalidBoc(format!(
                "Invalid magic: {:08x}, expected {:08x}",
                magic, BOC_GENERIC_MAGIC
            )));
        }

        let flags = reader.read_uint(1)? as u8;
        let has_index = flags & FLAG_HAS_INDEX != 0;
        let has_crc = flags & FLAG_HAS_CRC != 0;
        let size_bytes = (flags & FLAG_SIZE_MASK) as usize;
        let off_bytes = reader.read_uint(1)? as usize;
        if size_bytes == 0 || size_bytes > 4 || off_bytes == 0 || off_bytes > 8 {
            return Err(CellError::InvalidBoc(format!(
                "Invalid size fields: size_bytes={}, off_bytes={}",
                size_bytes, off_bytes
            )));
        }

        if has_crc {
            if data.len() < 4 {
                return Err(CellError::UnexpectedEof);
            }
            let (payload, tail) = data.split_at(data.len() - 4);
            let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
            let actual = crc32c(payload);
            if expected != actual {
                return Err(CellError::CrcMismatch { expected, actual });
            }
            reader.data = payload;
        }

        let cell_count = reader.read_uint(size_bytes)? as usize;
        let root_count = reader.read_uint(size_bytes)? as usize;
        let _absent = reader.read_uint(size_bytes)?;
        let total_size = reader.read_uint(off_bytes)? as usize;

        let root_indices = (0..root_count)
            .map(|_| reader.read_uint(size_bytes).map(|v| v as usize))
            .collect::<CellResult<Vec<_>>>()?;

        if has_index {
            reader.skip(cell_count * off_bytes)?;
        }

        let body_start = reader.offset;
        let raw = (0..cell_count)
            .map(|_| reader.read_raw_cell(size_bytes))
            .collect::<CellResult<Vec<_>>>()?;
        if reader.offset - body_start != total_size {
            return Err(CellError::InvalidBoc(format!(
                "Cell data size mismatch: header says {}, read {}",
                total_size,
                reader.offset - body_start
            )));
        }

        let cells = build_cells(raw)?;
        let roots = root_indices
            .into_iter()
            .map(|idx| cells.get(idx).cloned().ok_or(CellError::CellNotFound(idx)))
            .collect::<CellResult<Vec<_>>>()?;

        trace!(cells = cells.len(), roots = roots.len(), "deserialized BoC");
        Ok(BagOfCells { roots })
    }

    /// Deserialize from a standard base64 string.
    pub fn deserialize_from_base64(base64_str: &str) -> CellResult<Self> {
        let bytes = STANDARD
            .decode(base64_str.trim())
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Deserialize from a hex string.
    pub fn deserialize_from_hex(hex_str: &str) -> CellResult<Self> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| CellError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Unique cells ordered parents first.
    fn collect_cells(&self) -> Vec<Arc<Cell>> {
        let mut post_order = Vec::new();
        let mut visited = HashSet::new();
        for root in &self.roots {
            collect_post_order(root, &mut post_order, &mut visited);
        }
        post_order.reverse();
        post_order
    }
}

fn collect_post_order(
    cell: &Arc<Cell>,
    out: &mut Vec<Arc<Cell>>,
    visited: &mut HashSet<[u8; 32]>,
) {
    if !visited.insert(cell.hash()) {
        return;
    }
    for reference in cell.references() {
        collect_post_order(reference, out, visited);
    }
    out.push(cell.clone());
}

/// Resolve references back to front. Every reference must point to a
/// higher index, which also rules out cycles.
fn build_cells(raw: Vec<RawCell>) -> CellResult<Vec<Arc<Cell>>> {
    let count = raw.len();
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; count];

    for (i, cell) in raw.into_iter().enumerate().rev() {
        let references = cell
            .refs
            .iter()
            .map(|&idx| {
                if idx <= i || idx >= count {
                    return Err(CellError::InvalidBoc(format!(
                        "Cell {} references index {} out of order",
                        i, idx
                    )));
                }
                built[idx].clone().ok_or(CellError::CellNotFound(idx))
            })
            .collect::<CellResult<Vec<_>>>()?;
        built[i] = Some(Arc::new(Cell::new(cell.data, cell.bit_len, references)));
    }

    built
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.ok_or(CellError::CellNotFound(i)))
        .collect()
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn read_uint(&mut self, bytes: usize) -> CellResult<u64> {
        let end = self.offset + bytes;
        let chunk = self.data.get(self.offset..end).ok_or(CellError::UnexpectedEof)?;
        self.offset = end;
        Ok(chunk.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    fn skip(&mut self, bytes: usize) -> CellResult<()> {
        if self.offset + bytes > self.data.len() {
            return Err(CellError::UnexpectedEof);
        }
        self.offset += bytes;
        Ok(())
    }

    fn read_raw_cell(&mut self, size_bytes: usize) -> CellResult<RawCell> {
        let d1 = self.read_uint(1)? as u8;
        let d2 = self.read_uint(1)? as u8;

        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(ref_count));
        }
        if d1 & D1_WITH_HASHES != 0 || d1 >> 5 != 0 {
            return Err(CellError::InvalidBoc(format!(
                "Unsupported cell descriptor 0x{:02x}",
                d1
            )));
        }

        let byte_len = (d2 as usize).div_ceil(2);
        let end = self.offset + byte_len;
        let mut data = self
            .data
            .get(self.offset..end)
            .ok_or(CellError::UnexpectedEof)?
            .to_vec();
        self.offset = end;

        if d1 & D1_EXOTIC != 0 {
            return Err(CellError::ExoticCell(data.first().copied().unwrap_or(0)));
        }

        let bit_len = if d2.is_multiple_of(2) {
            byte_len * 8
        } else {
            let last = data.last_mut().ok_or(CellError::UnexpectedEof)?;
            if *last == 0 {
                return Err(CellError::InvalidBoc("Missing completion tag".to_string()));
            }
            let tag_pos = last.trailing_zeros() as usize;
            *last &= !(1u8 << tag_pos);
            byte_len * 8 - tag_pos - 1
        };
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(bit_len));
        }

        let refs = (0..ref_count)
            .map(|_| self.read_uint(size_bytes).map(|v| v as usize))
            .collect::<CellResult<Vec<_>>>()?;

        Ok(RawCell {
            data,
            bit_len,
            refs,
        })
    }
}

/// Minimal number of bytes needed to encode `n`.
fn bytes_needed(n: usize) -> usize {
    let bits = usize::BITS - n.leading_zeros();
    (bits as usize).div_ceil(8).max(1)
}

fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
    for i in (0..bytes).rev() {
        buf.push((value >> (i * 8)) as u8);
    }
}
