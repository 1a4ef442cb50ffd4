//! Cell implementation for TON.
//!
//! A Cell is the fundamental data unit in TON, containing up to 1023 bits
//! of data and up to 4 references to other cells. The representation hash
//! and depth are computed once, when the cell is built.

use std::sync::Arc;

use crate::{sha256, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// Depth size in bytes.
pub const DEPTH_BYTES: usize = 2;

/// An ordinary TON cell.
///
/// Cells form a DAG where each cell can reference up to 4 other cells.
/// The hash identifies the cell together with its entire subtree.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes (the last byte may be partial, unused bits are zero).
    data: Vec<u8>,
    /// Number of bits stored in data.
    bit_len: usize,
    /// References to child cells.
    references: Vec<Arc<Cell>>,
    /// Representation hash.
    hash: [u8; HASH_BYTES],
    /// 0 for leaves, otherwise 1 + max depth of the children.
    depth: u16,
}

impl Cell {
    /// Create a new cell. Called by `CellBuilder::build()` and the BoC decoder,
    /// which both enforce the bit and reference limits.
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth.saturating_add(1))
            .max()
            .unwrap_or(0);

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// Standard cell representation used for hashing:
    /// descriptors, data with completion tag, child depths, child hashes.
    pub fn representation(&self) -> Vec<u8> {
        let mut repr = Vec::with_capacity(
            2 + self.byte_len() + self.references.len() * (DEPTH_BYTES + HASH_BYTES),
        );

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());

        for reference in &self.references {
            repr.extend_from_slice(&reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash);
        }

        repr
    }

    /// Descriptor bytes (d1, d2).
    ///
    /// d1 = refs_count (ordinary cell, level 0);
    /// d2 = ceil(bit_len / 8) + floor(bit_len / 8).
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Data with completion tag.
    ///
    /// If bit_len is not byte-aligned, the bit right after the data is set
    /// to 1 and the rest of the last byte stays 0.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut result = self.data[..self.byte_len()].to_vec();
        let remainder = self.bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last |= 1 << (7 - remainder);
        }
        result
    }

    /// The SHA256 representation hash of this cell.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Depth of the subtree rooted at this cell.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of data bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of bytes needed to hold the data (rounded up).
    pub fn byte_len(&self) -> usize {
        self.bit_len.div_ceil(8)
    }

    /// All child references.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// A reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// A specific data bit, or None when out of bounds.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some((self.data[index / 8] >> (7 - (index % 8))) & 1 == 1)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
