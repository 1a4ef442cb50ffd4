//! Ordinary TON cells and their encodings.
//!
//! Jetton contracts keep their state and receive their messages as trees of
//! cells. A cell holds at most 1023 data bits and 4 references; its
//! representation hash commits to the whole subtree below it.
//!
//! - [`CellBuilder`] writes bits, integers, coins, addresses and
//!   dictionaries into a new [`Cell`]
//! - [`CellSlice`] reads them back
//! - [`Dictionary`] is a `HashmapE` with fixed-width byte keys
//! - [`BagOfCells`] is the `b5ee9c72` wire format for cell trees
//! - [`MsgAddress`] covers `addr_none`, external and standard addresses
//!
//! Exotic cells (pruned branches, Merkle proofs) are out of scope and the
//! BoC decoder refuses them.
//!
//! ```
//! use std::sync::Arc;
//! use ton_cell::{BagOfCells, Cell, CellBuilder, CellSlice};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x642b7d07).unwrap();
//! builder.store_coins(20_000_000).unwrap();
//! builder.store_ref(Arc::new(Cell::empty())).unwrap();
//! let root = builder.build().unwrap();
//!
//! let hex = BagOfCells::new(vec![Arc::new(root.clone())]).serialize_to_hex().unwrap();
//! let decoded = BagOfCells::deserialize_from_hex(&hex).unwrap();
//! let decoded = decoded.single_root().unwrap();
//! assert_eq!(decoded.hash(), root.hash());
//!
//! let mut slice = CellSlice::new(decoded);
//! assert_eq!(slice.load_u32().unwrap(), 0x642b7d07);
//! assert_eq!(slice.load_coins().unwrap(), 20_000_000);
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod dict;
mod slice;

pub use address::MsgAddress;
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, DEPTH_BYTES, HASH_BYTES};
pub use dict::Dictionary;
pub use slice::CellSlice;

/// Errors raised while building, reading or (de)serializing cells.
#[derive(Debug, Error)]
pub enum CellError {
    /// A write would push the cell past 1023 bits.
    #[error("cell overflow: {0} bits requested, 1023 allowed")]
    DataTooLong(usize),

    /// A write would push the cell past 4 references.
    #[error("cell overflow: {0} references requested, 4 allowed")]
    TooManyRefs(usize),

    /// A read asked for more bits than the slice has left.
    #[error("slice underflow: {need} bits requested, {have} left")]
    NotEnoughBits { need: usize, have: usize },

    /// A read asked for more references than the slice has left.
    #[error("slice underflow: {need} references requested, {have} left")]
    NotEnoughRefs { need: usize, have: usize },

    /// Integer width outside 0..=64.
    #[error("unsupported integer width: {0} bits")]
    InvalidBitLength(usize),

    /// Malformed bag of cells.
    #[error("malformed BoC: {0}")]
    InvalidBoc(String),

    /// BoC ended before the declared layout was read.
    #[error("BoC truncated")]
    UnexpectedEof,

    /// A reference points outside the cell table.
    #[error("BoC reference to missing cell {0}")]
    CellNotFound(usize),

    /// Stored CRC32-C does not match the payload.
    #[error("BoC checksum mismatch: stored {expected:08x}, computed {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// The BoC contains an exotic cell.
    #[error("exotic cell of type {0} is not supported")]
    ExoticCell(u8),

    /// The caller needed exactly one root.
    #[error("BoC has {0} roots, expected exactly one")]
    NotSingleRoot(usize),

    /// Address text or layout that cannot be decoded.
    #[error("bad address: {0}")]
    InvalidAddress(String),

    #[error("bad base64: {0}")]
    InvalidBase64(String),

    #[error("bad hex: {0}")]
    InvalidHex(String),

    /// Dictionary tree that does not follow the `HashmapE` layout.
    #[error("malformed dictionary: {0}")]
    InvalidDictionary(String),

    /// Key width differs from the dictionary's.
    #[error("dictionary key is {actual} bytes, dictionary uses {expected}")]
    DictKeyLength { expected: usize, actual: usize },
}

pub type CellResult<T> = Result<T, CellError>;

/// Data capacity of a cell in bits.
pub const MAX_CELL_BITS: usize = 1023;

/// Reference capacity of a cell.
pub const MAX_CELL_REFS: usize = 4;

/// Magic prefix of the generic `serialized_boc` layout.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// CRC32-C (Castagnoli), as appended to BoCs with the checksum flag.
fn crc32c(data: &[u8]) -> u32 {
    const CASTAGNOLI: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CASTAGNOLI.checksum(data)
}
