//! Cell construction.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, Dictionary, MAX_CELL_BITS, MAX_CELL_REFS, MsgAddress};

/// Accumulates bits and references for a new [`Cell`].
///
/// Every `store_*` method checks capacity before writing, so a failed call
/// leaves the builder unchanged.
///
/// ```
/// use ton_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x0f8a7ea5).unwrap().store_u64(1).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 96);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.reserve_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.reserve_bits(bits.len())?;
        bits.iter().for_each(|&bit| self.push_bit(bit));
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value.into(), 8)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value.into(), 32)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    /// Store the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.reserve_bits(bits)?;
        (0..bits)
            .rev()
            .for_each(|shift| self.push_bit((value >> shift) & 1 == 1));
        Ok(self)
    }

    /// Store `value` as a `bits`-wide two's complement integer.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        self.store_uint(value as u64, bits)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.reserve_bits(bytes.len() * 8)?;
        if self.bit_len.is_multiple_of(8) {
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            for &byte in bytes {
                (0..8).rev().for_each(|shift| self.push_bit((byte >> shift) & 1 == 1));
            }
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() == MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(MAX_CELL_REFS + 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`: presence bit, then the reference.
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                if self.references.len() == MAX_CELL_REFS {
                    return Err(CellError::TooManyRefs(MAX_CELL_REFS + 1));
                }
                self.store_bit(true)?.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// `VarUInteger 16`: a 4-bit byte count followed by the big-endian value.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let len = (u128::BITS - nanotons.leading_zeros()).div_ceil(8) as usize;
        if len > 15 {
            return Err(CellError::DataTooLong(self.bit_len + 4 + len * 8));
        }
        self.reserve_bits(4 + len * 8)?;
        self.store_uint(len as u64, 4)?;
        self.store_bytes(&nanotons.to_be_bytes()[16 - len..])
    }

    /// Store a `MsgAddress` in its TL-B form.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => self.store_uint(0b00, 2),
            // addr_extern$01 len:(## 9) external_address:(bits len)
            MsgAddress::External { len, data } => {
                let len = *len as usize;
                self.reserve_bits(2 + 9 + len)?;
                self.store_uint(0b01, 2)?.store_uint(len as u64, 9)?;
                for i in 0..len {
                    let bit = data.get(i / 8).is_some_and(|b| b & (0x80 >> (i % 8)) != 0);
                    self.push_bit(bit);
                }
                Ok(self)
            }
            // addr_std$10 anycast:nothing workchain_id:int8 address:bits256
            MsgAddress::Internal { workchain, address } => {
                self.reserve_bits(2 + 1 + 8 + 256)?;
                self.store_uint(0b100, 3)?
                    .store_int((*workchain).into(), 8)?
                    .store_bytes(address)
            }
        }
    }

    /// Store a `HashmapE`: bit 0 when empty, else bit 1 and the root reference.
    pub fn store_dict(&mut self, dict: &Dictionary) -> CellResult<&mut Self> {
        let root = dict.serialize()?;
        self.store_maybe_ref(root)
    }

    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }

    fn reserve_bits(&self, bits: usize) -> CellResult<()> {
        match self.bit_len + bits {
            total if total > MAX_CELL_BITS => Err(CellError::DataTooLong(total)),
            _ => Ok(()),
        }
    }

    /// Append one bit; capacity must already be reserved.
    fn push_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.data.push(0);
        }
        if bit && let Some(last) = self.data.last_mut() {
            *last |= 0x80 >> offset;
        }
        self.bit_len += 1;
    }
}
