//! Sequential reads from a cell.

use crate::{Cell, CellError, CellResult, Dictionary, MsgAddress};

/// Read cursor over the bits and references of a [`Cell`].
///
/// Bits and references are consumed independently, front to back. A failed
/// read reports how much was requested and how much is left; bits consumed
/// by an earlier successful read stay consumed.
///
/// ```
/// use ton_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x595f07bc).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// assert_eq!(slice.load_u32().unwrap(), 0x595f07bc);
/// assert!(slice.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    /// Index of the next unread bit.
    pos: usize,
    /// Index of the next unread reference.
    next_ref: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            pos: 0,
            next_ref: 0,
        }
    }

    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.require_bits(1)?;
        Ok(self.take_bit())
    }

    pub fn load_bits(&mut self, count: usize) -> CellResult<Vec<bool>> {
        self.require_bits(count)?;
        Ok((0..count).map(|_| self.take_bit()).collect())
    }

    pub fn load_u8(&mut self) -> CellResult<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    pub fn load_u32(&mut self) -> CellResult<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    /// Read a `bits`-wide unsigned integer, most significant bit first.
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.require_bits(bits)?;
        Ok((0..bits).fold(0u64, |acc, _| (acc << 1) | u64::from(self.take_bit())))
    }

    /// Read a `bits`-wide two's complement integer.
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        let raw = self.load_uint(bits)?;
        Ok(match bits {
            0 => 0,
            64 => raw as i64,
            _ => ((raw << (64 - bits)) as i64) >> (64 - bits),
        })
    }

    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        self.require_bits(count * 8)?;
        Ok((0..count)
            .map(|_| (0..8).fold(0u8, |acc, _| (acc << 1) | u8::from(self.take_bit())))
            .collect())
    }

    /// Every remaining whole byte. A trailing partial byte stays unread.
    pub fn load_remaining_bytes(&mut self) -> CellResult<Vec<u8>> {
        self.load_bytes(self.bits_left() / 8)
    }

    pub fn load_ref(&mut self) -> CellResult<&'a Cell> {
        let cell = self.cell;
        let child = cell.reference(self.next_ref).ok_or(CellError::NotEnoughRefs {
            need: 1,
            have: 0,
        })?;
        self.next_ref += 1;
        Ok(child.as_ref())
    }

    /// `Maybe ^Cell`.
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<&'a Cell>> {
        match self.load_bit()? {
            true => self.load_ref().map(Some),
            false => Ok(None),
        }
    }

    /// `HashmapE` with `key_bytes`-byte keys and `^Cell` values.
    pub fn load_dict(&mut self, key_bytes: usize) -> CellResult<Dictionary> {
        match self.load_maybe_ref()? {
            Some(root) => Dictionary::parse(root, key_bytes),
            None => Ok(Dictionary::new(key_bytes)),
        }
    }

    /// `VarUInteger 16`.
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let len = self.load_uint(4)? as usize;
        Ok(self
            .load_bytes(len)?
            .into_iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(byte)))
    }

    /// Read a `MsgAddress`. `addr_var` is accepted only with a 256-bit
    /// address, which is the only form standard contracts produce.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        match self.load_uint(2)? {
            0b00 => Ok(MsgAddress::Null),
            0b01 => {
                let len = self.load_uint(9)? as u16;
                let bits = self.load_bits(len.into())?;
                let mut data = vec![0u8; usize::from(len).div_ceil(8)];
                for (i, bit) in bits.into_iter().enumerate() {
                    if bit {
                        data[i / 8] |= 0x80 >> (i % 8);
                    }
                }
                Ok(MsgAddress::External { len, data })
            }
            0b10 => {
                self.skip_anycast()?;
                let workchain = self.load_int(8)? as i32;
                let address = self.load_hash_part()?;
                Ok(MsgAddress::Internal { workchain, address })
            }
            // addr_var$11 anycast:(Maybe Anycast) addr_len:(## 9) workchain_id:int32
            _ => {
                self.skip_anycast()?;
                let addr_len = self.load_uint(9)?;
                let workchain = self.load_int(32)? as i32;
                if addr_len != 256 {
                    return Err(CellError::InvalidAddress(format!(
                        "addr_var with a {}-bit address",
                        addr_len
                    )));
                }
                let address = self.load_hash_part()?;
                Ok(MsgAddress::Internal { workchain, address })
            }
        }
    }

    pub fn bits_left(&self) -> usize {
        self.cell.bit_len() - self.pos
    }

    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.next_ref
    }

    /// No bits and no references left.
    pub fn is_empty(&self) -> bool {
        self.bits_left() == 0 && self.refs_left() == 0
    }

    fn load_hash_part(&mut self) -> CellResult<[u8; 32]> {
        let mut address = [0u8; 32];
        address.copy_from_slice(&self.load_bytes(32)?);
        Ok(address)
    }

    fn skip_anycast(&mut self) -> CellResult<()> {
        if self.load_bit()? {
            let depth = self.load_uint(5)? as usize;
            self.require_bits(depth)?;
            self.pos += depth;
        }
        Ok(())
    }

    /// Consume one bit; the caller has checked it exists.
    fn take_bit(&mut self) -> bool {
        let bit = self.cell.get_bit(self.pos).unwrap_or(false);
        self.pos += 1;
        bit
    }

    fn require_bits(&self, need: usize) -> CellResult<()> {
        let have = self.bits_left();
        if need > have {
            return Err(CellError::NotEnoughBits { need, have });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBuilder;
    use std::sync::Arc;

    #[test]
    fn test_bits_run_out() {
        let mut builder = CellBuilder::new();
        builder.store_bits(&[true, false, true]).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_bits(3).unwrap(), vec![true, false, true]);
        assert!(matches!(
            slice.load_bit(),
            Err(CellError::NotEnoughBits { need: 1, have: 0 })
        ));
    }

    #[test]
    fn test_short_read_consumes_nothing() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0xAB).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert!(slice.load_u32().is_err());
        assert_eq!(slice.load_u8().unwrap(), 0xAB);
    }

    #[test]
    fn test_negative_ints_sign_extend() {
        let mut builder = CellBuilder::new();
        builder.store_int(-15, 8).unwrap();
        builder.store_int(-1, 6).unwrap();
        builder.store_int(3, 4).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_int(8).unwrap(), -15);
        assert_eq!(slice.load_int(6).unwrap(), -1);
        assert_eq!(slice.load_int(4).unwrap(), 3);
    }

    #[test]
    fn test_remaining_bytes_after_tag() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x00).unwrap();
        builder.store_bytes(b"abc").unwrap();
        builder.store_bit(true).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_u8().unwrap(), 0);
        assert_eq!(slice.load_remaining_bytes().unwrap(), b"abc");
        assert_eq!(slice.bits_left(), 1);
    }

    #[test]
    fn test_maybe_refs_in_order() {
        let child = Arc::new(Cell::empty());
        let mut builder = CellBuilder::new();
        builder.store_maybe_ref(Some(child.clone())).unwrap();
        builder.store_maybe_ref(None).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert_eq!(slice.load_maybe_ref().unwrap(), Some(child.as_ref()));
        assert_eq!(slice.load_maybe_ref().unwrap(), None);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_address_forms_read_back() {
        let addresses = [
            MsgAddress::Null,
            MsgAddress::Internal {
                workchain: -1,
                address: [0xAB; 32],
            },
            MsgAddress::External {
                len: 12,
                data: vec![0xAB, 0xC0],
            },
        ];

        for addr in addresses {
            let mut builder = CellBuilder::new();
            builder.store_address(&addr).unwrap();
            let cell = builder.build().unwrap();
            assert_eq!(CellSlice::new(&cell).load_address().unwrap(), addr);
        }
    }

    #[test]
    fn test_addr_var_256() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b11, 2).unwrap();
        builder.store_bit(false).unwrap();
        builder.store_uint(256, 9).unwrap();
        builder.store_int(-1, 32).unwrap();
        builder.store_bytes(&[0x5A; 32]).unwrap();
        let cell = builder.build().unwrap();

        assert_eq!(
            CellSlice::new(&cell).load_address().unwrap(),
            MsgAddress::Internal {
                workchain: -1,
                address: [0x5A; 32],
            }
        );
    }

    #[test]
    fn test_dicts_read_back() {
        let mut dict = Dictionary::new(2);
        dict.insert(&[0xBE, 0xEF], Arc::new(Cell::empty())).unwrap();

        let mut builder = CellBuilder::new();
        builder.store_dict(&Dictionary::new(2)).unwrap();
        builder.store_dict(&dict).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert!(slice.load_dict(2).unwrap().is_empty());
        assert_eq!(slice.load_dict(2).unwrap(), dict);
    }

    #[test]
    fn test_refs_run_out() {
        let cell = Cell::empty();
        assert!(matches!(
            CellSlice::new(&cell).load_ref(),
            Err(CellError::NotEnoughRefs { need: 1, have: 0 })
        ));
    }
}
