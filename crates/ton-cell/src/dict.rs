//! `HashmapE` dictionaries with fixed-width keys and `^Cell` values.
//!
//! ```text
//! hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
//!           {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
//! hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
//! hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X)
//!            right:^(Hashmap n X) = HashmapNode (n + 1) X;
//!
//! hml_short$0 {m:#} {n:#} len:(Unary ~n) s:(n * Bit) = HmLabel ~n m;
//! hml_long$10 {m:#} n:(#<= m) s:(n * Bit) = HmLabel ~n m;
//! hml_same$11 {m:#} v:Bit n:(#<= m) = HmLabel ~n m;
//! ```
//!
//! Values are always stored as a reference in the leaf (`X = ^Cell`).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice};

/// A dictionary keyed by `key_bytes`-wide byte strings.
///
/// Entries are kept ordered, so the serialized tree does not depend on
/// insertion order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ton_cell::{Cell, Dictionary};
///
/// let mut dict = Dictionary::new(32);
/// dict.insert(&[0u8; 32], Arc::new(Cell::empty())).unwrap();
/// let root = dict.serialize().unwrap().unwrap();
///
/// let parsed = Dictionary::parse(&root, 32).unwrap();
/// assert_eq!(parsed.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    key_bytes: usize,
    entries: BTreeMap<Vec<u8>, Arc<Cell>>,
}

impl Dictionary {
    /// Create an empty dictionary with keys of `key_bytes` bytes.
    pub fn new(key_bytes: usize) -> Self {
        Dictionary {
            key_bytes,
            entries: BTreeMap::new(),
        }
    }

    /// Key width in bits.
    pub fn key_bits(&self) -> usize {
        self.key_bytes * 8
    }

    /// Insert a value, replacing any previous one under the same key.
    pub fn insert(&mut self, key: &[u8], value: Arc<Cell>) -> CellResult<Option<Arc<Cell>>> {
        self.check_key(key)?;
        Ok(self.entries.insert(key.to_vec(), value))
    }

    /// Look up a value.
    pub fn get(&self, key: &[u8]) -> Option<&Arc<Cell>> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Arc<Cell>)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Serialize to the root of a `Hashmap`. Returns None for an empty
    /// dictionary (`hme_empty`).
    pub fn serialize(&self) -> CellResult<Option<Arc<Cell>>> {
        if self.entries.is_empty() {
            return Ok(None);
        }

        let entries: Vec<(Vec<bool>, &Arc<Cell>)> = self
            .entries
            .iter()
            .map(|(key, value)| (bytes_to_bits(key), value))
            .collect();

        build_edge(&entries, self.key_bits()).map(Some)
    }

    /// Parse a `Hashmap` root cell.
    pub fn parse(root: &Cell, key_bytes: usize) -> CellResult<Self> {
        let mut dict = Dictionary::new(key_bytes);
        let mut prefix = Vec::with_capacity(key_bytes * 8);
        parse_edge(root, key_bytes * 8, &mut prefix, &mut dict.entries)?;
        Ok(dict)
    }

    fn check_key(&self, key: &[u8]) -> CellResult<()> {
        if key.len() != self.key_bytes {
            return Err(CellError::DictKeyLength {
                expected: self.key_bytes,
                actual: key.len(),
            });
        }
        Ok(())
    }
}

/// Build one edge for `entries`, whose keys all have `m` remaining bits
/// and are sorted ascending.
fn build_edge(entries: &[(Vec<bool>, &Arc<Cell>)], m: usize) -> CellResult<Arc<Cell>> {
    let mut builder = CellBuilder::new();

    let [first, .., last] = entries else {
        // Exactly one entry: the whole remaining key is the label.
        let (key, value) = entries
            .first()
            .ok_or_else(|| CellError::InvalidDictionary("empty edge".to_string()))?;
        store_label(&mut builder, key, m)?;
        builder.store_ref(Arc::clone(value))?;
        return Ok(Arc::new(builder.build()?));
    };

    // Sorted keys share exactly the prefix shared by the first and last.
    let common = first
        .0
        .iter()
        .zip(&last.0)
        .take_while(|(a, b)| a == b)
        .count();
    if common >= m {
        return Err(CellError::InvalidDictionary("duplicate keys".to_string()));
    }

    store_label(&mut builder, &first.0[..common], m)?;

    let split = entries.partition_point(|(key, _)| !key[common]);
    let child_bits = m - common - 1;
    for half in [&entries[..split], &entries[split..]] {
        let rest: Vec<(Vec<bool>, &Arc<Cell>)> = half
            .iter()
            .map(|(key, value)| (key[common + 1..].to_vec(), *value))
            .collect();
        builder.store_ref(build_edge(&rest, child_bits)?)?;
    }

    Ok(Arc::new(builder.build()?))
}

/// Store the shortest of the three label forms. Ties prefer short, then long.
fn store_label(builder: &mut CellBuilder, label: &[bool], m: usize) -> CellResult<()> {
    let n = label.len();
    let len_bits = len_width(m);

    let short_len = 2 + 2 * n;
    let long_len = 2 + len_bits + n;
    let same_len = 3 + len_bits;
    let same_bit = match label {
        [] => Some(false),
        [first, rest @ ..] if rest.iter().all(|b| b == first) => Some(*first),
        _ => None,
    };

    let mut best = short_len;
    let mut use_long = false;
    if long_len < best {
        best = long_len;
        use_long = true;
    }

    match same_bit {
        Some(bit) if same_len < best => {
            builder.store_uint(0b11, 2)?;
            builder.store_bit(bit)?;
            builder.store_uint(n as u64, len_bits)?;
        }
        _ if use_long => {
            builder.store_uint(0b10, 2)?;
            builder.store_uint(n as u64, len_bits)?;
            builder.store_bits(label)?;
        }
        _ => {
            builder.store_bit(false)?;
            for _ in 0..n {
                builder.store_bit(true)?;
            }
            builder.store_bit(false)?;
            builder.store_bits(label)?;
        }
    }
    Ok(())
}

fn parse_edge(
    cell: &Cell,
    m: usize,
    prefix: &mut Vec<bool>,
    out: &mut BTreeMap<Vec<u8>, Arc<Cell>>,
) -> CellResult<()> {
    let mut slice = CellSlice::new(cell);
    let label = load_label(&mut slice, m)?;
    let base = prefix.len();
    prefix.extend_from_slice(&label);

    let remaining = m - label.len();
    if remaining == 0 {
        let value = cell
            .reference(0)
            .cloned()
            .ok_or(CellError::NotEnoughRefs { need: 1, have: 0 })?;
        out.insert(bits_to_bytes(prefix), value);
    } else {
        let (left, right) = match (cell.reference(0), cell.reference(1)) {
            (Some(left), Some(right)) => (left, right),
            _ => {
                return Err(CellError::InvalidDictionary(
                    "fork node needs two references".to_string(),
                ));
            }
        };
        for (bit, child) in [(false, left), (true, right)] {
            prefix.push(bit);
            parse_edge(child, remaining - 1, prefix, out)?;
            prefix.pop();
        }
    }

    prefix.truncate(base);
    Ok(())
}

fn load_label(slice: &mut CellSlice, m: usize) -> CellResult<Vec<bool>> {
    let len_bits = len_width(m);
    let label = if !slice.load_bit()? {
        let mut n = 0;
        while slice.load_bit()? {
            n += 1;
        }
        check_label_len(n, m)?;
        slice.load_bits(n)?
    } else if !slice.load_bit()? {
        let n = slice.load_uint(len_bits)? as usize;
        check_label_len(n, m)?;
        slice.load_bits(n)?
    } else {
        let bit = slice.load_bit()?;
        let n = slice.load_uint(len_bits)? as usize;
        check_label_len(n, m)?;
        vec![bit; n]
    };
    Ok(label)
}

fn check_label_len(n: usize, m: usize) -> CellResult<()> {
    if n > m {
        return Err(CellError::InvalidDictionary(format!(
            "label of {} bits exceeds {} remaining key bits",
            n, m
        )));
    }
    Ok(())
}

/// Bits needed for `#<= m`, i.e. ceil(log2(m + 1)).
fn len_width(m: usize) -> usize {
    (usize::BITS - m.leading_zeros()) as usize
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << (7 - i)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: u8) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u8(v).unwrap();
        Arc::new(builder.build().unwrap())
    }

    fn label_bits(label: &[bool], m: usize) -> Vec<bool> {
        let mut builder = CellBuilder::new();
        store_label(&mut builder, label, m).unwrap();
        let cell = builder.build().unwrap();
        (0..cell.bit_len()).map(|i| cell.get_bit(i).unwrap()).collect()
    }

    #[test]
    fn test_len_width() {
        assert_eq!(len_width(0), 0);
        assert_eq!(len_width(1), 1);
        assert_eq!(len_width(255), 8);
        assert_eq!(len_width(256), 9);
    }

    #[test]
    fn test_label_short_for_empty() {
        // hml_short with n = 0: "0" + unary "0"
        assert_eq!(label_bits(&[], 255), vec![false, false]);
    }

    #[test]
    fn test_label_long_for_full_key() {
        let key = bytes_to_bits(&[0xA5; 32]);
        let bits = label_bits(&key, 256);
        assert_eq!(bits.len(), 2 + 9 + 256);
        assert_eq!(&bits[..2], &[true, false]);
    }

    #[test]
    fn test_label_same_for_uniform_key() {
        let key = vec![true; 256];
        let bits = label_bits(&key, 256);
        // 11, v = 1, n = 256 in 9 bits
        assert_eq!(bits.len(), 3 + 9);
        assert_eq!(&bits[..3], &[true, true, true]);
    }

    #[test]
    fn test_label_short_beats_long_for_small_labels() {
        // short: 2 + 2 = 4 bits; long: 2 + 9 + 1 = 12 bits; same: 12 bits
        assert_eq!(label_bits(&[true], 256), vec![false, true, false, true]);
    }

    #[test]
    fn test_empty_dict_serializes_to_none() {
        let dict = Dictionary::new(32);
        assert!(dict.is_empty());
        assert!(dict.serialize().unwrap().is_none());
    }

    #[test]
    fn test_key_length_checked() {
        let mut dict = Dictionary::new(32);
        assert!(matches!(
            dict.insert(&[0u8; 31], value(1)),
            Err(CellError::DictKeyLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_single_entry_is_leaf() {
        let mut dict = Dictionary::new(32);
        dict.insert(&[0x42; 32], value(7)).unwrap();

        let root = dict.serialize().unwrap().unwrap();
        assert_eq!(root.bit_len(), 267);
        assert_eq!(root.reference_count(), 1);
        assert_eq!(root.reference(0).unwrap().data(), &[7]);
    }

    #[test]
    fn test_fork_on_first_bit() {
        let mut low = [0u8; 32];
        low[31] = 1;
        let mut high = [0u8; 32];
        high[0] = 0x80;

        let mut dict = Dictionary::new(32);
        dict.insert(&high, value(2)).unwrap();
        dict.insert(&low, value(1)).unwrap();

        let root = dict.serialize().unwrap().unwrap();
        // empty short label, then left and right children
        assert_eq!(root.bit_len(), 2);
        assert_eq!(root.reference_count(), 2);

        let left = root.reference(0).unwrap();
        assert_eq!(left.reference(0).unwrap().data(), &[1]);
        let right = root.reference(1).unwrap();
        assert_eq!(right.reference(0).unwrap().data(), &[2]);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let keys: Vec<[u8; 4]> = vec![[1, 2, 3, 4], [0xFF, 0, 0, 1], [1, 2, 3, 5], [0, 0, 0, 0]];

        let mut forward = Dictionary::new(4);
        for (i, key) in keys.iter().enumerate() {
            forward.insert(key, value(i as u8)).unwrap();
        }
        let mut backward = Dictionary::new(4);
        for (i, key) in keys.iter().enumerate().rev() {
            backward.insert(key, value(i as u8)).unwrap();
        }

        let a = forward.serialize().unwrap().unwrap();
        let b = backward.serialize().unwrap().unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_parse_roundtrip() {
        let mut dict = Dictionary::new(32);
        for i in 0..5u8 {
            let mut key = [i.wrapping_mul(53); 32];
            key[31] = i;
            dict.insert(&key, value(i)).unwrap();
        }

        let root = dict.serialize().unwrap().unwrap();
        let parsed = Dictionary::parse(&root, 32).unwrap();
        assert_eq!(parsed, dict);
    }

    #[test]
    fn test_parse_rejects_oversized_label() {
        // hml_same with n = 9 > m = 8
        let mut builder = CellBuilder::new();
        builder.store_uint(0b11, 2).unwrap();
        builder.store_bit(true).unwrap();
        builder.store_uint(9, 4).unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            Dictionary::parse(&cell, 1),
            Err(CellError::InvalidDictionary(_))
        ));
    }
}
