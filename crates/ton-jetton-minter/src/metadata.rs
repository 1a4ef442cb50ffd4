//! On-chain token metadata (TEP-64 style content tree).
//!
//! The content root is a single cell:
//!
//! ```text
//! content#00 data:(HashmapE 256 ^SnakeData) = ContentRoot;
//! snake#00 data:(bits 8*n) next:(Maybe ^SnakeTail) = SnakeData;
//! ```
//!
//! Keys are SHA-256 hashes of the field names. Every value is stored as a
//! snake chain: the first cell carries the `0x00` tag and up to 126 bytes,
//! each following cell holds the next 126 bytes and is referenced from the
//! previous one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;
use ton_cell::{Cell, CellBuilder, CellResult, CellSlice, Dictionary, MAX_CELL_BITS};

use crate::error::{JettonError, JettonResult};

/// Tag of the content root cell.
pub const CONTENT_PREFIX: u8 = 0x00;

/// Tag of the first cell of a snake chain.
pub const SNAKE_PREFIX: u8 = 0x00;

/// Payload bytes per snake cell: `(1023 - 8) / 8`.
pub const SNAKE_CHUNK_BYTES: usize = (MAX_CELL_BITS - 8) / 8;

/// Width of content dictionary keys in bytes.
pub const CONTENT_KEY_BYTES: usize = 32;

/// How a field's string value is turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// UTF-8.
    Utf8,
    /// One byte per UTF-16 code unit, keeping its low 8 bits.
    /// Plain ASCII text is unchanged.
    Ascii,
}

impl FieldEncoding {
    /// Encode a string value.
    pub fn encode(&self, value: &str) -> Vec<u8> {
        match self {
            FieldEncoding::Utf8 => value.as_bytes().to_vec(),
            FieldEncoding::Ascii => value.encode_utf16().map(|unit| unit as u8).collect(),
        }
    }

    /// Decode stored bytes back into a string.
    ///
    /// Single-byte values are read as Latin-1, so the low-byte truncation
    /// applied on encode is not reversed for characters above U+00FF.
    pub fn decode(&self, bytes: &[u8]) -> JettonResult<String> {
        match self {
            FieldEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| JettonError::InvalidSnakeData(e.to_string())),
            FieldEncoding::Ascii => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// A supported metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataField {
    Name,
    Description,
    Image,
    Decimals,
    Symbol,
    Uri,
}

impl MetadataField {
    /// All supported fields.
    pub const ALL: [MetadataField; 6] = [
        MetadataField::Name,
        MetadataField::Description,
        MetadataField::Image,
        MetadataField::Decimals,
        MetadataField::Symbol,
        MetadataField::Uri,
    ];

    /// The field name as used in metadata records.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Name => "name",
            MetadataField::Description => "description",
            MetadataField::Image => "image",
            MetadataField::Decimals => "decimals",
            MetadataField::Symbol => "symbol",
            MetadataField::Uri => "uri",
        }
    }

    /// Declared encoding of the field's value.
    pub fn encoding(&self) -> FieldEncoding {
        match self {
            MetadataField::Image | MetadataField::Uri => FieldEncoding::Ascii,
            _ => FieldEncoding::Utf8,
        }
    }

    /// Dictionary key: SHA-256 of the field name.
    pub fn key(&self) -> [u8; 32] {
        Sha256::digest(self.as_str().as_bytes()).into()
    }

    /// Look up the field whose key is `key`.
    pub fn from_key(key: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl FromStr for MetadataField {
    type Err = JettonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| JettonError::UnsupportedField(s.to_string()))
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the snake chain for `bytes` and return its first cell.
///
/// An empty input yields a single cell holding only the tag.
pub fn build_snake_chain(bytes: &[u8]) -> CellResult<Arc<Cell>> {
    let mut chunks = bytes.chunks(SNAKE_CHUNK_BYTES);
    let head = chunks.next().unwrap_or_default();

    let tail = chunks.rev().try_fold(None::<Arc<Cell>>, |next, chunk| {
        snake_cell(false, chunk, next).map(Some)
    })?;

    snake_cell(true, head, tail)
}

fn snake_cell(tagged: bool, chunk: &[u8], next: Option<Arc<Cell>>) -> CellResult<Arc<Cell>> {
    let mut builder = CellBuilder::new();
    if tagged {
        builder.store_u8(SNAKE_PREFIX)?;
    }
    builder.store_bytes(chunk)?;
    if let Some(next) = next {
        builder.store_ref(next)?;
    }
    Ok(Arc::new(builder.build()?))
}

/// Read the bytes of a snake chain starting at its tagged first cell.
pub fn read_snake_chain(cell: &Cell) -> JettonResult<Vec<u8>> {
    let mut slice = CellSlice::new(cell);
    let prefix = slice.load_u8()?;
    if prefix != SNAKE_PREFIX {
        return Err(JettonError::InvalidSnakeData(format!(
            "unexpected tag 0x{:02x}",
            prefix
        )));
    }

    let mut bytes = Vec::new();
    loop {
        bytes.extend(slice.load_remaining_bytes()?);
        if slice.bits_left() != 0 {
            return Err(JettonError::InvalidSnakeData(format!(
                "{} trailing bits in chain cell",
                slice.bits_left()
            )));
        }
        if slice.refs_left() == 0 {
            return Ok(bytes);
        }
        slice = CellSlice::new(slice.load_ref()?);
    }
}

/// Encode a content record into the content root cell.
///
/// Entries are `(field name, value)` pairs. Every name must be one of the
/// supported fields, even when its value is absent; absent and empty
/// values are left out of the dictionary.
///
/// # Example
///
/// ```
/// use ton_jetton_minter::build_token_metadata_cell;
///
/// let cell = build_token_metadata_cell([
///     ("name", Some("Test")),
///     ("symbol", Some("TST")),
///     ("description", None),
/// ])
/// .unwrap();
/// assert_eq!(cell.reference_count(), 1);
/// ```
pub fn build_token_metadata_cell<I, K, V>(fields: I) -> JettonResult<Cell>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut dict = Dictionary::new(CONTENT_KEY_BYTES);

    for (name, value) in fields {
        let field: MetadataField = name.as_ref().parse()?;
        let value: Option<&str> = value.as_ref().map(|v| v.as_ref());
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };

        let chain = build_snake_chain(&field.encoding().encode(value))?;
        dict.insert(&field.key(), chain)?;
    }

    debug!(fields = dict.len(), "encoded token metadata");

    let mut builder = CellBuilder::new();
    builder.store_u8(CONTENT_PREFIX)?;
    builder.store_dict(&dict)?;
    Ok(builder.build()?)
}

/// Parse a content root cell produced by [`build_token_metadata_cell`].
///
/// Dictionary keys that match no supported field are skipped.
pub fn parse_token_metadata_cell(cell: &Cell) -> JettonResult<OnChainMetadata> {
    let mut slice = CellSlice::new(cell);
    let prefix = slice.load_u8()?;
    if prefix != CONTENT_PREFIX {
        return Err(JettonError::InvalidContentPrefix(prefix));
    }

    let dict = slice.load_dict(CONTENT_KEY_BYTES)?;
    let mut metadata = OnChainMetadata::new();
    for (key, value) in dict.iter() {
        let Some(field) = MetadataField::from_key(key) else {
            debug!(key = %hex::encode(key), "skipping unknown metadata key");
            continue;
        };
        let bytes = read_snake_chain(value)?;
        metadata.set(field, field.encoding().decode(&bytes)?);
    }

    Ok(metadata)
}

/// Typed on-chain metadata record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnChainMetadata {
    /// Token name (e.g., "Toncoin").
    pub name: Option<String>,
    /// Token description.
    pub description: Option<String>,
    /// Image URL.
    pub image: Option<String>,
    /// Number of decimal places, as text (e.g., "9").
    pub decimals: Option<String>,
    /// Token symbol (e.g., "TON").
    pub symbol: Option<String>,
    /// URI of off-chain metadata.
    pub uri: Option<String>,
}

impl OnChainMetadata {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the image URL.
    pub fn set_image(&mut self, image: impl Into<String>) -> &mut Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the decimals.
    pub fn set_decimals(&mut self, decimals: impl Into<String>) -> &mut Self {
        self.decimals = Some(decimals.into());
        self
    }

    /// Sets the symbol.
    pub fn set_symbol(&mut self, symbol: impl Into<String>) -> &mut Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the URI.
    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets a field by enum.
    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) -> &mut Self {
        *self.slot(field) = Some(value.into());
        self
    }

    /// Value of a field.
    pub fn get(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::Name => self.name.as_deref(),
            MetadataField::Description => self.description.as_deref(),
            MetadataField::Image => self.image.as_deref(),
            MetadataField::Decimals => self.decimals.as_deref(),
            MetadataField::Symbol => self.symbol.as_deref(),
            MetadataField::Uri => self.uri.as_deref(),
        }
    }

    /// All fields with their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (MetadataField, Option<&str>)> + '_ {
        MetadataField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    /// Encode into the content root cell.
    pub fn to_cell(&self) -> JettonResult<Cell> {
        build_token_metadata_cell(self.fields().map(|(field, value)| (field.as_str(), value)))
    }

    fn slot(&mut self, field: MetadataField) -> &mut Option<String> {
        match field {
            MetadataField::Name => &mut self.name,
            MetadataField::Description => &mut self.description,
            MetadataField::Image => &mut self.image,
            MetadataField::Decimals => &mut self.decimals,
            MetadataField::Symbol => &mut self.symbol,
            MetadataField::Uri => &mut self.uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_cells(root: &Cell) -> Vec<&Cell> {
        let mut cells = vec![root];
        while let Some(next) = cells.last().copied().and_then(|c| c.reference(0)) {
            cells.push(next);
        }
        cells
    }

    fn content_dict(cell: &Cell) -> Dictionary {
        let mut slice = CellSlice::new(cell);
        assert_eq!(slice.load_u8().unwrap(), CONTENT_PREFIX);
        slice.load_dict(CONTENT_KEY_BYTES).unwrap()
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(SNAKE_CHUNK_BYTES, 126);
    }

    #[test]
    fn test_field_keys() {
        let expected = [
            (MetadataField::Name, "82a3537ff0dbce7eec35d69edc3a189ee6f17d82f353a553f9aa96cb0be3ce89"),
            (MetadataField::Description, "c9046f7a37ad0ea7cee73355984fa5428982f8b37c8f7bcec91f7ac71a7cd104"),
            (MetadataField::Image, "6105d6cc76af400325e94d588ce511be5bfdbb73b437dc51eca43917d7a43e3d"),
            (MetadataField::Decimals, "ee80fd2f1e03480e2282363596ee752d7bb27f50776b95086a0279189675923e"),
            (MetadataField::Symbol, "b76a7ca153c24671658335bbd08946350ffc621fa1c516e7123095d4ffd5c581"),
            (MetadataField::Uri, "70e5d7b6a29b392f85076fe15ca2f2053c56c2338728c4e33c9e8ddb1ee827cc"),
        ];
        for (field, key) in expected {
            assert_eq!(hex::encode(field.key()), key, "{}", field);
            assert_eq!(MetadataField::from_key(&field.key()), Some(field));
        }
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("uri".parse::<MetadataField>().unwrap(), MetadataField::Uri);
        assert!(matches!(
            "Name".parse::<MetadataField>(),
            Err(JettonError::UnsupportedField(name)) if name == "Name"
        ));
    }

    #[test]
    fn test_ascii_encoding_keeps_low_byte() {
        assert_eq!(FieldEncoding::Ascii.encode("ipfs://x"), b"ipfs://x");
        assert_eq!(FieldEncoding::Ascii.encode("é€"), vec![0xE9, 0xAC]);
        assert_eq!(FieldEncoding::Utf8.encode("é"), vec![0xC3, 0xA9]);
        assert_eq!(FieldEncoding::Ascii.decode(&[0x41, 0xE9]).unwrap(), "Aé");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = build_token_metadata_cell([("name", Some("A")), ("website", Some("x"))]);
        assert!(matches!(result, Err(JettonError::UnsupportedField(f)) if f == "website"));
    }

    #[test]
    fn test_unknown_field_rejected_even_without_value() {
        let result = build_token_metadata_cell([("website", None::<&str>)]);
        assert!(matches!(result, Err(JettonError::UnsupportedField(_))));

        let result = build_token_metadata_cell([("website", Some(""))]);
        assert!(matches!(result, Err(JettonError::UnsupportedField(_))));
    }

    #[test]
    fn test_empty_values_omitted() {
        let cell = build_token_metadata_cell([
            ("name", Some("Jetton")),
            ("description", Some("")),
            ("image", None),
        ])
        .unwrap();

        let dict = content_dict(&cell);
        assert_eq!(dict.len(), 1);
        assert!(dict.get(&MetadataField::Name.key()).is_some());
        assert!(dict.get(&MetadataField::Description.key()).is_none());
    }

    #[test]
    fn test_all_empty_gives_empty_dictionary() {
        let cell = build_token_metadata_cell([("name", None::<&str>), ("symbol", Some(""))]).unwrap();
        // tag 0x00 followed by hme_empty
        assert_eq!(cell.bit_len(), 9);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.data(), &[0x00, 0x00]);
    }

    #[test]
    fn test_end_to_end_small_record() {
        let cell = build_token_metadata_cell([
            ("name", Some("Test")),
            ("symbol", Some("TST")),
            ("decimals", Some("9")),
        ])
        .unwrap();

        let dict = content_dict(&cell);
        assert_eq!(dict.len(), 3);

        for (field, text) in [
            (MetadataField::Name, "Test"),
            (MetadataField::Symbol, "TST"),
            (MetadataField::Decimals, "9"),
        ] {
            let value = dict.get(&field.key()).unwrap();
            assert_eq!(value.reference_count(), 0);
            assert_eq!(value.bit_len(), 8 + text.len() * 8);
            assert_eq!(value.data()[0], SNAKE_PREFIX);
            assert_eq!(&value.data()[1..], text.as_bytes());
        }
    }

    #[test]
    fn test_chain_boundary_exact_chunk() {
        let root = build_snake_chain(&[0x61; 126]).unwrap();
        assert_eq!(chain_cells(&root).len(), 1);
        assert_eq!(root.bit_len(), 8 + 126 * 8);
    }

    #[test]
    fn test_chain_boundary_one_over() {
        let root = build_snake_chain(&[0x61; 127]).unwrap();
        let cells = chain_cells(&root);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].data(), &[0x61]);
        assert_eq!(cells[1].reference_count(), 0);
    }

    #[test]
    fn test_chain_layout_and_concatenation() {
        let bytes: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        let root = build_snake_chain(&bytes).unwrap();
        let cells = chain_cells(&root);

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].data()[0], SNAKE_PREFIX);
        assert_eq!(cells[0].bit_len(), 8 + 126 * 8);
        assert_eq!(cells[1].bit_len(), 126 * 8);
        assert_eq!(cells[2].bit_len(), 48 * 8);

        let mut joined = cells[0].data()[1..].to_vec();
        joined.extend_from_slice(cells[1].data());
        joined.extend_from_slice(cells[2].data());
        assert_eq!(joined, bytes);

        assert_eq!(read_snake_chain(&root).unwrap(), bytes);
    }

    #[test]
    fn test_empty_chain_is_tag_only() {
        let root = build_snake_chain(&[]).unwrap();
        assert_eq!(root.data(), &[SNAKE_PREFIX]);
        assert!(read_snake_chain(&root).unwrap().is_empty());
    }

    #[test]
    fn test_read_snake_chain_rejects_bad_tag() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x01).unwrap();
        let cell = builder.build().unwrap();
        assert!(matches!(
            read_snake_chain(&cell),
            Err(JettonError::InvalidSnakeData(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut metadata = OnChainMetadata::new();
            metadata
                .set_name("Deterministic")
                .set_symbol("DET")
                .set_description("x".repeat(400));
            metadata.to_cell().unwrap()
        };
        assert_eq!(build().hash(), build().hash());
    }

    #[test]
    fn test_input_order_irrelevant() {
        let a = build_token_metadata_cell([("name", Some("A")), ("symbol", Some("B"))]).unwrap();
        let b = build_token_metadata_cell([("symbol", Some("B")), ("name", Some("A"))]).unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_typed_record_roundtrip() {
        let mut metadata = OnChainMetadata::new();
        metadata
            .set_name("Sample Jetton")
            .set_description("A description that is long enough to need more than one cell. ".repeat(3))
            .set_image("https://example.com/logo.png")
            .set_decimals("9")
            .set_symbol("SMPL")
            .set_uri("ipfs://bafy");

        let cell = metadata.to_cell().unwrap();
        let parsed = parse_token_metadata_cell(&cell).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_parse_rejects_prefix() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x01).unwrap();
        builder.store_bit(false).unwrap();
        let cell = builder.build().unwrap();
        assert!(matches!(
            parse_token_metadata_cell(&cell),
            Err(JettonError::InvalidContentPrefix(0x01))
        ));
    }

    #[test]
    fn test_parse_skips_unknown_keys() {
        let mut dict = Dictionary::new(CONTENT_KEY_BYTES);
        dict.insert(&MetadataField::Symbol.key(), build_snake_chain(b"SYM").unwrap())
            .unwrap();
        dict.insert(&[0x11; 32], build_snake_chain(b"junk").unwrap())
            .unwrap();

        let mut builder = CellBuilder::new();
        builder.store_u8(CONTENT_PREFIX).unwrap();
        builder.store_dict(&dict).unwrap();
        let cell = builder.build().unwrap();

        let parsed = parse_token_metadata_cell(&cell).unwrap();
        assert_eq!(parsed.symbol.as_deref(), Some("SYM"));
        assert_eq!(parsed.fields().filter(|(_, v)| v.is_some()).count(), 1);
    }
}
