//! Minter configuration and compiled contract code.
//!
//! Contract code comes from compiler artifacts (`*.compiled.json`) whose
//! `hex` field holds a bag of cells. Artifacts are loaded explicitly and
//! passed to the contract wrapper; nothing is loaded at startup.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use ton_cell::{BagOfCells, Cell, MsgAddress};

use crate::error::{JettonError, JettonResult};
use crate::metadata::OnChainMetadata;

/// File name of the minter artifact.
pub const MINTER_ARTIFACT: &str = "jetton-minter.compiled.json";

/// File name of the wallet artifact.
pub const WALLET_ARTIFACT: &str = "jetton-wallet.compiled.json";

#[derive(Deserialize)]
struct CompiledArtifact {
    hex: String,
}

/// Compiled contract code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCode {
    root: Arc<Cell>,
}

impl ContractCode {
    /// Wrap an existing code cell.
    pub fn new(root: Arc<Cell>) -> Self {
        Self { root }
    }

    /// Decode code from a hex-encoded bag of cells with a single root.
    pub fn from_boc_hex(hex: &str) -> JettonResult<Self> {
        let boc = BagOfCells::deserialize_from_hex(hex)?;
        Ok(Self::new(boc.single_root()?.clone()))
    }

    /// Decode code from the contents of a `*.compiled.json` artifact.
    pub fn from_compiled_json(json: &str) -> JettonResult<Self> {
        let artifact: CompiledArtifact = serde_json::from_str(json)?;
        Self::from_boc_hex(&artifact.hex)
    }

    /// Load code from a `*.compiled.json` file.
    pub fn load(path: impl AsRef<Path>) -> JettonResult<Self> {
        let path = path.as_ref();
        let code = Self::from_compiled_json(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), hash = %hex::encode(code.hash()), "loaded contract code");
        Ok(code)
    }

    /// The code cell.
    pub fn cell(&self) -> Arc<Cell> {
        self.root.clone()
    }

    /// Representation hash of the code cell.
    pub fn hash(&self) -> [u8; 32] {
        self.root.hash()
    }
}

/// Minter and wallet code loaded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCodes {
    pub minter: ContractCode,
    pub wallet: ContractCode,
}

impl ContractCodes {
    /// Load `jetton-minter.compiled.json` and `jetton-wallet.compiled.json`
    /// from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> JettonResult<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            minter: ContractCode::load(dir.join(MINTER_ARTIFACT))?,
            wallet: ContractCode::load(dir.join(WALLET_ARTIFACT))?,
        })
    }
}

/// Configuration of a new jetton.
///
/// ```
/// use ton_jetton_minter::JettonConfig;
///
/// let config = JettonConfig::from_json(r#"{
///     "owner": "0:0000000000000000000000000000000000000000000000000000000000000001",
///     "name": "Sample",
///     "symbol": "SMPL",
///     "decimals": 9
/// }"#).unwrap();
/// assert_eq!(config.decimals.as_deref(), Some("9"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JettonConfig {
    /// Admin of the minter, in raw or user-friendly form.
    #[serde(serialize_with = "serialize_address", deserialize_with = "deserialize_address")]
    pub owner: MsgAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Decimals as text; JSON numbers are accepted too.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_decimals"
    )]
    pub decimals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl JettonConfig {
    /// A config with only the owner set.
    pub fn new(owner: MsgAddress) -> Self {
        Self {
            owner,
            name: None,
            symbol: None,
            image: None,
            description: None,
            decimals: None,
            uri: None,
        }
    }

    /// Parse from JSON text.
    pub fn from_json(json: &str) -> JettonResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if !config.owner.is_internal() {
            return Err(JettonError::Config(format!(
                "owner must be an internal address, got '{}'",
                config.owner
            )));
        }
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> JettonResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading jetton config");
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// The metadata record described by this config.
    pub fn metadata(&self) -> OnChainMetadata {
        OnChainMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            decimals: self.decimals.clone(),
            symbol: self.symbol.clone(),
            uri: self.uri.clone(),
        }
    }
}

fn serialize_address<S: Serializer>(address: &MsgAddress, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_raw_string())
}

fn deserialize_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MsgAddress, D::Error> {
    let text = String::deserialize(deserializer)?;
    MsgAddress::from_string(&text).map_err(serde::de::Error::custom)
}

fn deserialize_decimals<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(u64),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Number(n) => n.to_string(),
        }),
    )
}
