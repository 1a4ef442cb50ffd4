//! `MsgAddress` and its text forms.
//!
//! Two text forms are understood: raw (`<workchain>:<64 hex digits>`) and
//! user-friendly, which is 36 bytes in base64:
//!
//! ```text
//! tag:u8 workchain:i8 account:[u8; 32] crc16_xmodem:u16
//! ```

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use crate::{CellError, CellResult};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// Length of a decoded user-friendly address.
const FRIENDLY_BYTES: usize = 36;

/// Length of its base64 text.
const FRIENDLY_CHARS: usize = 48;

/// A message address as stored in cells.
///
/// ```
/// use ton_cell::MsgAddress;
///
/// let owner: MsgAddress = "EQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAM9c".parse().unwrap();
/// assert_eq!(owner.workchain(), Some(0));
/// assert_eq!(owner.hash_part(), Some(&[0u8; 32]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MsgAddress {
    /// `addr_none$00`
    #[default]
    Null,

    /// `addr_extern$01`, `len` bits of `data`.
    External { len: u16, data: Vec<u8> },

    /// `addr_std$10` without anycast.
    Internal { workchain: i32, address: [u8; 32] },
}

impl MsgAddress {
    /// Parse raw or user-friendly text. Blank text is `addr_none`.
    ///
    /// The user-friendly form is accepted in both base64 alphabets and with
    /// any bounceable/testnet flags; the flags are not kept.
    pub fn from_string(s: &str) -> CellResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            Ok(MsgAddress::Null)
        } else if let Some((workchain, account)) = s.split_once(':') {
            parse_raw(workchain, account)
        } else if s.len() == FRIENDLY_CHARS {
            parse_friendly(s)
        } else {
            Err(CellError::InvalidAddress(format!(
                "'{}' is neither raw nor user-friendly",
                s
            )))
        }
    }

    /// `<workchain>:<hex>` for internal addresses, empty for `addr_none`.
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::External { len, data } => format!("extern:{}:{}", len, hex::encode(data)),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex::encode(address))
            }
        }
    }

    /// URL-safe user-friendly form; `None` unless internal.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        let MsgAddress::Internal { workchain, address } = self else {
            return None;
        };

        let tag = match (bounceable, testnet) {
            (true, false) => TAG_BOUNCEABLE,
            (false, false) => TAG_NON_BOUNCEABLE,
            (true, true) => TAG_BOUNCEABLE | TAG_TESTNET,
            (false, true) => TAG_NON_BOUNCEABLE | TAG_TESTNET,
        };

        let mut bytes = [0u8; FRIENDLY_BYTES];
        bytes[0] = tag;
        bytes[1] = *workchain as i8 as u8;
        bytes[2..34].copy_from_slice(address);
        let crc = crc16_xmodem(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());

        Some(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            _ => None,
        }
    }

    /// The 256-bit account id of an internal address.
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == MsgAddress::Null
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, MsgAddress::Internal { .. })
    }
}

impl FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> CellResult<Self> {
        Self::from_string(s)
    }
}

impl fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw_string())
    }
}

fn parse_raw(workchain: &str, account: &str) -> CellResult<MsgAddress> {
    let workchain = workchain
        .parse::<i32>()
        .map_err(|_| CellError::InvalidAddress(format!("bad workchain '{}'", workchain)))?;
    let bytes = hex::decode(account).map_err(|e| CellError::InvalidHex(e.to_string()))?;
    let address = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        CellError::InvalidAddress(format!("account id is {} bytes, need 32", bytes.len()))
    })?;
    Ok(MsgAddress::Internal { workchain, address })
}

fn parse_friendly(text: &str) -> CellResult<MsgAddress> {
    let standard = text.replace('-', "+").replace('_', "/");
    let bytes = STANDARD
        .decode(standard)
        .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
    let bytes = <[u8; FRIENDLY_BYTES]>::try_from(bytes.as_slice()).map_err(|_| {
        CellError::InvalidAddress(format!("decoded {} bytes, need {}", bytes.len(), FRIENDLY_BYTES))
    })?;

    let stored = u16::from_be_bytes([bytes[34], bytes[35]]);
    let computed = crc16_xmodem(&bytes[..34]);
    if stored != computed {
        return Err(CellError::InvalidAddress(format!(
            "checksum {:04x} does not match {:04x}",
            stored, computed
        )));
    }

    if !matches!(bytes[0] & !TAG_TESTNET, TAG_BOUNCEABLE | TAG_NON_BOUNCEABLE) {
        return Err(CellError::InvalidAddress(format!(
            "unknown tag {:#04x}",
            bytes[0]
        )));
    }

    let mut address = [0u8; 32];
    address.copy_from_slice(&bytes[2..34]);
    Ok(MsgAddress::Internal {
        workchain: i32::from(bytes[1] as i8),
        address,
    })
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    const XMODEM: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    XMODEM.checksum(data)
}
