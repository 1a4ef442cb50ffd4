//! # ton-jetton-minter
//!
//! Deployment and administration toolkit for TEP-74 jetton minters.
//!
//! The core is the on-chain metadata encoder: a set of named fields becomes
//! the content tree stored in the minter's initial data. Around it the crate
//! provides the minter's initial data and StateInit, address derivation,
//! message bodies and a contract wrapper that talks to the ledger through a
//! [`ContractProvider`].
//!
//! ## Content tree
//!
//! ```text
//! root cell:   0x00 | HashmapE 256 (sha256(field name) -> ^snake chain)
//! snake chain: 0x00 | up to 126 bytes | ^next (126 bytes per cell after that)
//! ```
//!
//! Supported fields are `name`, `description`, `image`, `decimals`, `symbol`
//! and `uri`. `image` and `uri` are stored one byte per character, the rest
//! as UTF-8.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ton_cell::{Cell, MsgAddress};
//! use ton_jetton_minter::{JettonConfig, JettonMinter, MockProvider};
//!
//! let owner = MsgAddress::Internal { workchain: 0, address: [0x11; 32] };
//! let mut config = JettonConfig::new(owner.clone());
//! config.name = Some("Example".to_string());
//! config.symbol = Some("EXM".to_string());
//!
//! let code = Arc::new(Cell::empty());
//! let minter = JettonMinter::create_from_config(&config, code.clone(), code, 0).unwrap();
//!
//! let provider = MockProvider::new();
//! minter.send_deploy(&provider, 50_000_000).unwrap();
//! minter.send_mint(&provider, &owner, 1_000_000_000).unwrap();
//! assert_eq!(provider.sent_messages().len(), 2);
//! ```
//!
//! ## References
//!
//! - [TEP-74: Fungible tokens (Jettons) standard](https://github.com/ton-blockchain/TEPs/blob/master/text/0074-jettons-standard.md)
//! - [TEP-64: Token Data Standard](https://github.com/ton-blockchain/TEPs/blob/master/text/0064-token-data-standard.md)

pub mod config;
pub mod contract;
pub mod error;
pub mod messages;
pub mod metadata;
pub mod provider;
pub mod state;
pub mod types;

// Re-export main types
pub use config::{ContractCode, ContractCodes, JettonConfig};
pub use contract::{JettonMinter, MINT_FORWARD_TON, MINT_MESSAGE_VALUE};
pub use error::{JettonError, JettonResult};
pub use messages::{
    SendMode, burn_body, comment_body, deploy_body, internal_transfer_body, mint_body,
    mint_with_transfer_body, transfer_body,
};
pub use metadata::{
    FieldEncoding, MetadataField, OnChainMetadata, build_snake_chain, build_token_metadata_cell,
    parse_token_metadata_cell, read_snake_chain,
};
pub use provider::{
    ContractProvider, GetMethodCall, GetMethodResult, InternalMessage, MockProvider, StackEntry,
};
pub use state::{StateInit, jetton_minter_init_data};
pub use types::JettonData;

// Re-export operation codes
pub use messages::opcodes::{
    OP_BURN, OP_BURN_NOTIFICATION, OP_CLAIM_REWARDS, OP_CLAIM_REWARDS_NOTIFICATION, OP_EXCESSES,
    OP_INTERNAL_TRANSFER, OP_MINT, OP_TRANSFER, OP_TRANSFER_NOTIFICATION,
};

/// Creates a jetton transfer body with a random query id.
///
/// `comment`, if given, becomes a text comment forward payload.
///
/// # Example
///
/// ```rust
/// use ton_cell::MsgAddress;
/// use ton_jetton_minter::transfer_jetton_body;
///
/// let response = MsgAddress::Internal { workchain: 0, address: [0x12; 32] };
/// let to = MsgAddress::Internal { workchain: 0, address: [0x34; 32] };
///
/// let body = transfer_jetton_body(
///     &response,
///     &to,
///     1_000_000_000,      // 1 token (9 decimals)
///     50_000_000,         // 0.05 TON forward
///     Some("Payment"),
/// ).unwrap();
/// assert_eq!(body.reference_count(), 1);
/// ```
pub fn transfer_jetton_body(
    response_destination: &ton_cell::MsgAddress,
    to: &ton_cell::MsgAddress,
    amount: u128,
    forward_ton: u128,
    comment: Option<&str>,
) -> JettonResult<ton_cell::Cell> {
    let forward_payload = comment
        .map(|c| comment_body(c).map(std::sync::Arc::new))
        .transpose()?;

    transfer_body(
        rand::random(), // query_id
        amount,
        to,
        response_destination,
        None, // custom_payload
        forward_ton,
        forward_payload,
    )
}

/// Creates a burn body with a random query id.
pub fn burn_jetton_body(
    response_destination: &ton_cell::MsgAddress,
    amount: u128,
) -> JettonResult<ton_cell::Cell> {
    burn_body(
        rand::random(), // query_id
        amount,
        response_destination,
        None, // custom_payload
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::{CellSlice, MsgAddress};

    #[test]
    fn test_transfer_jetton_body() {
        let response = MsgAddress::Internal {
            workchain: 0,
            address: [0x12; 32],
        };
        let to = MsgAddress::Internal {
            workchain: 0,
            address: [0x34; 32],
        };

        let body =
            transfer_jetton_body(&response, &to, 1_000_000_000, 50_000_000, Some("Test")).unwrap();

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), OP_TRANSFER);
        slice.load_u64().unwrap();
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
        assert_eq!(slice.load_address().unwrap(), to);
        assert_eq!(slice.load_address().unwrap(), response);
        assert!(slice.load_maybe_ref().unwrap().is_none());
        assert_eq!(slice.load_coins().unwrap(), 50_000_000);

        let payload = slice.load_maybe_ref().unwrap().unwrap();
        let mut comment = CellSlice::new(payload);
        assert_eq!(comment.load_u32().unwrap(), 0);
        assert_eq!(comment.load_remaining_bytes().unwrap(), b"Test");
    }

    #[test]
    fn test_transfer_jetton_body_no_comment() {
        let response = MsgAddress::Internal {
            workchain: 0,
            address: [0x56; 32],
        };
        let to = MsgAddress::Internal {
            workchain: 0,
            address: [0x78; 32],
        };

        let body = transfer_jetton_body(&response, &to, 500_000_000, 0, None).unwrap();

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), OP_TRANSFER);
        assert_eq!(body.reference_count(), 0);
    }

    #[test]
    fn test_burn_jetton_body() {
        let response = MsgAddress::Internal {
            workchain: 0,
            address: [0x9A; 32],
        };

        let body = burn_jetton_body(&response, 1_000).unwrap();

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), OP_BURN);
        slice.load_u64().unwrap();
        assert_eq!(slice.load_coins().unwrap(), 1_000);
        assert_eq!(slice.load_address().unwrap(), response);
    }
}
