//! Get-method result types.

use std::sync::Arc;

use ton_cell::{Cell, MsgAddress};

use crate::error::JettonResult;
use crate::metadata::{OnChainMetadata, parse_token_metadata_cell};

/// Data returned by the `get_jetton_data` get method.
///
/// Contracts that only return the first three stack entries leave
/// `content` and `wallet_code` unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JettonData {
    /// Total supply of tokens (in smallest units).
    pub total_supply: u128,
    /// Whether new tokens can be minted.
    pub mintable: bool,
    /// Address of the admin/owner of the Jetton.
    pub admin_address: MsgAddress,
    /// Content root cell.
    pub content: Option<Arc<Cell>>,
    /// Code of the Jetton Wallet contract.
    pub wallet_code: Option<Arc<Cell>>,
}

impl JettonData {
    /// Decodes `content` as on-chain metadata, if present.
    pub fn metadata(&self) -> JettonResult<Option<OnChainMetadata>> {
        self.content
            .as_deref()
            .map(parse_token_metadata_cell)
            .transpose()
    }
}
