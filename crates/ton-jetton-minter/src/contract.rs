//! Jetton minter contract wrapper.
//!
//! [`JettonMinter`] knows the minter's address and, for a contract that is
//! not deployed yet, its StateInit. All ledger access goes through a
//! [`ContractProvider`].

use std::sync::Arc;

use tracing::debug;
use ton_cell::{Cell, CellSlice, MsgAddress};

use crate::config::JettonConfig;
use crate::error::{JettonError, JettonResult};
use crate::messages::{OP_MINT, SendMode, deploy_body, mint_with_transfer_body};
use crate::provider::{ContractProvider, InternalMessage, StackEntry};
use crate::state::{StateInit, jetton_minter_init_data};
use crate::types::JettonData;

/// TON attached to a mint message (0.05 TON).
pub const MINT_MESSAGE_VALUE: u128 = 50_000_000;

/// TON the minter forwards to the recipient's wallet on mint (0.02 TON).
pub const MINT_FORWARD_TON: u128 = 20_000_000;

/// Stack entries `get_jetton_data` must return at minimum.
const JETTON_DATA_MIN_ENTRIES: usize = 3;

/// A jetton minter contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JettonMinter {
    address: MsgAddress,
    init: Option<StateInit>,
}

impl JettonMinter {
    /// Wraps an already deployed minter.
    pub fn create_from_address(address: MsgAddress) -> Self {
        Self {
            address,
            init: None,
        }
    }

    /// Prepares a new minter from `config`.
    ///
    /// The initial data holds zero supply, the owner, the metadata content
    /// tree and `wallet_code`. The address is derived from the resulting
    /// StateInit in `workchain`.
    pub fn create_from_config(
        config: &JettonConfig,
        code: Arc<Cell>,
        wallet_code: Arc<Cell>,
        workchain: i32,
    ) -> JettonResult<Self> {
        let metadata = config.metadata();
        let fields = metadata
            .fields()
            .map(|(field, value)| (field.as_str(), value));
        let data = jetton_minter_init_data(&config.owner, fields, wallet_code)?;

        let init = StateInit::new(code, Arc::new(data));
        let address = init.address(workchain)?;
        debug!(%address, owner = %config.owner, "prepared jetton minter");

        Ok(Self {
            address,
            init: Some(init),
        })
    }

    /// Minter address.
    pub fn address(&self) -> &MsgAddress {
        &self.address
    }

    /// StateInit, known only for minters created from a config.
    pub fn init(&self) -> Option<&StateInit> {
        self.init.as_ref()
    }

    /// Sends the deploy message: an empty body with the StateInit attached.
    pub fn send_deploy<P: ContractProvider>(&self, provider: &P, value: u128) -> JettonResult<()> {
        debug!(address = %self.address, value, "deploying jetton minter");
        provider.send_internal(InternalMessage {
            to: self.address.clone(),
            value,
            bounce: true,
            send_mode: SendMode::PAY_GAS_SEPARATELY,
            body: Arc::new(deploy_body()),
            state_init: self.init.clone(),
        })
    }

    /// Asks the minter to mint `amount` jettons to `to`.
    ///
    /// Sends [`MINT_MESSAGE_VALUE`] with a mint body forwarding
    /// [`MINT_FORWARD_TON`] to the recipient's wallet.
    pub fn send_mint<P: ContractProvider>(
        &self,
        provider: &P,
        to: &MsgAddress,
        amount: u128,
    ) -> JettonResult<()> {
        let body = mint_with_transfer_body(0, to, MINT_FORWARD_TON, amount)?;
        debug!(
            op = OP_MINT,
            value = MINT_MESSAGE_VALUE,
            %to,
            amount,
            "sending mint"
        );

        provider.send_internal(InternalMessage {
            to: self.address.clone(),
            value: MINT_MESSAGE_VALUE,
            bounce: true,
            send_mode: SendMode::PAY_GAS_SEPARATELY,
            body: Arc::new(body),
            state_init: None,
        })
    }

    /// Calls the `get_jetton_data` get method.
    ///
    /// The first three entries (total supply, mintable flag, admin) are
    /// required. Content and wallet code are read when the contract
    /// returns them.
    pub fn get_jetton_data<P: ContractProvider>(&self, provider: &P) -> JettonResult<JettonData> {
        debug!(address = %self.address, method = "get_jetton_data", "running get method");
        let stack = provider
            .run_get_method(&self.address, "get_jetton_data", &[])?
            .into_stack(JETTON_DATA_MIN_ENTRIES)?;

        Ok(JettonData {
            total_supply: extract_u128(&stack[0])?,
            mintable: extract_bool(&stack[1])?,
            admin_address: extract_address(&stack[2])?,
            content: stack.get(3).map(extract_cell).transpose()?,
            wallet_code: stack.get(4).map(extract_cell).transpose()?,
        })
    }

    /// Calls the `get_wallet_address` get method for `owner`.
    pub fn get_wallet_address<P: ContractProvider>(
        &self,
        provider: &P,
        owner: &MsgAddress,
    ) -> JettonResult<MsgAddress> {
        debug!(address = %self.address, method = "get_wallet_address", %owner, "running get method");
        let args = [StackEntry::address_slice(owner)?];
        let stack = provider
            .run_get_method(&self.address, "get_wallet_address", &args)?
            .into_stack(1)?;

        extract_address(&stack[0])
    }
}

/// Extracts a non-negative integer.
fn extract_u128(entry: &StackEntry) -> JettonResult<u128> {
    match entry {
        StackEntry::Int(n) => u128::try_from(*n).map_err(|_| JettonError::InvalidStackEntry {
            expected: "non-negative integer",
            actual: entry.to_string(),
        }),
        _ => Err(JettonError::InvalidStackEntry {
            expected: "integer",
            actual: entry.to_string(),
        }),
    }
}

/// Extracts an integer flag (-1 = true, 0 = false).
fn extract_bool(entry: &StackEntry) -> JettonResult<bool> {
    match entry {
        StackEntry::Int(n) => Ok(*n != 0),
        _ => Err(JettonError::InvalidStackEntry {
            expected: "integer (bool)",
            actual: entry.to_string(),
        }),
    }
}

/// Extracts an address from a slice or cell entry.
fn extract_address(entry: &StackEntry) -> JettonResult<MsgAddress> {
    match entry {
        StackEntry::Slice(cell) | StackEntry::Cell(cell) => {
            Ok(CellSlice::new(cell).load_address()?)
        }
        // Some contracts return addr_none as null
        StackEntry::Null => Ok(MsgAddress::Null),
        StackEntry::Int(_) => Err(JettonError::InvalidStackEntry {
            expected: "slice",
            actual: entry.to_string(),
        }),
    }
}

fn extract_cell(entry: &StackEntry) -> JettonResult<Arc<Cell>> {
    match entry {
        StackEntry::Cell(cell) => Ok(cell.clone()),
        _ => Err(JettonError::InvalidStackEntry {
            expected: "cell",
            actual: entry.to_string(),
        }),
    }
}
