//! Minter initial data, StateInit and address derivation.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::error::JettonResult;
use crate::metadata::build_token_metadata_cell;

/// Code and data a contract is deployed with.
///
/// ```text
/// _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell)
///   library:(HashmapE 256 SimpleLib) = StateInit;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    /// Contract code.
    pub code: Arc<Cell>,
    /// Initial persistent data.
    pub data: Arc<Cell>,
}

impl StateInit {
    /// Creates a new StateInit.
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self { code, data }
    }

    /// Serializes to a StateInit cell without split depth, special flags
    /// or libraries.
    pub fn to_cell(&self) -> JettonResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bit(false)?;
        builder.store_bit(false)?;
        builder.store_maybe_ref(Some(self.code.clone()))?;
        builder.store_maybe_ref(Some(self.data.clone()))?;
        builder.store_bit(false)?;
        Ok(builder.build()?)
    }

    /// The address a contract deployed with this StateInit gets.
    pub fn address(&self, workchain: i32) -> JettonResult<MsgAddress> {
        Ok(MsgAddress::Internal {
            workchain,
            address: self.to_cell()?.hash(),
        })
    }
}

/// Build the minter's initial data cell.
///
/// ```text
/// total_supply:Coins admin_address:MsgAddress
///   content:^Cell jetton_wallet_code:^Cell = MinterData;
/// ```
///
/// Total supply starts at zero. `metadata_fields` is passed to
/// [`build_token_metadata_cell`], so unsupported field names fail here too.
pub fn jetton_minter_init_data<I, K, V>(
    owner: &MsgAddress,
    metadata_fields: I,
    wallet_code: Arc<Cell>,
) -> JettonResult<Cell>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let content = build_token_metadata_cell(metadata_fields)?;

    let mut builder = CellBuilder::new();
    builder.store_coins(0)?;
    builder.store_address(owner)?;
    builder.store_ref(Arc::new(content))?;
    builder.store_ref(wallet_code)?;
    Ok(builder.build()?)
}
