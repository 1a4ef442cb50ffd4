//! Jetton operation codes, send modes and message bodies.

use std::ops::BitOr;
use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MAX_CELL_BITS, MsgAddress};

use crate::error::JettonResult;

/// Jetton operation codes.
pub mod opcodes {
    /// Transfer tokens to another address.
    pub const OP_TRANSFER: u32 = 0x0f8a7ea5;

    /// Notification of incoming transfer.
    pub const OP_TRANSFER_NOTIFICATION: u32 = 0x7362d09c;

    /// Internal transfer between wallets (also sent by the minter on mint).
    pub const OP_INTERNAL_TRANSFER: u32 = 0x178d4519;

    /// Return excess TON after operation.
    pub const OP_EXCESSES: u32 = 0xd53276db;

    /// Burn tokens.
    pub const OP_BURN: u32 = 0x595f07bc;

    /// Notification of burned tokens.
    pub const OP_BURN_NOTIFICATION: u32 = 0x7bdd97de;

    /// Claim accumulated rewards.
    pub const OP_CLAIM_REWARDS: u32 = 0x05a3e000;

    /// Notification of claimed rewards.
    pub const OP_CLAIM_REWARDS_NOTIFICATION: u32 = 0x05a3e001;

    /// Mint new tokens (admin only).
    pub const OP_MINT: u32 = 0x642b7d07;
}

pub use opcodes::*;

/// Outbound message send mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendMode(pub u8);

impl SendMode {
    pub const ORDINARY: SendMode = SendMode(0);
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const CARRY_REMAINING_VALUE: SendMode = SendMode(64);
    pub const CARRY_ALL_BALANCE: SendMode = SendMode(128);

    /// Raw mode byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every flag of `other` is set.
    pub fn contains(self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        SendMode(self.0 | rhs.0)
    }
}

/// Creates a plain mint body.
///
/// ```text
/// mint#642b7d07 query_id:uint64 to:MsgAddress amount:Coins
/// ```
///
/// Query ID is always zero.
pub fn mint_body(to: &MsgAddress, jetton_amount: u128) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_MINT)?;
    builder.store_u64(0)?;
    builder.store_address(to)?;
    builder.store_coins(jetton_amount)?;
    Ok(builder.build()?)
}

/// Creates a mint body that carries the internal transfer the minter
/// forwards to the recipient's wallet.
///
/// ```text
/// mint#642b7d07 query_id:uint64 to:MsgAddress forward_ton:Coins
///   master_msg:^InternalTransfer
/// ```
///
/// The inner transfer has no sender, no response destination, no forwarded
/// TON and an empty forward payload.
pub fn mint_with_transfer_body(
    query_id: u64,
    to: &MsgAddress,
    forward_ton: u128,
    jetton_amount: u128,
) -> JettonResult<Cell> {
    let transfer = internal_transfer_body(
        query_id,
        jetton_amount,
        &MsgAddress::Null,
        &MsgAddress::Null,
        0,
        None,
    )?;

    let mut builder = CellBuilder::new();
    builder.store_u32(OP_MINT)?;
    builder.store_u64(query_id)?;
    builder.store_address(to)?;
    builder.store_coins(forward_ton)?;
    builder.store_ref(Arc::new(transfer))?;
    Ok(builder.build()?)
}

/// Creates an internal transfer body.
///
/// ```text
/// internal_transfer#178d4519 query_id:uint64 amount:Coins from:MsgAddress
///   response_address:MsgAddress forward_ton_amount:Coins
///   forward_payload:(Either Cell ^Cell)
/// ```
///
/// A missing forward payload is written inline as an empty cell (bit 0).
pub fn internal_transfer_body(
    query_id: u64,
    amount: u128,
    from: &MsgAddress,
    response_address: &MsgAddress,
    forward_ton_amount: u128,
    forward_payload: Option<Arc<Cell>>,
) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_INTERNAL_TRANSFER)?;
    builder.store_u64(query_id)?;
    builder.store_coins(amount)?;
    builder.store_address(from)?;
    builder.store_address(response_address)?;
    builder.store_coins(forward_ton_amount)?;
    builder.store_maybe_ref(forward_payload)?;
    Ok(builder.build()?)
}

/// Creates a transfer body for a jetton wallet.
///
/// # Message Format
///
/// ```text
/// transfer#0f8a7ea5
///   query_id:uint64
///   amount:(VarUInteger 16)
///   destination:MsgAddress
///   response_destination:MsgAddress
///   custom_payload:(Maybe ^Cell)
///   forward_ton_amount:(VarUInteger 16)
///   forward_payload:(Either Cell ^Cell)
/// ```
pub fn transfer_body(
    query_id: u64,
    amount: u128,
    destination: &MsgAddress,
    response_destination: &MsgAddress,
    custom_payload: Option<Arc<Cell>>,
    forward_ton_amount: u128,
    forward_payload: Option<Arc<Cell>>,
) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_TRANSFER)?;
    builder.store_u64(query_id)?;
    builder.store_coins(amount)?;
    builder.store_address(destination)?;
    builder.store_address(response_destination)?;
    builder.store_maybe_ref(custom_payload)?;
    builder.store_coins(forward_ton_amount)?;
    builder.store_maybe_ref(forward_payload)?;
    Ok(builder.build()?)
}

/// Creates a burn body for a jetton wallet.
///
/// ```text
/// burn#595f07bc query_id:uint64 amount:(VarUInteger 16)
///   response_destination:MsgAddress custom_payload:(Maybe ^Cell)
/// ```
pub fn burn_body(
    query_id: u64,
    amount: u128,
    response_destination: &MsgAddress,
    custom_payload: Option<Arc<Cell>>,
) -> JettonResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(OP_BURN)?;
    builder.store_u64(query_id)?;
    builder.store_coins(amount)?;
    builder.store_address(response_destination)?;
    builder.store_maybe_ref(custom_payload)?;
    Ok(builder.build()?)
}

/// Creates a text comment cell for use as a forward payload.
///
/// ```text
/// text_comment#00000000 text:SnakeString = Comment;
/// ```
///
/// Text that does not fit after the 32-bit prefix continues in a chain of
/// referenced cells.
pub fn comment_body(comment: &str) -> JettonResult<Cell> {
    const HEAD_BYTES: usize = (MAX_CELL_BITS - 32) / 8;
    const TAIL_BYTES: usize = MAX_CELL_BITS / 8;

    let bytes = comment.as_bytes();
    let (head, rest) = bytes.split_at(bytes.len().min(HEAD_BYTES));

    let tail = rest
        .chunks(TAIL_BYTES)
        .rev()
        .try_fold(None, |next: Option<Arc<Cell>>, chunk| {
            let mut builder = CellBuilder::new();
            builder.store_bytes(chunk)?;
            if let Some(next) = next {
                builder.store_ref(next)?;
            }
            builder.build().map(|cell| Some(Arc::new(cell)))
        })?;

    let mut builder = CellBuilder::new();
    builder.store_u32(0)?;
    builder.store_bytes(head)?;
    if let Some(tail) = tail {
        builder.store_ref(tail)?;
    }
    Ok(builder.build()?)
}

/// Body of the deploy message: an empty cell.
pub fn deploy_body() -> Cell {
    Cell::empty()
}
