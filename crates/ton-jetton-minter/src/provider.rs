//! Contract provider seam: get-method calls and outbound internal messages.
//!
//! The library never talks to the network itself. A [`ContractProvider`]
//! runs get methods against some ledger view and delivers internal
//! messages; [`MockProvider`] does both in memory for tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;
use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::error::{JettonError, JettonResult};
use crate::messages::SendMode;
use crate::state::StateInit;

/// A TVM stack value as exchanged with get methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Null,
    Int(i128),
    Cell(Arc<Cell>),
    /// A slice covering the whole referenced cell.
    Slice(Arc<Cell>),
}

impl StackEntry {
    /// Short name of the entry kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StackEntry::Null => "null",
            StackEntry::Int(_) => "int",
            StackEntry::Cell(_) => "cell",
            StackEntry::Slice(_) => "slice",
        }
    }

    /// A slice entry holding just `address`.
    pub fn address_slice(address: &MsgAddress) -> JettonResult<Self> {
        let mut builder = CellBuilder::new();
        builder.store_address(address)?;
        Ok(StackEntry::Slice(Arc::new(builder.build()?)))
    }
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEntry::Int(n) => write!(f, "int {}", n),
            StackEntry::Cell(c) | StackEntry::Slice(c) => {
                write!(f, "{} {}", self.kind(), hex::encode(c.hash()))
            }
            StackEntry::Null => f.write_str("null"),
        }
    }
}

/// Outcome of a get-method call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetMethodResult {
    /// TVM exit code; 0 and 1 mean success.
    pub exit_code: i32,
    /// Result stack, bottom first.
    pub stack: Vec<StackEntry>,
}

impl GetMethodResult {
    /// A successful result with the given stack.
    pub fn success(stack: Vec<StackEntry>) -> Self {
        Self {
            exit_code: 0,
            stack,
        }
    }

    /// A failed result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code,
            stack: Vec::new(),
        }
    }

    /// Returns the stack if the call succeeded.
    pub fn into_stack(self, expected: usize) -> JettonResult<Vec<StackEntry>> {
        if self.exit_code != 0 && self.exit_code != 1 {
            return Err(JettonError::GetMethodFailed(self.exit_code));
        }
        if self.stack.len() < expected {
            return Err(JettonError::StackUnderflow {
                expected,
                actual: self.stack.len(),
            });
        }
        Ok(self.stack)
    }
}

/// An internal message to be delivered to a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    /// Destination contract.
    pub to: MsgAddress,
    /// Attached value in nanotons.
    pub value: u128,
    /// Bounce flag.
    pub bounce: bool,
    /// Send mode used by the sending wallet.
    pub send_mode: SendMode,
    /// Message body.
    pub body: Arc<Cell>,
    /// StateInit to deploy the destination with, if any.
    pub state_init: Option<StateInit>,
}

impl InternalMessage {
    /// Build the message cell as a wallet would attach it to an outbound
    /// action. Source, fees and timestamps are left for the sender to fill.
    pub fn to_cell(&self) -> JettonResult<Cell> {
        let mut builder = CellBuilder::new();

        // int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
        builder.store_bit(false)?;
        builder.store_bit(true)?;
        builder.store_bit(self.bounce)?;
        builder.store_bit(false)?;

        builder.store_address(&MsgAddress::Null)?;
        builder.store_address(&self.to)?;
        builder.store_coins(self.value)?;
        builder.store_bit(false)?; // no extra currencies
        builder.store_coins(0)?; // ihr_fee
        builder.store_coins(0)?; // fwd_fee
        builder.store_u64(0)?;
        builder.store_u32(0)?;

        // init:(Maybe (Either StateInit ^StateInit))
        match &self.state_init {
            Some(init) => {
                builder.store_bit(true)?;
                builder.store_bit(true)?;
                builder.store_ref(Arc::new(init.to_cell()?))?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }

        // body:(Either X ^X), always as a reference
        builder.store_bit(true)?;
        builder.store_ref(self.body.clone())?;

        Ok(builder.build()?)
    }
}

/// Request/response access to contracts on the ledger.
pub trait ContractProvider {
    /// Run a get method on `address`.
    fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackEntry],
    ) -> JettonResult<GetMethodResult>;

    /// Deliver an internal message.
    fn send_internal(&self, message: InternalMessage) -> JettonResult<()>;
}

impl<P: ContractProvider + ?Sized> ContractProvider for &P {
    fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackEntry],
    ) -> JettonResult<GetMethodResult> {
        (**self).run_get_method(address, method, args)
    }

    fn send_internal(&self, message: InternalMessage) -> JettonResult<()> {
        (**self).send_internal(message)
    }
}

/// A recorded get-method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodCall {
    pub address: MsgAddress,
    pub method: String,
    pub args: Vec<StackEntry>,
}

/// In-memory provider for tests.
///
/// Get methods are answered from canned results keyed by method name;
/// sent messages and get-method calls are recorded.
#[derive(Debug, Default)]
pub struct MockProvider {
    results: HashMap<String, GetMethodResult>,
    sent: Mutex<Vec<InternalMessage>>,
    calls: Mutex<Vec<GetMethodCall>>,
}

impl MockProvider {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result returned for `method`.
    pub fn set_result(&mut self, method: impl Into<String>, result: GetMethodResult) {
        self.results.insert(method.into(), result);
    }

    /// Builder-style variant of [`MockProvider::set_result`].
    pub fn with_result(mut self, method: impl Into<String>, result: GetMethodResult) -> Self {
        self.set_result(method, result);
        self
    }

    /// Messages sent so far, oldest first.
    pub fn sent_messages(&self) -> Vec<InternalMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get-method calls made so far, oldest first.
    pub fn get_method_calls(&self) -> Vec<GetMethodCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ContractProvider for MockProvider {
    fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackEntry],
    ) -> JettonResult<GetMethodResult> {
        trace!(%address, method, "mock get method");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(GetMethodCall {
                address: address.clone(),
                method: method.to_string(),
                args: args.to_vec(),
            });

        self.results
            .get(method)
            .cloned()
            .ok_or_else(|| JettonError::Provider(format!("no mock result for {}", method)))
    }

    fn send_internal(&self, message: InternalMessage) -> JettonResult<()> {
        trace!(to = %message.to, value = message.value, "mock send");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
