//! Boundary to the SmartThings device SDK.
//!
//! The SDK owns the connection, the capability registry and the command
//! dispatch loop. This module only describes the calls the capability
//! adapters make into it ([`StBoundary`]) and the values that cross it.
//!
//! Handles are plain ids issued by the SDK. Adapters keep a copy of the id,
//! they never own the registration itself.

pub mod loopback;

pub use loopback::LoopbackSdk;

use crate::error::{CapsError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Opaque capability handle issued by [`StBoundary::register_handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CapHandle(pub u32);

impl fmt::Display for CapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequence number returned by a successful attribute send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SequenceNumber(pub i32);

/// Called by the SDK once the capability is ready on the cloud side.
pub type InitCallback = Arc<dyn Fn(CapHandle) + Send + Sync>;

/// Called by the SDK dispatch loop when a command arrives for a handle.
pub type CommandCallback = Arc<dyn Fn(CapHandle, &CommandData) -> Result<()> + Send + Sync>;

/// Calls made from the capability adapters into the device SDK.
///
/// Status codes are kept as the SDK reports them. The adapters turn them
/// into [`CapsError`] values.
pub trait StBoundary: Send + Sync {
    /// Register a capability instance on `component`.
    ///
    /// Returns `None` when the SDK refuses the registration. `init_cb` may
    /// run before this returns; it receives the same handle.
    fn register_handle(
        &self,
        component: &str,
        capability_id: &str,
        init_cb: InitCallback,
    ) -> Option<CapHandle>;

    /// Attach a command callback to a handle. Returns 0 on success.
    fn register_command(&self, handle: CapHandle, command: &str, cb: CommandCallback) -> i32;

    /// Submit attribute events for transmission.
    ///
    /// Returns the sequence number of the message, negative on failure.
    fn send_attributes(&self, handle: CapHandle, events: &[AttrEvent]) -> i32;

    /// Bring the device connection up. The SDK runs the init callback of
    /// every registered handle once the cloud side is ready.
    fn start(&self) {}

    /// Drop a registration. Called when the owning device shuts down.
    fn release_handle(&self, _handle: CapHandle) {}
}

/// Device context: the SDK connection all capabilities of a device share.
#[derive(Clone)]
pub struct DeviceContext {
    sdk: Arc<dyn StBoundary>,
}

impl DeviceContext {
    pub fn new(sdk: Arc<dyn StBoundary>) -> Self {
        Self { sdk }
    }

    pub fn sdk(&self) -> &Arc<dyn StBoundary> {
        &self.sdk
    }
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext").finish_non_exhaustive()
    }
}

/// One positional command argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CmdArg {
    Integer(i64),
    Number(f64),
    String(String),
}

impl CmdArg {
    fn kind(&self) -> &'static str {
        match self {
            CmdArg::Integer(_) => "integer",
            CmdArg::Number(_) => "number",
            CmdArg::String(_) => "string",
        }
    }
}

/// Arguments of an incoming command.
///
/// Accessors check both the index and the argument type, so a malformed
/// command fails with [`CapsError::InvalidArgument`] instead of reading
/// past the supplied arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandData {
    command: String,
    args: Vec<CmdArg>,
}

impl CommandData {
    pub fn new(command: impl Into<String>, args: Vec<CmdArg>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[CmdArg] {
        &self.args
    }

    fn arg(&self, index: usize) -> Result<&CmdArg> {
        self.args.get(index).ok_or_else(|| CapsError::InvalidArgument {
            command: self.command.clone(),
            index,
            reason: format!("only {} argument(s) supplied", self.args.len()),
        })
    }

    fn mismatch(&self, index: usize, expected: &str, found: &CmdArg) -> CapsError {
        CapsError::InvalidArgument {
            command: self.command.clone(),
            index,
            reason: format!("expected {}, found {}", expected, found.kind()),
        }
    }

    /// Integer argument at `index`, range-checked into `i32`.
    pub fn integer(&self, index: usize) -> Result<i32> {
        match self.arg(index)? {
            CmdArg::Integer(v) => i32::try_from(*v).map_err(|_| CapsError::InvalidArgument {
                command: self.command.clone(),
                index,
                reason: format!("{} does not fit in i32", v),
            }),
            other => Err(self.mismatch(index, "integer", other)),
        }
    }

    /// Numeric argument at `index`. Integers are widened.
    pub fn number(&self, index: usize) -> Result<f64> {
        match self.arg(index)? {
            CmdArg::Number(v) => Ok(*v),
            CmdArg::Integer(v) => Ok(*v as f64),
            other => Err(self.mismatch(index, "number", other)),
        }
    }

    pub fn string(&self, index: usize) -> Result<&str> {
        match self.arg(index)? {
            CmdArg::String(v) => Ok(v),
            other => Err(self.mismatch(index, "string", other)),
        }
    }
}

/// Value carried by an attribute event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i32),
    Number(f64),
    String(String),
}

/// A single attribute update submitted through [`StBoundary::send_attributes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttrEvent {
    pub name: String,
    pub value: AttrValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AttrEvent {
    pub fn integer(name: &str, value: i32, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: AttrValue::Integer(value),
            unit: unit.map(str::to_string),
        }
    }

    pub fn number(name: &str, value: f64, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: AttrValue::Number(value),
            unit: unit.map(str::to_string),
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: AttrValue::String(value.to_string()),
            unit: None,
        }
    }

    /// JSON payload as it goes on the wire.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
