//! The active-core collaborator seam.
//!
//! The FPGA core currently loaded decides what non-filesystem opcodes mean.
//! The interpreter holds the current handler as a swappable strategy object;
//! LOADFPGA replaces it atomically through a [`CoreLoader`].

use aqlink_types::VfsResult;
use async_trait::async_trait;

/// Reply from the core handler for an opcode the interpreter doesn't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreReply {
    /// Not this core's command. The frame is logged and dropped.
    Unrecognized,
    /// Handled; the command is complete.
    Done,
    /// Recognized, but more payload bytes are needed — keep accumulating.
    NeedMore,
}

/// Snapshot of one game controller, as returned to the GETGAMECTRL command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamePadData {
    pub lx: i8,
    pub ly: i8,
    pub rx: i8,
    pub ry: i8,
    pub lt: u8,
    pub rt: u8,
    pub buttons: u16,
}

/// The active FPGA core's command handler.
pub trait CoreHandler: Send {
    /// Handle an opcode the interpreter doesn't recognize. `payload` is
    /// everything accumulated after the opcode byte so far.
    fn command(&mut self, opcode: u8, payload: &[u8]) -> CoreReply;

    /// Input-device snapshot for controller `index`, if one is attached.
    fn gamepad(&mut self, index: u8) -> Option<GamePadData>;

    /// Notification of a protocol-level RESET.
    fn reset(&mut self) {}
}

/// Replaces the active core from a bitstream image.
#[async_trait]
pub trait CoreLoader: Send + Sync {
    /// Program the FPGA with `bitstream` and return the handler for the new
    /// core. On error the previously active core stays in place.
    async fn load(&self, bitstream: &[u8]) -> VfsResult<Box<dyn CoreHandler>>;
}

/// Default handler: no core-specific commands, no input devices.
#[derive(Debug, Default)]
pub struct NullCore;

impl CoreHandler for NullCore {
    fn command(&mut self, _opcode: u8, _payload: &[u8]) -> CoreReply {
        CoreReply::Unrecognized
    }

    fn gamepad(&mut self, _index: u8) -> Option<GamePadData> {
        None
    }
}
