//! Serial protocol stack: frame transport, command interpreter, and the
//! seams (core handler, bitstream loader, MIDI queue) the interpreter
//! delegates through.

mod core;
mod interpreter;
mod midi;
mod transport;

pub use self::core::{CoreHandler, CoreLoader, CoreReply, GamePadData, NullCore};
pub use interpreter::CommandInterpreter;
pub use midi::MidiQueue;
pub use transport::{ByteSink, EscapedSink, FifoDecoder, FrameDecoder, RxEvent};
