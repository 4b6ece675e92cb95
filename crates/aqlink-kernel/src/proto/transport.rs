//! Frame transport: the byte-level codec between the raw link and the
//! command interpreter.
//!
//! Two variants exist behind the same contract:
//!
//! - **Escaped stream** (UART): `0x7E` marks the start of a frame wherever
//!   it appears; `0x7D` escapes the next byte (XOR `0x20`). [`FrameDecoder`]
//!   handles the inbound direction, [`EscapedSink`] the outbound.
//! - **Polled FIFO** (shared-memory register interface): framing comes from
//!   a control-line write, so the codec is a no-op — [`FifoDecoder`] turns
//!   control/data register writes into the same [`RxEvent`]s, and responses
//!   go to a plain [`ByteSink`] unescaped.
//!
//! Neither side knows anything about command semantics.

use aqlink_types::proto::{ESCAPE_MASK, FRAME_ESCAPE, FRAME_START};

/// One decoded inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Nothing to forward (escape byte, or noise before the first frame).
    None,
    /// Start of a new frame; accumulation resets.
    FrameStart,
    /// One clean payload byte.
    Byte(u8),
}

/// Inbound de-escaping state machine for the UART stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    escape: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw wire byte.
    pub fn feed(&mut self, raw: u8) -> RxEvent {
        if raw == FRAME_START {
            self.escape = false;
            return RxEvent::FrameStart;
        }
        if raw == FRAME_ESCAPE {
            self.escape = true;
            return RxEvent::None;
        }
        if self.escape {
            self.escape = false;
            return RxEvent::Byte(raw ^ ESCAPE_MASK);
        }
        RxEvent::Byte(raw)
    }
}

/// Polled-channel variant: data/control register writes from the FPGA side.
///
/// A control write with bit 7 set marks the start of a frame; data writes
/// pass through unmodified.
#[derive(Debug, Default)]
pub struct FifoDecoder;

impl FifoDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn feed_ctrl(&mut self, value: u8) -> RxEvent {
        if value & 0x80 != 0 {
            RxEvent::FrameStart
        } else {
            RxEvent::None
        }
    }

    pub fn feed_data(&mut self, value: u8) -> RxEvent {
        RxEvent::Byte(value)
    }
}

/// Outbound byte sink the interpreter writes responses to.
///
/// `flush` is called once after every dispatched command.
pub trait ByteSink: Send {
    fn write(&mut self, byte: u8);

    fn write_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write(b);
        }
    }

    fn flush(&mut self) {}
}

/// A plain in-memory sink. Useful for the FIFO transport and for tests.
impl ByteSink for Vec<u8> {
    fn write(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Escaping wrapper for the UART transport: any outgoing `0x7E`/`0x7D` is
/// written as `0x7D` followed by the value XOR `0x20`.
#[derive(Debug)]
pub struct EscapedSink<S> {
    inner: S,
}

impl<S: ByteSink> EscapedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: ByteSink> ByteSink for EscapedSink<S> {
    fn write(&mut self, byte: u8) {
        if byte == FRAME_START || byte == FRAME_ESCAPE {
            self.inner.write(FRAME_ESCAPE);
            self.inner.write(byte ^ ESCAPE_MASK);
        } else {
            self.inner.write(byte);
        }
    }

    fn flush(&mut self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &[u8]) -> Vec<u8> {
        let mut dec = FrameDecoder::new();
        let mut out = Vec::new();
        for &b in raw {
            match dec.feed(b) {
                RxEvent::Byte(v) => out.push(v),
                RxEvent::FrameStart => out.clear(),
                RxEvent::None => {}
            }
        }
        out
    }

    #[test]
    fn escaping_round_trip() {
        let payload = [0x00, 0x7E, 0x41, 0x7D, 0xFF, 0x5E, 0x5D];
        let mut sink = EscapedSink::new(Vec::new());
        sink.write_all(&payload);
        let wire = sink.into_inner();

        // The markers themselves never appear on the wire as data
        let mut framed = vec![FRAME_START];
        framed.extend_from_slice(&wire);
        assert_eq!(decode(&framed), payload);
    }

    #[test]
    fn bytes_before_first_frame_are_data_for_the_caller_to_drop() {
        let mut dec = FrameDecoder::new();
        assert_eq!(dec.feed(0x41), RxEvent::Byte(0x41));
        assert_eq!(dec.feed(FRAME_START), RxEvent::FrameStart);
    }

    #[test]
    fn frame_start_clears_escape_state() {
        let mut dec = FrameDecoder::new();
        assert_eq!(dec.feed(FRAME_ESCAPE), RxEvent::None);
        assert_eq!(dec.feed(FRAME_START), RxEvent::FrameStart);
        // Next byte is not XORed
        assert_eq!(dec.feed(0x10), RxEvent::Byte(0x10));
    }

    #[test]
    fn escaped_values_are_unmasked() {
        let mut dec = FrameDecoder::new();
        assert_eq!(dec.feed(FRAME_ESCAPE), RxEvent::None);
        assert_eq!(dec.feed(0x5E), RxEvent::Byte(0x7E));
    }

    #[test]
    fn fifo_control_line_frames() {
        let mut dec = FifoDecoder::new();
        assert_eq!(dec.feed_ctrl(0x80), RxEvent::FrameStart);
        assert_eq!(dec.feed_ctrl(0x00), RxEvent::None);
        assert_eq!(dec.feed_data(0x7E), RxEvent::Byte(0x7E));
    }
}
