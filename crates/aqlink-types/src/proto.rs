//! Protocol constants: framing bytes and the command opcode table.

/// Start-of-frame marker. Resets the receive cursor wherever it appears.
pub const FRAME_START: u8 = 0x7E;
/// Escape marker. The byte that follows is XORed with [`ESCAPE_MASK`].
pub const FRAME_ESCAPE: u8 = 0x7D;
/// XOR mask applied to escaped bytes.
pub const ESCAPE_MASK: u8 = 0x20;

/// Receive-buffer capacity: the largest WRITE payload (64 KiB) plus header
/// slack.
pub const RX_BUF_CAPACITY: usize = 0x10000 + 16;

/// Fixed descriptor-table sizes.
pub const MAX_FDS: usize = 10;
pub const MAX_DDS: usize = 10;

/// Command opcodes, first byte of every frame.
pub mod cmd {
    pub const RESET: u8 = 0x01;
    pub const VERSION: u8 = 0x02;
    pub const GETDATETIME: u8 = 0x03;
    pub const GETGAMECTRL: u8 = 0x0E;
    pub const GETMIDIDATA: u8 = 0x0F;

    pub const OPEN: u8 = 0x10;
    pub const CLOSE: u8 = 0x11;
    pub const READ: u8 = 0x12;
    pub const WRITE: u8 = 0x13;
    pub const SEEK: u8 = 0x14;
    pub const TELL: u8 = 0x15;
    pub const OPENDIR: u8 = 0x16;
    pub const CLOSEDIR: u8 = 0x17;
    pub const READDIR: u8 = 0x18;
    pub const DELETE: u8 = 0x19;
    pub const RENAME: u8 = 0x1A;
    pub const MKDIR: u8 = 0x1B;
    pub const CHDIR: u8 = 0x1C;
    pub const STAT: u8 = 0x1D;
    pub const GETCWD: u8 = 0x1E;
    pub const CLOSEALL: u8 = 0x1F;
    pub const OPENDIR83: u8 = 0x20;
    pub const READLINE: u8 = 0x21;
    pub const OPENDIREXT: u8 = 0x22;
    pub const LSEEK: u8 = 0x23;

    pub const LOADFPGA: u8 = 0x40;
}

/// Path prefix selecting the internal read-only archive.
pub const ROM_PREFIX: &str = "esp:";
