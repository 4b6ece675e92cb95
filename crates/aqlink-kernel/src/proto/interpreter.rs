//! The command interpreter: a byte-accumulation state machine that turns
//! clean (de-escaped) bytes into commands and writes framed responses.
//!
//! The first byte of a frame is the opcode. Each opcode has its own terminal
//! condition — a fixed length, one or two zero-terminated strings, or a
//! little-endian length prefix — and the accumulated frame dispatches the
//! moment that condition is met. Everything runs to completion before the
//! next byte is accepted; there are never two commands in flight.
//!
//! Unrecognized opcodes are offered to the active core handler, which can
//! claim them, ask for more bytes, or decline.

use std::sync::Arc;

use aqlink_types::proto::{cmd, RX_BUF_CAPACITY};
use aqlink_types::{DirFlags, OpenFlags, SeekWhence, VfsError, VfsResult};
use tracing::{debug, info, warn};

use crate::context::VfsContext;

use super::core::{CoreHandler, CoreLoader, CoreReply, NullCore};
use super::midi::MidiQueue;
use super::transport::ByteSink;

/// Protocol state machine for one link.
///
/// Owns the link's [`VfsContext`], the outbound sink, and the swappable
/// core-handler strategy. Feed it [`frame_start`](Self::frame_start) and
/// [`receive_byte`](Self::receive_byte) from whichever transport decoder
/// the channel uses.
pub struct CommandInterpreter<S: ByteSink> {
    ctx: VfsContext,
    tx: S,
    core: Box<dyn CoreHandler>,
    loader: Option<Arc<dyn CoreLoader>>,
    midi: Arc<MidiQueue>,
    version: String,

    rx: Vec<u8>,
    /// False until the first start-of-frame; bytes are discarded while idle.
    started: bool,
    /// Start index of RENAME's second string, once its first NUL was seen.
    rename_split: Option<usize>,
}

impl<S: ByteSink> CommandInterpreter<S> {
    pub fn new(ctx: VfsContext, tx: S) -> Self {
        Self {
            ctx,
            tx,
            core: Box::new(NullCore),
            loader: None,
            midi: Arc::new(MidiQueue::new()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rx: Vec::new(),
            started: false,
            rename_split: None,
        }
    }

    /// Replace the active core handler.
    pub fn set_core_handler(&mut self, core: Box<dyn CoreHandler>) {
        self.core = core;
    }

    /// Install the bitstream loader used by the LOADFPGA command.
    pub fn set_core_loader(&mut self, loader: Arc<dyn CoreLoader>) {
        self.loader = Some(loader);
    }

    /// Version string reported by the VERSION command.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// The MIDI event queue drained by GETMIDIDATA.
    pub fn midi_queue(&self) -> Arc<MidiQueue> {
        self.midi.clone()
    }

    pub fn context(&self) -> &VfsContext {
        &self.ctx
    }

    /// Start-of-frame: reset accumulation.
    pub fn frame_start(&mut self) {
        self.started = true;
        self.rx.clear();
        self.rename_split = None;
    }

    /// Feed one clean payload byte. Runs any completed command to completion
    /// before returning.
    pub async fn receive_byte(&mut self, byte: u8) {
        if !self.started {
            return;
        }
        if self.rx.len() >= RX_BUF_CAPACITY {
            // Abandon the frame rather than corrupt it; the peer re-frames.
            warn!(opcode = self.rx[0], "receive buffer overflow, dropping frame");
            self.started = false;
            return;
        }
        self.rx.push(byte);
        self.advance(byte).await;
    }

    /// Inspect the opcode and dispatch once its terminal condition is met.
    async fn advance(&mut self, byte: u8) {
        let len = self.rx.len();
        match self.rx[0] {
            cmd::RESET => {
                debug!("RESET");
                self.ctx.reset().await;
                self.core.reset();
                self.complete();
            }
            cmd::VERSION => {
                debug!("VERSION");
                self.put_cstr(&self.version.clone());
                self.complete();
            }
            cmd::GETDATETIME if len == 2 => {
                let kind = self.rx[1];
                self.cmd_get_datetime(kind);
                self.complete();
            }
            cmd::GETGAMECTRL if len == 2 => {
                let index = self.rx[1];
                self.cmd_get_game_ctrl(index);
                self.complete();
            }
            cmd::GETMIDIDATA if len == 3 => {
                let size = self.arg_u16(1);
                self.cmd_get_midi_data(size);
                self.complete();
            }
            cmd::OPEN if byte == 0 && len >= 3 => {
                let flags = OpenFlags(self.rx[1]);
                let path = cstr(&self.rx[2..]);
                self.cmd_open(flags, &path).await;
                self.complete();
            }
            cmd::CLOSE if len == 2 => {
                let fd = self.rx[1];
                debug!(fd, "CLOSE");
                let result = self.ctx.close(fd).await;
                self.put_status(result);
                self.complete();
            }
            cmd::READ if len == 4 => {
                let (fd, size) = (self.rx[1], self.arg_u16(2));
                self.cmd_read(fd, size).await;
                self.complete();
            }
            cmd::READLINE if len == 4 => {
                let (fd, size) = (self.rx[1], self.arg_u16(2));
                self.cmd_read_line(fd, size).await;
                self.complete();
            }
            cmd::WRITE if len >= 4 => {
                let size = self.arg_u16(2) as usize;
                if len == 4 + size {
                    let fd = self.rx[1];
                    let data = self.rx[4..4 + size].to_vec();
                    self.cmd_write(fd, &data).await;
                    self.complete();
                }
            }
            cmd::SEEK if len == 6 => {
                let (fd, offset) = (self.rx[1], self.arg_u32(2));
                debug!(fd, offset, "SEEK");
                let result = self.ctx.seek(fd, offset).await;
                self.put_status(result);
                self.complete();
            }
            cmd::LSEEK if len == 7 => {
                let (fd, offset, whence) = (self.rx[1], self.arg_u32(2) as i32, self.rx[6]);
                self.cmd_lseek(fd, offset, whence).await;
                self.complete();
            }
            cmd::TELL if len == 2 => {
                let fd = self.rx[1];
                debug!(fd, "TELL");
                let result = self.ctx.tell(fd).await;
                self.put_u32_result(result);
                self.complete();
            }
            cmd::OPENDIR if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                self.cmd_open_dir(&path, DirFlags(0), 0).await;
                self.complete();
            }
            cmd::OPENDIR83 if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                self.cmd_open_dir(&path, DirFlags(DirFlags::MODE83), 0).await;
                self.complete();
            }
            cmd::OPENDIREXT if byte == 0 && len >= 5 => {
                let flags = DirFlags(self.rx[1]);
                let skip = self.arg_u16(2);
                let path = cstr(&self.rx[4..]);
                self.cmd_open_dir(&path, flags, skip).await;
                self.complete();
            }
            cmd::CLOSEDIR if len == 2 => {
                let dd = self.rx[1];
                debug!(dd, "CLOSEDIR");
                let result = self.ctx.close_dir(dd);
                self.put_status(result);
                self.complete();
            }
            cmd::READDIR if len == 2 => {
                let dd = self.rx[1];
                self.cmd_read_dir(dd);
                self.complete();
            }
            cmd::DELETE if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                debug!(path, "DELETE");
                let result = self.ctx.delete(&path).await;
                self.put_status(result);
                self.complete();
            }
            cmd::RENAME if byte == 0 => {
                match self.rename_split {
                    None => {
                        // First string complete; the second starts here
                        self.rename_split = Some(len);
                    }
                    Some(split) => {
                        let old = cstr(&self.rx[1..split]);
                        let new = cstr(&self.rx[split..]);
                        debug!(old, new, "RENAME");
                        let result = self.ctx.rename(&old, &new).await;
                        self.put_status(result);
                        self.complete();
                    }
                }
            }
            cmd::MKDIR if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                debug!(path, "MKDIR");
                let result = self.ctx.mkdir(&path).await;
                self.put_status(result);
                self.complete();
            }
            cmd::CHDIR if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                debug!(path, "CHDIR");
                let result = self.ctx.chdir(&path).await;
                self.put_status(result);
                self.complete();
            }
            cmd::STAT if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                self.cmd_stat(&path).await;
                self.complete();
            }
            cmd::GETCWD => {
                debug!("GETCWD");
                self.put(0);
                self.put(b'/');
                self.put_cstr(&self.ctx.current_path().to_string());
                self.complete();
            }
            cmd::CLOSEALL => {
                debug!("CLOSEALL");
                self.ctx.close_all().await;
                self.put(0);
                self.complete();
            }
            cmd::LOADFPGA if byte == 0 => {
                let path = cstr(&self.rx[1..]);
                self.cmd_load_fpga(&path).await;
                self.complete();
            }
            opcode => {
                // Fixed-length and string commands still accumulating fall
                // through to here with their own opcode; only genuinely
                // unknown opcodes reach the core handler.
                if !is_known(opcode) {
                    match self.core.command(opcode, &self.rx[1..]) {
                        CoreReply::NeedMore => {}
                        CoreReply::Done => self.complete(),
                        CoreReply::Unrecognized => {
                            debug!(opcode = format_args!("0x{opcode:02X}"), "invalid command");
                            self.complete();
                        }
                    }
                }
            }
        }
    }

    fn cmd_get_datetime(&mut self, kind: u8) {
        debug!(kind, "GETDATETIME");
        if kind != 0 {
            self.put_err(VfsError::InvalidParam);
            return;
        }
        let now = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        self.put(0);
        self.put_cstr(&now);
    }

    fn cmd_get_game_ctrl(&mut self, index: u8) {
        debug!(index, "GETGAMECTRL");
        match self.core.gamepad(index) {
            None => self.put_err(VfsError::NotFound),
            Some(data) => {
                self.put(0);
                self.put(data.lx as u8);
                self.put(data.ly as u8);
                self.put(data.rx as u8);
                self.put(data.ry as u8);
                self.put(data.lt);
                self.put(data.rt);
                self.put_u16(data.buttons);
            }
        }
    }

    fn cmd_get_midi_data(&mut self, size: u16) {
        debug!(size, "GETMIDIDATA");
        let mut count = self.midi.len();
        if count * 4 > size as usize {
            count = size as usize / 4;
        }
        self.put_u16((count * 4) as u16);
        for _ in 0..count {
            if let Some(event) = self.midi.pop() {
                self.tx.write_all(&event);
            }
        }
    }

    async fn cmd_open(&mut self, flags: OpenFlags, path: &str) {
        debug!(flags = flags.0, path, "OPEN");
        match self.ctx.open(flags, path).await {
            Ok(fd) => self.put(fd),
            Err(err) => self.put_err(err),
        }
    }

    async fn cmd_read(&mut self, fd: u8, size: u16) {
        debug!(fd, size, "READ");
        match self.ctx.read(fd, size).await {
            Err(err) => self.put_err(err),
            Ok(data) => {
                self.put(0);
                self.put_u16(data.len() as u16);
                self.tx.write_all(&data);
            }
        }
    }

    async fn cmd_read_line(&mut self, fd: u8, size: u16) {
        debug!(fd, size, "READLINE");
        match self.ctx.read_line(fd, size).await {
            Err(err) => self.put_err(err),
            Ok(line) => {
                self.put(0);
                // Strip at the first line terminator
                let end = line
                    .iter()
                    .position(|&b| b == b'\r' || b == b'\n' || b == 0)
                    .unwrap_or(line.len());
                self.tx.write_all(&line[..end]);
                self.put(0);
            }
        }
    }

    async fn cmd_write(&mut self, fd: u8, data: &[u8]) {
        debug!(fd, size = data.len(), "WRITE");
        match self.ctx.write(fd, data).await {
            Err(err) => self.put_err(err),
            Ok(written) => {
                self.put(0);
                self.put_u16(written as u16);
            }
        }
    }

    async fn cmd_lseek(&mut self, fd: u8, offset: i32, whence: u8) {
        debug!(fd, offset, whence, "LSEEK");
        let Some(whence) = SeekWhence::from_byte(whence) else {
            self.put_err(VfsError::InvalidParam);
            return;
        };
        let result = self.ctx.lseek(fd, offset, whence).await;
        self.put_u32_result(result);
    }

    async fn cmd_open_dir(&mut self, path: &str, flags: DirFlags, skip: u16) {
        debug!(path, flags = flags.0, skip, "OPENDIR");
        match self.ctx.open_dir(path, flags, skip).await {
            Ok(dd) => self.put(dd),
            Err(err) => self.put_err(err),
        }
    }

    fn cmd_read_dir(&mut self, dd: u8) {
        debug!(dd, "READDIR");
        match self.ctx.read_dir(dd) {
            Err(err) => self.put_err(err),
            Ok(de) => {
                self.put(0);
                self.put_u16(de.fdate);
                self.put_u16(de.ftime);
                self.put(de.attr);
                self.put_u32(de.size);
                self.put_cstr(&de.name);
            }
        }
    }

    async fn cmd_stat(&mut self, path: &str) {
        debug!(path, "STAT");
        match self.ctx.stat(path).await {
            Err(err) => self.put_err(err),
            Ok(st) => {
                self.put(0);
                self.put_u16(st.fdate);
                self.put_u16(st.ftime);
                self.put(st.attr());
                self.put_u32(st.size);
            }
        }
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn cmd_load_fpga(&mut self, path: &str) {
        let bitstream = match self.ctx.read_file(path).await {
            Ok(data) => data,
            Err(err) => {
                self.put_err(err);
                return;
            }
        };
        let Some(loader) = self.loader.clone() else {
            self.put_err(VfsError::Other);
            return;
        };
        self.put(0);
        info!(len = bitstream.len(), "loading bitstream");
        match loader.load(&bitstream).await {
            Ok(core) => self.core = core,
            Err(err) => {
                // Already acknowledged; the previous core stays active
                warn!(%err, "bitstream load failed");
            }
        }
        // Descriptors never survive a load attempt, successful or not
        self.ctx.close_all().await;
    }

    /// Command finished (successfully or not): reset accumulation and
    /// flush the transport. The link stays framed; the next byte begins a
    /// new command.
    fn complete(&mut self) {
        self.rx.clear();
        self.rename_split = None;
        self.tx.flush();
    }

    fn arg_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.rx[at], self.rx[at + 1]])
    }

    fn arg_u32(&self, at: usize) -> u32 {
        u32::from_le_bytes([
            self.rx[at],
            self.rx[at + 1],
            self.rx[at + 2],
            self.rx[at + 3],
        ])
    }

    fn put(&mut self, byte: u8) {
        self.tx.write(byte);
    }

    fn put_u16(&mut self, value: u16) {
        self.tx.write_all(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.tx.write_all(&value.to_le_bytes());
    }

    fn put_cstr(&mut self, s: &str) {
        self.tx.write_all(s.as_bytes());
        self.tx.write(0);
    }

    fn put_err(&mut self, err: VfsError) {
        self.put(err.code() as u8);
    }

    fn put_status(&mut self, result: VfsResult<()>) {
        match result {
            Ok(()) => self.put(0),
            Err(err) => self.put_err(err),
        }
    }

    fn put_u32_result(&mut self, result: VfsResult<u32>) {
        match result {
            Ok(value) => {
                self.put(0);
                self.put_u32(value);
            }
            Err(err) => self.put_err(err),
        }
    }
}

/// Extract a NUL-terminated string (lossily UTF-8) from the buffer.
fn cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Opcodes the interpreter itself handles; everything else goes to the
/// active core.
fn is_known(opcode: u8) -> bool {
    matches!(
        opcode,
        cmd::RESET
            | cmd::VERSION
            | cmd::GETDATETIME
            | cmd::GETGAMECTRL
            | cmd::GETMIDIDATA
            | cmd::OPEN
            | cmd::CLOSE
            | cmd::READ
            | cmd::WRITE
            | cmd::SEEK
            | cmd::TELL
            | cmd::OPENDIR
            | cmd::CLOSEDIR
            | cmd::READDIR
            | cmd::DELETE
            | cmd::RENAME
            | cmd::MKDIR
            | cmd::CHDIR
            | cmd::STAT
            | cmd::GETCWD
            | cmd::CLOSEALL
            | cmd::OPENDIR83
            | cmd::READLINE
            | cmd::OPENDIREXT
            | cmd::LSEEK
            | cmd::LOADFPGA
    )
}
