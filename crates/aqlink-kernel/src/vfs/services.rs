//! Backend service set — the closed mapping from path-prefix kind to
//! provider.

use std::sync::Arc;

use super::traits::VfsBackend;

/// Which backend a path resolved to.
///
/// A closed set: the resolver picks one of these from the path prefix, and
/// the [`BackendSet`] turns it into a provider. Comparing kinds is how the
/// multiplexer rejects cross-backend renames before touching any backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The block filesystem (SD card, or a host directory on desktop builds).
    Sdcard,
    /// The internal read-only archive (`esp:` prefix).
    Rom,
    /// HTTP/HTTPS provider (`http://`, `https://`).
    Http,
    /// Raw TCP provider (`tcp://`).
    Tcp,
}

/// Application-lifetime backend registry.
///
/// Populated once at link initialization and shared (read-only) by every
/// link. Slots for providers the build doesn't carry stay empty; resolving
/// a path to an empty slot is an `InvalidParam` at the multiplexer.
#[derive(Default)]
pub struct BackendSet {
    sdcard: Option<Arc<dyn VfsBackend>>,
    rom: Option<Arc<dyn VfsBackend>>,
    http: Option<Arc<dyn VfsBackend>>,
    tcp: Option<Arc<dyn VfsBackend>>,
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSet")
            .field("sdcard", &self.sdcard.is_some())
            .field("rom", &self.rom.is_some())
            .field("http", &self.http.is_some())
            .field("tcp", &self.tcp.is_some())
            .finish()
    }
}

impl BackendSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for `kind`.
    pub fn register(&mut self, kind: BackendKind, backend: Arc<dyn VfsBackend>) {
        *self.slot_mut(kind) = Some(backend);
    }

    /// Look up the provider for `kind`.
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn VfsBackend>> {
        match kind {
            BackendKind::Sdcard => self.sdcard.clone(),
            BackendKind::Rom => self.rom.clone(),
            BackendKind::Http => self.http.clone(),
            BackendKind::Tcp => self.tcp.clone(),
        }
    }

    fn slot_mut(&mut self, kind: BackendKind) -> &mut Option<Arc<dyn VfsBackend>> {
        match kind {
            BackendKind::Sdcard => &mut self.sdcard,
            BackendKind::Rom => &mut self.rom,
            BackendKind::Http => &mut self.http,
            BackendKind::Tcp => &mut self.tcp,
        }
    }
}
