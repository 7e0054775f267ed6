use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::channel::oneshot;

use crate::error::LoadError;

/// Status of a completed transfer that delivered its body.
pub const STATUS_OK: u16 = 200;

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: STATUS_OK, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: Vec::new() }
    }
}

/// Host-side fetch primitive.
///
/// The returned future resolves once the transfer has completed (with any
/// status), or fails if the transfer itself broke down. A transfer that never
/// completes never resolves; no timeout is applied here.
pub trait Transport {
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<FetchResponse, LoadError>>;
}

// ── file transport ────────────────────────────────────────────────────────

/// Serves locators from a directory.
///
/// Each fetch reads its file on a dedicated worker thread and hands the
/// result back over a oneshot channel, so concurrent fetches overlap while
/// the caller only awaits.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a locator onto a path under the root.
    ///
    /// Returns `None` when the locator tries to leave the root.
    fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let relative = Path::new(locator.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }
}

fn read_response(path: &Path) -> Result<FetchResponse, String> {
    match std::fs::read(path) {
        Ok(body) => Ok(FetchResponse::ok(body)),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(FetchResponse::status(404)),
            io::ErrorKind::PermissionDenied => Ok(FetchResponse::status(403)),
            _ => Err(e.to_string()),
        },
    }
}

impl Transport for FileTransport {
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<FetchResponse, LoadError>> {
        let owned = locator.to_string();
        let (tx, rx) = oneshot::channel();

        // The transfer starts here, before the returned future is first polled.
        let issued = match self.resolve(locator) {
            Some(path) => std::thread::Builder::new()
                .name("easel-fetch".into())
                .spawn(move || {
                    // The receiver may already be gone after a sibling failed.
                    let _ = tx.send(read_response(&path));
                })
                .map(drop)
                .map_err(|e| e.to_string()),
            None => {
                log::warn!("locator `{locator}` escapes the asset root");
                let _ = tx.send(Ok(FetchResponse::status(403)));
                Ok(())
            }
        };

        async move {
            issued.map_err(|reason| LoadError::Transport {
                locator: owned.clone(),
                reason,
            })?;

            match rx.await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(reason)) => Err(LoadError::Transport { locator: owned, reason }),
                Err(oneshot::Canceled) => Err(LoadError::Transport {
                    locator: owned,
                    reason: "fetch worker exited without a response".into(),
                }),
            }
        }
    }
}

// ── memory transport ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Entry {
    Complete(FetchResponse),
    Broken(String),
    Pending,
}

/// Serves locators from memory.
///
/// Unknown locators complete with status 404. Entries registered with
/// [`MemoryTransport::insert_pending`] never complete.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    entries: HashMap<String, Entry>,
    issued: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful (status 200) response.
    pub fn insert(&mut self, locator: impl Into<String>, body: impl Into<Vec<u8>>) -> &mut Self {
        self.entries
            .insert(locator.into(), Entry::Complete(FetchResponse::ok(body)));
        self
    }

    /// Registers a completed response with an arbitrary status.
    pub fn insert_response(
        &mut self,
        locator: impl Into<String>,
        response: FetchResponse,
    ) -> &mut Self {
        self.entries.insert(locator.into(), Entry::Complete(response));
        self
    }

    /// Registers a transfer that breaks down before completing.
    pub fn insert_broken(
        &mut self,
        locator: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.entries.insert(locator.into(), Entry::Broken(reason.into()));
        self
    }

    /// Registers a transfer that never completes.
    pub fn insert_pending(&mut self, locator: impl Into<String>) -> &mut Self {
        self.entries.insert(locator.into(), Entry::Pending);
        self
    }

    /// Number of fetches issued so far.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<FetchResponse, LoadError>> {
        self.issued.fetch_add(1, Ordering::Relaxed);
        let entry = self.entries.get(locator).cloned();
        let owned = locator.to_string();

        async move {
            match entry {
                Some(Entry::Complete(response)) => Ok(response),
                Some(Entry::Broken(reason)) => Err(LoadError::Transport { locator: owned, reason }),
                Some(Entry::Pending) => futures::future::pending().await,
                None => Ok(FetchResponse::status(404)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("easel-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("shader")).unwrap();
        dir
    }

    #[test]
    fn file_transport_serves_existing_file() {
        let dir = scratch_dir("serve");
        std::fs::write(dir.join("shader/a.vert"), "vertex source").unwrap();

        let transport = FileTransport::new(&dir);
        let response = pollster::block_on(transport.fetch("/shader/a.vert")).unwrap();
        assert_eq!(response, FetchResponse::ok("vertex source"));
    }

    #[test]
    fn file_transport_reports_missing_file_as_404() {
        let dir = scratch_dir("missing");
        let transport = FileTransport::new(&dir);
        let response = pollster::block_on(transport.fetch("/shader/none.frag")).unwrap();
        assert_eq!(response.status, 404);
        assert!(response.body.is_empty());
    }

    #[test]
    fn file_transport_refuses_to_leave_root() {
        let dir = scratch_dir("escape");
        let transport = FileTransport::new(dir.join("shader"));
        let response = pollster::block_on(transport.fetch("../escape.txt")).unwrap();
        assert_eq!(response.status, 403);
    }

    #[test]
    fn memory_transport_unknown_locator_is_404() {
        let transport = MemoryTransport::new();
        let response = pollster::block_on(transport.fetch("nope")).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(transport.issued(), 1);
    }
}
