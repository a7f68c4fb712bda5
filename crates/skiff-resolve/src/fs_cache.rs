//! Memoizing async file-system access.
//!
//! Every read and existence check during a build goes through [`FsCache`],
//! which deduplicates concurrent requests for the same path: the first caller
//! starts the I/O and stores the in-flight future, later callers attach to
//! it, so at most one syscall is outstanding per unique path.
//!
//! A confirmed "file does not exist" is a stable negative result and stays
//! cached; a hard I/O error evicts its entry so the next access retries
//! instead of replaying a stale failure for the rest of the build.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared I/O error. `std::io::Error` is not `Clone`, and cached in-flight
/// futures hand the same failure to every waiter.
pub type FsError = Arc<io::Error>;

type SharedIo<T> = Shared<BoxFuture<'static, Result<T, FsError>>>;

/// Raw file-system capability used by the resolver.
///
/// The production backend is [`DiskFs`]; tests substitute in-memory
/// implementations to control timing and count syscalls.
pub trait ModuleFs: Send + Sync {
    /// Read a file as (lossy) UTF-8 text.
    fn read_file(&self, path: &Path) -> BoxFuture<'static, Result<Arc<str>, FsError>>;

    /// Check whether the path exists and is a regular file.
    ///
    /// A missing path is reported as a `NotFound` error, not `Ok(false)`;
    /// the cache layer decides how to classify it.
    fn is_file(&self, path: &Path) -> BoxFuture<'static, Result<bool, FsError>>;
}

/// `ModuleFs` backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl ModuleFs for DiskFs {
    fn read_file(&self, path: &Path) -> BoxFuture<'static, Result<Arc<str>, FsError>> {
        let path = path.to_path_buf();
        async move {
            let bytes = tokio::fs::read(&path).await.map_err(Arc::new)?;
            Ok(Arc::from(String::from_utf8_lossy(&bytes).into_owned()))
        }
        .boxed()
    }

    fn is_file(&self, path: &Path) -> BoxFuture<'static, Result<bool, FsError>> {
        let path = path.to_path_buf();
        async move {
            let meta = tokio::fs::metadata(&path).await.map_err(Arc::new)?;
            Ok(meta.is_file())
        }
        .boxed()
    }
}

/// Memoizing wrapper around a [`ModuleFs`] backend.
///
/// Owned by one build session; [`FsCache::clear`] is the end-of-build
/// lifecycle hook.
pub struct FsCache {
    backend: Arc<dyn ModuleFs>,
    reads: Arc<Mutex<HashMap<PathBuf, SharedIo<Arc<str>>>>>,
    stats: Arc<Mutex<HashMap<PathBuf, SharedIo<bool>>>>,
}

impl Default for FsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsCache").finish_non_exhaustive()
    }
}

impl FsCache {
    /// Cache over the real filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Arc::new(DiskFs))
    }

    /// Cache over an injected backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn ModuleFs>) -> Self {
        Self {
            backend,
            reads: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Read a file through the cache.
    pub async fn read_file(&self, path: &Path) -> Result<Arc<str>, FsError> {
        self.read_shared(path).await
    }

    /// Check file existence through the cache.
    pub async fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        self.stat_shared(path).await
    }

    /// Drop all cached entries. Called at end of build: filesystem state is
    /// not trusted across builds.
    pub fn clear(&self) {
        self.reads.lock().expect("fs cache lock poisoned").clear();
        self.stats.lock().expect("fs cache lock poisoned").clear();
    }

    fn read_shared(&self, path: &Path) -> SharedIo<Arc<str>> {
        let mut reads = self.reads.lock().expect("fs cache lock poisoned");
        if let Some(existing) = reads.get(path) {
            return existing.clone();
        }

        let key = path.to_path_buf();
        let backend = Arc::clone(&self.backend);
        let map = Arc::clone(&self.reads);
        let evict_key = key.clone();
        let fut = async move {
            match backend.read_file(&evict_key).await {
                Ok(contents) => Ok(contents),
                Err(err) => {
                    // evict so a later access retries instead of replaying
                    map.lock().expect("fs cache lock poisoned").remove(&evict_key);
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();
        reads.insert(key, fut.clone());
        fut
    }

    fn stat_shared(&self, path: &Path) -> SharedIo<bool> {
        let mut stats = self.stats.lock().expect("fs cache lock poisoned");
        if let Some(existing) = stats.get(path) {
            return existing.clone();
        }

        let key = path.to_path_buf();
        let backend = Arc::clone(&self.backend);
        let map = Arc::clone(&self.stats);
        let evict_key = key.clone();
        let fut = async move {
            match backend.is_file(&evict_key).await {
                Ok(found) => Ok(found),
                // absence is a stable answer, not a fault
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(err) => {
                    map.lock().expect("fs cache lock poisoned").remove(&evict_key);
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();
        stats.insert(key, fut.clone());
        fut
    }
}

impl ModuleFs for FsCache {
    fn read_file(&self, path: &Path) -> BoxFuture<'static, Result<Arc<str>, FsError>> {
        self.read_shared(path).boxed()
    }

    fn is_file(&self, path: &Path) -> BoxFuture<'static, Result<bool, FsError>> {
        self.stat_shared(path).boxed()
    }
}
