use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};

/// A contiguous block of memory mapped `MAP_SHARED`.
///
/// A region is either backed by a file (every [`SharedRegion::open`] of the
/// same path maps the same physical pages) or anonymous. The handle that
/// [`created`](SharedRegion::create) the backing file owns it and removes it
/// on drop; handles obtained through `open` are non-owning mappings.
///
/// Bytes are only reachable through relaxed atomic loads and stores. Nothing
/// here orders or serializes writers: two handles writing overlapping ranges
/// at the same time can leave the range holding a mix of both writes.
pub struct SharedRegion {
    ptr: NonNull<AtomicU8>,
    len: usize,
    path: Option<PathBuf>,
    owned_inode: Option<(u64, u64)>,
}

// SAFETY: the mapping is process-wide and every access goes through `AtomicU8`.
unsafe impl Send for SharedRegion {}
// SAFETY: see above; shared references only ever perform atomic operations.
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Default permission mode for region backing files.
    pub const DEFAULT_FILE_MODE: u32 = 0o600;

    /// Create (or truncate) the backing file at `path`, size it to `len`
    /// zero bytes, and map it.
    pub fn create(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(TransportError::EmptyRegion);
        }
        let path = path.as_ref().to_path_buf();
        let region_err = |source: std::io::Error| TransportError::Region {
            path: Some(path.clone()),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(Self::DEFAULT_FILE_MODE)
            .open(&path)
            .map_err(region_err)?;
        file.set_len(len as u64).map_err(region_err)?;
        let metadata = file.metadata().map_err(region_err)?;

        let ptr = map_file(&file, len).map_err(region_err)?;
        info!(?path, len, "created shared region");

        Ok(Self {
            ptr,
            len,
            owned_inode: Some((metadata.dev(), metadata.ino())),
            path: Some(path),
        })
    }

    /// Map an existing backing file. The mapping spans the whole file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let region_err = |source: std::io::Error| TransportError::Region {
            path: Some(path.clone()),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(region_err)?;
        let len = file.metadata().map_err(region_err)?.len() as usize;
        if len == 0 {
            return Err(TransportError::EmptyRegion);
        }

        let ptr = map_file(&file, len).map_err(region_err)?;
        debug!(?path, len, "mapped shared region");

        Ok(Self {
            ptr,
            len,
            path: Some(path),
            owned_inode: None,
        })
    }

    /// Map `len` zero bytes not backed by any file.
    pub fn anonymous(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(TransportError::EmptyRegion);
        }
        let ptr = mmap_shared(-1, len, libc::MAP_ANON).map_err(|source| {
            TransportError::Region { path: None, source }
        })?;
        debug!(len, "mapped anonymous shared region");
        Ok(Self {
            ptr,
            len,
            path: None,
            owned_inode: None,
        })
    }

    /// Length of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; empty regions are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing file path, `None` for anonymous regions.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the region.
    pub fn read(&self, offset: usize, dst: &mut [u8]) {
        let len = dst.len();
        for (byte, cell) in dst.iter_mut().zip(self.span(offset, len)) {
            *byte = cell.load(Ordering::Relaxed);
        }
    }

    /// Copy `src` into the region starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the region.
    pub fn write(&self, offset: usize, src: &[u8]) {
        for (cell, byte) in self.span(offset, src.len()).iter().zip(src) {
            cell.store(*byte, Ordering::Relaxed);
        }
    }

    /// Set `len` bytes starting at `offset` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the region.
    pub fn fill(&self, offset: usize, len: usize, value: u8) {
        for cell in self.span(offset, len) {
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// True when every byte in the range is zero.
    pub fn is_zeroed(&self, offset: usize, len: usize) -> bool {
        self.span(offset, len)
            .iter()
            .all(|cell| cell.load(Ordering::Relaxed) == 0)
    }

    fn span(&self, offset: usize, len: usize) -> &[AtomicU8] {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.len)
            .unwrap_or_else(|| {
                panic!(
                    "range {offset}+{len} out of bounds for region of {} bytes",
                    self.len
                )
            });
        &self.cells()[offset..end]
    }

    fn cells(&self) -> &[AtomicU8] {
        // SAFETY: `ptr` points at a live mapping of `len` bytes for the lifetime
        // of `self`; `AtomicU8` has the same layout as `u8`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe exactly the mapping created in `mmap_shared`.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr().cast::<libc::c_void>(), self.len) };
        if rc != 0 {
            warn!(
                error = %std::io::Error::last_os_error(),
                "failed to unmap shared region"
            );
        }

        let (Some(path), Some((dev, ino))) = (&self.path, self.owned_inode) else {
            return;
        };
        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.dev() == dev && metadata.ino() == ino => {
                debug!(?path, "removing shared region backing file");
                let _ = std::fs::remove_file(path);
            }
            _ => debug!(?path, "region backing file replaced; skipping cleanup"),
        }
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("len", &self.len)
            .field("path", &self.path)
            .field("owner", &self.owned_inode.is_some())
            .finish()
    }
}

fn map_file(file: &File, len: usize) -> std::io::Result<NonNull<AtomicU8>> {
    mmap_shared(file.as_raw_fd(), len, 0)
}

fn mmap_shared(
    fd: libc::c_int,
    len: usize,
    extra_flags: libc::c_int,
) -> std::io::Result<NonNull<AtomicU8>> {
    // SAFETY: a null hint lets the kernel pick the address; `fd` is either -1
    // with MAP_ANON or an open descriptor sized to at least `len` bytes.
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | extra_flags,
            fd,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    NonNull::new(addr.cast::<AtomicU8>())
        .ok_or_else(|| std::io::Error::other("mmap returned a null mapping"))
}
