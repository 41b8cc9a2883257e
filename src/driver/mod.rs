//! The `Driver` trait: a uniform contract over filesystem backends.
//!
//! Two implementations are provided:
//!
//! - [`FileDriver`]: wraps the local OS filesystem (the default backend)
//! - [`MemoryDriver`]: ephemeral in-memory storage, useful for hermetic
//!   tests and as the second backend kind for cross-driver transfers
//!
//! # Cross-driver operations
//!
//! `rename`, `copy`, and `symlink` accept an optional target driver. The
//! decision is always the same: when the target is the *same kind* of
//! backend, the native OS primitive runs; when the kinds differ, rename and
//! copy degrade to a content transfer (read through the source driver,
//! write through the target, and for rename delete the source only after
//! the write succeeded), while symlink is rejected outright. "Same kind"
//! is a value comparison of [`DriverKind`] tags, never a type-identity or
//! path check.

mod file;
mod memory;

pub use file::FileDriver;
pub use memory::MemoryDriver;

use std::time::SystemTime;

use crate::error::DriverResult;
use crate::paths;
use crate::stream::{FileStream, OpenMode};

/// Backend kind tag, compared by value for cross-driver decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Local OS filesystem.
    File,
    /// In-memory storage.
    Memory,
}

/// Stat record for a file or directory. Fields are passed through from the
/// backend without interpretation; anything the backend cannot report is
/// `None`.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
    /// Size in bytes (0 for directories on some backends).
    pub size: u64,
    /// Permission bits (e.g. `0o644`), if available.
    pub mode: Option<u32>,
    /// Last modification time, if available.
    pub modified: Option<SystemTime>,
    /// Last access time, if available.
    pub accessed: Option<SystemTime>,
    /// Inode number, if the backend has one.
    pub inode: Option<u64>,
    /// Hard link count, if available.
    pub nlink: Option<u64>,
    /// Owner uid/gid, if available.
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// Write mode for [`Driver::file_put_contents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace existing content (default).
    #[default]
    Overwrite,
    /// Append to existing content.
    Append,
    /// Fail if the file already exists.
    CreateNew,
}

/// Uniform filesystem operation contract.
///
/// Every implementation must satisfy identical error-raising and ordering
/// contracts so cross-driver fallbacks behave predictably regardless of
/// which pair of backends is involved. Operations that can fail at the OS
/// level either return a fully defined result or raise
/// [`FileSystemError`](crate::error::FileSystemError) — never a silent
/// sentinel. The documented exceptions: [`Driver::search`] degrades to an
/// empty result and [`Driver::real_path`] returns `None` on unresolvable
/// paths, because callers use those to probe.
pub trait Driver: Send + Sync {
    /// The backend kind tag for cross-driver decisions.
    fn kind(&self) -> DriverKind;

    // ── Queries ────────────────────────────────────────────────────────────

    /// Whether the path exists. Missing paths are `Ok(false)`; only a
    /// genuine OS failure raises.
    fn is_exists(&self, path: &str) -> DriverResult<bool>;

    /// Stat the path.
    fn stat(&self, path: &str) -> DriverResult<Metadata>;

    /// Whether the path is readable by the current process.
    fn is_readable(&self, path: &str) -> DriverResult<bool>;

    /// Whether the path is a regular file (`Ok(false)` when missing).
    fn is_file(&self, path: &str) -> DriverResult<bool>;

    /// Whether the path is a directory (`Ok(false)` when missing).
    fn is_directory(&self, path: &str) -> DriverResult<bool>;

    /// Whether the path is writable by the current process.
    fn is_writable(&self, path: &str) -> DriverResult<bool>;

    /// Parent directory by string manipulation. Never fails, no I/O.
    fn parent_directory(&self, path: &str) -> String {
        paths::parent_directory(path)
    }

    /// Canonical path with symlinks and relative segments resolved, or
    /// `None` when the path cannot be resolved.
    fn real_path(&self, path: &str) -> Option<String>;

    // ── Enumeration ────────────────────────────────────────────────────────

    /// Immediate children as absolute pathnames, dot entries skipped,
    /// sorted lexicographically before return.
    fn read_directory(&self, path: &str) -> DriverResult<Vec<String>>;

    /// All descendants, depth first, each directory's children listed
    /// before the directory itself. This child-first order is contractual:
    /// recursive deletes consume it directly.
    fn read_directory_recursively(&self, path: &str) -> DriverResult<Vec<String>>;

    /// Glob `pattern` (brace expansion supported) rooted at `path`. Any
    /// failure degrades to an empty result instead of raising.
    fn search(&self, pattern: &str, path: &str) -> Vec<String>;

    // ── Mutation ───────────────────────────────────────────────────────────

    /// Create the directory and any missing parents with the given
    /// permission bits.
    fn create_directory(&self, path: &str, permissions: u32) -> DriverResult<()>;

    /// Unlink a single file.
    fn delete_file(&self, path: &str) -> DriverResult<()>;

    /// Recursively delete a directory, descendants first. The first failing
    /// deletion aborts and propagates; the root removal is never reached in
    /// that case.
    fn delete_directory(&self, path: &str) -> DriverResult<()>;

    /// Change permission bits on a single path.
    fn change_permissions(&self, path: &str, permissions: u32) -> DriverResult<()>;

    /// Change permission bits on a whole tree, depth first, applying
    /// `dir_permissions` to directories and `file_permissions` to files.
    fn change_permissions_recursively(
        &self,
        path: &str,
        dir_permissions: u32,
        file_permissions: u32,
    ) -> DriverResult<()>;

    /// Set access and modification times to now, or to `modification_time`
    /// when given. Creates the file if it does not exist.
    fn touch(&self, path: &str, modification_time: Option<SystemTime>) -> DriverResult<()>;

    /// Rename `old_path` to `new_path`. With a target driver of a different
    /// kind, falls back to copy-then-delete; the source is deleted only
    /// after the destination write succeeded.
    fn rename(
        &self,
        old_path: &str,
        new_path: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()>;

    /// Copy `source` to `destination`, with the same cross-kind content
    /// transfer fallback as `rename` (minus the delete).
    fn copy(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()>;

    /// Create a symlink at `destination` pointing at `source`. Only
    /// supported when the target driver is the same kind; anything else
    /// raises.
    fn symlink(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()>;

    /// Create a hard link at `destination` for `source`.
    fn create_hard_link(&self, source: &str, destination: &str) -> DriverResult<()>;

    // ── One-shot content transfer ──────────────────────────────────────────

    /// Read the full contents of a file.
    fn file_get_contents(&self, path: &str) -> DriverResult<Vec<u8>>;

    /// Write `content` in one shot, returning the byte count. Writing zero
    /// bytes of nonempty content is a failure; an explicitly empty content
    /// argument succeeds trivially with `Ok(0)`.
    fn file_put_contents(
        &self,
        path: &str,
        content: &[u8],
        mode: Option<WriteMode>,
    ) -> DriverResult<usize>;

    // ── Streams ────────────────────────────────────────────────────────────

    /// Open a stream handle. The caller owns the handle and must close it
    /// on every exit path.
    fn file_open(&self, path: &str, mode: OpenMode) -> DriverResult<Box<dyn FileStream>>;

    // ── Pure path helpers ──────────────────────────────────────────────────

    /// See [`paths::absolute_path`].
    fn absolute_path(&self, base_path: &str, path: &str, scheme: Option<&str>) -> String {
        paths::absolute_path(base_path, path, scheme)
    }

    /// See [`paths::relative_path`].
    fn relative_path(&self, base_path: &str, path: &str) -> String {
        paths::relative_path(base_path, path)
    }

    /// See [`paths::real_path_safety`].
    fn real_path_safety(&self, path: &str) -> String {
        paths::real_path_safety(path)
    }
}

/// Content-transfer fallback shared by cross-kind rename and copy: read the
/// full content through `source_driver`, write it through `target`.
pub(crate) fn transfer_contents(
    source_driver: &dyn Driver,
    source: &str,
    target: &dyn Driver,
    destination: &str,
) -> DriverResult<usize> {
    tracing::debug!(
        source_kind = ?source_driver.kind(),
        target_kind = ?target.kind(),
        source,
        destination,
        "cross-driver content transfer"
    );
    let content = source_driver.file_get_contents(source)?;
    target.file_put_contents(destination, &content, None)
}
