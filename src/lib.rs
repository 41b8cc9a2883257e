//! Filesystem access behind a swappable driver abstraction.
//!
//! The [`Driver`] trait is the single surface through which callers touch a
//! filesystem: existence and metadata queries, directory enumeration and glob
//! search, mutation (create, delete, rename, copy, link, permissions), one-shot
//! content transfer, and positioned stream handles with advisory locking and
//! CSV row access. Two implementations ship here:
//!
//! - [`FileDriver`] — the local OS filesystem, optionally addressed through a
//!   URI scheme prefix;
//! - [`MemoryDriver`] — a process-local tree, handy in tests and as the far
//!   side of cross-driver rename/copy.
//!
//! Rename, copy and symlink accept an optional target driver; when the target
//! is of a different kind, rename and copy fall back to a read-then-write
//! transfer of the file contents, while symlink refuses.
//!
//! ```no_run
//! use fsdriver::{Driver, FileDriver, OpenMode};
//!
//! # fn main() -> fsdriver::DriverResult<()> {
//! let driver = FileDriver::new();
//! driver.file_put_contents("/tmp/report.csv", b"", None)?;
//! let mut out = driver.file_open("/tmp/report.csv", OpenMode::Write)?;
//! out.put_csv(&["sku", "qty"], ',', '"')?;
//! out.close()?;
//! # Ok(())
//! # }
//! ```

pub mod csv;
pub mod driver;
pub mod error;
pub mod glob;
pub mod paths;
pub mod stream;

pub use driver::{Driver, DriverKind, FileDriver, MemoryDriver, Metadata, WriteMode};
pub use error::{DriverResult, FileSystemError};
pub use stream::{FileStream, LockMode, OpenMode};
