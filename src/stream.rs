//! Stream handles: open files with positioned read/write, CSV helpers, and
//! advisory locking.
//!
//! A handle is obtained from [`Driver::file_open`](crate::driver::Driver::file_open)
//! and is owned by the caller, who is responsible for closing it on every
//! exit path. No operation here implicitly closes a handle. Every failing
//! call raises [`FileSystemError`](crate::error::FileSystemError) with the
//! OS error text from that specific call; only [`FileStream::eof`] is
//! infallible by contract.

use std::io::SeekFrom;

use crate::csv;
use crate::error::{DriverResult, FileSystemError};

/// Open mode for [`file_open`](crate::driver::Driver::file_open), modeled on
/// the classic `fopen` mode strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`: read, positioned at the start; the file must exist.
    Read,
    /// `r+`: read and write; the file must exist.
    ReadWrite,
    /// `w`: write, truncating; created if missing.
    Write,
    /// `w+`: read and write, truncating; created if missing.
    WriteRead,
    /// `a`: append-only writes; created if missing.
    Append,
    /// `a+`: read anywhere, writes append; created if missing.
    AppendRead,
    /// `x`: write; the file must not exist.
    CreateNew,
    /// `x+`: read and write; the file must not exist.
    CreateNewRead,
}

impl OpenMode {
    /// Parse an `fopen`-style mode string. Trailing `b`/`t` flags are
    /// accepted and ignored; streams are always binary here.
    pub fn from_flag(flag: &str) -> Option<Self> {
        let trimmed = flag.trim_end_matches(&['b', 't'][..]);
        match trimmed {
            "r" => Some(Self::Read),
            "r+" => Some(Self::ReadWrite),
            "w" => Some(Self::Write),
            "w+" => Some(Self::WriteRead),
            "a" => Some(Self::Append),
            "a+" => Some(Self::AppendRead),
            "x" => Some(Self::CreateNew),
            "x+" => Some(Self::CreateNewRead),
            _ => None,
        }
    }

    pub fn readable(self) -> bool {
        !matches!(self, Self::Write | Self::Append | Self::CreateNew)
    }

    pub fn writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    pub fn append(self) -> bool {
        matches!(self, Self::Append | Self::AppendRead)
    }

    pub fn truncate(self) -> bool {
        matches!(self, Self::Write | Self::WriteRead)
    }

    pub fn create(self) -> bool {
        !matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn create_new(self) -> bool {
        matches!(self, Self::CreateNew | Self::CreateNewRead)
    }
}

/// Advisory lock mode for an open handle.
///
/// Advisory means exactly that: only cooperating processes that also take
/// the lock are constrained. Non-blocking variants fail immediately instead
/// of waiting when the lock is contended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
    SharedNonBlocking,
    ExclusiveNonBlocking,
}

/// An open stream handle.
///
/// Positioned reads and writes, one-row CSV transfer, flushing, and advisory
/// locking. `get_csv`/`put_csv`/`read_line` are provided in terms of the
/// byte-level primitives so every backend gets identical CSV semantics.
pub trait FileStream: Send {
    /// Read up to `length` bytes from the current position. A short or empty
    /// result means end of data was reached, not an error.
    fn read(&mut self, length: usize) -> DriverResult<Vec<u8>>;

    /// Read a single byte; `None` at end of data.
    fn read_byte(&mut self) -> DriverResult<Option<u8>>;

    /// Read until `ending` (default `\n`), end of data, or `max_len` bytes
    /// (`0` = unlimited). The terminator is consumed but not returned.
    fn read_line(&mut self, max_len: usize, ending: Option<char>) -> DriverResult<String> {
        let terminator = ending.unwrap_or('\n') as u32;
        let terminator = u8::try_from(terminator).map_err(|_| {
            FileSystemError::Unsupported("line ending must be a single byte".to_string())
        })?;
        let mut buf = Vec::new();
        loop {
            if max_len > 0 && buf.len() >= max_len {
                break;
            }
            match self.read_byte()? {
                None => break,
                Some(b) if b == terminator => break,
                Some(b) => buf.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Read one CSV row. `Ok(None)` signals a normal end of data; a
    /// malformed row raises.
    fn get_csv(
        &mut self,
        delimiter: char,
        enclosure: char,
        escape: char,
    ) -> DriverResult<Option<Vec<String>>> {
        csv::parse_row(|| self.read_byte(), delimiter, enclosure, escape)
    }

    /// Current position of the read/write pointer.
    fn tell(&mut self) -> DriverResult<u64>;

    /// Move the read/write pointer. Returns the new position.
    fn seek(&mut self, pos: SeekFrom) -> DriverResult<u64>;

    /// True when the pointer is at (or past) the end of the file. Never
    /// raises; on any inspection failure this reads as end of file.
    fn eof(&mut self) -> bool;

    /// Write `data` at the current position, returning the byte count.
    fn write(&mut self, data: &[u8]) -> DriverResult<usize>;

    /// Write one CSV row with the formula-injection guard applied to every
    /// field. Returns the byte count written.
    fn put_csv(
        &mut self,
        fields: &[&str],
        delimiter: char,
        enclosure: char,
    ) -> DriverResult<usize> {
        let row = csv::format_row(fields, delimiter, enclosure);
        self.write(row.as_bytes())
    }

    /// Flush buffered writes to the backing store.
    fn flush(&mut self) -> DriverResult<()>;

    /// Take an advisory lock on the handle.
    fn lock(&mut self, mode: LockMode) -> DriverResult<()>;

    /// Release the advisory lock.
    fn unlock(&mut self) -> DriverResult<()>;

    /// Close the handle, flushing first. Consumes the handle; errors here
    /// mean buffered data may not have reached the backing store.
    fn close(self: Box<Self>) -> DriverResult<()>;
}
