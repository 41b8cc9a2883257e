//! Local filesystem driver.
//!
//! Wraps the OS filesystem primitives behind the [`Driver`] contract. Every
//! OS call captures its own error value at the call site; the captured text
//! travels inside the raised [`FileSystemError`] together with a template
//! naming the operation and the target path.
//!
//! The driver holds an optional URI scheme set at construction. A non-empty
//! scheme is prefixed (as `scheme://`) onto every path handed to the OS
//! layer, for backends reached through wrapped stream protocols; the default
//! empty scheme addresses the plain local filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;

use super::{transfer_contents, Driver, DriverKind, Metadata, WriteMode};
use crate::error::{DriverResult, FileSystemError};
use crate::glob;
use crate::paths;
use crate::stream::{FileStream, LockMode, OpenMode};

/// Driver for the local OS filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileDriver {
    scheme: String,
}

impl FileDriver {
    /// Driver for the plain local filesystem (empty scheme).
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver whose paths are prefixed with `scheme://` before reaching the
    /// OS layer.
    pub fn with_scheme(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    /// The configured scheme, empty for the local filesystem.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn prefixed(&self, path: &str) -> String {
        if self.scheme.is_empty() {
            path.to_string()
        } else {
            format!("{}://{path}", self.scheme)
        }
    }

    /// Boolean metadata query with the legitimate-false vs. raised-error
    /// distinction: missing paths answer `false`, anything else that fails
    /// raises with the captured OS text.
    fn query_metadata(
        &self,
        path: &str,
        what: &str,
        check: impl Fn(&fs::Metadata) -> bool,
    ) -> DriverResult<bool> {
        match fs::metadata(self.prefixed(path)) {
            Ok(meta) => Ok(check(&meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileSystemError::io(
                format!("cannot check whether \"{path}\" is {what}"),
                e,
            )),
        }
    }

    fn list_into(&self, path: &str, out: &mut Vec<String>) -> DriverResult<()> {
        for entry in self.read_directory(path)? {
            let is_dir = fs::symlink_metadata(&entry)
                .map(|m| m.file_type().is_dir())
                .unwrap_or(false);
            if is_dir {
                self.list_into(&entry, out)?;
            }
            out.push(entry);
        }
        Ok(())
    }
}

impl Driver for FileDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::File
    }

    // ── Queries ────────────────────────────────────────────────────────────

    fn is_exists(&self, path: &str) -> DriverResult<bool> {
        Path::new(&self.prefixed(path)).try_exists().map_err(|e| {
            FileSystemError::io(format!("cannot check existence of \"{path}\""), e)
        })
    }

    fn stat(&self, path: &str) -> DriverResult<Metadata> {
        let full = self.prefixed(path);
        let meta = fs::metadata(&full)
            .map_err(|e| FileSystemError::io(format!("cannot gather stats for \"{path}\""), e))?;
        let is_symlink = fs::symlink_metadata(&full)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        Ok(build_metadata(&meta, is_symlink))
    }

    fn is_readable(&self, path: &str) -> DriverResult<bool> {
        access_check(&self.prefixed(path), AccessMode::Read)
            .map_err(|e| FileSystemError::io(format!("cannot check readability of \"{path}\""), e))
    }

    fn is_file(&self, path: &str) -> DriverResult<bool> {
        self.query_metadata(path, "a file", |m| m.is_file())
    }

    fn is_directory(&self, path: &str) -> DriverResult<bool> {
        self.query_metadata(path, "a directory", |m| m.is_dir())
    }

    fn is_writable(&self, path: &str) -> DriverResult<bool> {
        access_check(&self.prefixed(path), AccessMode::Write)
            .map_err(|e| FileSystemError::io(format!("cannot check writability of \"{path}\""), e))
    }

    fn real_path(&self, path: &str) -> Option<String> {
        fs::canonicalize(self.prefixed(path))
            .ok()
            .map(|p| paths::fix_separator(&p.to_string_lossy()))
    }

    // ── Enumeration ────────────────────────────────────────────────────────

    fn read_directory(&self, path: &str) -> DriverResult<Vec<String>> {
        let full = self.prefixed(path);
        let context = || format!("cannot read directory \"{path}\"");
        let entries = fs::read_dir(&full).map_err(|e| FileSystemError::io(context(), e))?;
        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FileSystemError::io(context(), e))?;
            result.push(paths::fix_separator(&entry.path().to_string_lossy()));
        }
        // Listing order from the OS is not assumed stable.
        result.sort();
        Ok(result)
    }

    fn read_directory_recursively(&self, path: &str) -> DriverResult<Vec<String>> {
        let mut result = Vec::new();
        self.list_into(path, &mut result)?;
        Ok(result)
    }

    fn search(&self, pattern: &str, path: &str) -> Vec<String> {
        let full = format!(
            "{}/{}",
            path.trim_end_matches('/'),
            pattern.trim_start_matches('/')
        );
        let mut results = Vec::new();
        for expanded in glob::expand_braces(&paths::fix_separator(&full)) {
            glob_walk(&expanded, &mut results);
        }
        results.sort();
        results.dedup();
        results
    }

    // ── Mutation ───────────────────────────────────────────────────────────

    fn create_directory(&self, path: &str, permissions: u32) -> DriverResult<()> {
        let full = self.prefixed(path);
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(permissions);
        }
        #[cfg(not(unix))]
        let _ = permissions;
        builder
            .create(&full)
            .map_err(|e| FileSystemError::io(format!("directory \"{path}\" cannot be created"), e))
    }

    fn delete_file(&self, path: &str) -> DriverResult<()> {
        fs::remove_file(self.prefixed(path))
            .map_err(|e| FileSystemError::io(format!("the file \"{path}\" cannot be deleted"), e))
    }

    fn delete_directory(&self, path: &str) -> DriverResult<()> {
        tracing::trace!(path, "recursive directory delete");
        for entry in self.read_directory(path)? {
            let meta = fs::symlink_metadata(&entry).map_err(|e| {
                FileSystemError::io(format!("the directory \"{path}\" cannot be deleted"), e)
            })?;
            if meta.file_type().is_dir() {
                self.delete_directory(&entry)?;
            } else {
                self.delete_file(&entry)?;
            }
        }
        fs::remove_dir(self.prefixed(path)).map_err(|e| {
            FileSystemError::io(format!("the directory \"{path}\" cannot be deleted"), e)
        })
    }

    #[cfg(unix)]
    fn change_permissions(&self, path: &str, permissions: u32) -> DriverResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.prefixed(path), fs::Permissions::from_mode(permissions)).map_err(
            |e| FileSystemError::io(format!("cannot change permissions for path \"{path}\""), e),
        )
    }

    #[cfg(not(unix))]
    fn change_permissions(&self, path: &str, _permissions: u32) -> DriverResult<()> {
        Err(FileSystemError::Unsupported(format!(
            "cannot change permissions for path \"{path}\" on this platform"
        )))
    }

    fn change_permissions_recursively(
        &self,
        path: &str,
        dir_permissions: u32,
        file_permissions: u32,
    ) -> DriverResult<()> {
        if self.is_directory(path)? {
            for entry in self.read_directory(path)? {
                self.change_permissions_recursively(&entry, dir_permissions, file_permissions)?;
            }
            self.change_permissions(path, dir_permissions)
        } else {
            self.change_permissions(path, file_permissions)
        }
    }

    fn touch(&self, path: &str, modification_time: Option<SystemTime>) -> DriverResult<()> {
        let full = self.prefixed(path);
        let context = || format!("the file or directory \"{path}\" cannot be touched");
        let exists = Path::new(&full)
            .try_exists()
            .map_err(|e| FileSystemError::io(context(), e))?;
        if !exists {
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&full)
                .map_err(|e| FileSystemError::io(context(), e))?;
        }
        let time = match modification_time {
            Some(t) => FileTime::from_system_time(t),
            None => FileTime::now(),
        };
        filetime::set_file_times(&full, time, time)
            .map_err(|e| FileSystemError::io(context(), e))
    }

    fn rename(
        &self,
        old_path: &str,
        new_path: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        match target {
            Some(t) if t.kind() != self.kind() => {
                transfer_contents(self, old_path, t, new_path)?;
                // Source is removed only once the destination write landed.
                self.delete_file(old_path)
            }
            _ => fs::rename(self.prefixed(old_path), self.prefixed(new_path)).map_err(|e| {
                FileSystemError::io(
                    format!("the path \"{old_path}\" cannot be renamed into \"{new_path}\""),
                    e,
                )
            }),
        }
    }

    fn copy(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        match target {
            Some(t) if t.kind() != self.kind() => {
                transfer_contents(self, source, t, destination)?;
                Ok(())
            }
            _ => fs::copy(self.prefixed(source), self.prefixed(destination))
                .map(|_| ())
                .map_err(|e| {
                    FileSystemError::io(
                        format!(
                            "the file or directory \"{source}\" cannot be copied to \"{destination}\""
                        ),
                        e,
                    )
                }),
        }
    }

    fn symlink(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        if let Some(t) = target {
            if t.kind() != self.kind() {
                return Err(FileSystemError::Unsupported(format!(
                    "cannot create a symlink for \"{source}\" and place it to \"{destination}\": \
                     source and destination drivers are of different kinds"
                )));
            }
        }
        symlink_native(&self.prefixed(source), &self.prefixed(destination)).map_err(|e| {
            FileSystemError::io(
                format!(
                    "cannot create a symlink for \"{source}\" and place it to \"{destination}\""
                ),
                e,
            )
        })
    }

    fn create_hard_link(&self, source: &str, destination: &str) -> DriverResult<()> {
        fs::hard_link(self.prefixed(source), self.prefixed(destination)).map_err(|e| {
            FileSystemError::io(
                format!("cannot create a hard link for \"{source}\" at \"{destination}\""),
                e,
            )
        })
    }

    // ── One-shot content transfer ──────────────────────────────────────────

    fn file_get_contents(&self, path: &str) -> DriverResult<Vec<u8>> {
        fs::read(self.prefixed(path)).map_err(|e| {
            FileSystemError::io(format!("cannot read contents from file \"{path}\""), e)
        })
    }

    fn file_put_contents(
        &self,
        path: &str,
        content: &[u8],
        mode: Option<WriteMode>,
    ) -> DriverResult<usize> {
        let context = || format!("the specified \"{path}\" file could not be written");
        let mut options = OpenOptions::new();
        options.write(true);
        match mode.unwrap_or_default() {
            WriteMode::Overwrite => options.create(true).truncate(true),
            WriteMode::Append => options.create(true).append(true),
            WriteMode::CreateNew => options.create_new(true),
        };
        let mut file = options
            .open(self.prefixed(path))
            .map_err(|e| FileSystemError::io(context(), e))?;
        file.write_all(content)
            .map_err(|e| FileSystemError::io(context(), e))?;
        Ok(content.len())
    }

    // ── Streams ────────────────────────────────────────────────────────────

    fn file_open(&self, path: &str, mode: OpenMode) -> DriverResult<Box<dyn FileStream>> {
        let mut options = OpenOptions::new();
        options
            .read(mode.readable())
            .write(mode.writable() && !mode.append())
            .append(mode.append())
            .truncate(mode.truncate())
            .create(mode.create() && !mode.create_new())
            .create_new(mode.create_new());
        let file = options
            .open(self.prefixed(path))
            .map_err(|e| FileSystemError::io(format!("file \"{path}\" cannot be opened"), e))?;
        Ok(Box::new(LocalStream {
            file,
            path: path.to_string(),
            writable: mode.writable(),
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Local stream handle
// ═══════════════════════════════════════════════════════════════════════════

struct LocalStream {
    file: File,
    path: String,
    writable: bool,
}

impl LocalStream {
    fn ctx(&self, what: &str) -> String {
        format!("{what} \"{}\"", self.path)
    }
}

impl FileStream for LocalStream {
    fn read(&mut self, length: usize) -> DriverResult<Vec<u8>> {
        let mut buf = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FileSystemError::io(self.ctx("cannot read from file"), e)),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn read_byte(&mut self) -> DriverResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.file.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FileSystemError::io(self.ctx("cannot read from file"), e)),
            }
        }
    }

    fn tell(&mut self) -> DriverResult<u64> {
        self.file
            .stream_position()
            .map_err(|e| FileSystemError::io(self.ctx("cannot tell position in file"), e))
    }

    fn seek(&mut self, pos: SeekFrom) -> DriverResult<u64> {
        self.file
            .seek(pos)
            .map_err(|e| FileSystemError::io(self.ctx("cannot seek in file"), e))
    }

    fn eof(&mut self) -> bool {
        let Ok(pos) = self.file.stream_position() else {
            return true;
        };
        match self.file.metadata() {
            Ok(meta) => pos >= meta.len(),
            Err(_) => true,
        }
    }

    fn write(&mut self, data: &[u8]) -> DriverResult<usize> {
        self.file
            .write_all(data)
            .map_err(|e| FileSystemError::io(self.ctx("cannot write to file"), e))?;
        Ok(data.len())
    }

    fn flush(&mut self) -> DriverResult<()> {
        self.file
            .flush()
            .map_err(|e| FileSystemError::io(self.ctx("cannot flush file"), e))
    }

    fn lock(&mut self, mode: LockMode) -> DriverResult<()> {
        flock(&self.file, lock_operation(mode)).map_err(|e| {
            tracing::debug!(path = %self.path, ?mode, "lock attempt failed");
            FileSystemError::io(self.ctx("cannot lock file"), e)
        })
    }

    fn unlock(&mut self) -> DriverResult<()> {
        #[cfg(unix)]
        {
            flock(&self.file, libc::LOCK_UN)
                .map_err(|e| FileSystemError::io(self.ctx("cannot unlock file"), e))
        }
        #[cfg(not(unix))]
        {
            Err(FileSystemError::Unsupported(
                self.ctx("cannot unlock file"),
            ))
        }
    }

    fn close(mut self: Box<Self>) -> DriverResult<()> {
        self.file
            .flush()
            .map_err(|e| FileSystemError::io(self.ctx("cannot close file"), e))?;
        // The fd itself closes in Drop, which cannot report; syncing a
        // writable handle here surfaces deferred write errors instead.
        if self.writable {
            self.file
                .sync_all()
                .map_err(|e| FileSystemError::io(self.ctx("cannot close file"), e))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn lock_operation(mode: LockMode) -> libc::c_int {
    match mode {
        LockMode::Shared => libc::LOCK_SH,
        LockMode::Exclusive => libc::LOCK_EX,
        LockMode::SharedNonBlocking => libc::LOCK_SH | libc::LOCK_NB,
        LockMode::ExclusiveNonBlocking => libc::LOCK_EX | libc::LOCK_NB,
    }
}

#[cfg(not(unix))]
fn lock_operation(_mode: LockMode) -> i32 {
    0
}

#[cfg(unix)]
fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn flock(_file: &File, _operation: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "advisory locks are not supported on this platform",
    ))
}

// ═══════════════════════════════════════════════════════════════════════════
// OS helpers
// ═══════════════════════════════════════════════════════════════════════════

enum AccessMode {
    Read,
    Write,
}

/// Ask the OS whether the current process may read/write the path. A missing
/// path or denied access is a legitimate `false`; unexpected errno values
/// propagate so the caller can raise.
#[cfg(unix)]
fn access_check(path: &str, mode: AccessMode) -> io::Result<bool> {
    use std::ffi::CString;
    let cpath = CString::new(path)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))?;
    let flag = match mode {
        AccessMode::Read => libc::R_OK,
        AccessMode::Write => libc::W_OK,
    };
    let rc = unsafe { libc::access(cpath.as_ptr(), flag) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EACCES) | Some(libc::ENOENT) | Some(libc::ENOTDIR) | Some(libc::EROFS) => {
            Ok(false)
        }
        _ => Err(err),
    }
}

#[cfg(not(unix))]
fn access_check(path: &str, mode: AccessMode) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(match mode {
            AccessMode::Read => true,
            AccessMode::Write => !meta.permissions().readonly(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink_native(source: &str, destination: &str) -> io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(windows)]
fn symlink_native(source: &str, destination: &str) -> io::Result<()> {
    if Path::new(source).is_dir() {
        std::os::windows::fs::symlink_dir(source, destination)
    } else {
        std::os::windows::fs::symlink_file(source, destination)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink_native(_source: &str, _destination: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

fn build_metadata(meta: &fs::Metadata, is_symlink: bool) -> Metadata {
    let (mode, inode, nlink, uid, gid) = owner_bits(meta);
    Metadata {
        is_dir: meta.is_dir(),
        is_file: meta.is_file(),
        is_symlink,
        size: meta.len(),
        mode,
        modified: meta.modified().ok(),
        accessed: meta.accessed().ok(),
        inode,
        nlink,
        uid,
        gid,
    }
}

#[cfg(unix)]
fn owner_bits(
    meta: &fs::Metadata,
) -> (Option<u32>, Option<u64>, Option<u64>, Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (
        Some(meta.mode()),
        Some(meta.ino()),
        Some(meta.nlink()),
        Some(meta.uid()),
        Some(meta.gid()),
    )
}

#[cfg(not(unix))]
fn owner_bits(
    _meta: &fs::Metadata,
) -> (Option<u32>, Option<u64>, Option<u64>, Option<u32>, Option<u32>) {
    (None, None, None, None, None)
}

/// Walk one expanded glob pattern, pushing every matching path. Any OS error
/// along the way is treated as "no matches here" — search never raises.
fn glob_walk(pattern: &str, out: &mut Vec<String>) {
    let anchored = pattern.starts_with('/');
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return;
    }

    let mut current: Vec<String> = vec![if anchored { "/" } else { "." }.to_string()];
    for segment in &segments {
        let literal = !segment.contains(['*', '?', '[']);
        let mut next = Vec::new();
        for base in &current {
            if literal {
                let candidate = join_segment(base, segment);
                if fs::symlink_metadata(&candidate).is_ok() {
                    next.push(candidate);
                }
            } else {
                let Ok(entries) = fs::read_dir(base) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if glob::glob_match(segment, &name) {
                        next.push(join_segment(base, &name));
                    }
                }
            }
        }
        current = next;
        if current.is_empty() {
            return;
        }
    }
    out.append(&mut current);
}

fn join_segment(base: &str, name: &str) -> String {
    match base {
        "/" => format!("/{name}"),
        "." => name.to_string(),
        _ => format!("{base}/{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, UNIX_EPOCH};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> String {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!(
            "fsdriver-test-{}-{}",
            std::process::id(),
            id
        ));
        dir.to_string_lossy().into_owned()
    }

    fn setup() -> (FileDriver, String) {
        let dir = temp_dir();
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        (FileDriver::new(), dir)
    }

    fn cleanup(dir: &str) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn queries_on_missing_paths_are_false_not_errors() {
        let (driver, dir) = setup();
        let missing = format!("{dir}/nothing-here");

        assert!(!driver.is_exists(&missing).unwrap());
        assert!(!driver.is_file(&missing).unwrap());
        assert!(!driver.is_directory(&missing).unwrap());
        assert!(!driver.is_readable(&missing).unwrap());
        assert!(!driver.is_writable(&missing).unwrap());

        cleanup(&dir);
    }

    #[test]
    fn put_get_contents_round_trip() {
        let (driver, dir) = setup();
        let path = format!("{dir}/blob.bin");
        let content: Vec<u8> = (0..=255u8).collect();

        let written = driver.file_put_contents(&path, &content, None).unwrap();
        assert_eq!(written, 256);
        assert_eq!(driver.file_get_contents(&path).unwrap(), content);

        cleanup(&dir);
    }

    #[test]
    fn put_contents_empty_content_is_trivially_successful() {
        let (driver, dir) = setup();
        let path = format!("{dir}/empty.txt");

        assert_eq!(driver.file_put_contents(&path, b"", None).unwrap(), 0);
        assert!(driver.is_file(&path).unwrap());

        cleanup(&dir);
    }

    #[test]
    fn put_contents_append_and_create_new() {
        let (driver, dir) = setup();
        let path = format!("{dir}/log.txt");

        driver.file_put_contents(&path, b"one", None).unwrap();
        driver
            .file_put_contents(&path, b"-two", Some(WriteMode::Append))
            .unwrap();
        assert_eq!(driver.file_get_contents(&path).unwrap(), b"one-two");

        let result = driver.file_put_contents(&path, b"x", Some(WriteMode::CreateNew));
        assert!(matches!(result, Err(FileSystemError::AlreadyExists(_))));

        cleanup(&dir);
    }

    #[test]
    fn get_contents_on_missing_file_raises_not_found() {
        let (driver, dir) = setup();
        let result = driver.file_get_contents(&format!("{dir}/absent"));
        match result {
            Err(FileSystemError::NotFound(msg)) => {
                assert!(msg.contains("cannot read contents from file"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        cleanup(&dir);
    }

    #[test]
    fn read_directory_is_sorted() {
        let (driver, dir) = setup();
        for name in ["b", "a", "c"] {
            driver
                .file_put_contents(&format!("{dir}/{name}"), b"x", None)
                .unwrap();
        }

        let listed = driver.read_directory(&dir).unwrap();
        let names: Vec<&str> = listed
            .iter()
            .map(|p| p.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        cleanup(&dir);
    }

    #[test]
    fn recursive_listing_is_child_first() {
        let (driver, dir) = setup();
        driver
            .file_put_contents(&format!("{dir}/f1"), b"1", None)
            .unwrap();
        driver.create_directory(&format!("{dir}/sub"), 0o755).unwrap();
        driver
            .file_put_contents(&format!("{dir}/sub/f2"), b"2", None)
            .unwrap();

        let listed = driver.read_directory_recursively(&dir).unwrap();
        let f2_pos = listed.iter().position(|p| p.ends_with("/f2")).unwrap();
        let sub_pos = listed.iter().position(|p| p.ends_with("/sub")).unwrap();
        assert!(f2_pos < sub_pos, "children must precede their parent: {listed:?}");
        assert_eq!(listed.len(), 3);
        // The root itself is not part of the listing.
        assert!(!listed.iter().any(|p| p == &dir));

        cleanup(&dir);
    }

    #[test]
    fn delete_directory_removes_whole_tree() {
        let (driver, dir) = setup();
        let root = format!("{dir}/tree");
        driver.create_directory(&format!("{root}/a/b"), 0o755).unwrap();
        driver
            .file_put_contents(&format!("{root}/a/b/f"), b"x", None)
            .unwrap();
        driver
            .file_put_contents(&format!("{root}/top"), b"y", None)
            .unwrap();

        driver.delete_directory(&root).unwrap();
        assert!(!driver.is_exists(&root).unwrap());

        cleanup(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn delete_directory_with_unremovable_descendant_leaves_root() {
        // Permission bits do not constrain uid 0; nothing to observe there.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let (driver, dir) = setup();
        let root = format!("{dir}/tree");
        let sub = format!("{root}/sub");
        driver.create_directory(&sub, 0o755).unwrap();
        driver
            .file_put_contents(&format!("{sub}/f"), b"x", None)
            .unwrap();
        driver.change_permissions(&sub, 0o555).unwrap();

        assert!(driver.delete_directory(&root).is_err());
        assert!(driver.is_directory(&root).unwrap());
        assert!(driver.is_file(&format!("{sub}/f")).unwrap());

        driver.change_permissions(&sub, 0o755).unwrap();
        cleanup(&dir);
    }

    #[test]
    fn delete_directory_on_missing_path_raises() {
        let (driver, dir) = setup();
        let result = driver.delete_directory(&format!("{dir}/absent"));
        assert!(matches!(result, Err(FileSystemError::NotFound(_))));
        cleanup(&dir);
    }

    #[test]
    fn delete_file_on_directory_raises_and_leaves_it() {
        let (driver, dir) = setup();
        let sub = format!("{dir}/sub");
        driver.create_directory(&sub, 0o755).unwrap();

        assert!(driver.delete_file(&sub).is_err());
        assert!(driver.is_directory(&sub).unwrap());

        cleanup(&dir);
    }

    #[test]
    fn rename_and_copy_native() {
        let (driver, dir) = setup();
        let src = format!("{dir}/src.txt");
        driver.file_put_contents(&src, b"payload", None).unwrap();

        let moved = format!("{dir}/moved.txt");
        driver.rename(&src, &moved, None).unwrap();
        assert!(!driver.is_exists(&src).unwrap());
        assert_eq!(driver.file_get_contents(&moved).unwrap(), b"payload");

        let copied = format!("{dir}/copied.txt");
        driver.copy(&moved, &copied, None).unwrap();
        assert_eq!(driver.file_get_contents(&copied).unwrap(), b"payload");
        assert!(driver.is_exists(&moved).unwrap());

        cleanup(&dir);
    }

    #[test]
    fn rename_missing_source_raises() {
        let (driver, dir) = setup();
        let result = driver.rename(
            &format!("{dir}/nope"),
            &format!("{dir}/other"),
            None,
        );
        assert!(matches!(result, Err(FileSystemError::NotFound(_))));
        cleanup(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_same_kind() {
        let (driver, dir) = setup();
        let target = format!("{dir}/target.txt");
        let link = format!("{dir}/link.txt");
        driver.file_put_contents(&target, b"linked", None).unwrap();

        driver.symlink(&target, &link, None).unwrap();
        assert_eq!(driver.file_get_contents(&link).unwrap(), b"linked");
        assert!(driver.stat(&link).unwrap().is_symlink);

        cleanup(&dir);
    }

    #[test]
    fn hard_link_shares_content() {
        let (driver, dir) = setup();
        let original = format!("{dir}/orig");
        let link = format!("{dir}/hard");
        driver.file_put_contents(&original, b"shared", None).unwrap();

        driver.create_hard_link(&original, &link).unwrap();
        driver
            .file_put_contents(&original, b"updated", None)
            .unwrap();
        assert_eq!(driver.file_get_contents(&link).unwrap(), b"updated");
        assert_eq!(driver.stat(&link).unwrap().nlink, Some(2));

        cleanup(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn change_permissions_single_and_recursive() {
        let (driver, dir) = setup();
        let root = format!("{dir}/perms");
        driver.create_directory(&root, 0o755).unwrap();
        let file = format!("{root}/f");
        driver.file_put_contents(&file, b"x", None).unwrap();

        driver.change_permissions(&file, 0o640).unwrap();
        assert_eq!(driver.stat(&file).unwrap().mode.unwrap() & 0o777, 0o640);

        driver
            .change_permissions_recursively(&root, 0o750, 0o600)
            .unwrap();
        assert_eq!(driver.stat(&file).unwrap().mode.unwrap() & 0o777, 0o600);
        assert_eq!(driver.stat(&root).unwrap().mode.unwrap() & 0o777, 0o750);

        cleanup(&dir);
    }

    #[test]
    fn touch_sets_explicit_modification_time() {
        let (driver, dir) = setup();
        let path = format!("{dir}/stamped");
        let when = UNIX_EPOCH + Duration::from_secs(1_600_000_000);

        driver.touch(&path, Some(when)).unwrap();
        let meta = driver.stat(&path).unwrap();
        assert_eq!(meta.modified.unwrap(), when);

        // Touch without a time refreshes to roughly now.
        driver.touch(&path, None).unwrap();
        let refreshed = driver.stat(&path).unwrap().modified.unwrap();
        assert!(refreshed > when);

        cleanup(&dir);
    }

    #[test]
    fn real_path_resolves_only_existing_paths() {
        let (driver, dir) = setup();
        let file = format!("{dir}/real");
        driver.file_put_contents(&file, b"x", None).unwrap();

        assert!(driver.real_path(&file).is_some());
        assert!(driver.real_path(&format!("{dir}/ghost")).is_none());

        cleanup(&dir);
    }

    #[test]
    fn search_with_globs_and_braces() {
        let (driver, dir) = setup();
        for name in ["a.csv", "b.csv", "c.txt"] {
            driver
                .file_put_contents(&format!("{dir}/{name}"), b"x", None)
                .unwrap();
        }
        driver.create_directory(&format!("{dir}/sub"), 0o755).unwrap();
        driver
            .file_put_contents(&format!("{dir}/sub/d.csv"), b"x", None)
            .unwrap();

        let csvs = driver.search("*.csv", &dir);
        assert_eq!(csvs.len(), 2);
        assert!(csvs.iter().all(|p| p.ends_with(".csv")));

        let both = driver.search("*.{csv,txt}", &dir);
        assert_eq!(both.len(), 3);

        let nested = driver.search("sub/*.csv", &dir);
        assert_eq!(nested.len(), 1);
        assert!(nested[0].ends_with("sub/d.csv"));

        // Failures degrade to empty, never raise.
        assert!(driver.search("*", &format!("{dir}/no-such-dir")).is_empty());

        cleanup(&dir);
    }

    #[test]
    fn stream_write_seek_read_tell_eof() {
        let (driver, dir) = setup();
        let path = format!("{dir}/stream.bin");

        let mut handle = driver.file_open(&path, OpenMode::WriteRead).unwrap();
        assert_eq!(handle.write(b"0123456789").unwrap(), 10);
        assert_eq!(handle.tell().unwrap(), 10);
        assert!(handle.eof());

        assert_eq!(handle.seek(SeekFrom::Start(2)).unwrap(), 2);
        assert!(!handle.eof());
        assert_eq!(handle.read(4).unwrap(), b"2345");
        assert_eq!(handle.tell().unwrap(), 6);

        // Reads past the end come back short, not as errors.
        assert_eq!(handle.seek(SeekFrom::End(-2)).unwrap(), 8);
        assert_eq!(handle.read(100).unwrap(), b"89");

        handle.flush().unwrap();
        handle.close().unwrap();

        cleanup(&dir);
    }

    #[test]
    fn close_persists_pending_writes() {
        let (driver, dir) = setup();
        let path = format!("{dir}/out.bin");

        let mut handle = driver.file_open(&path, OpenMode::Write).unwrap();
        handle.write(b"durable").unwrap();
        handle.close().unwrap();

        assert_eq!(driver.file_get_contents(&path).unwrap(), b"durable");

        // A read-only handle closes cleanly too.
        let handle = driver.file_open(&path, OpenMode::Read).unwrap();
        handle.close().unwrap();

        cleanup(&dir);
    }

    #[test]
    fn stream_read_line_with_custom_ending() {
        let (driver, dir) = setup();
        let path = format!("{dir}/lines.txt");
        driver
            .file_put_contents(&path, b"alpha\nbeta;gamma", None)
            .unwrap();

        let mut handle = driver.file_open(&path, OpenMode::Read).unwrap();
        assert_eq!(handle.read_line(0, None).unwrap(), "alpha");
        assert_eq!(handle.read_line(0, Some(';')).unwrap(), "beta");
        assert_eq!(handle.read_line(2, None).unwrap(), "ga");
        handle.close().unwrap();

        cleanup(&dir);
    }

    #[test]
    fn stream_open_missing_file_for_read_raises() {
        let (driver, dir) = setup();
        let result = driver.file_open(&format!("{dir}/nope"), OpenMode::Read);
        assert!(matches!(result, Err(FileSystemError::NotFound(_))));
        cleanup(&dir);
    }

    #[test]
    fn stream_csv_round_trip_with_formula_guard() {
        let (driver, dir) = setup();
        let path = format!("{dir}/rows.csv");

        let mut out = driver.file_open(&path, OpenMode::Write).unwrap();
        out.put_csv(&["=1+1", "ok", "5"], ',', '"').unwrap();
        out.put_csv(&["a,b", "plain"], ',', '"').unwrap();
        out.close().unwrap();

        let raw = driver.file_get_contents(&path).unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with(" =1+1,ok,5\n"));

        let mut input = driver.file_open(&path, OpenMode::Read).unwrap();
        let first = input.get_csv(',', '"', '\\').unwrap().unwrap();
        assert_eq!(first, vec![" =1+1", "ok", "5"]);
        let second = input.get_csv(',', '"', '\\').unwrap().unwrap();
        assert_eq!(second, vec!["a,b", "plain"]);
        assert!(input.get_csv(',', '"', '\\').unwrap().is_none());
        input.close().unwrap();

        cleanup(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn advisory_lock_contention_is_visible_to_second_handle() {
        let (driver, dir) = setup();
        let path = format!("{dir}/locked");
        driver.file_put_contents(&path, b"x", None).unwrap();

        let mut first = driver.file_open(&path, OpenMode::ReadWrite).unwrap();
        first.lock(LockMode::Exclusive).unwrap();

        let mut second = driver.file_open(&path, OpenMode::ReadWrite).unwrap();
        assert!(second.lock(LockMode::ExclusiveNonBlocking).is_err());

        first.unlock().unwrap();
        second.lock(LockMode::ExclusiveNonBlocking).unwrap();
        second.unlock().unwrap();

        first.close().unwrap();
        second.close().unwrap();
        cleanup(&dir);
    }

    #[test]
    fn scheme_prefix_is_applied() {
        let driver = FileDriver::with_scheme("zip");
        assert_eq!(driver.scheme(), "zip");
        assert_eq!(driver.prefixed("/a/b"), "zip:///a/b");
        assert_eq!(FileDriver::new().prefixed("/a/b"), "/a/b");
    }
}
