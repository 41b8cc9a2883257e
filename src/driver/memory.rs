//! In-memory filesystem driver.
//!
//! Backs the full [`Driver`] contract with a process-local tree of nodes.
//! Useful as a test double and as the second driver kind when exercising
//! cross-driver rename/copy paths. Clones share the same store.

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::{transfer_contents, Driver, DriverKind, Metadata, WriteMode};
use crate::error::{DriverResult, FileSystemError};
use crate::glob;
use crate::paths;
use crate::stream::{FileStream, LockMode, OpenMode};

const SYMLINK_DEPTH: usize = 16;

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Arc<Mutex<Vec<u8>>>,
        mode: u32,
        mtime: SystemTime,
    },
    Directory {
        mode: u32,
        mtime: SystemTime,
    },
    Symlink {
        target: String,
    },
}

#[derive(Debug, Default)]
struct Store {
    nodes: BTreeMap<String, Node>,
}

/// In-memory driver. All paths are normalized to absolute `/`-separated
/// keys; the root directory always exists.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    store: Arc<Mutex<Store>>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    pub fn new() -> Self {
        let mut store = Store::default();
        store.nodes.insert(
            "/".to_string(),
            Node::Directory {
                mode: 0o755,
                mtime: SystemTime::now(),
            },
        );
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, Store> {
        // A poisoned store mutex means a panic mid-mutation; the tree is
        // still usable for the operations this driver performs.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collapse a path to the canonical store key: absolute, `/`-separated, no
/// `.`/`..` segments, no trailing slash. Unlike the lexical helper in
/// [`paths`], empty and `.` segments are always dropped here so every
/// spelling of a path lands on the same key.
fn normalize(path: &str) -> String {
    let fixed = paths::fix_separator(path);
    let mut segments: Vec<&str> = Vec::new();
    for part in fixed.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn parent_key(key: &str) -> String {
    normalize(&paths::parent_directory(key))
}

fn child_prefix(key: &str) -> String {
    if key == "/" {
        "/".to_string()
    } else {
        format!("{key}/")
    }
}

impl Store {
    /// Follow symlink nodes up to a fixed depth; returns the final key.
    fn resolve(&self, key: &str) -> String {
        let mut current = key.to_string();
        for _ in 0..SYMLINK_DEPTH {
            match self.nodes.get(&current) {
                Some(Node::Symlink { target }) => current = normalize(target),
                _ => break,
            }
        }
        current
    }

    fn get(&self, key: &str) -> Option<&Node> {
        let resolved = self.resolve(key);
        self.nodes.get(&resolved)
    }

    fn children(&self, key: &str) -> Vec<String> {
        let prefix = child_prefix(key);
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn require_directory(&self, key: &str, context: &str) -> DriverResult<()> {
        match self.get(key) {
            Some(Node::Directory { .. }) => Ok(()),
            Some(_) => Err(FileSystemError::NotDirectory(context.to_string())),
            None => Err(FileSystemError::NotFound(context.to_string())),
        }
    }

    fn require_parent(&self, key: &str, context: &str) -> DriverResult<()> {
        self.require_directory(&parent_key(key), context)
    }

    fn insert_file(&mut self, key: String, data: Vec<u8>) {
        self.nodes.insert(
            key,
            Node::File {
                data: Arc::new(Mutex::new(data)),
                mode: 0o644,
                mtime: SystemTime::now(),
            },
        );
    }
}

impl Driver for MemoryDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Memory
    }

    // ── Queries ────────────────────────────────────────────────────────────

    fn is_exists(&self, path: &str) -> DriverResult<bool> {
        Ok(self.lock_store().get(&normalize(path)).is_some())
    }

    fn stat(&self, path: &str) -> DriverResult<Metadata> {
        let key = normalize(path);
        let store = self.lock_store();
        let is_symlink = matches!(store.nodes.get(&key), Some(Node::Symlink { .. }));
        match store.get(&key) {
            Some(Node::File { data, mode, mtime }) => {
                let size = data.lock().unwrap_or_else(|e| e.into_inner()).len() as u64;
                Ok(Metadata {
                    is_dir: false,
                    is_file: true,
                    is_symlink,
                    size,
                    mode: Some(*mode),
                    modified: Some(*mtime),
                    accessed: Some(*mtime),
                    inode: None,
                    nlink: None,
                    uid: None,
                    gid: None,
                })
            }
            Some(Node::Directory { mode, mtime }) => Ok(Metadata {
                is_dir: true,
                is_file: false,
                is_symlink,
                size: 0,
                mode: Some(*mode),
                modified: Some(*mtime),
                accessed: Some(*mtime),
                inode: None,
                nlink: None,
                uid: None,
                gid: None,
            }),
            _ => Err(FileSystemError::NotFound(format!(
                "cannot gather stats for \"{path}\""
            ))),
        }
    }

    fn is_readable(&self, path: &str) -> DriverResult<bool> {
        self.is_exists(path)
    }

    fn is_file(&self, path: &str) -> DriverResult<bool> {
        Ok(matches!(
            self.lock_store().get(&normalize(path)),
            Some(Node::File { .. })
        ))
    }

    fn is_directory(&self, path: &str) -> DriverResult<bool> {
        Ok(matches!(
            self.lock_store().get(&normalize(path)),
            Some(Node::Directory { .. })
        ))
    }

    fn is_writable(&self, path: &str) -> DriverResult<bool> {
        self.is_exists(path)
    }

    fn real_path(&self, path: &str) -> Option<String> {
        let key = normalize(path);
        let store = self.lock_store();
        let resolved = store.resolve(&key);
        store.nodes.contains_key(&resolved).then_some(resolved)
    }

    // ── Enumeration ────────────────────────────────────────────────────────

    fn read_directory(&self, path: &str) -> DriverResult<Vec<String>> {
        let key = normalize(path);
        let store = self.lock_store();
        let context = format!("cannot read directory \"{path}\"");
        store.require_directory(&key, &context)?;
        Ok(store.children(&store.resolve(&key)))
    }

    fn read_directory_recursively(&self, path: &str) -> DriverResult<Vec<String>> {
        fn walk(driver: &MemoryDriver, path: &str, out: &mut Vec<String>) -> DriverResult<()> {
            for child in driver.read_directory(path)? {
                let is_dir = driver.is_directory(&child)?;
                if is_dir {
                    walk(driver, &child, out)?;
                }
                out.push(child);
            }
            Ok(())
        }
        let mut result = Vec::new();
        walk(self, path, &mut result)?;
        Ok(result)
    }

    fn search(&self, pattern: &str, path: &str) -> Vec<String> {
        let full = format!(
            "{}/{}",
            normalize(path).trim_end_matches('/'),
            pattern.trim_start_matches('/')
        );
        let store = self.lock_store();
        let mut results: Vec<String> = Vec::new();
        for expanded in glob::expand_braces(&full) {
            results.extend(
                store
                    .nodes
                    .keys()
                    .filter(|key| glob::path_match(&expanded, key))
                    .cloned(),
            );
        }
        results.sort();
        results.dedup();
        results
    }

    // ── Mutation ───────────────────────────────────────────────────────────

    fn create_directory(&self, path: &str, permissions: u32) -> DriverResult<()> {
        let key = normalize(path);
        let mut store = self.lock_store();
        // Create every missing ancestor, shallowest first.
        let mut pending = Vec::new();
        let mut current = key;
        loop {
            match store.nodes.get(&current) {
                Some(Node::Directory { .. }) => break,
                Some(_) => {
                    return Err(FileSystemError::AlreadyExists(format!(
                        "directory \"{path}\" cannot be created"
                    )))
                }
                None => {
                    pending.push(current.clone());
                    current = parent_key(&current);
                }
            }
        }
        for dir in pending.into_iter().rev() {
            store.nodes.insert(
                dir,
                Node::Directory {
                    mode: permissions,
                    mtime: SystemTime::now(),
                },
            );
        }
        Ok(())
    }

    fn delete_file(&self, path: &str) -> DriverResult<()> {
        let key = normalize(path);
        let context = format!("the file \"{path}\" cannot be deleted");
        let mut store = self.lock_store();
        match store.nodes.get(&key) {
            Some(Node::Directory { .. }) => Err(FileSystemError::IsDirectory(context)),
            Some(_) => {
                store.nodes.remove(&key);
                Ok(())
            }
            None => Err(FileSystemError::NotFound(context)),
        }
    }

    fn delete_directory(&self, path: &str) -> DriverResult<()> {
        let key = normalize(path);
        let context = format!("the directory \"{path}\" cannot be deleted");
        let mut store = self.lock_store();
        store.require_directory(&key, &context)?;
        let prefix = child_prefix(&key);
        let doomed: Vec<String> = store
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for k in doomed {
            store.nodes.remove(&k);
        }
        if key != "/" {
            store.nodes.remove(&key);
        }
        Ok(())
    }

    fn change_permissions(&self, path: &str, permissions: u32) -> DriverResult<()> {
        let key = normalize(path);
        let mut store = self.lock_store();
        let resolved = store.resolve(&key);
        match store.nodes.get_mut(&resolved) {
            Some(Node::File { mode, .. }) | Some(Node::Directory { mode, .. }) => {
                *mode = permissions;
                Ok(())
            }
            _ => Err(FileSystemError::NotFound(format!(
                "cannot change permissions for path \"{path}\""
            ))),
        }
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
        let key = normalize(path);
        let context = format!("the file or directory \"{path}\" cannot be touched");
        let time = modification_time.unwrap_or_else(SystemTime::now);
        let mut store = self.lock_store();
        let resolved = store.resolve(&key);
        match store.nodes.get_mut(&resolved) {
            Some(Node::File { mtime, .. }) | Some(Node::Directory { mtime, .. }) => {
                *mtime = time;
                Ok(())
            }
            Some(Node::Symlink { .. }) => Err(FileSystemError::NotFound(context)),
            None => {
                store.require_parent(&resolved, &context)?;
                store.nodes.insert(
                    resolved,
                    Node::File {
                        data: Arc::new(Mutex::new(Vec::new())),
                        mode: 0o644,
                        mtime: time,
                    },
                );
                Ok(())
            }
        }
    }

    fn rename(
        &self,
        old_path: &str,
        new_path: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        if let Some(t) = target {
            if t.kind() != self.kind() {
                transfer_contents(self, old_path, t, new_path)?;
                return self.delete_file(old_path);
            }
        }
        let old_key = normalize(old_path);
        let new_key = normalize(new_path);
        let context =
            format!("the path \"{old_path}\" cannot be renamed into \"{new_path}\"");
        let mut store = self.lock_store();
        if !store.nodes.contains_key(&old_key) {
            return Err(FileSystemError::NotFound(context));
        }
        if matches!(store.nodes.get(&new_key), Some(Node::Directory { .. })) {
            return Err(FileSystemError::IsDirectory(context));
        }
        store.require_parent(&new_key, &context)?;
        // Move the node and, for directories, its whole subtree.
        let prefix = child_prefix(&old_key);
        let moved: Vec<String> = store
            .nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        if let Some(node) = store.nodes.remove(&old_key) {
            store.nodes.insert(new_key.clone(), node);
        }
        for k in moved {
            if let Some(node) = store.nodes.remove(&k) {
                let relocated = format!("{}{}", child_prefix(&new_key), &k[prefix.len()..]);
                store.nodes.insert(relocated, node);
            }
        }
        Ok(())
    }

    fn copy(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        if let Some(t) = target {
            if t.kind() != self.kind() {
                transfer_contents(self, source, t, destination)?;
                return Ok(());
            }
        }
        let content = self.file_get_contents(source)?;
        let dest_key = normalize(destination);
        let context =
            format!("the file or directory \"{source}\" cannot be copied to \"{destination}\"");
        let mut store = self.lock_store();
        if matches!(store.nodes.get(&dest_key), Some(Node::Directory { .. })) {
            return Err(FileSystemError::IsDirectory(context));
        }
        store.require_parent(&dest_key, &context)?;
        store.insert_file(dest_key, content);
        Ok(())
    }

    fn symlink(
        &self,
        source: &str,
        destination: &str,
        target: Option<&dyn Driver>,
    ) -> DriverResult<()> {
        let context = format!(
            "cannot create a symlink for \"{source}\" and place it to \"{destination}\""
        );
        if let Some(t) = target {
            if t.kind() != self.kind() {
                return Err(FileSystemError::Unsupported(format!(
                    "{context}: source and destination drivers are of different kinds"
                )));
            }
        }
        let dest_key = normalize(destination);
        let mut store = self.lock_store();
        if store.nodes.contains_key(&dest_key) {
            return Err(FileSystemError::AlreadyExists(context));
        }
        store.require_parent(&dest_key, &context)?;
        store.nodes.insert(
            dest_key,
            Node::Symlink {
                target: normalize(source),
            },
        );
        Ok(())
    }

    fn create_hard_link(&self, source: &str, destination: &str) -> DriverResult<()> {
        let source_key = normalize(source);
        let dest_key = normalize(destination);
        let context =
            format!("cannot create a hard link for \"{source}\" at \"{destination}\"");
        let mut store = self.lock_store();
        if store.nodes.contains_key(&dest_key) {
            return Err(FileSystemError::AlreadyExists(context));
        }
        let resolved = store.resolve(&source_key);
        let node = match store.nodes.get(&resolved) {
            // Hard links alias the same backing data.
            Some(Node::File { data, mode, mtime }) => Node::File {
                data: Arc::clone(data),
                mode: *mode,
                mtime: *mtime,
            },
            Some(_) => return Err(FileSystemError::IsDirectory(context)),
            None => return Err(FileSystemError::NotFound(context)),
        };
        store.require_parent(&dest_key, &context)?;
        store.nodes.insert(dest_key, node);
        Ok(())
    }

    // ── One-shot content transfer ──────────────────────────────────────────

    fn file_get_contents(&self, path: &str) -> DriverResult<Vec<u8>> {
        let key = normalize(path);
        let context = format!("cannot read contents from file \"{path}\"");
        let store = self.lock_store();
        match store.get(&key) {
            Some(Node::File { data, .. }) => {
                Ok(data.lock().unwrap_or_else(|e| e.into_inner()).clone())
            }
            Some(_) => Err(FileSystemError::IsDirectory(context)),
            None => Err(FileSystemError::NotFound(context)),
        }
    }

    fn file_put_contents(
        &self,
        path: &str,
        content: &[u8],
        mode: Option<WriteMode>,
    ) -> DriverResult<usize> {
        let key = normalize(path);
        let context = format!("the specified \"{path}\" file could not be written");
        let mut store = self.lock_store();
        let resolved = store.resolve(&key);
        match (mode.unwrap_or_default(), store.nodes.get_mut(&resolved)) {
            (WriteMode::CreateNew, Some(_)) => Err(FileSystemError::AlreadyExists(context)),
            (_, Some(Node::Directory { .. })) => Err(FileSystemError::IsDirectory(context)),
            (WriteMode::Append, Some(Node::File { data, mtime, .. })) => {
                data.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(content);
                *mtime = SystemTime::now();
                Ok(content.len())
            }
            (WriteMode::Overwrite, Some(Node::File { data, mtime, .. })) => {
                let mut guard = data.lock().unwrap_or_else(|e| e.into_inner());
                guard.clear();
                guard.extend_from_slice(content);
                *mtime = SystemTime::now();
                Ok(content.len())
            }
            (_, Some(Node::Symlink { .. })) => Err(FileSystemError::NotFound(context)),
            (_, None) => {
                store.require_parent(&resolved, &context)?;
                store.insert_file(resolved, content.to_vec());
                Ok(content.len())
            }
        }
    }

    // ── Streams ────────────────────────────────────────────────────────────

    fn file_open(&self, path: &str, mode: OpenMode) -> DriverResult<Box<dyn FileStream>> {
        let key = normalize(path);
        let context = format!("file \"{path}\" cannot be opened");
        let mut store = self.lock_store();
        let resolved = store.resolve(&key);
        let data = match store.nodes.get(&resolved) {
            Some(Node::File { data, .. }) => {
                if mode.create_new() {
                    return Err(FileSystemError::AlreadyExists(context));
                }
                if mode.truncate() {
                    data.lock().unwrap_or_else(|e| e.into_inner()).clear();
                }
                Arc::clone(data)
            }
            Some(_) => return Err(FileSystemError::IsDirectory(context)),
            None => {
                if !mode.create() && !mode.create_new() {
                    return Err(FileSystemError::NotFound(context));
                }
                store.require_parent(&resolved, &context)?;
                store.insert_file(resolved.clone(), Vec::new());
                match store.nodes.get(&resolved) {
                    Some(Node::File { data, .. }) => Arc::clone(data),
                    _ => return Err(FileSystemError::NotFound(context)),
                }
            }
        };
        Ok(Box::new(MemoryStream {
            data,
            path: path.to_string(),
            pos: 0,
            readable: mode.readable(),
            writable: mode.writable(),
            append: mode.append(),
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Memory stream handle
// ═══════════════════════════════════════════════════════════════════════════

struct MemoryStream {
    data: Arc<Mutex<Vec<u8>>>,
    path: String,
    pos: usize,
    readable: bool,
    writable: bool,
    append: bool,
}

impl MemoryStream {
    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileStream for MemoryStream {
    fn read(&mut self, length: usize) -> DriverResult<Vec<u8>> {
        if !self.readable {
            return Err(FileSystemError::Unsupported(format!(
                "cannot read from file \"{}\": handle is not readable",
                self.path
            )));
        }
        let guard = self.guard();
        let start = self.pos.min(guard.len());
        let end = start.saturating_add(length).min(guard.len());
        let chunk = guard[start..end].to_vec();
        drop(guard);
        self.pos = end;
        Ok(chunk)
    }

    fn read_byte(&mut self) -> DriverResult<Option<u8>> {
        let chunk = self.read(1)?;
        Ok(chunk.first().copied())
    }

    fn tell(&mut self) -> DriverResult<u64> {
        Ok(self.pos as u64)
    }

    fn seek(&mut self, pos: SeekFrom) -> DriverResult<u64> {
        let len = self.guard().len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if target < 0 {
            return Err(FileSystemError::Unsupported(format!(
                "cannot seek in file \"{}\": position before start",
                self.path
            )));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }

    fn eof(&mut self) -> bool {
        self.pos >= self.guard().len()
    }

    fn write(&mut self, data: &[u8]) -> DriverResult<usize> {
        if !self.writable && !self.append {
            return Err(FileSystemError::Unsupported(format!(
                "cannot write to file \"{}\": handle is not writable",
                self.path
            )));
        }
        let pos = self.pos;
        let new_pos = {
            let mut guard = self.data.lock().unwrap_or_else(|e| e.into_inner());
            if self.append {
                guard.extend_from_slice(data);
                guard.len()
            } else {
                // Sparse seeks past the end fill with zeros, matching OS files.
                if pos > guard.len() {
                    guard.resize(pos, 0);
                }
                let end = pos + data.len();
                if end > guard.len() {
                    guard.resize(end, 0);
                }
                guard[pos..end].copy_from_slice(data);
                end
            }
        };
        self.pos = new_pos;
        Ok(data.len())
    }

    fn flush(&mut self) -> DriverResult<()> {
        Ok(())
    }

    // Advisory locks are meaningless for a process-local store; lock
    // requests succeed without contention tracking.
    fn lock(&mut self, _mode: LockMode) -> DriverResult<()> {
        Ok(())
    }

    fn unlock(&mut self) -> DriverResult<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> DriverResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_always_exists() {
        let driver = MemoryDriver::new();
        assert!(driver.is_directory("/").unwrap());
        assert!(driver.read_directory("/").unwrap().is_empty());
    }

    #[test]
    fn put_get_round_trip_and_queries() {
        let driver = MemoryDriver::new();
        driver.create_directory("/data", 0o755).unwrap();
        driver
            .file_put_contents("/data/f.txt", b"hello", None)
            .unwrap();

        assert!(driver.is_exists("/data/f.txt").unwrap());
        assert!(driver.is_file("/data/f.txt").unwrap());
        assert!(!driver.is_directory("/data/f.txt").unwrap());
        assert_eq!(driver.file_get_contents("/data/f.txt").unwrap(), b"hello");
        assert_eq!(driver.stat("/data/f.txt").unwrap().size, 5);
    }

    #[test]
    fn paths_are_normalized() {
        let driver = MemoryDriver::new();
        driver.create_directory("/a/b", 0o755).unwrap();
        driver.file_put_contents("/a/b/f", b"x", None).unwrap();

        assert!(driver.is_file("/a/./b/../b/f").unwrap());
        assert!(driver.is_directory("/a/b/").unwrap());
        assert_eq!(driver.real_path("/a/./b").unwrap(), "/a/b");
    }

    #[test]
    fn put_contents_requires_existing_parent() {
        let driver = MemoryDriver::new();
        let result = driver.file_put_contents("/missing/f", b"x", None);
        assert!(matches!(result, Err(FileSystemError::NotFound(_))));
    }

    #[test]
    fn create_directory_builds_ancestors() {
        let driver = MemoryDriver::new();
        driver.create_directory("/x/y/z", 0o700).unwrap();
        assert!(driver.is_directory("/x").unwrap());
        assert!(driver.is_directory("/x/y").unwrap());
        assert_eq!(driver.stat("/x/y/z").unwrap().mode, Some(0o700));
    }

    #[test]
    fn listing_is_sorted_and_child_first() {
        let driver = MemoryDriver::new();
        driver.create_directory("/d/sub", 0o755).unwrap();
        driver.file_put_contents("/d/b", b"", None).unwrap();
        driver.file_put_contents("/d/a", b"", None).unwrap();
        driver.file_put_contents("/d/sub/f", b"", None).unwrap();

        assert_eq!(
            driver.read_directory("/d").unwrap(),
            vec!["/d/a", "/d/b", "/d/sub"]
        );
        assert_eq!(
            driver.read_directory_recursively("/d").unwrap(),
            vec!["/d/a", "/d/b", "/d/sub/f", "/d/sub"]
        );
    }

    #[test]
    fn delete_directory_takes_subtree() {
        let driver = MemoryDriver::new();
        driver.create_directory("/d/sub", 0o755).unwrap();
        driver.file_put_contents("/d/sub/f", b"x", None).unwrap();

        driver.delete_directory("/d").unwrap();
        assert!(!driver.is_exists("/d").unwrap());
        assert!(!driver.is_exists("/d/sub/f").unwrap());
    }

    #[test]
    fn delete_file_rejects_directories() {
        let driver = MemoryDriver::new();
        driver.create_directory("/d", 0o755).unwrap();
        assert!(matches!(
            driver.delete_file("/d"),
            Err(FileSystemError::IsDirectory(_))
        ));
    }

    #[test]
    fn rename_moves_directory_subtree() {
        let driver = MemoryDriver::new();
        driver.create_directory("/old/sub", 0o755).unwrap();
        driver.file_put_contents("/old/sub/f", b"x", None).unwrap();

        driver.rename("/old", "/new", None).unwrap();
        assert!(!driver.is_exists("/old").unwrap());
        assert_eq!(driver.file_get_contents("/new/sub/f").unwrap(), b"x");
    }

    #[test]
    fn copy_onto_existing_directory_raises_and_leaves_it() {
        let driver = MemoryDriver::new();
        driver.create_directory("/dir", 0o755).unwrap();
        driver.file_put_contents("/dir/child", b"c", None).unwrap();
        driver.file_put_contents("/f", b"x", None).unwrap();

        let result = driver.copy("/f", "/dir", None);
        assert!(matches!(result, Err(FileSystemError::IsDirectory(_))));
        assert!(driver.is_directory("/dir").unwrap());
        assert_eq!(driver.file_get_contents("/dir/child").unwrap(), b"c");
    }

    #[test]
    fn rename_onto_existing_directory_raises_and_leaves_both() {
        let driver = MemoryDriver::new();
        driver.create_directory("/dir", 0o755).unwrap();
        driver.file_put_contents("/dir/child", b"c", None).unwrap();
        driver.file_put_contents("/f", b"x", None).unwrap();

        let result = driver.rename("/f", "/dir", None);
        assert!(matches!(result, Err(FileSystemError::IsDirectory(_))));
        assert!(driver.is_directory("/dir").unwrap());
        assert_eq!(driver.file_get_contents("/dir/child").unwrap(), b"c");
        assert_eq!(driver.file_get_contents("/f").unwrap(), b"x");
    }

    #[test]
    fn symlink_resolves_on_read() {
        let driver = MemoryDriver::new();
        driver.file_put_contents("/target", b"via link", None).unwrap();
        driver.symlink("/target", "/link", None).unwrap();

        assert_eq!(driver.file_get_contents("/link").unwrap(), b"via link");
        assert!(driver.stat("/link").unwrap().is_symlink);
        assert_eq!(driver.real_path("/link").unwrap(), "/target");
    }

    #[test]
    fn hard_link_aliases_backing_data() {
        let driver = MemoryDriver::new();
        driver.file_put_contents("/orig", b"one", None).unwrap();
        driver.create_hard_link("/orig", "/alias").unwrap();

        driver
            .file_put_contents("/orig", b"two", Some(WriteMode::Overwrite))
            .unwrap();
        assert_eq!(driver.file_get_contents("/alias").unwrap(), b"two");
    }

    #[test]
    fn search_matches_per_segment() {
        let driver = MemoryDriver::new();
        driver.create_directory("/var/sub", 0o755).unwrap();
        for name in ["a.csv", "b.csv", "c.txt"] {
            driver
                .file_put_contents(&format!("/var/{name}"), b"", None)
                .unwrap();
        }
        driver.file_put_contents("/var/sub/d.csv", b"", None).unwrap();

        assert_eq!(driver.search("*.csv", "/var"), vec!["/var/a.csv", "/var/b.csv"]);
        assert_eq!(
            driver.search("*.{csv,txt}", "/var").len(),
            3,
            "brace alternatives both match"
        );
        assert_eq!(driver.search("sub/*.csv", "/var"), vec!["/var/sub/d.csv"]);
        assert!(driver.search("*", "/nope").is_empty());
    }

    #[test]
    fn stream_positions_are_per_handle_but_data_is_shared() {
        let driver = MemoryDriver::new();
        driver.file_put_contents("/f", b"abcdef", None).unwrap();

        let mut writer = driver.file_open("/f", OpenMode::ReadWrite).unwrap();
        let mut reader = driver.file_open("/f", OpenMode::Read).unwrap();

        writer.seek(SeekFrom::Start(0)).unwrap();
        writer.write(b"XY").unwrap();
        assert_eq!(reader.read(6).unwrap(), b"XYcdef");
        assert!(reader.eof());

        writer.close().unwrap();
        reader.close().unwrap();
    }

    #[test]
    fn stream_append_mode_always_writes_at_end() {
        let driver = MemoryDriver::new();
        driver.file_put_contents("/log", b"start", None).unwrap();

        let mut handle = driver.file_open("/log", OpenMode::Append).unwrap();
        handle.seek(SeekFrom::Start(0)).unwrap();
        handle.write(b"+more").unwrap();
        handle.close().unwrap();

        assert_eq!(driver.file_get_contents("/log").unwrap(), b"start+more");
    }

    #[test]
    fn read_only_handle_rejects_writes() {
        let driver = MemoryDriver::new();
        driver.file_put_contents("/f", b"x", None).unwrap();
        let mut handle = driver.file_open("/f", OpenMode::Read).unwrap();
        assert!(handle.write(b"y").is_err());
        handle.close().unwrap();
    }

    #[test]
    fn clones_share_the_store() {
        let a = MemoryDriver::new();
        let b = a.clone();
        a.file_put_contents("/shared", b"x", None).unwrap();
        assert!(b.is_file("/shared").unwrap());
    }
}
