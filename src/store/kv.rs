// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Host persistent key-value store. Both operations may fail.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-process store. Reads and writes can be made to fail to exercise the
/// storage-unavailable path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw stored value, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Stores `value` directly, bypassing failure injection and the write counter.
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.lock().insert(key.to_owned(), value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of {key:?} refused")));
        }
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of {key:?} refused")));
        }
        self.lock().insert(key.to_owned(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

/// One pretty-printed JSON file per key inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    durability: WriteDurability,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for_key(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(format!("{}.json", encode_key_file_stem(key))))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for_key(key)?;
        run_blocking(move || read_json(&path)).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for_key(key)?;
        let root = self.root.clone();
        let durability = self.durability;
        run_blocking(move || {
            let mut contents = serde_json::to_vec_pretty(&value).map_err(|source| {
                StoreError::Json {
                    path: path.clone(),
                    source,
                }
            })?;
            contents.push(b'\n');
            write_atomic(&root, &path, &contents, durability)
        })
        .await
    }
}

/// Runs filesystem work on tokio's blocking pool so a stalled disk only delays this operation.
async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| StoreError::Unavailable(format!("storage task failed: {err}")))?
}

fn read_json(path: &Path) -> Result<Option<Value>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Percent-encodes every byte outside `[A-Za-z0-9_-]`, so keys never produce separators, dots or
/// other characters some filesystems reject. Windows device names get a `~` prefix.
fn encode_key_file_stem(key: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(key.len());
    for &b in key.as_bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    if is_windows_device_name(&out) {
        out.insert(0, '~');
    }
    out
}

fn is_windows_device_name(stem: &str) -> bool {
    let upper = stem.to_ascii_uppercase();
    match upper.as_bytes() {
        b"CON" | b"PRN" | b"AUX" | b"NUL" => true,
        [b'C', b'O', b'M', n] | [b'L', b'P', b'T', n] => (b'1'..=b'9').contains(n),
        _ => false,
    }
}

/// Writes `contents` to a sibling temp file, then renames it over `path`. With
/// [`WriteDurability::Durable`] the file and, on unix, the directory are synced.
fn write_atomic(
    root: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    fs::create_dir_all(root).map_err(|source| io_error(root, source))?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let stem = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let tmp_path = root.join(format!(".overtext.tmp.{stem}.{nanos}"));

    let written = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            if durability == WriteDurability::Durable {
                file.sync_all()?;
            }
            Ok(())
        })
        .and_then(|()| replace_file(&tmp_path, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(path, source));
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            fs::File::open(root)
                .and_then(|dir| dir.sync_all())
                .map_err(|source| io_error(root, source))?;
        }
    }
    Ok(())
}

/// `rename` that also replaces an existing target on Windows.
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        #[cfg(windows)]
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
            ) =>
        {
            let _ = fs::remove_file(to);
            fs::rename(from, to)
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::encode_key_file_stem;

    #[test]
    fn key_file_stems_are_filesystem_safe() {
        assert_eq!(
            encode_key_file_stem("https://a.com/p"),
            "https%3A%2F%2Fa%2Ecom%2Fp"
        );
        assert_eq!(encode_key_file_stem("plain-key_1"), "plain-key_1");
        assert_eq!(encode_key_file_stem("con"), "~con");
        assert_eq!(encode_key_file_stem("Lpt7"), "~Lpt7");
        assert_eq!(encode_key_file_stem("com0"), "com0");
        assert_eq!(encode_key_file_stem("é"), "%C3%A9");
    }
}
