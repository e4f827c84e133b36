//! The session store: a namespaced filesystem KV surface.
//!
//! Layout: `<projects_base>/<project_hash>/meta.json` plus
//! `<namespace>/<key>.json` for arbitrary keys. Lock order: `state` (RwLock
//! over meta, also serialising filesystem writes) strictly before `dirty`
//! (plain Mutex over the write-behind buffer); never the reverse.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use xxhash_rust::xxh3::xxh3_64;

use beacon_core::constants::{DEFAULT_FLUSH_INTERVAL, MAX_FILE_SIZE, MAX_PROJECT_SIZE};
use beacon_core::pathsafe::{validate_path_in_dir, validate_store_input};
use beacon_core::{FxHashMap, StoreError};

use crate::meta::ProjectMeta;

const META_FILE: &str = "meta.json";

/// Aggregate statistics over the project directory.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Total bytes across meta and all namespace files.
    pub total_bytes: u64,
    /// Sessions opened against this project.
    pub session_count: u64,
    /// `.json` file count per namespace.
    pub namespaces: FxHashMap<String, usize>,
}

/// Shared state between the store handle and the flush thread.
struct Shared {
    project_dir: PathBuf,
    /// Lock order: `state` strictly before `dirty`.
    state: RwLock<ProjectMeta>,
    dirty: Mutex<FxHashMap<(String, String), Vec<u8>>>,
}

/// Persistent, namespaced filesystem KV store for one project.
pub struct SessionStore {
    shared: Arc<Shared>,
    stop_tx: Sender<()>,
    flush_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Open (or create) the store for `project_path` under `projects_base`,
    /// with the default 30 s flush interval.
    pub fn open(project_path: &Path, projects_base: &Path) -> Result<Self, StoreError> {
        Self::open_with_interval(project_path, projects_base, DEFAULT_FLUSH_INTERVAL)
    }

    /// Open with an explicit dirty-buffer flush interval.
    pub fn open_with_interval(
        project_path: &Path,
        projects_base: &Path,
        flush_interval: Duration,
    ) -> Result<Self, StoreError> {
        let path_str = project_path.to_string_lossy();
        let project_id = format!("{:016x}", xxh3_64(path_str.as_bytes()));
        let project_dir = projects_base.join(&project_id);
        fs::create_dir_all(&project_dir).map_err(StoreError::io)?;

        let meta = match fs::read(project_dir.join(META_FILE)) {
            Ok(bytes) => match serde_json::from_slice::<ProjectMeta>(&bytes) {
                Ok(mut meta) => {
                    meta.begin_session();
                    meta
                }
                Err(err) => {
                    tracing::warn!("session-store: corrupt meta.json, recreating: {err}");
                    ProjectMeta::fresh(&project_id, &path_str)
                }
            },
            Err(_) => ProjectMeta::fresh(&project_id, &path_str),
        };
        write_json_file(&project_dir.join(META_FILE), &serde_json::to_vec_pretty(&meta).map_err(|e| StoreError::Io { message: e.to_string() })?)?;

        let shared = Arc::new(Shared {
            project_dir,
            state: RwLock::new(meta),
            dirty: Mutex::new(FxHashMap::default()),
        });

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let flush_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("beacon-store-flush".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(flush_interval) {
                    Err(RecvTimeoutError::Timeout) => flush_dirty(&flush_shared),
                    _ => break,
                }
            })
            .map_err(StoreError::io)?;

        Ok(Self {
            shared,
            stop_tx,
            flush_handle: Mutex::new(Some(handle)),
        })
    }

    /// The on-disk project directory.
    pub fn project_dir(&self) -> &Path {
        &self.shared.project_dir
    }

    /// Current project metadata, by value.
    pub fn get_meta(&self) -> ProjectMeta {
        self.shared.state.read().expect("state lock poisoned").clone()
    }

    /// Write `bytes` to `<namespace>/<key>.json`, enforcing the per-file and
    /// per-project size caps.
    pub fn save(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.shared.entry_path(namespace, key)?;
        if bytes.len() as u64 > MAX_FILE_SIZE {
            return Err(StoreError::FileTooLarge {
                size: bytes.len() as u64,
                max: MAX_FILE_SIZE,
            });
        }

        let _state = self.shared.state.write().expect("state lock poisoned");
        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let current = directory_size(&self.shared.project_dir).saturating_sub(existing);
        if current + bytes.len() as u64 > MAX_PROJECT_SIZE {
            return Err(StoreError::ProjectSizeExceeded {
                current,
                max: MAX_PROJECT_SIZE,
            });
        }
        write_json_file(&path, bytes)
    }

    /// Read `<namespace>/<key>.json`. Any read failure reports `KeyNotFound`.
    pub fn load(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.shared.entry_path(namespace, key)?;
        let _state = self.shared.state.read().expect("state lock poisoned");
        fs::read(&path).map_err(|_| StoreError::KeyNotFound {
            namespace: namespace.to_string(),
            key: key.to_string(),
        })
    }

    /// List keys (extension stripped) in a namespace. A namespace that does
    /// not exist yet yields an empty list.
    pub fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.shared.namespace_dir(namespace)?;
        let _state = self.shared.state.read().expect("state lock poisoned");

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };
        let mut keys: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Delete `<namespace>/<key>.json`.
    pub fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let path = self.shared.entry_path(namespace, key)?;
        let _state = self.shared.state.write().expect("state lock poisoned");
        fs::remove_file(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::KeyNotFound {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                }
            } else {
                StoreError::io(err)
            }
        })
    }

    /// Walk the project directory and report sizes and per-namespace file
    /// counts. Sub-subdirectories within a namespace are skipped.
    pub fn stats(&self) -> StoreStats {
        let state = self.shared.state.read().expect("state lock poisoned");
        let mut stats = StoreStats {
            session_count: state.session_count,
            ..Default::default()
        };
        drop(state);

        let Ok(entries) = fs::read_dir(&self.shared.project_dir) else {
            return stats;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                stats.total_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            } else if path.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                let mut count = 0;
                if let Ok(files) = fs::read_dir(&path) {
                    for file in files.flatten() {
                        let fp = file.path();
                        if !fp.is_file() {
                            continue;
                        }
                        stats.total_bytes += fs::metadata(&fp).map(|m| m.len()).unwrap_or(0);
                        if fp.extension().is_some_and(|ext| ext == "json") {
                            count += 1;
                        }
                    }
                }
                stats.namespaces.insert(name, count);
            }
        }
        stats
    }

    /// Buffer a write for the background flush thread.
    pub fn mark_dirty(&self, namespace: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.shared.entry_path(namespace, key)?;
        let mut dirty = self.shared.dirty.lock().expect("dirty lock poisoned");
        dirty.insert((namespace.to_string(), key.to_string()), bytes);
        Ok(())
    }

    /// Number of buffered dirty entries awaiting flush.
    pub fn dirty_len(&self) -> usize {
        self.shared.dirty.lock().expect("dirty lock poisoned").len()
    }

    /// Stop the flush thread, flush remaining dirty entries, stamp the
    /// session end into meta, and persist it. Idempotent.
    pub fn shutdown(&self) {
        let handle = self.flush_handle.lock().expect("flush handle lock poisoned").take();
        let Some(handle) = handle else {
            return;
        };
        let _ = self.stop_tx.send(());
        let _ = handle.join();

        flush_dirty(&self.shared);

        let mut state = self.shared.state.write().expect("state lock poisoned");
        state.last_session = Utc::now();
        match serde_json::to_vec_pretty(&*state) {
            Ok(bytes) => {
                if let Err(err) = write_json_file(&self.shared.project_dir.join(META_FILE), &bytes) {
                    tracing::warn!("session-store: failed to persist meta on shutdown: {err}");
                }
            }
            Err(err) => tracing::warn!("session-store: failed to serialize meta on shutdown: {err}"),
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    /// Validate the namespace and build its directory path.
    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, StoreError> {
        validate_store_input(namespace, "namespace")?;
        let dir = self.project_dir.join(namespace);
        validate_path_in_dir(&self.project_dir, &dir)?;
        Ok(dir)
    }

    /// Validate both components and build the full entry path.
    fn entry_path(&self, namespace: &str, key: &str) -> Result<PathBuf, StoreError> {
        let dir = self.namespace_dir(namespace)?;
        validate_store_input(key, "key")?;
        let path = dir.join(format!("{key}.json"));
        validate_path_in_dir(&self.project_dir, &path)?;
        Ok(path)
    }
}

/// Drain the dirty buffer by take-and-clear, then write each entry
/// best-effort. Lock order: `state` before `dirty`.
fn flush_dirty(shared: &Shared) {
    let _state = shared.state.write().expect("state lock poisoned");
    let drained = {
        let mut dirty = shared.dirty.lock().expect("dirty lock poisoned");
        std::mem::take(&mut *dirty)
    };
    for ((namespace, key), bytes) in drained {
        let Ok(path) = shared.entry_path(&namespace, &key) else {
            continue;
        };
        if let Err(err) = write_json_file(&path, &bytes) {
            tracing::debug!("session-store: background flush of {namespace}/{key} failed: {err}");
        }
    }
}

fn write_json_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(StoreError::io)?;
    }
    fs::write(path, bytes).map_err(StoreError::io)
}

/// Total size of files directly in `dir` and one level of subdirectories.
fn directory_size(dir: &Path) -> u64 {
    let mut total = 0;
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            total += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        } else if path.is_dir() {
            if let Ok(files) = fs::read_dir(&path) {
                for file in files.flatten() {
                    let fp = file.path();
                    if fp.is_file() {
                        total += fs::metadata(&fp).map(|m| m.len()).unwrap_or(0);
                    }
                }
            }
        }
    }
    total
}
