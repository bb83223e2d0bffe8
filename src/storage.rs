use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use derive_more::Display;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Debug, Display)]
pub enum StorageError {
    #[display(fmt = "I/O error on {}: {}", path, source)]
    Io { path: String, source: io::Error },
    #[display(fmt = "Corrupt JSON in {}: {}", path, source)]
    Corrupt { path: String, source: serde_json::Error },
    #[display(fmt = "Id sequence exhausted for {}", path)]
    Exhausted { path: String },
}

impl std::error::Error for StorageError {}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io { path: path.display().to_string(), source }
    }

    fn corrupt(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Corrupt { path: path.display().to_string(), source }
    }
}

/// A stored document addressable by its numeric id.
pub trait Record {
    fn id(&self) -> u64;
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Sequence {
    next_id: u64,
}

/// Reads a whole collection file. A missing file is an empty collection.
pub fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    serde_json::from_str(&content).map_err(|e| StorageError::corrupt(path, e))
}

/// Replaces `path` with the pretty-printed records. The content is written to
/// a temporary file in the same directory and renamed into place.
pub fn write_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
    write_json(path, records)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

    let body = serde_json::to_string_pretty(value).map_err(|e| StorageError::corrupt(path, e))?;
    let mut file = NamedTempFile::new_in(&dir).map_err(|e| StorageError::io(&dir, e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| StorageError::io(file.path(), e))?;
    file.persist(path).map_err(|e| StorageError::io(path, e.error))?;

    debug!("wrote {}", path.display());
    Ok(())
}

/// The in-memory view of a collection handed to [`Collection::modify`].
pub struct Snapshot<T> {
    records: Vec<T>,
    next_id: u64,
    dirty: bool,
}

impl<T> Snapshot<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Mutable access marks the snapshot for persisting.
    pub fn records_mut(&mut self) -> &mut Vec<T> {
        self.dirty = true;
        &mut self.records
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.dirty = true;
        id
    }

    pub fn push(&mut self, record: T) {
        self.records_mut().push(record);
    }
}

/// A JSON array file guarded by an in-process lock, with a persisted id
/// sequence stored next to it.
pub struct Collection<T> {
    path: PathBuf,
    sequence_path: PathBuf,
    lock: Mutex<()>,
    records: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sequence_path = path.with_extension("seq.json");
        Collection {
            path,
            sequence_path,
            lock: Mutex::new(()),
            records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        let _guard = self.lock();
        read_collection(&self.path)
    }

    /// Runs a read-modify-write cycle under the collection lock. Nothing is
    /// written if `f` fails or leaves the snapshot untouched.
    pub fn modify<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Snapshot<T>) -> Result<R, E>,
        E: From<StorageError>,
    {
        let _guard = self.lock();

        let records: Vec<T> = read_collection(&self.path)?;
        let next_id = self.next_id(&records)?;
        let mut snapshot = Snapshot {
            records,
            next_id,
            dirty: false,
        };

        let output = f(&mut snapshot)?;

        if snapshot.dirty {
            write_collection(&self.path, &snapshot.records)?;
            write_json(
                &self.sequence_path,
                &Sequence {
                    next_id: snapshot.next_id,
                },
            )?;
        }
        Ok(output)
    }

    fn next_id(&self, records: &[T]) -> Result<u64, StorageError> {
        let persisted = match fs::read_to_string(&self.sequence_path) {
            Ok(content) => serde_json::from_str::<Sequence>(&content)
                .map_err(|e| StorageError::corrupt(&self.sequence_path, e))?
                .next_id,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(StorageError::io(&self.sequence_path, e)),
        };
        let highest = records.iter().map(Record::id).max().unwrap_or(0);
        let after_highest = highest.checked_add(1).ok_or_else(|| StorageError::Exhausted {
            path: self.path.display().to_string(),
        })?;
        Ok(persisted.max(after_highest).max(1))
    }

    /// The lock guards no data of its own, so a panic in another request
    /// leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
