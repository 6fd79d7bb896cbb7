//! Directory-backed store: one `<key>.json` file per key.
//!
//! Writes go to a hidden temporary file in the same directory and are renamed
//! over the target, so a crash leaves either the old or the new contents.

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use cap_std::{
    ambient_authority,
    fs::{Dir, OpenOptions},
};
use tracing::debug;

use crate::domain::ports::{LocalStore, LocalStoreError};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`LocalStore`] persisting each key as a JSON file under one directory.
#[derive(Debug)]
pub struct FileLocalStore {
    dir: Dir,
}

impl FileLocalStore {
    /// Open `path`, creating it and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created or opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self { dir })
    }

    fn write_atomic(&self, key: &str, file_name: &str, contents: &str) -> Result<(), LocalStoreError> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let tmp_name = format!(".{file_name}.tmp.{}.{suffix}.{counter}", std::process::id());

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        let mut file = self
            .dir
            .open_with(&tmp_name, &options)
            .map_err(|error| io_error(key, &error))?;
        let written = file
            .write_all(contents.as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);
        if let Err(error) = written {
            drop(self.dir.remove_file(&tmp_name));
            return Err(io_error(key, &error));
        }

        if let Err(error) = self.dir.rename(&tmp_name, &self.dir, file_name) {
            drop(self.dir.remove_file(&tmp_name));
            return Err(io_error(key, &error));
        }
        Ok(())
    }
}

impl LocalStore for FileLocalStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let file_name = file_name(key)?;
        match self.dir.read_to_string(&file_name) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(key, &error)),
        }
    }

    fn write_raw(&self, key: &str, contents: &str) -> Result<(), LocalStoreError> {
        let file_name = file_name(key)?;
        self.write_atomic(key, &file_name, contents)?;
        debug!(key, bytes = contents.len(), "local store entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let file_name = file_name(key)?;
        match self.dir.remove_file(&file_name) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(key, &error)),
        }
    }
}

/// Keys map to plain file names; anything that could escape the directory or
/// collide with a temporary file is refused.
fn file_name(key: &str) -> Result<String, LocalStoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(LocalStoreError::io(key, "keys must be plain file names"));
    }
    Ok(format!("{key}.json"))
}

fn io_error(key: &str, error: &io::Error) -> LocalStoreError {
    LocalStoreError::io(key, error.to_string())
}
