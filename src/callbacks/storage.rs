use crate::errors::PersistenceError;

use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{create_dir_all, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn serde_error(path: &Path) -> impl FnOnce(serde_json::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Serialization {
        path: path.to_path_buf(),
        source,
    }
}

/// Creates `path` and its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), PersistenceError> {
    create_dir_all(path).map_err(io_error(path))
}

/// Writes `data` as JSON to `path`, replacing any previous content.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), PersistenceError> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, data).map_err(serde_error(path))?;
    writer.flush().map_err(io_error(path))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let file = File::open(path).map_err(io_error(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(serde_error(path))
}
