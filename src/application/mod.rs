pub mod files;

use std::io;
use std::path::{Component, Path, PathBuf};

use derive_more::Deref;

use crate::domain::errors::HandlerError;

/// Canonical root every `/files/` path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct ServingDirectory(PathBuf);

/// Read-only state shared by every connection task.
#[derive(Debug, Clone)]
pub struct ServerData {
    pub directory: ServingDirectory,
}

impl ServerData {
    /// Fails when `directory` cannot be canonicalized or is not a directory.
    pub fn new(directory: impl AsRef<Path>) -> io::Result<Self> {
        let directory = directory.as_ref().canonicalize()?;
        if !directory.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", directory.display()),
            ));
        }

        Ok(Self {
            directory: ServingDirectory(directory),
        })
    }

    /// Joins `name` onto the serving directory.
    ///
    /// Only plain components are accepted; `..`, absolute paths and prefixes
    /// are refused so the result never leaves the directory lexically. An
    /// empty name resolves to the directory itself. Names that are not UTF-8
    /// cannot name a file here and are reported as missing.
    pub fn resolve(&self, name: &[u8]) -> Result<PathBuf, HandlerError> {
        let name = std::str::from_utf8(name).map_err(|_| HandlerError::NotFound)?;
        let mut resolved = self.directory.to_path_buf();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(HandlerError::OutsideDirectory)
                }
            }
        }
        Ok(resolved)
    }
}
