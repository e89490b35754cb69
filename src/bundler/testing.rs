//! In-memory filesystem and fetcher used by tests.

use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use super::{
    error::{BundleError, BundleResult},
    source::{Fetcher, FileSystem},
};

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    directories: HashSet<PathBuf>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.into());
        self
    }

    /**
        Marks a path as a directory, reading it fails with an io error.
    */
    pub fn with_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directories.insert(path.into());
        self
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.reads.lock().unwrap().iter().filter(|p| p.as_path() == path).count()
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_text(&self, path: &Path) -> BundleResult<String> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        if self.directories.contains(path) {
            return Err(BundleError::from_io(
                path,
                io::Error::new(io::ErrorKind::Other, "is a directory"),
            ));
        }
        self.file(path).ok_or_else(|| BundleError::NotFound {
            path: path.to_path_buf(),
        })
    }

    async fn write_text(&self, path: &Path, contents: &str) -> BundleResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryFetcher {
    bodies: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_text(&self, url: &str) -> BundleResult<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| BundleError::transport(url, "connection refused"))
    }
}
