//! Guarded `std::fs` routines.

use crate::guarded_fn;
use std::fs::File;
use std::io;
use std::path::Path;

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::read`].
    pub fn read(path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::read_to_string`].
    pub fn read_to_string(path: impl AsRef<Path>) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::write`].
    pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::copy`].
    pub fn copy(from: impl AsRef<Path>, to: impl AsRef<Path>) -> io::Result<u64> {
        std::fs::copy(from, to)
    }
}

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::remove_file`].
    pub fn remove_file(path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

guarded_fn! {
    owner = "std::fs";
    /// Guarded [`std::fs::create_dir_all`].
    pub fn create_dir_all(path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

guarded_fn! {
    owner = "std::fs::File", name = "open";
    /// Guarded [`File::open`].
    pub fn open(path: impl AsRef<Path>) -> io::Result<File> {
        File::open(path)
    }
}

guarded_fn! {
    owner = "std::fs::File", name = "create";
    /// Guarded [`File::create`].
    pub fn create(path: impl AsRef<Path>) -> io::Result<File> {
        File::create(path)
    }
}

/// Guarded [`File`] methods.
pub trait GuardedFile {
    /// Guarded [`File::sync_all`].
    fn guarded_sync_all(&self) -> io::Result<()>;
}

impl GuardedFile for File {
    guarded_fn! {
        owner = "std::fs::File", name = "sync_all";
        fn guarded_sync_all(&self) -> io::Result<()> {
            self.sync_all()
        }
    }
}
