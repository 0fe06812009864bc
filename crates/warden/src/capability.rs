//! Narrow capability traits implemented by the concrete handles.
//!
//! Code that only needs part of a [`Client`] can be written against one of
//! these instead, e.g. `fn build(dir: &impl ExecutorWriteFileManager)`.

use crate::client::Client;
use crate::exec::Wait;
use crate::provider::ClientProvider;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use warden_core::{Cmd, Error, Guard, PipeCmdList, Result, path};

/// Something bound to a directory.
pub trait DirectoryContext {
    fn dir_path(&self) -> &Path;
}

/// Something that can be destroyed exactly once.
pub trait Destroyable {
    fn destroy(&self) -> Result<()>;

    fn is_destroyed(&self) -> bool;
}

pub trait Readable: DirectoryContext {
    fn is_file_exists(&self, path: &Path) -> Result<bool>;

    fn open(&self, path: &Path) -> Result<File>;

    fn list_regular_files(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Non-empty lines of a file, with surrounding whitespace trimmed.
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        ensure_exists(self, path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(self.open(path)?).lines() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        Ok(lines)
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        ensure_exists(self, path)?;
        let mut contents = Vec::new();
        self.open(path)?.read_to_end(&mut contents)?;
        Ok(contents)
    }

    fn join(&self, elems: &[&str]) -> PathBuf {
        path::join(elems)
    }

    fn matches(&self, pattern: &str, path: &Path) -> Result<bool> {
        path::matches(pattern, path)
    }

    fn to_slash(&self, path: &Path) -> String {
        path::to_slash(path)
    }

    fn base(&self, path: &Path) -> String {
        path::base(path)
    }

    fn dir(&self, path: &Path) -> PathBuf {
        path::dir(path)
    }

    fn path_separator(&self) -> char {
        path::PATH_SEPARATOR
    }
}

fn ensure_exists<R: Readable + ?Sized>(readable: &R, path: &Path) -> Result<()> {
    if readable.is_file_exists(path)? {
        Ok(())
    } else {
        Err(Error::FileDoesNotExist(path.to_path_buf()))
    }
}

pub trait Writable: Readable {
    fn create(&self, path: &Path) -> Result<File>;

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;
}

pub trait Executable {
    fn execute(&self, cmd: Cmd) -> Wait;

    fn execute_piped(&self, list: PipeCmdList) -> Wait;
}

pub trait SubdirectoryFactory {
    type Handle;

    fn new_sub_dir(&self, path: &Path) -> Result<Self::Handle>;
}

pub trait TempDirFactory {
    type Handle;

    fn new_temp_dir(&self) -> Result<Self::Handle>;
}

pub trait ExecutorReadFileManager: Executable + Readable + Destroyable {}

impl<T: Executable + Readable + Destroyable> ExecutorReadFileManager for T {}

pub trait ExecutorWriteFileManager: Executable + Writable + Destroyable {}

impl<T: Executable + Writable + Destroyable> ExecutorWriteFileManager for T {}

pub trait ReadWriteFileManager: Writable + Destroyable {}

impl<T: Writable + Destroyable> ReadWriteFileManager for T {}

impl Destroyable for Guard {
    fn destroy(&self) -> Result<()> {
        Guard::destroy(self)
    }

    fn is_destroyed(&self) -> bool {
        Guard::is_destroyed(self)
    }
}

impl DirectoryContext for Client {
    fn dir_path(&self) -> &Path {
        Client::dir_path(self)
    }
}

impl Destroyable for Client {
    fn destroy(&self) -> Result<()> {
        Client::destroy(self)
    }

    fn is_destroyed(&self) -> bool {
        Client::is_destroyed(self)
    }
}

impl Readable for Client {
    fn is_file_exists(&self, path: &Path) -> Result<bool> {
        Client::is_file_exists(self, path)
    }

    fn open(&self, path: &Path) -> Result<File> {
        Client::open(self, path)
    }

    fn list_regular_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        Client::list_regular_files(self, path)
    }
}

impl Writable for Client {
    fn create(&self, path: &Path) -> Result<File> {
        Client::create(self, path)
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> Result<()> {
        Client::mkdir_all(self, path, mode)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Client::rename(self, from, to)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        Client::remove(self, path)
    }
}

impl Executable for Client {
    fn execute(&self, cmd: Cmd) -> Wait {
        Client::execute(self, cmd)
    }

    fn execute_piped(&self, list: PipeCmdList) -> Wait {
        Client::execute_piped(self, list)
    }
}

impl SubdirectoryFactory for Client {
    type Handle = Client;

    fn new_sub_dir(&self, path: &Path) -> Result<Client> {
        self.new_sub_dir_client(path)
    }
}

impl Destroyable for ClientProvider {
    fn destroy(&self) -> Result<()> {
        ClientProvider::destroy(self)
    }

    fn is_destroyed(&self) -> bool {
        ClientProvider::is_destroyed(self)
    }
}

impl TempDirFactory for ClientProvider {
    type Handle = Client;

    fn new_temp_dir(&self) -> Result<Client> {
        self.new_temp_dir_client()
    }
}
