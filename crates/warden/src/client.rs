use crate::exec::{self, Wait};
use std::fs::{self, DirBuilder, File};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use warden_core::path::{is_file_exists, validate_absolute, validate_is_dir, validate_relative};
use warden_core::{Cmd, Error, Guard, PipeCmdList, Result};

/// Mode new sandbox directories are created with.
pub(crate) const DIR_MODE: u32 = 0o755;

/// Handle to a guarded directory.
///
/// All paths taken by a client are relative to [`Client::dir_path`]. Each
/// operation is admitted by the client's guard, so nothing touches the
/// directory once [`Client::destroy`] has started.
///
/// Clones share the same guard: destroying one destroys them all.
#[derive(Debug, Clone)]
pub struct Client {
    guard: Guard,
    dir_path: PathBuf,
    base_dir_path: Option<PathBuf>,
}

impl Client {
    /// Wraps an existing absolute directory.
    ///
    /// The directory is left in place when the client is destroyed.
    pub fn from_absolute_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        validate_absolute(path)?;
        validate_is_dir(path)?;
        Ok(Self {
            guard: Guard::new(),
            dir_path: path.canonicalize()?,
            base_dir_path: None,
        })
    }

    /// A client whose destruction removes `dir_path` recursively.
    pub(crate) fn owning(dir_path: PathBuf, base_dir_path: PathBuf) -> Self {
        let removed = dir_path.clone();
        let guard = Guard::with_teardown(move || {
            validate_is_dir(&removed)?;
            fs::remove_dir_all(&removed)?;
            tracing::debug!(path = %removed.display(), "removed directory");
            Ok(())
        });
        Self {
            guard,
            dir_path,
            base_dir_path: Some(base_dir_path),
        }
    }

    pub(crate) fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Absolute path of the directory this client is bound to.
    pub fn dir_path(&self) -> &Path {
        &self.dir_path
    }

    /// Directory this client's directory was created in, if warden created it.
    pub fn base_dir_path(&self) -> Option<&Path> {
        self.base_dir_path.as_deref()
    }

    /// Waits for admitted operations, destroys every sub-directory client,
    /// then removes the directory if this client owns it.
    pub fn destroy(&self) -> Result<()> {
        self.guard.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.guard.is_destroyed()
    }

    fn absolute_path(&self, path: &Path) -> PathBuf {
        self.dir_path.join(path)
    }

    /// Starts `cmd` in the client's directory, or in its `sub_dir`.
    pub fn execute(&self, cmd: Cmd) -> Wait {
        exec::execute(&self.guard, &self.dir_path, cmd)
    }

    /// Starts a pipeline of at least two commands.
    pub fn execute_piped(&self, list: PipeCmdList) -> Wait {
        exec::execute_piped(&self.guard, &self.dir_path, list)
    }

    pub fn is_file_exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| is_file_exists(&self.absolute_path(path)))
    }

    /// Opens an existing file for reading.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            let absolute = self.absolute_path(path);
            if !is_file_exists(&absolute)? {
                return Err(Error::FileDoesNotExist(path.to_path_buf()));
            }
            Ok(File::open(absolute)?)
        })
    }

    /// Names of the entries directly inside `path`, sorted.
    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            let mut names = fs::read_dir(self.absolute_path(path))?
                .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
                .collect::<Result<Vec<_>>>()?;
            names.sort();
            Ok(names)
        })
    }

    /// Every regular file under `path`, relative to the client's directory.
    ///
    /// Symlinks are not followed and not listed.
    pub fn list_regular_files(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            let mut files = Vec::new();
            for entry in WalkDir::new(self.absolute_path(path)).sort_by_file_name() {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&self.dir_path) {
                    files.push(relative.to_path_buf());
                }
            }
            Ok(files)
        })
    }

    /// Creates or truncates a file for writing.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| Ok(File::create(self.absolute_path(path))?))
    }

    /// Creates `path` and any missing parents with `mode`.
    pub fn mkdir_all(&self, path: impl AsRef<Path>, mode: u32) -> Result<()> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            DirBuilder::new()
                .recursive(true)
                .mode(mode)
                .create(self.absolute_path(path))?;
            Ok(())
        })
    }

    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        let (from, to) = (from.as_ref(), to.as_ref());
        validate_relative(from)?;
        validate_relative(to)?;
        self.guard.run(|| {
            let source = self.absolute_path(from);
            if !is_file_exists(&source)? {
                return Err(Error::FileDoesNotExist(from.to_path_buf()));
            }
            fs::rename(source, self.absolute_path(to))?;
            Ok(())
        })
    }

    /// Removes a file or an empty directory.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            let absolute = self.absolute_path(path);
            let metadata = match fs::symlink_metadata(&absolute) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::FileDoesNotExist(path.to_path_buf()));
                }
                Err(e) => return Err(e.into()),
            };
            if metadata.is_dir() {
                fs::remove_dir(absolute)?;
            } else {
                fs::remove_file(absolute)?;
            }
            Ok(())
        })
    }

    /// Creates the directory `path` and returns a client bound to it.
    ///
    /// The new client is a child of this one: destroying this client
    /// destroys it and removes the directory. It may also be destroyed on
    /// its own first.
    pub fn new_sub_dir_client(&self, path: impl AsRef<Path>) -> Result<Client> {
        let path = path.as_ref();
        validate_relative(path)?;
        self.guard.run(|| {
            let absolute = self.absolute_path(path);
            if is_file_exists(&absolute)? {
                return Err(Error::FileAlreadyExists(path.to_path_buf()));
            }
            DirBuilder::new().mode(DIR_MODE).create(&absolute)?;
            let child = Client::owning(absolute, self.dir_path.clone());
            if let Err(e) = self.guard.add_child(child.guard.clone()) {
                if let Err(cleanup) = child.destroy() {
                    tracing::warn!("Failed to remove unregistered directory: {}", cleanup);
                }
                return Err(e);
            }
            tracing::debug!(path = %child.dir_path.display(), "created sub-directory client");
            Ok(child)
        })
    }
}
