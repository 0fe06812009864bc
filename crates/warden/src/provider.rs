use crate::client::{Client, DIR_MODE};
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;
use uuid::Uuid;
use warden_core::{ExecOptions, ExternalExecOptions, Guard, OsExecOptions, Result};

const TEMP_DIR_PREFIX: &str = "warden-";

/// Hands out clients bound to fresh temporary directories.
///
/// Every client created here is a child of the provider: destroying the
/// provider removes every temporary directory that was not already
/// destroyed on its own.
#[derive(Debug, Clone)]
pub struct ClientProvider {
    guard: Guard,
    options: ExecOptions,
}

impl ClientProvider {
    pub fn new(options: ExecOptions) -> Result<Self> {
        options.validate()?;
        tracing::debug!(exec_type = %options.exec_type(), "created client provider");
        Ok(Self {
            guard: Guard::new(),
            options,
        })
    }

    /// Creates a provider from options read from a configuration file.
    pub fn from_external(external: ExternalExecOptions) -> Result<Self> {
        Self::new(ExecOptions::try_from(external)?)
    }

    /// Provider for the host system using the system temporary directory.
    pub fn os() -> Result<Self> {
        Self::new(ExecOptions::Os(OsExecOptions::default()))
    }

    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Creates a uniquely named directory and returns a client owning it.
    pub fn new_temp_dir_client(&self) -> Result<Client> {
        self.guard.run(|| {
            let base_dir = self.base_dir()?;
            let dir = base_dir.join(format!("{TEMP_DIR_PREFIX}{}", Uuid::new_v4().simple()));
            DirBuilder::new().mode(DIR_MODE).create(&dir)?;

            let client = match dir.canonicalize() {
                Ok(canonical) => Client::owning(canonical, base_dir),
                Err(e) => {
                    if let Err(cleanup) = std::fs::remove_dir(&dir) {
                        tracing::warn!("Failed to remove temp directory: {}", cleanup);
                    }
                    return Err(e.into());
                }
            };
            if let Err(e) = self.guard.add_child(client.guard().clone()) {
                if let Err(cleanup) = client.destroy() {
                    tracing::warn!("Failed to remove unregistered temp directory: {}", cleanup);
                }
                return Err(e);
            }
            tracing::debug!(path = %client.dir_path().display(), "created temp dir client");
            Ok(client)
        })
    }

    fn base_dir(&self) -> Result<PathBuf> {
        match &self.options {
            ExecOptions::Os(options) => Ok(options
                .tmp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir)
                .canonicalize()?),
        }
    }

    /// Destroys every temp dir client this provider created.
    pub fn destroy(&self) -> Result<()> {
        self.guard.destroy()
    }

    pub fn is_destroyed(&self) -> bool {
        self.guard.is_destroyed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::Error;

    #[test]
    fn rejects_invalid_options() {
        let dir = tempfile::tempdir().unwrap();
        let options = OsExecOptions::new().with_tmp_dir(dir.path().join("missing"));
        assert!(matches!(
            ClientProvider::new(options.into()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn from_external_rejects_unknown_type() {
        let external = ExternalExecOptions {
            exec_type: "vm".to_string(),
            tmp_dir: None,
        };
        assert!(matches!(
            ClientProvider::from_external(external),
            Err(Error::UnknownExecType(_))
        ));
    }

    #[test]
    fn temp_dir_named_under_base() {
        let base = tempfile::tempdir().unwrap();
        let provider =
            ClientProvider::new(OsExecOptions::new().with_tmp_dir(base.path()).into()).unwrap();
        let client = provider.new_temp_dir_client().unwrap();

        let canonical_base = base.path().canonicalize().unwrap();
        assert_eq!(client.dir_path().parent(), Some(canonical_base.as_path()));
        assert_eq!(client.base_dir_path(), Some(canonical_base.as_path()));
        let name = client.dir_path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(TEMP_DIR_PREFIX));
        assert_eq!(name.len(), TEMP_DIR_PREFIX.len() + 32);

        provider.destroy().unwrap();
    }

    #[test]
    fn temp_dirs_are_distinct() {
        let provider = ClientProvider::os().unwrap();
        let first = provider.new_temp_dir_client().unwrap();
        let second = provider.new_temp_dir_client().unwrap();
        assert_ne!(first.dir_path(), second.dir_path());
        provider.destroy().unwrap();
        assert!(!first.dir_path().exists());
        assert!(!second.dir_path().exists());
    }

    #[test]
    fn destroyed_provider_refuses_new_clients() {
        let provider = ClientProvider::os().unwrap();
        provider.destroy().unwrap();
        assert!(matches!(
            provider.new_temp_dir_client(),
            Err(Error::AlreadyDestroyed)
        ));
    }
}
