pub mod pipe;
pub mod run;
pub mod types;

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use warden::{Client, ClientProvider, Error, ExecType, ExternalExecOptions};

/// Provider options shared by every command that creates a sandbox.
#[derive(Args)]
pub struct ProviderArgs {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory temporary sandboxes are created in
    #[arg(long)]
    tmp_dir: Option<PathBuf>,
}

impl ProviderArgs {
    fn options(&self) -> anyhow::Result<ExternalExecOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                parse_config(&text)
                    .with_context(|| format!("invalid configuration in {}", path.display()))?
            }
            None => ExternalExecOptions::default(),
        };
        if options.exec_type.is_empty() {
            options.exec_type = ExecType::Os.to_string();
        }
        if let Some(tmp_dir) = &self.tmp_dir {
            options.tmp_dir = Some(tmp_dir.to_string_lossy().into_owned());
        }
        Ok(options)
    }
}

fn parse_config(text: &str) -> Result<ExternalExecOptions, toml::de::Error> {
    toml::from_str(text)
}

/// Runs `f` against a fresh sandbox and destroys the provider afterwards,
/// whatever `f` returned.
pub fn with_sandbox<F>(args: &ProviderArgs, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&Client) -> anyhow::Result<()>,
{
    let provider = ClientProvider::from_external(args.options()?)?;
    let result = provider
        .new_temp_dir_client()
        .map_err(anyhow::Error::from)
        .and_then(|client| {
            tracing::info!(path = %client.dir_path().display(), "created sandbox");
            f(&client)
        });
    let destroyed = provider.destroy().context("failed to remove sandbox");
    result?;
    destroyed
}

/// Process exit code for a failed command: the child's own code when it
/// exited unsuccessfully, 1 otherwise.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(Error::ExitStatus { status, .. }) => status.code().unwrap_or(1),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(config: Option<PathBuf>, tmp_dir: Option<PathBuf>) -> ProviderArgs {
        ProviderArgs { config, tmp_dir }
    }

    #[test]
    fn defaults_to_os_type() {
        let options = args(None, None).options().unwrap();
        assert_eq!(options.exec_type, "os");
        assert_eq!(options.tmp_dir, None);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("warden.toml");
        std::fs::write(&config, "type = \"os\"\ntmp_dir = \"/var/tmp\"\n").unwrap();

        let options = args(Some(config), None).options().unwrap();
        assert_eq!(options.exec_type, "os");
        assert_eq!(options.tmp_dir.as_deref(), Some("/var/tmp"));
    }

    #[test]
    fn tmp_dir_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("warden.toml");
        std::fs::write(&config, "tmp_dir = \"/var/tmp\"\n").unwrap();

        let options = args(Some(config), Some(PathBuf::from("/scratch")))
            .options()
            .unwrap();
        assert_eq!(options.exec_type, "os");
        assert_eq!(options.tmp_dir.as_deref(), Some("/scratch"));
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(parse_config("type = ").is_err());
    }

    #[test]
    fn with_sandbox_removes_directory_after_failure() {
        let base = tempfile::tempdir().unwrap();
        let args = args(None, Some(base.path().to_path_buf()));

        let mut seen = None;
        let result = with_sandbox(&args, |client| {
            seen = Some(client.dir_path().to_path_buf());
            anyhow::bail!("command failed")
        });

        assert!(result.is_err());
        let seen = seen.unwrap();
        assert!(seen.starts_with(base.path().canonicalize().unwrap()));
        assert!(!seen.exists());
    }

    #[test]
    fn exit_code_follows_child() {
        let client = Client::from_absolute_path(std::env::temp_dir()).unwrap();
        let err = client
            .execute(warden::Cmd::new(["sh", "-c", "exit 7"]))
            .wait()
            .unwrap_err();
        assert_eq!(exit_code(&anyhow::Error::from(err)), 7);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
