use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of executor a provider is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecType {
    /// Processes run directly on the host operating system.
    Os,
}

impl ExecType {
    pub const ALL: &'static [ExecType] = &[ExecType::Os];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecType::Os => "os",
        }
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ExecType::ALL
            .iter()
            .copied()
            .find(|exec_type| exec_type.as_str() == s)
            .ok_or_else(|| Error::UnknownExecType(s.to_string()))
    }
}

/// Options for the host operating system executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsExecOptions {
    /// Directory temporary sandboxes are created in. Defaults to the system
    /// temporary directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,
}

impl OsExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(tmp_dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let Some(tmp_dir) = &self.tmp_dir else {
            return Ok(());
        };
        match std::fs::metadata(tmp_dir) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(Error::NotADirectory(tmp_dir.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::InvalidConfig(
                format!("tmp_dir {} does not exist", tmp_dir.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Validated executor configuration, one variant per [`ExecType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOptions {
    Os(OsExecOptions),
}

impl ExecOptions {
    pub fn exec_type(&self) -> ExecType {
        match self {
            ExecOptions::Os(_) => ExecType::Os,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ExecOptions::Os(options) => options.validate(),
        }
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions::Os(OsExecOptions::default())
    }
}

impl From<OsExecOptions> for ExecOptions {
    fn from(options: OsExecOptions) -> Self {
        ExecOptions::Os(options)
    }
}

/// Executor configuration as it appears in configuration files.
///
/// ```toml
/// type = "os"
/// tmp_dir = "/var/tmp/warden"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalExecOptions {
    #[serde(rename = "type", default)]
    pub exec_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<String>,
}

impl TryFrom<ExternalExecOptions> for ExecOptions {
    type Error = Error;

    fn try_from(external: ExternalExecOptions) -> Result<Self> {
        match external.exec_type.parse::<ExecType>()? {
            ExecType::Os => Ok(ExecOptions::Os(OsExecOptions {
                tmp_dir: external
                    .tmp_dir
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from),
            })),
        }
    }
}
