//! Configuration for the snapshot tool.

use crate::snapshot::SnapshotSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_files_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root holding `__files`, both for extracted bodies and for serving
    #[serde(default = "default_files_root")]
    pub files_root: PathBuf,

    /// Recorded exchanges to snapshot (JSON array of serve events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanges: Option<PathBuf>,

    /// Default snapshot spec, used when none is given on the command line
    #[serde(default)]
    pub snapshot: SnapshotSpec,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files_root: default_files_root(),
            exchanges: None,
            snapshot: SnapshotSpec::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.files_root.as_os_str().is_empty() {
            anyhow::bail!("'filesRoot' cannot be empty");
        }

        if let Some(ref exchanges) = self.exchanges {
            if exchanges.as_os_str().is_empty() {
                anyhow::bail!("'exchanges' cannot be empty when given");
            }
        }

        for name in &self.snapshot.transformers {
            if name.trim().is_empty() {
                anyhow::bail!("Transformer names cannot be blank");
            }
        }

        Ok(())
    }
}
