//! Configuration for typegraft passes and logging.
//!
//! Every section has sensible defaults, so an empty JSON object is a valid
//! configuration file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::abi::Abi;
use crate::error::Result;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypegraftConfig {
    /// Options handed to model passes.
    pub passes: PassConfig,
    /// Subscriber setup for binaries.
    pub logging: LoggingConfig,
}

/// Options shared by model passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// ABI targeted by conversions to calling-convention level prototypes.
    /// `None` uses the model's default ABI.
    pub target_abi: Option<Abi>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl TypegraftConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl PassConfig {
    /// Target the given ABI.
    pub fn with_abi(abi: Abi) -> Self {
        Self {
            target_abi: Some(abi),
        }
    }
}
