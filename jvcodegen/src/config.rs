//! Lowering configuration.
//!
//! Configuration is read from the `[lowering]` table of a TOML file:
//!
//! ```toml
//! [lowering]
//! membership_check = "always"   # "never" | "debug" | "always"
//! verify_stack_effect = true
//! ```
//!
//! Missing keys (or a missing table) fall back to [`LoweringConfig::default`].
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, CodegenResult};

/// When to validate that a rewritten node belongs to its list and is a type
/// test before splicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipCheck {
    /// No validation by the driver. The debug assertions of
    /// [`crate::intrinsics::instance_of::rewrite_instance_of`] still fire in
    /// builds with debug assertions enabled.
    Never,
    /// Only in builds with debug assertions enabled.
    #[default]
    Debug,
    Always,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringConfig {
    pub membership_check: MembershipCheck,
    /// Check that every replacement has the operand stack effect of the
    /// instruction it replaces.
    pub verify_stack_effect: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    lowering: LoweringConfig,
}

impl LoweringConfig {
    /// Parse the configuration from TOML text. `origin` names the source in
    /// error reports.
    pub fn from_toml_str(source: &str, origin: &str) -> CodegenResult<Self> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|source| CodegenError::ConfigParseError {
                source,
                file: origin.to_string(),
            })?;
        Ok(file.lowering)
    }

    /// Read and parse the configuration file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> CodegenResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source, &path.display().to_string())
    }

    /// Whether membership and node kind must be validated in this build.
    pub fn checks_membership(&self) -> bool {
        match self.membership_check {
            MembershipCheck::Never => false,
            MembershipCheck::Debug => cfg!(debug_assertions),
            MembershipCheck::Always => true,
        }
    }
}
