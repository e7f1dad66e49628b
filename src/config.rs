use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

// -------------------------------------------------------------------------------------------------
// Policy
// -------------------------------------------------------------------------------------------------
/// The remediation policy: the global enumerations the rules are parameterized by.
///
/// A policy is loaded once at startup and never mutated; rules built from it are safe to share
/// across scanning threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Transaction codes considered obsolete
    pub obsolete_transactions: Vec<String>,

    /// The canonical successor transaction suggested in place of all obsolete codes
    pub successor_transaction: String,

    /// Tables whose SELECT statements must carry a `<TABLE>-DRAFT = SPACE` filter
    pub draft_tables: Vec<String>,
}

impl Policy {
    /// Load the policy that ships embedded in the binary.
    pub fn from_default() -> Result<Self> {
        serde_yaml::from_str(crate::defaults::DEFAULT_POLICY)
            .context("Failed to load default policy")
    }

    /// Load a policy from the given YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let infile = File::open(path)
            .with_context(|| format!("Failed to read policy from {}", path.display()))?;
        let reader = BufReader::new(infile);
        let policy: Self = serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to load YAML from {}", path.display()))?;
        debug!(
            "Loaded policy from {}: {} obsolete transactions, {} draft tables",
            path.display(),
            policy.obsolete_transactions.len(),
            policy.draft_tables.len()
        );
        Ok(policy)
    }
}
