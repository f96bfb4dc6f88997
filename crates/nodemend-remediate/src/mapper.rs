//! Port → remediation action mapping.

use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use nodemend_core::config::RemediationConfig;
use nodemend_core::{RemediationAction, RemediationTable};

use crate::error::MappingSkip;

/// Resolves a node port to the action that remediates it.
///
/// Compose slots additionally require their descriptor file to exist under
/// `descriptor_dir`; a missing descriptor is a skip, not an error.
#[derive(Debug, Clone)]
pub struct RemediationMapper {
    table: RemediationTable,
    config: RemediationConfig,
    descriptor_dir: PathBuf,
}

impl RemediationMapper {
    pub fn new(config: &RemediationConfig, descriptor_dir: &Path) -> Self {
        Self {
            table: RemediationTable::from_config(config),
            config: config.clone(),
            descriptor_dir: descriptor_dir.to_path_buf(),
        }
    }

    /// Path of the compose descriptor for slot `index`.
    pub fn descriptor_path(&self, index: u32) -> PathBuf {
        self.descriptor_dir.join(self.config.descriptor_name(index))
    }

    /// Map `port` to an action. Defined for every integer.
    pub fn map(&self, port: i64) -> Result<RemediationAction, MappingSkip> {
        match self.table.lookup(port) {
            Some(RemediationAction::NamedServiceRestart) => {
                Ok(RemediationAction::NamedServiceRestart)
            }
            Some(RemediationAction::ComposeFileCycle(index)) => {
                let path = self.descriptor_path(index);
                if path.is_file() {
                    Ok(RemediationAction::ComposeFileCycle(index))
                } else {
                    error!(port, path = %path.display(), "compose descriptor not found, skipping");
                    Err(MappingSkip::MissingDescriptor { port, path })
                }
            }
            None => {
                let below = self
                    .table
                    .compose_range()
                    .is_some_and(|range| port < *range.start());
                if below {
                    warn!(port, "port below compose range, skipping");
                    Err(MappingSkip::BelowRange { port })
                } else {
                    debug!(port, "port outside remediation scope, skipping");
                    Err(MappingSkip::OutOfScope { port })
                }
            }
        }
    }
}
