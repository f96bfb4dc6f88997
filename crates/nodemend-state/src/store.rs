//! StateStore — JSON-file persistence for the node ledger.
//!
//! Saves go to a sibling temp file that is then renamed over the target,
//! so a crash mid-write never leaves a truncated ledger behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use nodemend_core::NodeObservation;

use crate::error::{StateError, StateResult};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// On-disk shape of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateDocument {
    #[serde(default)]
    pub nodes: Vec<NodeObservation>,
}

#[derive(Clone)]
enum Backend {
    File(Arc<PathBuf>),
    Memory(Arc<Mutex<Option<Vec<u8>>>>),
}

/// Handle to the persisted ledger.
#[derive(Clone)]
pub struct StateStore {
    backend: Backend,
}

impl StateStore {
    /// Use the ledger file at `path`. The file is created on first save.
    pub fn open(path: &Path) -> Self {
        debug!(?path, "state store opened");
        Self {
            backend: Backend::File(Arc::new(path.to_path_buf())),
        }
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(None))),
        }
    }

    /// Ledger file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path.as_path()),
            Backend::Memory(_) => None,
        }
    }

    /// Load every stored observation in stored order.
    ///
    /// A missing ledger is an empty ledger. Duplicate ids keep the first
    /// record.
    pub fn load(&self) -> StateResult<Vec<NodeObservation>> {
        let Some(bytes) = self.read_raw()? else {
            debug!("no ledger yet, starting empty");
            return Ok(Vec::new());
        };
        let doc: StateDocument = serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;

        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(doc.nodes.len());
        for node in doc.nodes {
            if seen.insert(node.id.clone()) {
                nodes.push(node);
            } else {
                warn!(node_id = %node.id, "duplicate node in ledger, keeping first");
            }
        }
        debug!(count = nodes.len(), "ledger loaded");
        Ok(nodes)
    }

    /// Load, treating an unreadable or corrupt ledger as empty.
    pub fn load_or_empty(&self) -> Vec<NodeObservation> {
        match self.load() {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, "ledger unreadable, treating prior state as empty");
                Vec::new()
            }
        }
    }

    /// Replace the ledger contents with `nodes`.
    pub fn save(&self, nodes: &[NodeObservation]) -> StateResult<()> {
        let doc = StateDocument {
            nodes: nodes.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&doc).map_err(map_err!(Serialize))?;
        self.write_raw(bytes)?;
        debug!(count = nodes.len(), "ledger saved");
        Ok(())
    }

    fn read_raw(&self) -> StateResult<Option<Vec<u8>>> {
        match &self.backend {
            Backend::File(path) => match std::fs::read(path.as_path()) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StateError::Read(format!("{}: {e}", path.display()))),
            },
            Backend::Memory(slot) => {
                let guard = slot.lock().map_err(map_err!(Read))?;
                Ok(guard.clone())
            }
        }
    }

    fn write_raw(&self, bytes: Vec<u8>) -> StateResult<()> {
        match &self.backend {
            Backend::File(path) => {
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, &bytes)
                    .map_err(|e| StateError::Write(format!("{}: {e}", tmp.display())))?;
                std::fs::rename(&tmp, path.as_path())
                    .map_err(|e| StateError::Write(format!("{}: {e}", path.display())))?;
                Ok(())
            }
            Backend::Memory(slot) => {
                let mut guard = slot.lock().map_err(map_err!(Write))?;
                *guard = Some(bytes);
                Ok(())
            }
        }
    }
}
