//! The store's collections and the pure merge logic over them.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use crate::remote::types::Writing;

/// Everything the writings store holds: published articles plus local-only
/// drafts. This whole value is the unit of persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
  #[serde(default)]
  pub articles: Vec<Writing>,
  #[serde(default)]
  pub drafts: Vec<Writing>,
}

impl StoreState {
  /// Deserialize a persisted blob. `None` (nothing persisted yet) yields
  /// the empty state.
  pub fn decode(bytes: Option<&[u8]>) -> Result<Self> {
    match bytes {
      Some(data) => {
        serde_json::from_slice(data).map_err(|e| eyre!("Failed to decode store state: {}", e))
      }
      None => Ok(Self::default()),
    }
  }

  /// Serialize for the persisted store.
  pub fn encode(&self) -> Result<Vec<u8>> {
    serde_json::to_vec(self).map_err(|e| eyre!("Failed to encode store state: {}", e))
  }
}

/// Upsert-by-id merge: replace the entry whose id matches, or append if none
/// does. Order of untouched entries is preserved.
pub fn upsert_by_id(collection: &mut Vec<Writing>, writing: Writing) {
  if collection.is_empty() {
    collection.push(writing);
    return;
  }

  if let Some(existing) = collection.iter_mut().find(|w| w.id == writing.id) {
    *existing = writing;
  } else {
    collection.push(writing);
  }
}

/// Drop the entry with the given id, if any. Unknown ids are a no-op.
pub fn remove_by_id(collection: &mut Vec<Writing>, id: &str) {
  collection.retain(|w| w.id != id);
}
