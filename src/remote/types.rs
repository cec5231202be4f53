use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One piece of user-authored content, published or draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Writing {
  /// Unique within the collection (articles or drafts) it occupies
  #[serde(default)]
  pub id: String,
  /// Authoring user; not validated by the store
  #[serde(default)]
  pub owner_id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub body_text: String,
  #[serde(default)]
  pub category: String,
  /// Display order matters; duplicates allowed
  #[serde(default)]
  pub tags: Vec<String>,
  /// Informational only, never mutated by the store
  #[serde(default)]
  pub star_count: u64,
  #[serde(default)]
  pub poster_image_url: String,
  #[serde(default = "Utc::now")]
  pub created_at: DateTime<Utc>,
  #[serde(default = "Utc::now")]
  pub updated_at: DateTime<Utc>,
}

/// The authenticated session, as resolved from the auth endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
  /// Id of the signed-in user
  pub user_id: String,
}
