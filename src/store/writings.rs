//! The writings store: a local view of the user's published articles plus a
//! purely local scratch area for drafts.
//!
//! Articles are write-through: every mutation goes to the backend first and
//! the local collection only changes after the remote call succeeds. Drafts
//! never leave the device. The whole state is re-serialized to the persisted
//! store after every mutation and rehydrated once at open.

use chrono::Utc;
use color_eyre::Result;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::remote::client::RemoteWritings;
use crate::remote::types::Writing;
use crate::store::persist::PersistStorage;
use crate::store::state::{remove_by_id, upsert_by_id, StoreState};

/// Slot name the store persists under.
pub const WRITINGS_SLOT: &str = "writings-storage";

/// Store over a remote backend and a persisted storage device.
///
/// Mutations serialize through one async mutex held across the remote call,
/// the merge, and the persist, so overlapping calls apply in arrival order
/// and never merge against a stale snapshot.
pub struct WritingsStore<R, S> {
  remote: R,
  storage: S,
  state: Mutex<StoreState>,
}

impl<R: RemoteWritings, S: PersistStorage> WritingsStore<R, S> {
  /// Open the store, rehydrating from the persisted slot. A corrupt blob is
  /// logged and replaced with the empty state rather than refusing to open.
  pub fn open(remote: R, storage: S) -> Result<Self> {
    let blob = storage.get_item(WRITINGS_SLOT)?;
    let state = match StoreState::decode(blob.as_deref()) {
      Ok(state) => state,
      Err(e) => {
        error!("Persisted writings state unreadable, starting empty: {}", e);
        StoreState::default()
      }
    };

    Ok(Self {
      remote,
      storage,
      state: Mutex::new(state),
    })
  }

  /// Snapshot of the current articles collection.
  pub async fn articles(&self) -> Vec<Writing> {
    self.state.lock().await.articles.clone()
  }

  /// Snapshot of the current drafts collection.
  pub async fn drafts(&self) -> Vec<Writing> {
    self.state.lock().await.drafts.clone()
  }

  /// Replace the entire articles collection verbatim. No remote call.
  pub async fn set_articles(&self, articles: Vec<Writing>) {
    let mut state = self.state.lock().await;
    state.articles = articles;
    self.persist(&state);
  }

  /// Publish a writing: upsert it remotely, then merge it into the local
  /// articles (replace-by-id or append) and drop any draft with the same id.
  ///
  /// On remote failure the error is logged and nothing changes locally.
  pub async fn add_article(&self, mut writing: Writing) {
    writing.updated_at = Utc::now();

    let mut state = self.state.lock().await;

    if let Err(e) = self.remote.upsert_writing(&writing).await {
      error!("Error adding article {}: {}", writing.id, e);
      return;
    }

    let id = writing.id.clone();
    upsert_by_id(&mut state.articles, writing);
    // Publishing a draft moves it out of the scratch area
    remove_by_id(&mut state.drafts, &id);
    self.persist(&state);
  }

  /// Delete an article remotely, then filter it out of the local collection.
  ///
  /// On remote failure the error is logged and nothing changes locally.
  pub async fn remove_article(&self, id: &str) {
    let mut state = self.state.lock().await;

    if let Err(e) = self.remote.delete_writing(id).await {
      error!("Error removing article {}: {}", id, e);
      return;
    }

    remove_by_id(&mut state.articles, id);
    self.persist(&state);
  }

  /// Refresh the articles collection from the backend, replacing it verbatim
  /// with whatever the signed-in user owns remotely.
  ///
  /// Aborts before any table call if nobody is signed in.
  pub async fn articles_by_owner(&self) {
    let mut state = self.state.lock().await;

    let session = match self.remote.current_session().await {
      Ok(Some(session)) => session,
      Ok(None) => {
        error!("No user signed in");
        return;
      }
      Err(e) => {
        error!("Error resolving session: {}", e);
        return;
      }
    };

    match self.remote.writings_by_owner(&session.user_id).await {
      Ok(articles) => {
        debug!("Fetched {} articles for {}", articles.len(), session.user_id);
        state.articles = articles;
        self.persist(&state);
      }
      Err(e) => {
        error!("Error fetching articles: {}", e);
      }
    }
  }

  /// Save a draft locally: replace-by-id or append. Never touches the
  /// backend and stores the argument verbatim.
  pub async fn save_draft(&self, draft: Writing) {
    let mut state = self.state.lock().await;
    upsert_by_id(&mut state.drafts, draft);
    self.persist(&state);
  }

  /// Delete a draft locally. Unknown ids are a no-op.
  pub async fn delete_draft(&self, id: &str) {
    let mut state = self.state.lock().await;
    remove_by_id(&mut state.drafts, id);
    self.persist(&state);
  }

  /// Serialize the whole state to the persisted slot. Persistence failures
  /// are logged; the in-memory mutation already happened.
  fn persist(&self, state: &StoreState) {
    let written = state
      .encode()
      .and_then(|bytes| self.storage.set_item(WRITINGS_SLOT, &bytes));

    if let Err(e) = written {
      error!("Failed to persist writings store: {}", e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::api_types::{RemoteError, RemoteResult};
  use crate::remote::types::Session;
  use crate::store::persist::MemoryStorage;
  use async_trait::async_trait;
  use chrono::Utc;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
  use std::sync::Arc;

  /// Scriptable remote: flip the fail flags to make the next calls error.
  #[derive(Default)]
  struct FakeRemote {
    fail_upsert: AtomicBool,
    fail_delete: AtomicBool,
    session: std::sync::Mutex<Option<Session>>,
    rows: std::sync::Mutex<Vec<Writing>>,
    select_calls: AtomicU32,
  }

  impl FakeRemote {
    fn signed_in(user_id: &str) -> Self {
      let remote = Self::default();
      *remote.session.lock().unwrap() = Some(Session {
        user_id: user_id.to_string(),
      });
      remote
    }

    fn network_down() -> RemoteError {
      RemoteError::transport("network request failed")
    }
  }

  #[async_trait]
  impl RemoteWritings for FakeRemote {
    async fn upsert_writing(&self, writing: &Writing) -> RemoteResult<()> {
      if self.fail_upsert.load(Ordering::SeqCst) {
        return Err(Self::network_down());
      }
      let mut rows = self.rows.lock().unwrap();
      if let Some(existing) = rows.iter_mut().find(|w| w.id == writing.id) {
        *existing = writing.clone();
      } else {
        rows.push(writing.clone());
      }
      Ok(())
    }

    async fn delete_writing(&self, id: &str) -> RemoteResult<()> {
      if self.fail_delete.load(Ordering::SeqCst) {
        return Err(Self::network_down());
      }
      self.rows.lock().unwrap().retain(|w| w.id != id);
      Ok(())
    }

    async fn writings_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<Writing>> {
      self.select_calls.fetch_add(1, Ordering::SeqCst);
      let rows = self.rows.lock().unwrap();
      Ok(rows.iter().filter(|w| w.owner_id == owner_id).cloned().collect())
    }

    async fn current_session(&self) -> RemoteResult<Option<Session>> {
      Ok(self.session.lock().unwrap().clone())
    }
  }

  fn writing(id: &str, title: &str) -> Writing {
    Writing {
      id: id.to_string(),
      owner_id: "user-1".to_string(),
      title: title.to_string(),
      body_text: "body".to_string(),
      category: "essay".to_string(),
      tags: vec!["tag".to_string()],
      star_count: 0,
      poster_image_url: String::new(),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn store(remote: FakeRemote) -> WritingsStore<FakeRemote, MemoryStorage> {
    WritingsStore::open(remote, MemoryStorage::default()).unwrap()
  }

  #[tokio::test]
  async fn add_article_keeps_one_entry_per_id() {
    let store = store(FakeRemote::default());

    store.add_article(writing("a1", "First")).await;
    store.add_article(writing("a2", "Second")).await;
    store.add_article(writing("a1", "First, revised")).await;

    let articles = store.articles().await;
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].id, "a1");
    assert_eq!(articles[0].title, "First, revised");
    assert_eq!(articles[1].id, "a2");
  }

  #[tokio::test]
  async fn add_article_removes_same_id_draft() {
    let store = store(FakeRemote::default());

    store.save_draft(writing("a1", "Draft version")).await;
    store.add_article(writing("a1", "Published version")).await;

    assert!(store.drafts().await.is_empty());
    assert_eq!(store.articles().await[0].title, "Published version");
  }

  #[tokio::test]
  async fn add_article_failure_leaves_state_and_storage_untouched() {
    let remote = FakeRemote::default();
    remote.fail_upsert.store(true, Ordering::SeqCst);
    let storage = Arc::new(MemoryStorage::default());
    let store = WritingsStore::open(remote, Arc::clone(&storage)).unwrap();

    store.add_article(writing("a1", "Never lands")).await;

    assert!(store.articles().await.is_empty());
    // No mutation happened, so nothing was persisted either
    assert_eq!(storage.get_item(WRITINGS_SLOT).unwrap(), None);
  }

  #[tokio::test]
  async fn remove_article_failure_leaves_articles_unchanged() {
    let remote = FakeRemote::default();
    let store = store(remote);
    store.add_article(writing("a1", "First")).await;
    let before = store.articles().await;

    store.remote.fail_delete.store(true, Ordering::SeqCst);
    store.remove_article("a1").await;

    assert_eq!(store.articles().await, before);
  }

  #[tokio::test]
  async fn remove_article_filters_locally_on_success() {
    let store = store(FakeRemote::default());
    store.add_article(writing("a1", "First")).await;
    store.add_article(writing("a2", "Second")).await;

    store.remove_article("a1").await;

    let articles = store.articles().await;
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, "a2");
  }

  #[tokio::test]
  async fn save_draft_twice_keeps_second_version_verbatim() {
    let store = store(FakeRemote::default());
    let second = writing("d1", "B");

    store.save_draft(writing("d1", "A")).await;
    store.save_draft(second.clone()).await;

    let drafts = store.drafts().await;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0], second);
  }

  #[tokio::test]
  async fn delete_draft_unknown_id_is_noop() {
    let store = store(FakeRemote::default());
    store.save_draft(writing("d1", "Keep me")).await;
    let before = store.drafts().await;

    store.delete_draft("missing").await;

    assert_eq!(store.drafts().await, before);
  }

  #[tokio::test]
  async fn refresh_without_session_makes_no_table_call() {
    let remote = FakeRemote::default(); // nobody signed in
    let store = store(remote);
    store.set_articles(vec![writing("a1", "Stale")]).await;

    store.articles_by_owner().await;

    assert_eq!(store.remote.select_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.articles().await.len(), 1);
  }

  #[tokio::test]
  async fn refresh_replaces_articles_verbatim() {
    let remote = FakeRemote::signed_in("user-1");
    remote.rows.lock().unwrap().push(writing("r1", "Remote one"));
    remote.rows.lock().unwrap().push(writing("r2", "Remote two"));
    let store = store(remote);
    store.set_articles(vec![writing("local", "Goes away")]).await;

    store.articles_by_owner().await;

    let articles = store.articles().await;
    assert_eq!(
      articles.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(),
      ["r1", "r2"]
    );
  }

  #[tokio::test]
  async fn state_survives_reopen() {
    let storage = Arc::new(MemoryStorage::default());

    {
      let store = WritingsStore::open(FakeRemote::default(), Arc::clone(&storage)).unwrap();
      store.add_article(writing("a1", "Persisted")).await;
      store.save_draft(writing("d1", "Scratch")).await;
    }

    let store = WritingsStore::open(FakeRemote::default(), storage).unwrap();
    assert_eq!(store.articles().await[0].id, "a1");
    assert_eq!(store.drafts().await[0].id, "d1");
  }

  #[tokio::test]
  async fn corrupt_persisted_blob_opens_empty() {
    let storage = Arc::new(MemoryStorage::default());
    storage.set_item(WRITINGS_SLOT, b"not json").unwrap();

    let store = WritingsStore::open(FakeRemote::default(), storage).unwrap();
    assert!(store.articles().await.is_empty());
    assert!(store.drafts().await.is_empty());
  }

  #[tokio::test]
  async fn add_article_refreshes_updated_at() {
    let store = store(FakeRemote::default());
    let mut stale = writing("a1", "Old timestamp");
    stale.updated_at = Utc::now() - chrono::Duration::days(7);
    let before = stale.updated_at;

    store.add_article(stale).await;

    assert!(store.articles().await[0].updated_at > before);
  }
}
