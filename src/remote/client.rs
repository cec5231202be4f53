use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use url::Url;

use crate::config::Config;
use crate::remote::api_types::{ApiAuthUser, ApiErrorBody, RemoteError, RemoteResult};
use crate::remote::types::{Session, Writing};

/// Remote operations the writings store depends on.
///
/// The store only ever issues these four calls; keeping them behind a trait
/// lets tests script success and failure per call.
#[async_trait]
pub trait RemoteWritings: Send + Sync {
  /// Insert or replace a writing in the backend table, keyed by id.
  async fn upsert_writing(&self, writing: &Writing) -> RemoteResult<()>;

  /// Delete the writing with the given id from the backend table.
  async fn delete_writing(&self, id: &str) -> RemoteResult<()>;

  /// Fetch all writings owned by the given user.
  async fn writings_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<Writing>>;

  /// Resolve the current session. `Ok(None)` means nobody is signed in.
  async fn current_session(&self) -> RemoteResult<Option<Session>>;
}

/// Backend client for the hosted tables/auth service.
#[derive(Clone)]
pub struct HttpRemote {
  http: reqwest::Client,
  base: Url,
  table: String,
  api_key: String,
  access_token: String,
}

impl HttpRemote {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend URL {}: {}", config.backend.url, e))?;

    let api_key = Config::get_api_key()?;
    let access_token = Config::get_access_token()?;

    let http = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      table: config.backend.table.clone(),
      api_key,
      access_token,
    })
  }

  /// URL of the writings table endpoint.
  fn table_url(&self) -> RemoteResult<Url> {
    self
      .base
      .join(&format!("rest/v1/{}", self.table))
      .map_err(|e| RemoteError::transport(format!("bad table URL: {}", e)))
  }

  /// Attach the auth headers every call needs.
  fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req
      .header("apikey", &self.api_key)
      .bearer_auth(&self.access_token)
  }

  /// Turn a non-success response into the domain error, decoding the
  /// backend's error body when there is one.
  async fn error_from(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.json::<ApiErrorBody>().await.unwrap_or(ApiErrorBody {
      message: String::new(),
      code: None,
    });
    body.into_error(status)
  }
}

#[async_trait]
impl RemoteWritings for HttpRemote {
  async fn upsert_writing(&self, writing: &Writing) -> RemoteResult<()> {
    let url = self.table_url()?;

    let response = self
      .authed(self.http.post(url))
      .header("Prefer", "resolution=merge-duplicates")
      .json(&[writing])
      .send()
      .await
      .map_err(|e| RemoteError::transport(format!("upsert failed: {}", e)))?;

    if response.status().is_success() {
      Ok(())
    } else {
      Err(Self::error_from(response).await)
    }
  }

  async fn delete_writing(&self, id: &str) -> RemoteResult<()> {
    let mut url = self.table_url()?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let response = self
      .authed(self.http.delete(url))
      .send()
      .await
      .map_err(|e| RemoteError::transport(format!("delete failed: {}", e)))?;

    if response.status().is_success() {
      Ok(())
    } else {
      Err(Self::error_from(response).await)
    }
  }

  async fn writings_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<Writing>> {
    let mut url = self.table_url()?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("owner_id", &format!("eq.{}", owner_id));

    let response = self
      .authed(self.http.get(url))
      .send()
      .await
      .map_err(|e| RemoteError::transport(format!("select failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(Self::error_from(response).await);
    }

    response
      .json::<Vec<Writing>>()
      .await
      .map_err(|e| RemoteError::transport(format!("failed to decode writings: {}", e)))
  }

  async fn current_session(&self) -> RemoteResult<Option<Session>> {
    let url = self
      .base
      .join("auth/v1/user")
      .map_err(|e| RemoteError::transport(format!("bad auth URL: {}", e)))?;

    let response = self
      .authed(self.http.get(url))
      .send()
      .await
      .map_err(|e| RemoteError::transport(format!("session lookup failed: {}", e)))?;

    // No bearer token or an expired one reads as "not signed in", not as a
    // hard failure; same for the missing-row status on single-row reads.
    if response.status() == StatusCode::UNAUTHORIZED {
      return Ok(None);
    }

    if !response.status().is_success() {
      let err = Self::error_from(response).await;
      if err.is_missing_row() {
        return Ok(None);
      }
      return Err(err);
    }

    let user = response
      .json::<ApiAuthUser>()
      .await
      .map_err(|e| RemoteError::transport(format!("failed to decode session: {}", e)))?;

    Ok(Some(Session { user_id: user.id }))
  }
}
