//! Serde-deserializable types matching backend responses, plus the tagged
//! error every remote call resolves to.
//!
//! The backend answers every request with either data or an error body;
//! modeling that as `Result<T, RemoteError>` keeps the "which statuses count
//! as real failures" rule an explicit branch instead of ad-hoc field checks.

use serde::Deserialize;

/// Result of any remote call.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A failed remote call: the backend's message plus whatever secondary
/// detail the response carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
  pub message: String,
  /// Backend error code (e.g. a postgres error code), when present
  pub code: Option<String>,
  /// HTTP status of the response, when the request got that far
  pub status: Option<u16>,
}

impl RemoteError {
  /// Error with no HTTP response behind it (transport failure, bad URL).
  pub fn transport(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      code: None,
      status: None,
    }
  }

  /// The backend reports "no matching row" as an error with HTTP 406 on
  /// single-row reads. That is an empty result, not a real failure.
  pub fn is_missing_row(&self) -> bool {
    self.status == Some(406)
  }
}

impl std::fmt::Display for RemoteError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (self.status, &self.code) {
      (Some(status), Some(code)) => {
        write!(f, "{} (status {}, code {})", self.message, status, code)
      }
      (Some(status), None) => write!(f, "{} (status {})", self.message, status),
      (None, Some(code)) => write!(f, "{} (code {})", self.message, code),
      (None, None) => write!(f, "{}", self.message),
    }
  }
}

impl std::error::Error for RemoteError {}

// ============================================================================
// Wire types
// ============================================================================

/// Error body the tables endpoint returns alongside a non-2xx status.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: String,
  pub code: Option<String>,
}

impl ApiErrorBody {
  /// Attach the HTTP status to form the domain error.
  pub fn into_error(self, status: u16) -> RemoteError {
    let message = if self.message.is_empty() {
      format!("backend request failed with status {}", status)
    } else {
      self.message
    };
    RemoteError {
      message,
      code: self.code,
      status: Some(status),
    }
  }
}

/// Response from the auth user endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiAuthUser {
  pub id: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_body_decodes_and_carries_status() {
    let body: ApiErrorBody =
      serde_json::from_str(r#"{"message": "duplicate key", "code": "23505"}"#).unwrap();
    let err = body.into_error(409);

    assert_eq!(err.message, "duplicate key");
    assert_eq!(err.code.as_deref(), Some("23505"));
    assert_eq!(err.status, Some(409));
    assert!(!err.is_missing_row());
  }

  #[test]
  fn empty_error_body_gets_a_message() {
    let body: ApiErrorBody = serde_json::from_str("{}").unwrap();
    let err = body.into_error(500);

    assert_eq!(err.message, "backend request failed with status 500");
    assert_eq!(err.code, None);
  }

  #[test]
  fn status_406_is_missing_row_not_failure() {
    let err = ApiErrorBody {
      message: "JSON object requested, multiple (or no) rows returned".into(),
      code: Some("PGRST116".into()),
    }
    .into_error(406);

    assert!(err.is_missing_row());
  }

  #[test]
  fn transport_error_has_no_status() {
    let err = RemoteError::transport("connection refused");
    assert!(!err.is_missing_row());
    assert_eq!(err.to_string(), "connection refused");
  }
}
