//! Control API capabilities used by a run.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use fleet_job::Record;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Authorization context a run's calls are made under.
///
/// Identities are plain values: each dispatched call holds its own clone, so
/// closing the identity after dispatch does not reach into calls in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
  pub id: String,
  pub user_id: String,
}

/// A failed API call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
  /// The API rejected or failed the call.
  #[error("{message}")]
  Rejected { message: String },

  /// The task running the call panicked or was cancelled.
  #[error("call aborted: {message}")]
  Aborted { message: String },
}

impl CallError {
  pub fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }
}

/// The platform's RPC dispatch surface.
#[async_trait]
pub trait Api: Send + Sync {
  /// Invoke `method` with `params` on behalf of `identity`.
  async fn invoke(
    &self,
    identity: &Identity,
    method: &str,
    params: Record,
  ) -> Result<Value, CallError>;
}

/// Factory for short-lived identities.
pub trait IdentityProvider: Send + Sync {
  /// Open an identity acting as `user_id`.
  fn open(&self, user_id: &str) -> Identity;

  /// Release an identity.
  fn close(&self, identity: &Identity);
}

/// Identity provider that tracks open identities in memory.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
  open: Mutex<HashSet<String>>,
}

impl LocalIdentityProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether `identity` has been opened and not yet closed.
  pub fn is_open(&self, identity: &Identity) -> bool {
    let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
    open.contains(&identity.id)
  }

  /// Number of identities currently open.
  pub fn open_count(&self) -> usize {
    self.open.lock().unwrap_or_else(|e| e.into_inner()).len()
  }
}

impl IdentityProvider for LocalIdentityProvider {
  fn open(&self, user_id: &str) -> Identity {
    let identity = Identity {
      id: uuid::Uuid::new_v4().to_string(),
      user_id: user_id.to_string(),
    };

    let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
    open.insert(identity.id.clone());

    info!(identity_id = %identity.id, user_id = %identity.user_id, "identity_opened");
    identity
  }

  fn close(&self, identity: &Identity) {
    let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
    open.remove(&identity.id);

    info!(identity_id = %identity.id, user_id = %identity.user_id, "identity_closed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_local_identity_lifecycle() {
    let provider = LocalIdentityProvider::new();

    let first = provider.open("admin");
    let second = provider.open("admin");

    assert_eq!(first.user_id, "admin");
    assert_ne!(first.id, second.id);
    assert_eq!(provider.open_count(), 2);

    provider.close(&first);

    assert!(!provider.is_open(&first));
    assert!(provider.is_open(&second));
    assert_eq!(provider.open_count(), 1);
  }
}
