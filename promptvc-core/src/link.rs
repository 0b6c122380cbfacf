//! Binding between a workspace and a remote hosting repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access credential for the remote service.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw secret, for building request headers
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// A repository on the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepoRef {
    /// Service-assigned identifier (e.g. `owner/name`)
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

impl RemoteRepoRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            private: false,
        }
    }
}

/// Stored credential plus the chosen remote repository.
///
/// `token` is `None` after reloading a workspace saved without credentials;
/// such a link cannot be used until the user re-authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<AccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RemoteRepoRef>,
    pub linked_at: DateTime<Utc>,
}

impl RemoteLink {
    /// Link created by a successful authentication
    pub fn new(token: AccessToken) -> Self {
        Self {
            token: Some(token),
            repository: None,
            linked_at: Utc::now(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Copy of the link with the secret removed
    pub fn without_secret(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }
}
