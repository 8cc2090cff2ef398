use std::fmt;

use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};

/// Stable identity of the authenticated caller, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "Get current actor": `None` means unauthenticated.
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self, headers: &HeaderMap) -> Option<ActorId>;
}

/// Trusts an identity header stamped by the authentication proxy in front of the service.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    pub fn new(header: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            header: HeaderName::from_bytes(header.trim().as_bytes())?,
        })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl IdentityProvider for HeaderIdentity {
    fn current_actor(&self, headers: &HeaderMap) -> Option<ActorId> {
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| ActorId(value.to_string()))
    }
}
