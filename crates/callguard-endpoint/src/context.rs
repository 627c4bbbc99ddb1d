use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Authenticated caller identity supplied by the transport.
#[derive(Clone, Serialize, PartialEq)]
pub struct AuthIdentity {
    /// Stable user identifier.
    pub uid: String,
    /// Raw bearer token. Never serialized and redacted in debug output.
    #[serde(skip)]
    pub token: Option<String>,
    /// Decoded token claims.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub claims: Map<String, Value>,
}

impl AuthIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: None,
            claims: Map::new(),
        }
    }
}

impl fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("AuthIdentity");
        dbg.field("uid", &self.uid);
        if let Some(token) = &self.token {
            dbg.field("token", &format_args!("<redacted:{} bytes>", token.len()));
        } else {
            dbg.field("token", &Option::<String>::None);
        }
        dbg.field("claims", &self.claims).finish()
    }
}

/// Per-invocation context handed over by the transport.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CallContext {
    /// Authenticated identity, absent for anonymous callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthIdentity>,
    /// Client instance identifier, when the transport supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Request metadata (headers, trace ids) forwarded by the transport.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CallContext {
    /// Context without an authenticated identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an authenticated caller.
    pub fn authenticated(uid: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthIdentity::new(uid)),
            ..Self::default()
        }
    }

    /// Attach the raw bearer token. No-op on anonymous contexts.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        if let Some(auth) = self.auth.as_mut() {
            auth.token = Some(token.into());
        }
        self
    }

    /// Attach a decoded token claim. No-op on anonymous contexts.
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(auth) = self.auth.as_mut() {
            auth.claims.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn auth(&self) -> Option<&AuthIdentity> {
        self.auth.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Caller uid, if authenticated.
    pub fn uid(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.uid.as_str())
    }
}
