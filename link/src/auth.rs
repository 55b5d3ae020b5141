//! Authentication provider for the engine client.
//!
//! Attaches the appropriate Authorization header to outgoing HTTP requests.
//! Credential *acquisition* (key files, token refresh) is the host
//! application's concern; this type only carries what it is given.

use crate::error::Result;
use base64::{engine::general_purpose, Engine as _};

/// Authentication credentials for the remote query engine.
///
/// # Examples
///
/// ```rust
/// use querydeck_link::AuthProvider;
///
/// // Bearer token (service account or OAuth access token)
/// let auth = AuthProvider::bearer_token("ya29.abc".to_string());
///
/// // HTTP Basic Auth
/// let auth = AuthProvider::basic_auth("svc".to_string(), "secret".to_string());
///
/// // No authentication (local emulator)
/// let auth = AuthProvider::none();
/// ```
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// HTTP Basic Auth (username, password)
    BasicAuth(String, String),

    /// Bearer token authentication
    BearerToken(String),

    /// No authentication
    None,
}

impl AuthProvider {
    /// Create HTTP Basic Auth credentials
    pub fn basic_auth(username: String, password: String) -> Self {
        Self::BasicAuth(username, password)
    }

    /// Create bearer token authentication
    pub fn bearer_token(token: String) -> Self {
        Self::BearerToken(token)
    }

    /// No authentication
    pub fn none() -> Self {
        Self::None
    }

    /// Attach the Authorization header for this credential to a request:
    /// `Basic <base64(username:password)>` per RFC 7617, or `Bearer <token>`.
    pub fn apply_to_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        match self {
            Self::BasicAuth(username, password) => {
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Ok(request.header("Authorization", format!("Basic {}", encoded)))
            }
            Self::BearerToken(token) => Ok(request.bearer_auth(token)),
            Self::None => Ok(request),
        }
    }

    /// Check if authentication is configured
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}
