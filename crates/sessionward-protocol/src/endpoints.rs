//! Endpoint table, unauthenticated allow-list, and storage/route names.

/// Credential-store key for the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Credential-store key for the role.
pub const ROLE_KEY: &str = "role";

/// Every key the session owns in the credential store.
pub const AUTH_KEYS: [&str; 2] = [TOKEN_KEY, ROLE_KEY];

/// Route the navigation stack is reset to when a session ends.
pub const LOGIN_ROUTE: &str = "Login";

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Formats a bearer credential header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// The auth service paths and the unauthenticated allow-list.
///
/// The allow-list is `{login, register, public_read}`: requests to those
/// paths carry no bearer token and their failures are handed back raw,
/// never classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub validate: String,
    /// Public read-only endpoint reachable before any session exists.
    pub public_read: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/api/auth/login".into(),
            register: "/api/auth/register".into(),
            validate: "/api/auth/validate".into(),
            public_read: "/api/ai/overview".into(),
        }
    }
}

impl Endpoints {
    /// `true` if `path` is on the unauthenticated allow-list.
    ///
    /// Matching is by prefix on the path without its query string, so
    /// `/api/ai/overview?model=x` is public too.
    pub fn is_public(&self, path: &str) -> bool {
        let path = strip_query(path);
        [&self.login, &self.register, &self.public_read]
            .iter()
            .any(|allowed| path.starts_with(allowed.as_str()))
    }

    /// `true` if `path` is exactly the validate endpoint.
    pub fn is_validate(&self, path: &str) -> bool {
        strip_query(path) == self.validate
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}
