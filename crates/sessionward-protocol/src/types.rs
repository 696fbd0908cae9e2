//! Core session types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The account role granted by the auth service.
///
/// On the wire a role is an upper-case string (`"MEMBER"`, `"ADMIN"`).
/// Any value this client does not know is read as [`Role::Member`], the
/// least-privileged role, so a new server-side role never breaks a
/// session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    /// The wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses a stored or received role string. Case-insensitive;
    /// unknown values fall back to `Member`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("ADMIN") {
            Self::Admin
        } else {
            Self::Member
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FailureClass
// ---------------------------------------------------------------------------

/// What a failed call means for the session.
///
/// Produced only by the failure classifier and the validation loop; every
/// other component forwards it instead of re-deriving it.
///
/// | Class                | Session effect                                  |
/// |----------------------|-------------------------------------------------|
/// | `AuthExpired`        | terminal: the logout bundle runs                |
/// | `PermissionDenied`   | none, the caller gets the original error        |
/// | `NetworkUnreachable` | none, connectivity banner + countdown retry     |
/// | `ServerError`        | none, logged                                    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    AuthExpired,
    PermissionDenied,
    NetworkUnreachable,
    ServerError,
}

impl FailureClass {
    /// `true` only for [`FailureClass::AuthExpired`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// `true` for failures expected to heal on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnreachable | Self::ServerError)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthExpired => "auth expired",
            Self::PermissionDenied => "permission denied",
            Self::NetworkUnreachable => "network unreachable",
            Self::ServerError => "server error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A freshly issued bearer token together with its role.
///
/// `Debug` redacts the token so it can't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub role: Role,
}

impl Credentials {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
