//! Request and response bodies exchanged with the auth service.

use serde::{Deserialize, Serialize};

use crate::{Credentials, ProtocolError, Role};

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Profile fields collected at registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterProfile {
    pub full_name: String,
    pub phone: Option<String>,
}

/// Body of `POST /api/auth/register`.
///
/// The API speaks camelCase (`fullName`); `rename_all` maps it onto the
/// snake_case fields here so neither side bends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    // Omitted rather than sent as `null` when there is no phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        profile: RegisterProfile,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: profile.full_name,
            phone: profile.phone,
        }
    }
}

/// Response of login and register.
///
/// Register responses carry no role; the account is always a member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    // A missing `role` key decodes to `None` instead of failing.
    #[serde(default)]
    pub role: Option<Role>,
}

impl TokenResponse {
    /// Converts into [`Credentials`], using `fallback_role` when the
    /// server sent none.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] for an empty token.
    pub fn into_credentials(
        self,
        fallback_role: Role,
    ) -> Result<Credentials, ProtocolError> {
        if self.token.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "auth response carried an empty token".into(),
            ));
        }
        Ok(Credentials {
            token: self.token,
            role: self.role.unwrap_or(fallback_role),
        })
    }
}

/// Response of `GET /api/auth/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidateResponse {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub email: Option<String>,
}

fn default_valid() -> bool {
    true
}

/// Error payload the API returns alongside 4xx/5xx statuses.
///
/// The backend uses either `message` or `error` for the text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message, if any.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_uses_camel_case() {
        let req = RegisterRequest::new(
            "a@b.vn",
            "pw",
            RegisterProfile {
                full_name: "Nguyen Van A".into(),
                phone: None,
            },
        );

        let json = serde_json::to_value(&req).expect("should encode");

        assert_eq!(json["fullName"], "Nguyen Van A");
        assert!(json.get("phone").is_none(), "absent phone is omitted");
    }

    #[test]
    fn test_token_response_without_role_uses_fallback() {
        let res: TokenResponse =
            serde_json::from_str(r#"{"token":"t"}"#).expect("should decode");

        let creds = res.into_credentials(Role::Member).expect("valid token");

        assert_eq!(creds.role, Role::Member);
        assert_eq!(creds.token, "t");
    }

    #[test]
    fn test_token_response_empty_token_is_invalid() {
        let res: TokenResponse =
            serde_json::from_str(r#"{"token":"  ","role":"ADMIN"}"#)
                .expect("should decode");

        assert!(matches!(
            res.into_credentials(Role::Member),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_validate_response_unknown_role_is_member() {
        let res: ValidateResponse = serde_json::from_str(
            r#"{"valid":true,"role":"SUPPORT","email":"a@b.vn"}"#,
        )
        .expect("should decode");

        assert!(res.valid);
        assert_eq!(res.role, Some(Role::Member));
    }

    #[test]
    fn test_error_body_prefers_message_over_error() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"m","error":"e"}"#)
                .expect("should decode");
        assert_eq!(body.text(), Some("m"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":"Email already in use"}"#)
            .expect("should decode");
        assert_eq!(body.text(), Some("Email already in use"));
    }
}
