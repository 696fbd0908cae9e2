//! The auth service over the API client.

use sessionward_protocol::{
    Codec, Credentials, JsonCodec, LoginRequest, RegisterProfile, RegisterRequest, Role,
    TokenResponse, ValidateResponse,
};
use sessionward_session::{AuthService, CredentialStore};
use sessionward_transport::HttpTransport;

use crate::{ApiClient, ApiError};

/// Login, register, and validate calls, classified like any other request.
///
/// Login and register are on the unauthenticated allow-list, so their
/// failures come back raw and never end a session.
pub struct AuthApi<T, S, C = JsonCodec> {
    client: ApiClient<T, S, C>,
}

impl<T, S, C> Clone for AuthApi<T, S, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<T, S, C> AuthApi<T, S, C> {
    pub fn new(client: ApiClient<T, S, C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient<T, S, C> {
        &self.client
    }
}

impl<T: HttpTransport, S: CredentialStore, C: Codec> AuthService for AuthApi<T, S, C> {
    type Error = ApiError;

    async fn login(&self, email: &str, password: &str) -> Result<Credentials, ApiError> {
        let path = self.client.endpoints().login.clone();
        let response = self
            .client
            .post_json(path, &LoginRequest::new(email, password))
            .await?;
        let body: TokenResponse = self.client.decode(&response)?;
        Ok(body.into_credentials(Role::Member)?)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        profile: RegisterProfile,
    ) -> Result<Credentials, ApiError> {
        let path = self.client.endpoints().register.clone();
        let response = self
            .client
            .post_json(path, &RegisterRequest::new(email, password, profile))
            .await?;
        let body: TokenResponse = self.client.decode(&response)?;
        // New accounts are always members.
        let body = TokenResponse { role: None, ..body };
        Ok(body.into_credentials(Role::Member)?)
    }

    /// `Ok(role)` when the server accepts the token; the role is `None`
    /// when the response carries none. A 2xx that says `valid: false` is
    /// treated like a 401.
    async fn validate(&self) -> Result<Option<Role>, ApiError> {
        let epoch = self.client.state().current().epoch();
        let path = self.client.endpoints().validate.clone();
        let response = self.client.get(path).await?;
        let body: ValidateResponse = self.client.decode(&response)?;
        if !body.valid {
            self.client.expire(epoch, response.status).await?;
        }
        Ok(body.role)
    }
}
