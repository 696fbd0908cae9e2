//! The API client for Sessionward.
//!
//! Every outbound call goes through [`ApiClient`], which attaches the
//! bearer token on the way out and classifies failures on the way back:
//!
//! | Response                          | Verdict                          |
//! |-----------------------------------|----------------------------------|
//! | 401 anywhere                      | `AuthExpired`, logout fires      |
//! | 403 from the validate endpoint    | `AuthExpired`, logout fires      |
//! | 403 elsewhere                     | recheck validate, then decide    |
//! | no response                       | `NetworkUnreachable`             |
//! | 5xx with a body                   | `ServerError`                    |
//! | other non-2xx, bare 5xx           | `Status`, unclassified           |
//!
//! Requests to the unauthenticated allow-list (login, register, the public
//! read endpoint) carry no token and their failures come back raw.
//!
//! [`AuthApi`] is the auth service built on top of the client.

mod api;
mod auth;
mod error;
mod request;

pub use api::ApiClient;
pub use auth::AuthApi;
pub use error::ApiError;
pub use request::{ApiRequest, RetryMarker};
