//! Shared vocabulary for Sessionward.
//!
//! This crate defines what the other layers agree on:
//!
//! - **Types** ([`Role`], [`FailureClass`], [`Credentials`]): the
//!   session concepts every layer talks about.
//! - **Wire** ([`LoginRequest`], [`TokenResponse`], [`ValidateResponse`]):
//!   bodies exchanged with the auth service.
//! - **Endpoints** ([`Endpoints`]): which paths exist, which one is the
//!   validate endpoint, and which are exempt from credentials.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how bodies become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (typed bodies) → Session / Client
//! ```

mod codec;
mod endpoints;
mod error;
mod types;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use endpoints::{
    AUTH_KEYS, AUTHORIZATION, Endpoints, LOGIN_ROUTE, ROLE_KEY, TOKEN_KEY,
    bearer,
};
pub use error::ProtocolError;
pub use types::{Credentials, FailureClass, Role};
pub use wire::{
    ErrorBody, LoginRequest, RegisterProfile, RegisterRequest, TokenResponse,
    ValidateResponse,
};
