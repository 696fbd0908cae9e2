//! Session lifecycle for Sessionward.
//!
//! This crate owns the client's belief about "am I logged in":
//!
//! 1. **State**: [`AuthState`], the single container for
//!    `{token, role, isAuthenticated, isLoading}`, published to observers
//!    through a `watch` channel and mutated only through serialized
//!    transitions (`load`, `save`, `sign_out`, `validate_token`).
//! 2. **Persistence**: the [`CredentialStore`] port with [`MemoryStore`]
//!    and [`FileStore`] implementations.
//! 3. **Ending a session**: [`LogoutBundle`], which clears storage and
//!    memory, resets navigation, and alerts the user exactly once per
//!    session epoch, however many callers race to trigger it.
//! 4. **Ports**: [`AuthService`], [`Navigator`], [`Notifier`]: what the
//!    session needs from the outside world.
//!
//! # How it fits in the stack
//!
//! ```text
//! Monitor (validation loop)   Client (failure classifier)
//!              ↘                 ↙
//!        Session Layer (this crate)
//!              ↓
//!        Protocol Layer (Role, FailureClass, keys)
//! ```

mod error;
mod guard;
mod logout;
mod ports;
mod session;
mod state;
mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::SessionError;
pub use guard::AccessGuard;
pub use logout::{LogoutBundle, LogoutNotice};
pub use ports::{Alert, AuthService, Navigator, Notifier, ServiceFailure};
pub use session::{Session, SessionKey};
pub use state::AuthState;
pub use store::{
    CredentialStore, FileStore, MemoryStore, StoreError, StoreFailures,
};
